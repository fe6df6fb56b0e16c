use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Floats per interleaved vertex: `position.xyz` followed by `normal.xyz`.
pub const VERTEX_STRIDE: usize = 6;

/// Triangle mesh decoded from a model file, ready for upload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MeshData {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

/// Axis-aligned bounds of a mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

impl MeshData {
    /// Parses Wavefront OBJ text.
    ///
    /// Polygons are fan-triangulated, negative indices count back from the
    /// end of the current vertex list and vertices without normals get
    /// smooth normals computed from the surrounding faces.
    pub fn from_obj_str(data: &str) -> Result<Self> {
        let mut positions = Vec::new();
        let mut normals = Vec::new();
        let mut faces: Vec<[FaceIndex; 3]> = Vec::new();

        for (line_no, line) in data.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let mut parts = trimmed.split_whitespace();
            let Some(tag) = parts.next() else {
                continue;
            };
            match tag {
                "v" => positions.push(
                    parse_vec3(parts)
                        .with_context(|| format!("invalid vertex on line {}", line_no + 1))?,
                ),
                "vn" => normals.push(
                    parse_vec3(parts)
                        .with_context(|| format!("invalid normal on line {}", line_no + 1))?,
                ),
                "f" => {
                    let polygon = parse_face(parts)
                        .with_context(|| format!("invalid face on line {}", line_no + 1))?;
                    triangulate(&polygon, &mut faces);
                }
                _ => {}
            }
        }

        if positions.is_empty() {
            return Err(anyhow!("model does not define any vertices"));
        }
        if faces.is_empty() {
            return Err(anyhow!("model does not define any faces"));
        }

        let mut mesh = build_mesh(&positions, &normals, &faces)?;
        if mesh.has_missing_normals() {
            mesh.compute_normals();
        }
        Ok(mesh)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / VERTEX_STRIDE
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.vertices
            .chunks_exact(VERTEX_STRIDE)
            .map(|chunk| Vec3::new(chunk[0], chunk[1], chunk[2]))
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let mut positions = self.positions();
        let first = positions.next()?;
        let (min, max) = positions.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Bounds { min, max })
    }

    /// Translates every vertex so the bounding box is centred on the origin.
    pub fn center_on_origin(&mut self) {
        let Some(bounds) = self.bounds() else {
            return;
        };
        let offset = bounds.center();
        if offset.length_squared() <= f32::EPSILON {
            return;
        }
        for chunk in self.vertices.chunks_exact_mut(VERTEX_STRIDE) {
            chunk[0] -= offset.x;
            chunk[1] -= offset.y;
            chunk[2] -= offset.z;
        }
    }

    fn has_missing_normals(&self) -> bool {
        self.vertices
            .chunks_exact(VERTEX_STRIDE)
            .any(|chunk| chunk[3] == 0.0 && chunk[4] == 0.0 && chunk[5] == 0.0)
    }

    fn compute_normals(&mut self) {
        let mut accum = vec![Vec3::ZERO; self.vertex_count()];

        for triangle in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
            let p0 = Vec3::from_slice(&self.vertices[i0 * VERTEX_STRIDE..]);
            let p1 = Vec3::from_slice(&self.vertices[i1 * VERTEX_STRIDE..]);
            let p2 = Vec3::from_slice(&self.vertices[i2 * VERTEX_STRIDE..]);
            let normal = (p1 - p0).cross(p2 - p0);
            if normal.length_squared() > f32::EPSILON {
                let normal = normal.normalize();
                accum[i0] += normal;
                accum[i1] += normal;
                accum[i2] += normal;
            }
        }

        for (i, normal) in accum.into_iter().enumerate() {
            let normal = normal.normalize_or_zero();
            let base = i * VERTEX_STRIDE;
            self.vertices[base + 3] = normal.x;
            self.vertices[base + 4] = normal.y;
            self.vertices[base + 5] = normal.z;
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct FaceIndex {
    position: i32,
    normal: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct VertexKey {
    position: usize,
    normal: Option<usize>,
}

fn parse_vec3<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec3> {
    let mut next = || -> Result<f32> {
        Ok(parts
            .next()
            .ok_or_else(|| anyhow!("missing vector component"))?
            .parse::<f32>()?)
    };
    Ok(Vec3::new(next()?, next()?, next()?))
}

fn parse_face<'a>(parts: impl Iterator<Item = &'a str>) -> Result<Vec<FaceIndex>> {
    let mut polygon = Vec::new();
    for part in parts {
        let mut segments = part.split('/');
        let position = segments
            .next()
            .ok_or_else(|| anyhow!("missing vertex index"))?
            .parse::<i32>()?;
        // texture coordinates are ignored
        let _ = segments.next();
        let normal = match segments.next() {
            Some(s) if !s.is_empty() => s.parse::<i32>()?,
            _ => 0,
        };
        polygon.push(FaceIndex { position, normal });
    }
    if polygon.len() < 3 {
        return Err(anyhow!("faces must reference at least 3 vertices"));
    }
    Ok(polygon)
}

fn triangulate(polygon: &[FaceIndex], faces: &mut Vec<[FaceIndex; 3]>) {
    for i in 1..polygon.len().saturating_sub(1) {
        faces.push([polygon[0], polygon[i], polygon[i + 1]]);
    }
}

fn build_mesh(positions: &[Vec3], normals: &[Vec3], faces: &[[FaceIndex; 3]]) -> Result<MeshData> {
    let mut lookup: HashMap<VertexKey, u32> = HashMap::new();
    let mut vertices = Vec::new();
    let mut indices = Vec::with_capacity(faces.len() * 3);

    for face in faces {
        for idx in face {
            let position = resolve_index(idx.position, positions.len())
                .ok_or_else(|| anyhow!("vertex index {} out of range", idx.position))?;
            let normal = resolve_index(idx.normal, normals.len());
            let key = VertexKey { position, normal };
            let next_index = (vertices.len() / VERTEX_STRIDE) as u32;
            let index = *lookup.entry(key).or_insert_with(|| {
                let p = positions[position];
                let n = normal.map(|i| normals[i]).unwrap_or(Vec3::ZERO);
                vertices.extend_from_slice(&[p.x, p.y, p.z, n.x, n.y, n.z]);
                next_index
            });
            indices.push(index);
        }
    }

    Ok(MeshData { vertices, indices })
}

fn resolve_index(index: i32, len: usize) -> Option<usize> {
    if index > 0 {
        let zero_based = index as usize - 1;
        (zero_based < len).then_some(zero_based)
    } else if index < 0 {
        let back = index.unsigned_abs() as usize;
        (back <= len).then(|| len - back)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "v 0 0 0\nv 2 0 0\nv 2 2 0\nv 0 2 0\nf 1 2 3 4\n";

    #[test]
    fn quad_is_fan_triangulated() {
        let mesh = MeshData::from_obj_str(QUAD).unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.vertex_count(), 4);
    }

    #[test]
    fn missing_normals_are_computed() {
        let mesh = MeshData::from_obj_str(QUAD).unwrap();
        for chunk in mesh.vertices.chunks_exact(VERTEX_STRIDE) {
            let normal = Vec3::new(chunk[3], chunk[4], chunk[5]);
            assert!((normal - Vec3::Z).length() < 1e-5);
        }
    }

    #[test]
    fn negative_indices_count_from_end() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let mesh = MeshData::from_obj_str(obj).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn explicit_normals_are_kept() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 1 0\nf 1//1 2//1 3//1\n";
        let mesh = MeshData::from_obj_str(obj).unwrap();
        assert_eq!(&mesh.vertices[3..6], &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn centering_moves_bounds_to_origin() {
        let mut mesh = MeshData::from_obj_str(QUAD).unwrap();
        mesh.center_on_origin();
        let bounds = mesh.bounds().unwrap();
        assert!(bounds.center().length() < 1e-6);
        assert_eq!(bounds.size(), Vec3::new(2.0, 2.0, 0.0));
    }

    #[test]
    fn rejects_empty_and_out_of_range_models() {
        assert!(MeshData::from_obj_str("# nothing here\n").is_err());
        assert!(MeshData::from_obj_str("v 0 0 0\n").is_err());
        assert!(MeshData::from_obj_str("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 9\n").is_err());
        assert!(MeshData::from_obj_str("v 0 zero 0\n").is_err());
    }
}
