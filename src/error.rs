use thiserror::Error;

/// Reasons a scene asset could not be produced.
///
/// Errors are cached alongside successful loads, so the type is cheap to
/// clone and carries only owned strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetLoadError {
    #[error("asset not found: {path}")]
    NotFound { path: String },
    #[error("unable to read asset {path}: {message}")]
    Io { path: String, message: String },
    #[error("asset {path} is malformed: {reason}")]
    Malformed { path: String, reason: String },
}

impl AssetLoadError {
    /// Resource path the error refers to.
    pub fn path(&self) -> &str {
        match self {
            Self::NotFound { path } | Self::Io { path, .. } | Self::Malformed { path, .. } => path,
        }
    }

    pub(crate) fn from_io(path: &str, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound {
                path: path.to_string(),
            }
        } else {
            Self::Io {
                path: path.to_string(),
                message: err.to_string(),
            }
        }
    }

    pub(crate) fn malformed(path: &str, reason: impl std::fmt::Display) -> Self {
        Self::Malformed {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_not_found_maps_to_not_found() {
        let err = AssetLoadError::from_io(
            "/Model/scene.obj",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(
            err,
            AssetLoadError::NotFound {
                path: "/Model/scene.obj".into()
            }
        );
        assert_eq!(err.path(), "/Model/scene.obj");
    }

    #[test]
    fn malformed_message_names_path() {
        let err = AssetLoadError::malformed("a.obj", "no vertices");
        assert_eq!(err.to_string(), "asset a.obj is malformed: no vertices");
    }
}
