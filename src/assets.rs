//! Path-keyed loading and caching of the decorative scene model.
//!
//! Callers never observe a half-built asset: [`AssetLoader::load`] answers
//! with an [`AssetState`] that is either pending, ready with a shared handle
//! or failed with the cached error. Cache transitions only happen inside
//! [`AssetLoader::pump`], which the owning UI thread calls once per frame.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use log::{debug, error, info, warn};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::error::AssetLoadError;
use crate::mesh::MeshData;

/// Well-known resource path of the scene model.
pub const MODEL_PATH: &str = "/Model/scene.obj";

static GLOBAL: OnceCell<AssetLoader> = OnceCell::new();

/// Decoded model shared read-only between the loader cache and the scene.
#[derive(Debug)]
pub struct SceneAsset {
    path: String,
    mesh: MeshData,
}

impl SceneAsset {
    /// Decodes model bytes. The mesh is centred on its bounding box.
    pub fn decode(path: &str, bytes: &[u8]) -> Result<Self, AssetLoadError> {
        let text =
            std::str::from_utf8(bytes).map_err(|err| AssetLoadError::malformed(path, err))?;
        let mut mesh = MeshData::from_obj_str(text)
            .map_err(|err| AssetLoadError::malformed(path, format!("{err:#}")))?;
        mesh.center_on_origin();
        Ok(Self {
            path: path.to_string(),
            mesh,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn mesh(&self) -> &MeshData {
        &self.mesh
    }
}

/// Observable state of a model request.
#[derive(Debug, Clone)]
pub enum AssetState {
    Pending,
    Ready(Arc<SceneAsset>),
    Failed(AssetLoadError),
}

impl AssetState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn ready(&self) -> Option<&Arc<SceneAsset>> {
        match self {
            Self::Ready(asset) => Some(asset),
            _ => None,
        }
    }
}

/// Where model bytes come from.
pub trait AssetSource: Send + Sync {
    fn read(&self, path: &str) -> Result<Vec<u8>, AssetLoadError>;
}

/// Reads resources from a directory, treating resource paths as rooted at it.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, AssetLoadError> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            return Err(AssetLoadError::Io {
                path: path.to_string(),
                message: "path escapes the asset root".to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

impl AssetSource for FsSource {
    fn read(&self, path: &str) -> Result<Vec<u8>, AssetLoadError> {
        let full = self.resolve(path)?;
        std::fs::read(&full).map_err(|err| AssetLoadError::from_io(path, err))
    }
}

/// In-memory resources, used for embedded data and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.into(), bytes.into());
        self
    }
}

impl AssetSource for MemorySource {
    fn read(&self, path: &str) -> Result<Vec<u8>, AssetLoadError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| AssetLoadError::NotFound {
                path: path.to_string(),
            })
    }
}

/// How fetches are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Fetches run on the caller's thread during [`AssetLoader::pump`].
    Deferred,
    /// Each fetch runs on a worker thread; `pump` collects the results.
    Background,
}

enum Slot {
    Queued,
    InFlight,
    Ready(Arc<SceneAsset>),
    Failed(AssetLoadError),
}

type Completion = (String, Result<SceneAsset, AssetLoadError>);

/// Path-keyed model cache. One fetch per distinct path, ever.
pub struct AssetLoader {
    source: Arc<dyn AssetSource>,
    mode: FetchMode,
    slots: Mutex<HashMap<String, Slot>>,
    completed_tx: Mutex<Sender<Completion>>,
    completed_rx: Mutex<Receiver<Completion>>,
    fetches: AtomicUsize,
}

impl AssetLoader {
    pub fn new(source: impl AssetSource + 'static, mode: FetchMode) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            source: Arc::new(source),
            mode,
            slots: Mutex::new(HashMap::new()),
            completed_tx: Mutex::new(tx),
            completed_rx: Mutex::new(rx),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn mode(&self) -> FetchMode {
        self.mode
    }

    /// Starts loading `path` unless it is already known. Never blocks.
    pub fn preload(&self, path: &str) {
        let mut slots = self.slots.lock();
        if slots.contains_key(path) {
            return;
        }
        match self.mode {
            FetchMode::Deferred => {
                debug!("queued asset {path}");
                slots.insert(path.to_string(), Slot::Queued);
            }
            FetchMode::Background => {
                slots.insert(path.to_string(), Slot::InFlight);
                drop(slots);
                self.spawn_fetch(path);
            }
        }
    }

    /// Returns the current state for `path`, starting a load if needed.
    pub fn load(&self, path: &str) -> AssetState {
        self.preload(path);
        match self.slots.lock().get(path) {
            Some(Slot::Ready(asset)) => AssetState::Ready(Arc::clone(asset)),
            Some(Slot::Failed(err)) => AssetState::Failed(err.clone()),
            Some(Slot::Queued | Slot::InFlight) | None => AssetState::Pending,
        }
    }

    /// Applies finished fetches to the cache and returns how many landed.
    pub fn pump(&self) -> usize {
        match self.mode {
            FetchMode::Deferred => self.run_queued(),
            FetchMode::Background => {
                let finished: Vec<Completion> = self.completed_rx.lock().try_iter().collect();
                let count = finished.len();
                for (path, result) in finished {
                    self.complete(path, result);
                }
                count
            }
        }
    }

    /// Number of underlying fetches issued so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn run_queued(&self) -> usize {
        let mut queued: Vec<String> = {
            let mut slots = self.slots.lock();
            slots
                .iter_mut()
                .filter(|(_, slot)| matches!(slot, Slot::Queued))
                .map(|(path, slot)| {
                    *slot = Slot::InFlight;
                    path.clone()
                })
                .collect()
        };
        queued.sort();
        let count = queued.len();
        for path in queued {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let result = fetch(self.source.as_ref(), &path);
            self.complete(path, result);
        }
        count
    }

    fn spawn_fetch(&self, path: &str) {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let source = Arc::clone(&self.source);
        let tx = self.completed_tx.lock().clone();
        let worker_path = path.to_string();
        let spawned = std::thread::Builder::new()
            .name("asset-fetch".to_string())
            .spawn(move || {
                let result = fetch(source.as_ref(), &worker_path);
                let _ = tx.send((worker_path, result));
            });
        if let Err(err) = spawned {
            let failure = AssetLoadError::from_io(path, err);
            let _ = self
                .completed_tx
                .lock()
                .send((path.to_string(), Err(failure)));
        }
    }

    fn complete(&self, path: String, result: Result<SceneAsset, AssetLoadError>) {
        let slot = match result {
            Ok(asset) => {
                info!(
                    "loaded {path} ({} vertices, {} triangles)",
                    asset.mesh.vertex_count(),
                    asset.mesh.triangle_count()
                );
                Slot::Ready(Arc::new(asset))
            }
            Err(err) => {
                error!("{err}");
                Slot::Failed(err)
            }
        };
        self.slots.lock().insert(path, slot);
    }
}

fn fetch(source: &dyn AssetSource, path: &str) -> Result<SceneAsset, AssetLoadError> {
    let bytes = source.read(path)?;
    SceneAsset::decode(path, &bytes)
}

/// Installs the process-wide loader. The first installation wins.
pub fn install_global(loader: AssetLoader) -> &'static AssetLoader {
    if GLOBAL.get().is_some() {
        warn!("asset loader already installed; keeping the existing cache");
    }
    GLOBAL.get_or_init(|| loader)
}

/// Returns the process-wide loader, if one was installed.
pub fn global() -> Option<&'static AssetLoader> {
    GLOBAL.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    struct CountingSource {
        inner: MemorySource,
        reads: Arc<AtomicUsize>,
    }

    impl AssetSource for CountingSource {
        fn read(&self, path: &str) -> Result<Vec<u8>, AssetLoadError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.read(path)
        }
    }

    fn counting_loader(mode: FetchMode) -> (AssetLoader, Arc<AtomicUsize>) {
        let reads = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            inner: MemorySource::new().with_file(MODEL_PATH, TRIANGLE),
            reads: Arc::clone(&reads),
        };
        (AssetLoader::new(source, mode), reads)
    }

    fn wait_until_settled(loader: &AssetLoader, path: &str) -> AssetState {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            loader.pump();
            let state = loader.load(path);
            if !state.is_pending() || Instant::now() > deadline {
                return state;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn pending_until_pumped() {
        let (loader, reads) = counting_loader(FetchMode::Deferred);
        loader.preload(MODEL_PATH);
        assert!(loader.load(MODEL_PATH).is_pending());
        assert_eq!(reads.load(Ordering::SeqCst), 0);

        assert_eq!(loader.pump(), 1);
        assert!(loader.load(MODEL_PATH).ready().is_some());
    }

    #[test]
    fn repeated_loads_share_one_handle() {
        let (loader, reads) = counting_loader(FetchMode::Deferred);
        loader.load(MODEL_PATH);
        loader.load(MODEL_PATH);
        loader.pump();
        let first = loader.load(MODEL_PATH);
        let second = loader.load(MODEL_PATH);
        assert!(Arc::ptr_eq(first.ready().unwrap(), second.ready().unwrap()));
        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert_eq!(loader.fetch_count(), 1);
        assert_eq!(loader.pump(), 0);
    }

    #[test]
    fn failure_is_cached_without_retry() {
        let (loader, reads) = counting_loader(FetchMode::Deferred);
        loader.load("/Model/missing.obj");
        loader.pump();
        for _ in 0..3 {
            match loader.load("/Model/missing.obj") {
                AssetState::Failed(AssetLoadError::NotFound { path }) => {
                    assert_eq!(path, "/Model/missing.obj")
                }
                other => panic!("unexpected state {other:?}"),
            }
            loader.pump();
        }
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn malformed_bytes_fail_to_decode() {
        let source = MemorySource::new()
            .with_file("/bad.obj", "v 1 2\n")
            .with_file("/binary.obj", vec![0xff, 0xfe, 0x00]);
        let loader = AssetLoader::new(source, FetchMode::Deferred);
        loader.preload("/bad.obj");
        loader.preload("/binary.obj");
        assert_eq!(loader.pump(), 2);
        for path in ["/bad.obj", "/binary.obj"] {
            assert!(matches!(
                loader.load(path),
                AssetState::Failed(AssetLoadError::Malformed { .. })
            ));
        }
    }

    #[test]
    fn background_fetch_is_collected_by_pump() {
        let (loader, reads) = counting_loader(FetchMode::Background);
        let state = wait_until_settled(&loader, MODEL_PATH);
        let asset = state.ready().expect("asset should load");
        assert_eq!(asset.path(), MODEL_PATH);
        assert_eq!(asset.mesh().triangle_count(), 1);
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_requests_fetch_once() {
        let (loader, reads) = counting_loader(FetchMode::Background);
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| loader.preload(MODEL_PATH));
            }
        });
        let first = wait_until_settled(&loader, MODEL_PATH);
        let second = loader.load(MODEL_PATH);
        assert!(Arc::ptr_eq(first.ready().unwrap(), second.ready().unwrap()));
        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert_eq!(loader.fetch_count(), 1);
    }

    #[test]
    fn fs_source_reads_rooted_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Model")).unwrap();
        std::fs::write(dir.path().join("Model/scene.obj"), TRIANGLE).unwrap();

        let source = FsSource::new(dir.path());
        assert_eq!(source.read(MODEL_PATH).unwrap(), TRIANGLE.as_bytes());
        assert!(matches!(
            source.read("/Model/other.obj"),
            Err(AssetLoadError::NotFound { .. })
        ));
        assert!(matches!(
            source.read("/../secret.obj"),
            Err(AssetLoadError::Io { .. })
        ));
    }

    #[test]
    fn decoded_assets_are_centred() {
        let asset = SceneAsset::decode("/quad.obj", b"v 2 2 0\nv 4 2 0\nv 4 4 0\nf 1 2 3\n")
            .unwrap();
        let bounds = asset.mesh().bounds().unwrap();
        assert!(bounds.center().length() < 1e-6);
    }
}
