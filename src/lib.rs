//! Runtime for the X Gold Dragon X fundraising page.
//!
//! The page is a static content model plus three pieces of live state: an
//! interactive 3D scene whose model loads asynchronously, a quote carousel
//! driven by a repeating timer, and the funding progress. Everything here is
//! single threaded and ephemeral; mounting a page acquires its timers and
//! unmounting (dropping) it releases them.

pub mod app;
pub mod assets;
pub mod carousel;
pub mod composer;
pub mod content;
pub mod controls;
pub mod error;
pub mod mesh;
pub mod page;
pub mod progress;
pub mod render;
pub mod scene;
pub mod stars;
pub mod timer;
pub mod transform;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use assets::{
    AssetLoader, AssetSource, AssetState, FetchMode, FsSource, MemorySource, SceneAsset,
    MODEL_PATH,
};
pub use carousel::{
    MountedCarousel, QuoteCarousel, QuoteEntry, Transition, ROTATION_INTERVAL_MS,
};
pub use composer::{AssetSlot, SceneComposer, SceneGraph, SceneNode};
pub use controls::OrbitControls;
pub use error::AssetLoadError;
pub use mesh::MeshData;
pub use page::{FundingState, MountedPage, Page, PageRenderer, PageView, TextRenderer};
pub use progress::{format_count, percentage, ProgressView};
pub use render::{CameraParams, LightParams, Renderer};
pub use scene::{EnvironmentPreset, LightDescriptor, OrbitConfig, SceneDescriptor};
pub use stars::{StarField, StarFieldConfig};
pub use timer::{IntervalGuard, IntervalId, TimerHost, VirtualClock};
pub use transform::Transform;
