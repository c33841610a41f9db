//! The public surface of the asset system.
//!
//! Every load, request and tick goes through the `Pipeline` trait. There are two
//! implementations. `BundleManager` drives the throttled request queue, the
//! bundle and asset caches and the loader state machines. `DirectPipeline`
//! bypasses all of that with synchronous reads, which is handy for tooling and
//! offline workflows. The strategy is picked once, when the `AssetSystem` is
//! constructed, so none of the loader or queue code branches on the
//! environment.
//!
//! ```rust,ignore
//! let mut sys = AssetSystem::networked(params, schemas, urls);
//! sys.initialize();
//!
//! let loader = sys.load_asset_async("ui/login.prefab").unwrap();
//! while !sys.asset_loader(loader).unwrap().is_done() {
//!     sys.advance();
//! }
//! ```

pub mod diagnostics;
pub mod direct;
pub mod manager;

pub use self::direct::{DirectDirectory, DirectPipeline, DirectReader};
pub use self::manager::BundleManager;

use std::ops::{Deref, DerefMut};
use std::time::Duration;

use crate::asset::loader::{AssetLoader, AssetLoaderHandle};
use crate::asset::Asset;
use crate::bundle::loader::{BundleLoader, BundleLoaderHandle};
use crate::request::{FetchRequest, RequestHandle};
use crate::settings::BundleParams;
use crate::url::UrlResolver;
use crate::vfs::SchemaResolver;

/// The lifecycle stage of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    Idle,
    Initializing,
    Ready,
    /// Initialization failed, the pipeline is unusable.
    Failed,
    /// Teardown is waiting for in-flight work to drain.
    Closing,
    Closed,
}

pub trait Pipeline {
    /// Starts loading the dependency manifest and the path mapping.
    fn initialize(&mut self);

    fn state(&self) -> InitState;

    /// Returns true once both the manifest and the path mapping are populated.
    #[inline]
    fn is_ready(&self) -> bool {
        self.state() == InitState::Ready
    }

    /// Blocks new requests and cache reads, then releases every asset and bundle
    /// once in-flight work has drained.
    fn teardown(&mut self);

    #[inline]
    fn is_torn_down(&self) -> bool {
        self.state() == InitState::Closed
    }

    /// Returns true if any request is queued or active, or any loader is still
    /// waiting.
    fn is_process_running(&self) -> bool;

    /// Runs one update pass: the request queue, then bundle loaders, then asset
    /// loaders.
    fn advance(&mut self);

    fn load_asset_async(&mut self, path: &str) -> Option<AssetLoaderHandle>;

    /// Loads an asset whose bundle is resident already.
    fn load_asset_sync(&mut self, path: &str) -> Option<Asset>;

    /// Loads the bundle of an additive scene. Never satisfied from cache.
    fn load_additive_scene_async(&mut self, path: &str) -> Option<AssetLoaderHandle>;

    fn load_bundle_async(&mut self, name: &str, header_only: bool) -> Option<BundleLoaderHandle>;

    fn asset_loader(&self, handle: AssetLoaderHandle) -> Option<&AssetLoader>;

    fn asset_loader_progress(&self, handle: AssetLoaderHandle) -> f32;

    /// Returns the loader to its pool. Fetches are never aborted.
    fn dispose_asset_loader(&mut self, handle: AssetLoaderHandle) -> bool;

    fn bundle_loader(&self, handle: BundleLoaderHandle) -> Option<&BundleLoader>;

    fn bundle_loader_progress(&self, handle: BundleLoaderHandle) -> f32;

    fn dispose_bundle_loader(&mut self, handle: BundleLoaderHandle) -> bool;

    /// Fetches bytes from an arbitrary url.
    fn download_web_resource(&mut self, url: &str, timeout: Option<Duration>) -> Option<RequestHandle>;

    /// Fetches a file from the download server.
    fn download_asset_file(&mut self, path: &str, timeout: Option<Duration>) -> Option<RequestHandle>;

    /// Fetches the raw bytes of a bundle from the download server. The timeout
    /// falls back to `BundleParams::bundle_download_timeout`.
    fn download_asset_bundle(&mut self, path: &str, timeout: Option<Duration>) -> Option<RequestHandle>;

    /// Fetches a shipped file, preferring newer local copies unless
    /// `packaged_only` is set.
    fn request_asset_file(&mut self, path: &str, packaged_only: bool) -> Option<RequestHandle>;

    /// Fetches a full bundle without caching it.
    fn request_asset_bundle(&mut self, name: &str) -> Option<RequestHandle>;

    fn request(&self, handle: RequestHandle) -> Option<&FetchRequest>;

    fn dispose_request(&mut self, handle: RequestHandle) -> bool;
}

/// The host-owned asset system, holding the pipeline strategy chosen at
/// construction.
pub struct AssetSystem {
    pipeline: Box<dyn Pipeline>,
}

impl AssetSystem {
    pub fn new<T: Pipeline + 'static>(pipeline: T) -> Self {
        AssetSystem {
            pipeline: Box::new(pipeline),
        }
    }

    /// Creates the bundle driven pipeline.
    pub fn networked<U>(params: BundleParams, schemas: SchemaResolver, urls: U) -> Self
    where
        U: UrlResolver + 'static,
    {
        AssetSystem::new(BundleManager::new(params, schemas, urls))
    }

    /// Creates the pipeline reading straight from `reader`.
    pub fn direct<R>(params: BundleParams, schemas: SchemaResolver, reader: R) -> Self
    where
        R: DirectReader + 'static,
    {
        AssetSystem::new(DirectPipeline::new(params, schemas, reader))
    }
}

impl Deref for AssetSystem {
    type Target = dyn Pipeline;

    fn deref(&self) -> &Self::Target {
        self.pipeline.as_ref()
    }
}

impl DerefMut for AssetSystem {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.pipeline.as_mut()
    }
}
