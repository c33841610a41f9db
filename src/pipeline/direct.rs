use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::asset::loader::{AssetLoader, AssetLoaderHandle};
use crate::asset::{Asset, RawAsset};
use crate::bundle::cache::BundleCache;
use crate::bundle::loader::{BundleLoader, BundleLoaderHandle};
use crate::errors::*;
use crate::request::queue::RequestQueue;
use crate::request::{FetchRequest, RequestHandle, RequestParams};
use crate::settings::BundleParams;
use crate::utils::object_pool::ObjectPool;
use crate::vfs::SchemaResolver;

use super::{InitState, Pipeline};

/// Synchronous access to unpackaged content.
pub trait DirectReader: Send + Sync {
    /// Reads the asset stored at `path`, which is already prefixed with the
    /// assets folder.
    fn read_asset(&self, path: &str) -> Result<Asset>;

    /// Returns the url raw fetches of `path` should use.
    fn file_url(&self, path: &str) -> String;
}

/// Reads assets as plain files below a root directory.
#[derive(Debug, Clone)]
pub struct DirectDirectory {
    root: PathBuf,
}

impl DirectDirectory {
    pub fn new<T: Into<PathBuf>>(root: T) -> Self {
        DirectDirectory { root: root.into() }
    }
}

impl DirectReader for DirectDirectory {
    fn read_asset(&self, path: &str) -> Result<Asset> {
        let bytes = fs::read(self.root.join(path))?;
        Ok(Arc::new(RawAsset::new(path, bytes.into_boxed_slice())))
    }

    fn file_url(&self, path: &str) -> String {
        format!("file://{}", self.root.join(path).display())
    }
}

/// A pipeline without bundles. Assets are read synchronously through a
/// `DirectReader` and loaders complete as soon as they are created. Raw fetches
/// still go through a request queue, which teardown waits to drain.
pub struct DirectPipeline {
    params: BundleParams,
    reader: Box<dyn DirectReader>,
    queue: RequestQueue,
    bundles: BundleCache,
    bundle_loaders: ObjectPool<BundleLoaderHandle, BundleLoader>,
    asset_loaders: ObjectPool<AssetLoaderHandle, AssetLoader>,
    remote: Option<String>,
    closing: bool,
}

impl DirectPipeline {
    pub fn new<R>(params: BundleParams, schemas: SchemaResolver, reader: R) -> Self
    where
        R: DirectReader + 'static,
    {
        DirectPipeline {
            reader: Box::new(reader),
            queue: RequestQueue::new(params.max_concurrent_requests, schemas),
            bundles: BundleCache::new(),
            bundle_loaders: ObjectPool::new(),
            asset_loaders: ObjectPool::new(),
            remote: None,
            closing: false,
            params,
        }
    }

    /// Sets the download server base url.
    pub fn with_remote<T: Into<String>>(mut self, base: T) -> Self {
        self.remote = Some(base.into());
        self
    }

    fn accepts_reads(&self) -> bool {
        if self.closing {
            warn!("[DirectPipeline] Rejected during {:?}.", self.state());
        }

        !self.closing
    }

    fn read(&self, path: &str) -> Option<Asset> {
        let location = self.params.package_to_assets_path(path);
        match self.reader.read_asset(&location) {
            Ok(asset) => Some(asset),
            Err(err) => {
                error!("[DirectPipeline] Could not read {}. {}", location, err);
                None
            }
        }
    }

    fn resolved_loader(&mut self, path: &str, asset: Option<Asset>) -> AssetLoaderHandle {
        let handle = self.asset_loaders.create(AssetLoader::new);
        if let Some(loader) = self.asset_loaders.get_mut(handle) {
            loader.init_resolved(path, asset);
        }

        handle
    }
}

impl Pipeline for DirectPipeline {
    fn initialize(&mut self) {
        if self.closing && !self.queue.is_idle() {
            warn!("[DirectPipeline] Could not initialize during {:?}.", self.state());
            return;
        }

        self.closing = false;
    }

    fn state(&self) -> InitState {
        match (self.closing, self.queue.is_idle()) {
            (false, _) => InitState::Ready,
            (true, false) => InitState::Closing,
            (true, true) => InitState::Closed,
        }
    }

    fn teardown(&mut self) {
        if !self.closing {
            info!("[DirectPipeline] Teardown.");
            self.closing = true;
        }
    }

    #[inline]
    fn is_process_running(&self) -> bool {
        !self.queue.is_idle()
    }

    fn advance(&mut self) {
        self.queue.advance(&mut self.bundles);
    }

    fn load_asset_async(&mut self, path: &str) -> Option<AssetLoaderHandle> {
        if !self.accepts_reads() {
            return None;
        }

        let asset = self.read(path);
        Some(self.resolved_loader(path, asset))
    }

    fn load_asset_sync(&mut self, path: &str) -> Option<Asset> {
        if !self.accepts_reads() {
            return None;
        }

        self.read(path)
    }

    fn load_additive_scene_async(&mut self, path: &str) -> Option<AssetLoaderHandle> {
        if !self.accepts_reads() {
            return None;
        }

        let asset = self.read(path);
        Some(self.resolved_loader(path, asset))
    }

    fn load_bundle_async(&mut self, name: &str, _: bool) -> Option<BundleLoaderHandle> {
        if !self.accepts_reads() {
            return None;
        }

        let handle = self.bundle_loaders.create(BundleLoader::new);
        if let Some(loader) = self.bundle_loaders.get_mut(handle) {
            loader.init_resolved(name, None);
        }

        Some(handle)
    }

    #[inline]
    fn asset_loader(&self, handle: AssetLoaderHandle) -> Option<&AssetLoader> {
        self.asset_loaders.get(handle)
    }

    fn asset_loader_progress(&self, handle: AssetLoaderHandle) -> f32 {
        if self.asset_loaders.contains(handle) {
            1.0
        } else {
            0.0
        }
    }

    #[inline]
    fn dispose_asset_loader(&mut self, handle: AssetLoaderHandle) -> bool {
        self.asset_loaders.free(handle)
    }

    #[inline]
    fn bundle_loader(&self, handle: BundleLoaderHandle) -> Option<&BundleLoader> {
        self.bundle_loaders.get(handle)
    }

    fn bundle_loader_progress(&self, handle: BundleLoaderHandle) -> f32 {
        if self.bundle_loaders.contains(handle) {
            1.0
        } else {
            0.0
        }
    }

    #[inline]
    fn dispose_bundle_loader(&mut self, handle: BundleLoaderHandle) -> bool {
        self.bundle_loaders.free(handle)
    }

    fn download_web_resource(&mut self, url: &str, timeout: Option<Duration>) -> Option<RequestHandle> {
        if !self.accepts_reads() {
            return None;
        }

        Some(self.queue.enqueue(url, url, RequestParams::raw(timeout)))
    }

    fn download_asset_file(&mut self, path: &str, timeout: Option<Duration>) -> Option<RequestHandle> {
        if !self.accepts_reads() {
            return None;
        }

        let url = match self.remote {
            Some(ref base) => format!("{}{}", base, path),
            None => {
                error!("[DirectPipeline] Download url has not been set, could not download {}.", path);
                return None;
            }
        };

        Some(self.queue.enqueue(path, &url, RequestParams::raw(timeout)))
    }

    fn download_asset_bundle(&mut self, path: &str, timeout: Option<Duration>) -> Option<RequestHandle> {
        let timeout = timeout.unwrap_or(self.params.bundle_download_timeout);
        self.download_asset_file(path, Some(timeout))
    }

    fn request_asset_file(&mut self, path: &str, _: bool) -> Option<RequestHandle> {
        if !self.accepts_reads() {
            return None;
        }

        let url = self.reader.file_url(path);
        Some(self.queue.enqueue(path, &url, RequestParams::raw(None)))
    }

    fn request_asset_bundle(&mut self, name: &str) -> Option<RequestHandle> {
        error!("[DirectPipeline] Bundle {} could not be requested without bundles.", name);
        None
    }

    #[inline]
    fn request(&self, handle: RequestHandle) -> Option<&FetchRequest> {
        self.queue.get(handle)
    }

    #[inline]
    fn dispose_request(&mut self, handle: RequestHandle) -> bool {
        self.queue.dispose(handle)
    }
}
