use std::io::Cursor;
use std::time::Duration;

use crate::asset::cache::AssetCache;
use crate::asset::loader::{AssetLoader, AssetLoaderHandle};
use crate::asset::{Asset, RawAsset};
use crate::bundle::cache::BundleCache;
use crate::bundle::loader::{BundleLoader, BundleLoaderHandle};
use crate::bundle::Bundle;
use crate::errors::*;
use crate::manifest::{DependencyResolver, Manifest};
use crate::mapping::{PathMapping, PathResolver};
use crate::request::queue::RequestQueue;
use crate::request::{FetchRequest, RequestHandle, RequestParams};
use crate::settings::BundleParams;
use crate::url::UrlResolver;
use crate::utils::object_pool::ObjectPool;
use crate::vfs::SchemaResolver;

use super::{InitState, Pipeline};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    Initializing {
        manifest: RequestHandle,
        mapping: RequestHandle,
    },
    Ready,
    Failed,
    Closing,
    Closed,
}

/// The bundle driven pipeline. It owns the request queue, both caches and the
/// loader pools, and mutates them only from its own methods.
pub struct BundleManager {
    pub(crate) params: BundleParams,
    pub(crate) urls: Box<dyn UrlResolver>,
    pub(crate) queue: RequestQueue,
    pub(crate) bundles: BundleCache,
    pub(crate) assets: AssetCache,
    pub(crate) bundle_loaders: ObjectPool<BundleLoaderHandle, BundleLoader>,
    pub(crate) asset_loaders: ObjectPool<AssetLoaderHandle, AssetLoader>,
    pub(crate) processing_bundle_loaders: Vec<BundleLoaderHandle>,
    pub(crate) processing_asset_loaders: Vec<AssetLoaderHandle>,
    pub(crate) manifest: Option<Box<dyn DependencyResolver>>,
    pub(crate) mapping: Option<Box<dyn PathResolver>>,
    stage: Stage,
}

impl BundleManager {
    pub fn new<U>(params: BundleParams, schemas: SchemaResolver, urls: U) -> Self
    where
        U: UrlResolver + 'static,
    {
        BundleManager {
            queue: RequestQueue::new(params.max_concurrent_requests, schemas),
            bundles: BundleCache::new(),
            assets: AssetCache::new(&params),
            bundle_loaders: ObjectPool::new(),
            asset_loaders: ObjectPool::new(),
            processing_bundle_loaders: Vec::new(),
            processing_asset_loaders: Vec::new(),
            manifest: None,
            mapping: None,
            stage: Stage::Idle,
            urls: Box::new(urls),
            params,
        }
    }

    /// Installs already decoded resolvers, skipping the initialization fetches.
    pub fn initialize_with(
        &mut self,
        manifest: Box<dyn DependencyResolver>,
        mapping: Box<dyn PathResolver>,
    ) {
        match self.stage {
            Stage::Idle | Stage::Closed => {
                self.manifest = Some(manifest);
                self.mapping = Some(mapping);
                self.stage = Stage::Ready;
                info!("[BundleManager] Initialized with provided resolvers.");
            }
            _ => warn!("[BundleManager] Could not initialize during {:?}.", self.state()),
        }
    }

    #[inline]
    pub fn params(&self) -> &BundleParams {
        &self.params
    }

    #[inline]
    pub fn bundles(&self) -> &BundleCache {
        &self.bundles
    }

    #[inline]
    pub fn assets(&self) -> &AssetCache {
        &self.assets
    }

    #[inline]
    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    #[inline]
    pub fn manifest(&self) -> Option<&dyn DependencyResolver> {
        self.manifest.as_ref().map(|v| &**v)
    }

    #[inline]
    pub fn mapping(&self) -> Option<&dyn PathResolver> {
        self.mapping.as_ref().map(|v| &**v)
    }

    /// Returns the transitive dependencies of `bundle`, empty until the manifest
    /// is loaded.
    pub fn dependencies(&self, bundle: &str) -> Vec<String> {
        match self.manifest {
            Some(ref manifest) => manifest.dependencies(bundle),
            None => Vec::new(),
        }
    }

    /// Returns true if the fetch of bundle `name` has completed.
    #[inline]
    pub fn is_bundle_loaded(&self, name: &str) -> bool {
        self.bundles.contains(name)
    }

    /// Releases asset cache entries. See `AssetCache::sweep`.
    pub fn sweep(&mut self, full: bool) -> usize {
        self.assets.sweep(full)
    }

    /// Returns the asset named `asset` through the asset cache. The bundle must be
    /// resident.
    pub fn asset(&mut self, asset: &str) -> Option<Asset> {
        if !self.accepts_reads() {
            return None;
        }

        let mapping = self.mapping.as_ref()?;
        self.assets.get(asset, &**mapping, &self.bundles)
    }

    fn accepts_reads(&self) -> bool {
        match self.stage {
            Stage::Closing | Stage::Closed => {
                warn!("[BundleManager] Rejected during {:?}.", self.state());
                false
            }
            Stage::Failed => {
                error!("[BundleManager] Rejected since initialization failed.");
                false
            }
            _ => true,
        }
    }

    fn resolve(&self, path: &str) -> Option<(String, String)> {
        let mapping = match self.mapping {
            Some(ref mapping) => mapping,
            None => {
                error!("[BundleManager] Path mapping has not been loaded, could not load {}.", path);
                return None;
            }
        };

        match mapping.resolve(path) {
            Some((bundle, asset)) => Some((bundle.to_owned(), asset.to_owned())),
            None => {
                error!("[BundleManager] No bundle at asset path {}.", path);
                None
            }
        }
    }

    /// Enqueues a cached fetch of `name` unless it is resolved or requested
    /// already.
    fn create_bundle_request(&mut self, name: &str, header_only: bool) -> bool {
        if self.bundles.contains(name) || self.queue.is_active(name) {
            return false;
        }

        let url = self.urls.bundle_url(name);
        self.queue.enqueue(name, &url, RequestParams::bundle(header_only));
        true
    }

    fn create_bundle_loader(&mut self, name: &str, header_only: bool) -> BundleLoaderHandle {
        let dependencies = self.dependencies(name);
        for v in &dependencies {
            if !v.is_empty() && v != name {
                self.create_bundle_request(v, header_only);
            }
        }

        let handle = self.bundle_loaders.create(BundleLoader::new);
        if let Some(loader) = self.bundle_loaders.get_mut(handle) {
            loader.init(name, &dependencies, &self.bundles);
        }

        self.create_bundle_request(name, header_only);
        self.processing_bundle_loaders.push(handle);
        handle
    }

    fn create_pending_asset_loader(&mut self, bundle: &str, asset: &str, additive: bool) -> AssetLoaderHandle {
        let bundle_loader = self.create_bundle_loader(bundle, true);
        let handle = self.asset_loaders.create(AssetLoader::new);
        if let Some(loader) = self.asset_loaders.get_mut(handle) {
            loader.init_pending(bundle, asset, bundle_loader, additive);
        }

        self.processing_asset_loaders.push(handle);
        handle
    }

    fn raw_request(&mut self, key: &str, url: &str, params: RequestParams) -> Option<RequestHandle> {
        if !self.accepts_reads() {
            return None;
        }

        Some(self.queue.enqueue(key, url, params))
    }

    fn advance_initialization(&mut self, manifest: RequestHandle, mapping: RequestHandle) {
        let done = |h: RequestHandle| self.queue.get(h).map(|v| v.is_done()).unwrap_or(true);
        if !done(manifest) || !done(mapping) {
            return;
        }

        let decoded = self.decode_manifest(manifest).and_then(|m| {
            let p = self.decode_mapping(mapping)?;
            Ok((m, p))
        });

        self.queue.dispose(manifest);
        self.queue.dispose(mapping);

        match decoded {
            Ok((manifest, mapping)) => {
                info!(
                    "[BundleManager] Initialized with {} bundles and {} asset paths.",
                    manifest.len(),
                    mapping.len()
                );

                self.manifest = Some(Box::new(manifest));
                self.mapping = Some(Box::new(mapping));
                self.stage = Stage::Ready;
            }
            Err(err) => {
                error!("[BundleManager] Failed to initialize. {}", err);
                self.stage = Stage::Failed;
            }
        }
    }

    fn decode_text(&self, handle: RequestHandle, asset: &str, unload_all: bool) -> Result<Box<[u8]>> {
        let request = self
            .queue
            .get(handle)
            .ok_or_else(|| format_err!("Initialization request has been disposed."))?;

        let bundle: &Bundle = match request.bundle() {
            Some(bundle) => bundle,
            None => bail!(
                "Could not load bundle {}. {}",
                request.key(),
                request.error().unwrap_or("")
            ),
        };

        let bytes: Option<Box<[u8]>> = bundle
            .load_asset(asset)
            .and_then(|v| v.downcast::<RawAsset>().ok())
            .map(|v| v.bytes().into());

        bundle.unload(unload_all);
        bytes.ok_or_else(|| format_err!("Could not find {} in bundle {}.", asset, request.key()))
    }

    fn decode_manifest(&self, handle: RequestHandle) -> Result<Manifest> {
        let bytes = self.decode_text(handle, &self.params.manifest_asset, false)?;
        Manifest::load_from(&mut Cursor::new(bytes))
    }

    fn decode_mapping(&self, handle: RequestHandle) -> Result<PathMapping> {
        let bytes = self.decode_text(handle, &self.params.mapping_asset, true)?;
        PathMapping::from_json(&bytes[..])
    }

    fn advance_bundle_loaders(&mut self) {
        let BundleManager {
            ref mut bundle_loaders,
            ref mut processing_bundle_loaders,
            ref mut assets,
            ref bundles,
            ref mapping,
            ..
        } = *self;

        processing_bundle_loaders.retain(|&handle| {
            let loader = match bundle_loaders.get_mut(handle) {
                Some(loader) => loader,
                None => return false,
            };

            if !loader.update(bundles) {
                return !loader.is_done();
            }

            trace!("[BundleManager] Bundle loader of {} completes.", loader.name());
            if let (Some(bundle), Some(mapping)) = (loader.bundle(), mapping.as_ref()) {
                assets.preload(bundle, &**mapping);
            }

            false
        });
    }

    fn advance_asset_loaders(&mut self) {
        let BundleManager {
            ref mut asset_loaders,
            ref mut processing_asset_loaders,
            ref mut bundle_loaders,
            ref mut assets,
            ref bundles,
            ref mapping,
            ..
        } = *self;

        processing_asset_loaders.retain(|&handle| {
            let loader = match asset_loaders.get_mut(handle) {
                Some(loader) => loader,
                None => return false,
            };

            // A disposed bundle loader stops being polled, the bundle itself
            // still arrives through the queue.
            let bundle_done = match loader.bundle_loader().and_then(|v| bundle_loaders.get(v)) {
                Some(v) => v.is_done(),
                None => bundles.contains(loader.bundle()),
            };

            let completed = loader.update(bundle_done, |name| match *mapping {
                Some(ref mapping) => assets.get(name, &**mapping, bundles),
                None => None,
            });

            if completed {
                if let Some(v) = loader.take_bundle_loader() {
                    bundle_loaders.free(v);
                }
            }

            !loader.is_done()
        });
    }

    fn advance_teardown(&mut self) {
        if self.is_process_running() {
            return;
        }

        let assets = self.assets.sweep(true);
        let bundles = self.bundles.len();
        self.bundles.unload_all();
        self.stage = Stage::Closed;

        info!(
            "[BundleManager] Teardown released {} assets and {} bundles.",
            assets, bundles
        );
    }
}

impl Pipeline for BundleManager {
    fn initialize(&mut self) {
        match self.stage {
            Stage::Idle | Stage::Closed => {}
            _ => {
                warn!("[BundleManager] Could not initialize during {:?}.", self.state());
                return;
            }
        }

        let params = RequestParams::bundle(false).uncached();
        let manifest = self.params.manifest_bundle.clone();
        let mapping = self.params.mapping_bundle.clone();

        let url = self.urls.bundle_url(&manifest);
        let manifest = self.queue.enqueue(&manifest, &url, params);
        let url = self.urls.bundle_url(&mapping);
        let mapping = self.queue.enqueue(&mapping, &url, params);

        self.manifest = None;
        self.mapping = None;
        self.stage = Stage::Initializing { manifest, mapping };
        info!("[BundleManager] Initializing.");
    }

    fn state(&self) -> InitState {
        match self.stage {
            Stage::Idle => InitState::Idle,
            Stage::Initializing { .. } => InitState::Initializing,
            Stage::Ready => InitState::Ready,
            Stage::Failed => InitState::Failed,
            Stage::Closing => InitState::Closing,
            Stage::Closed => InitState::Closed,
        }
    }

    fn teardown(&mut self) {
        match self.stage {
            Stage::Closing | Stage::Closed => return,
            Stage::Initializing { manifest, mapping } => {
                self.queue.dispose(manifest);
                self.queue.dispose(mapping);
            }
            _ => {}
        }

        info!("[BundleManager] Teardown.");
        self.stage = Stage::Closing;
        self.advance_teardown();
    }

    fn is_process_running(&self) -> bool {
        !self.queue.is_idle()
            || !self.processing_bundle_loaders.is_empty()
            || !self.processing_asset_loaders.is_empty()
    }

    fn advance(&mut self) {
        self.queue.advance(&mut self.bundles);

        if let Stage::Initializing { manifest, mapping } = self.stage {
            self.advance_initialization(manifest, mapping);
        }

        self.advance_bundle_loaders();
        self.advance_asset_loaders();

        if self.stage == Stage::Closing {
            self.advance_teardown();
        }
    }

    fn load_asset_async(&mut self, path: &str) -> Option<AssetLoaderHandle> {
        if !self.accepts_reads() {
            return None;
        }

        let (bundle, asset) = self.resolve(path)?;
        if !self.bundles.contains(&bundle) {
            return Some(self.create_pending_asset_loader(&bundle, &asset, false));
        }

        let v = self.asset(&asset);
        let handle = self.asset_loaders.create(AssetLoader::new);
        if let Some(loader) = self.asset_loaders.get_mut(handle) {
            loader.init_resolved(&asset, v);
        }

        Some(handle)
    }

    fn load_asset_sync(&mut self, path: &str) -> Option<Asset> {
        if !self.accepts_reads() {
            return None;
        }

        let (bundle, asset) = self.resolve(path)?;
        if !self.bundles.contains(&bundle) {
            error!(
                "[BundleManager] Bundle {} must be loaded before loading {} synchronously.",
                bundle, path
            );
            return None;
        }

        self.asset(&asset)
    }

    fn load_additive_scene_async(&mut self, path: &str) -> Option<AssetLoaderHandle> {
        if !self.accepts_reads() {
            return None;
        }

        let (bundle, asset) = self.resolve(path)?;
        Some(self.create_pending_asset_loader(&bundle, &asset, true))
    }

    fn load_bundle_async(&mut self, name: &str, header_only: bool) -> Option<BundleLoaderHandle> {
        if !self.accepts_reads() {
            return None;
        }

        if name.is_empty() {
            error!("[BundleManager] Could not load bundle with empty name.");
            return None;
        }

        Some(self.create_bundle_loader(name, header_only))
    }

    #[inline]
    fn asset_loader(&self, handle: AssetLoaderHandle) -> Option<&AssetLoader> {
        self.asset_loaders.get(handle)
    }

    fn asset_loader_progress(&self, handle: AssetLoaderHandle) -> f32 {
        match self.asset_loaders.get(handle) {
            Some(loader) if loader.is_done() => 1.0,
            Some(loader) => loader
                .bundle_loader()
                .map(|v| self.bundle_loader_progress(v))
                .unwrap_or(0.0),
            None => 0.0,
        }
    }

    fn dispose_asset_loader(&mut self, handle: AssetLoaderHandle) -> bool {
        let bundle_loader = match self.asset_loaders.get_mut(handle) {
            Some(loader) => loader.take_bundle_loader(),
            None => return false,
        };

        if let Some(v) = bundle_loader {
            self.bundle_loaders.free(v);
        }

        self.asset_loaders.free(handle)
    }

    #[inline]
    fn bundle_loader(&self, handle: BundleLoaderHandle) -> Option<&BundleLoader> {
        self.bundle_loaders.get(handle)
    }

    fn bundle_loader_progress(&self, handle: BundleLoaderHandle) -> f32 {
        self.bundle_loaders
            .get(handle)
            .map(|v| v.progress(&self.queue))
            .unwrap_or(0.0)
    }

    #[inline]
    fn dispose_bundle_loader(&mut self, handle: BundleLoaderHandle) -> bool {
        self.bundle_loaders.free(handle)
    }

    fn download_web_resource(&mut self, url: &str, timeout: Option<Duration>) -> Option<RequestHandle> {
        self.raw_request(url, url, RequestParams::raw(timeout))
    }

    fn download_asset_file(&mut self, path: &str, timeout: Option<Duration>) -> Option<RequestHandle> {
        let url = match self.urls.remote_url(path) {
            Some(url) => url,
            None => {
                error!("[BundleManager] Download url has not been set, could not download {}.", path);
                return None;
            }
        };

        self.raw_request(path, &url, RequestParams::raw(timeout))
    }

    fn download_asset_bundle(&mut self, path: &str, timeout: Option<Duration>) -> Option<RequestHandle> {
        let timeout = timeout.unwrap_or(self.params.bundle_download_timeout);
        self.download_asset_file(path, Some(timeout))
    }

    fn request_asset_file(&mut self, path: &str, packaged_only: bool) -> Option<RequestHandle> {
        let url = self.urls.local_url(path, packaged_only);
        self.raw_request(path, &url, RequestParams::raw(None))
    }

    fn request_asset_bundle(&mut self, name: &str) -> Option<RequestHandle> {
        let url = self.urls.bundle_url(name);
        self.raw_request(name, &url, RequestParams::bundle(false).uncached())
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
