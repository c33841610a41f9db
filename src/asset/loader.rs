use crate::bundle::loader::BundleLoaderHandle;
use crate::utils::object_pool::Recycle;

use super::Asset;

impl_handle!(AssetLoaderHandle);

/// Waits for the bundle of an asset, then resolves the asset through the
/// `AssetCache`.
///
/// The loader either completes during `init_resolved`, or goes `initialized ->
/// waiting(bundle loader) -> complete`. Additive scene loaders complete as soon
/// as their bundle does, without resolving anything.
pub struct AssetLoader {
    sequence: u32,
    name: String,
    bundle: String,
    asset: Option<Asset>,
    bundle_loader: Option<BundleLoaderHandle>,
    additive: bool,
    done: bool,
}

impl Recycle for AssetLoader {
    fn recycle(&mut self) {
        self.name.clear();
        self.bundle.clear();
        self.asset = None;
        self.bundle_loader = None;
        self.additive = false;
        self.done = false;
    }
}

impl AssetLoader {
    pub(crate) fn new(sequence: u32) -> Self {
        AssetLoader {
            sequence,
            name: String::new(),
            bundle: String::new(),
            asset: None,
            bundle_loader: None,
            additive: false,
            done: false,
        }
    }

    pub(crate) fn init_resolved(&mut self, name: &str, asset: Option<Asset>) {
        self.name.push_str(name);
        self.asset = asset;
        self.done = true;
    }

    pub(crate) fn init_pending(
        &mut self,
        bundle: &str,
        name: &str,
        bundle_loader: BundleLoaderHandle,
        additive: bool,
    ) {
        self.name.push_str(name);
        self.bundle.push_str(bundle);
        self.bundle_loader = Some(bundle_loader);
        self.additive = additive;
    }

    /// Completes the loader once its bundle loader is done. `resolve` is only
    /// invoked for non-additive loaders. Returns true if the loader completes
    /// during this call.
    pub(crate) fn update<F>(&mut self, bundle_done: bool, resolve: F) -> bool
    where
        F: FnOnce(&str) -> Option<Asset>,
    {
        if self.done || !bundle_done {
            return false;
        }

        if !self.additive {
            self.asset = resolve(&self.name);
        }

        self.done = true;
        true
    }

    #[inline]
    pub(crate) fn take_bundle_loader(&mut self) -> Option<BundleLoaderHandle> {
        self.bundle_loader.take()
    }

    #[inline]
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// The asset name inside its bundle.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bundle this loader waits for. Empty for loaders resolved at creation.
    #[inline]
    pub fn bundle(&self) -> &str {
        &self.bundle
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.done
    }

    #[inline]
    pub fn is_additive(&self) -> bool {
        self.additive
    }

    #[inline]
    pub fn bundle_loader(&self) -> Option<BundleLoaderHandle> {
        self.bundle_loader
    }

    /// Returns the resolved asset once completed.
    #[inline]
    pub fn asset(&self) -> Option<&Asset> {
        self.asset.as_ref()
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::utils::handle::Handle;

    #[test]
    fn states() {
        let mut loader = AssetLoader::new(1);
        loader.init_pending("ui", "ui/login.prefab", Handle::new(1, 1).into(), false);
        assert!(!loader.is_done());
        assert!(!loader.update(false, |_| unreachable!()));

        let asset: Asset = Arc::new(3u32);
        assert!(loader.update(true, |name| {
            assert_eq!(name, "ui/login.prefab");
            Some(asset.clone())
        }));

        assert!(loader.is_done());
        assert_eq!(loader.bundle(), "ui");
        assert!(Arc::ptr_eq(loader.asset().unwrap(), &asset));
        assert!(!loader.update(true, |_| unreachable!()));

        loader.recycle();
        loader.init_pending("scenes", "scene", Handle::new(1, 1).into(), true);
        assert!(loader.update(true, |_| unreachable!()));
        assert!(loader.asset().is_none());
    }
}
