//! Introspection of a running `BundleManager`, for debug overlays and tooling.

use crate::utils::hash::FastHashMap;

use super::manager::BundleManager;

impl BundleManager {
    /// Returns the names of every resolved bundle, failed ones included.
    pub fn cached_bundles(&self) -> Vec<&str> {
        self.bundles.names().collect()
    }

    /// Returns every queued or active request key.
    pub fn requesting(&self) -> Vec<&str> {
        self.queue.requesting().collect()
    }

    /// Returns the keys waiting for a free slot, in order.
    pub fn queued(&self) -> Vec<&str> {
        self.queue.queued().collect()
    }

    #[inline]
    pub fn active_request_count(&self) -> usize {
        self.queue.active_len()
    }

    #[inline]
    pub fn queued_request_count(&self) -> usize {
        self.queue.queued_len()
    }

    #[inline]
    pub fn processing_bundle_loader_count(&self) -> usize {
        self.processing_bundle_loaders.len()
    }

    #[inline]
    pub fn processing_asset_loader_count(&self) -> usize {
        self.processing_asset_loaders.len()
    }

    #[inline]
    pub fn cached_asset_count(&self) -> usize {
        self.assets.len()
    }

    /// Returns the names of cached assets, grouped by their bundles.
    pub fn cached_assets(&self) -> FastHashMap<String, Vec<String>> {
        let mut groups = FastHashMap::default();

        for asset in self.assets.names() {
            let bundle = self
                .mapping()
                .and_then(|v| v.bundle_of(asset))
                .unwrap_or("")
                .to_owned();

            groups
                .entry(bundle)
                .or_insert_with(Vec::new)
                .push(asset.to_owned());
        }

        groups
    }

    /// Returns the number of bundles `bundle` depends on transitively.
    pub fn dependency_count(&self, bundle: &str) -> usize {
        self.dependencies(bundle)
            .iter()
            .filter(|v| !v.is_empty() && v.as_str() != bundle)
            .count()
    }

    /// Returns the cached or requesting bundles which depend on `bundle`.
    pub fn bundle_references(&self, bundle: &str) -> Vec<String> {
        let mut references = Vec::new();

        let candidates = self.bundles.names().chain(self.queue.requesting());
        for name in candidates {
            if name == bundle || references.iter().any(|v: &String| v == name) {
                continue;
            }

            if self.dependencies(name).iter().any(|v| v == bundle) {
                references.push(name.to_owned());
            }
        }

        references
    }

    /// Returns the sequence ids of requests fetching `key`.
    pub fn request_references(&self, key: &str) -> Vec<u32> {
        self.queue
            .requests()
            .filter(|&(_, v)| v.key() == key)
            .map(|(_, v)| v.sequence())
            .collect()
    }

    /// Returns the sequence ids of processing bundle loaders targeting `bundle`.
    pub fn bundle_loader_references(&self, bundle: &str) -> Vec<u32> {
        self.processing_bundle_loaders
            .iter()
            .filter_map(|&v| self.bundle_loaders.get(v))
            .filter(|v| v.name() == bundle)
            .map(|v| v.sequence())
            .collect()
    }

    /// Returns the sequence ids of processing asset loaders resolving `asset`.
    pub fn asset_loader_references(&self, asset: &str) -> Vec<u32> {
        self.processing_asset_loaders
            .iter()
            .filter_map(|&v| self.asset_loaders.get(v))
            .filter(|v| v.name() == asset)
            .map(|v| v.sequence())
            .collect()
    }
}
