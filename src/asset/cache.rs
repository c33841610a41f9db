use crate::bundle::cache::BundleCache;
use crate::bundle::Bundle;
use crate::mapping::PathResolver;
use crate::settings::{BundleParams, PreloadPolicy};
use crate::utils::hash::FastHashMap;

use super::weak::{WeakEntryHandle, WeakEntryPool};
use super::Asset;

/// Name-keyed table of reclaimable references into bundle contents.
///
/// The cache never owns its assets. An entry whose target has been dropped by
/// every consumer is treated as a miss and reloaded from the bundle, provided
/// the bundle is still resident. Preloaded assets are the only exception, they
/// are held strongly until the first `get` hands them out.
pub struct AssetCache {
    entries: FastHashMap<String, WeakEntryHandle>,
    weaks: WeakEntryPool,
    resident: FastHashMap<String, Asset>,
    assets_folder: String,
    policy: PreloadPolicy,
}

impl AssetCache {
    pub fn new(params: &BundleParams) -> Self {
        AssetCache {
            entries: FastHashMap::default(),
            weaks: WeakEntryPool::new(),
            resident: FastHashMap::default(),
            assets_folder: params.assets_folder.clone(),
            policy: params.preload.clone(),
        }
    }

    /// Returns the asset named `asset`, loading it from its resident bundle on a
    /// miss. Scene-only and failed bundles yield nothing.
    pub fn get(
        &mut self,
        asset: &str,
        resolver: &dyn PathResolver,
        bundles: &BundleCache,
    ) -> Option<Asset> {
        if let Some(v) = self.resident.remove(asset) {
            return Some(v);
        }

        if let Some(v) = self.lookup(asset) {
            return Some(v);
        }

        let name = match resolver.bundle_of(asset) {
            Some(name) => name,
            None => {
                error!("[AssetCache] No bundle carries asset {}.", asset);
                return None;
            }
        };

        if !bundles.contains(name) {
            error!(
                "[AssetCache] Try to get asset {} from bundle {} which has not been loaded.",
                asset, name
            );
            return None;
        }

        match bundles.get(name) {
            Some(bundle) => self.load(asset, bundle),
            None => {
                error!(
                    "[AssetCache] Try to get asset {} from failed bundle {}.",
                    asset, name
                );
                None
            }
        }
    }

    /// Returns the asset if it is still alive, without touching any bundle.
    pub fn lookup(&mut self, asset: &str) -> Option<Asset> {
        let handle = *self.entries.get(asset)?;
        if let Some(v) = self.weaks.upgrade(handle) {
            return Some(v);
        }

        self.weaks.recover(handle);
        self.entries.remove(asset);
        None
    }

    fn load(&mut self, asset: &str, bundle: &Bundle) -> Option<Asset> {
        if bundle.is_scene_only() {
            warn!(
                "[AssetCache] Bundle {} only carries scenes, {} could not be loaded from it.",
                bundle.name(),
                asset
            );
            return None;
        }

        let path = format!("{}{}", self.assets_folder, asset);
        let v = match bundle.load_asset(&path) {
            Some(v) => v,
            None => {
                error!("[AssetCache] Could not find {} in bundle {}.", path, bundle.name());
                return None;
            }
        };

        let handle = self.weaks.get(&v);
        if let Some(prev) = self.entries.insert(asset.to_owned(), handle) {
            self.weaks.recover(prev);
        }

        Some(v)
    }

    /// Resolves every asset the path mapping declares for `bundle` ahead of
    /// time. Returns the number of assets loaded.
    pub fn preload(&mut self, bundle: &Bundle, resolver: &dyn PathResolver) -> usize {
        if bundle.is_scene_only() || !self.policy.accepts(bundle.name()) {
            return 0;
        }

        let mut num = 0;
        for asset in resolver.assets_of(bundle.name()) {
            if self.resident.contains_key(asset) || self.lookup(asset).is_some() {
                continue;
            }

            if let Some(v) = self.load(asset, bundle) {
                self.resident.insert(asset.to_owned(), v);
                num += 1;
            }
        }

        debug!("[AssetCache] Preload {} assets from {}.", num, bundle.name());
        num
    }

    /// With `full` set, releases every entry. Otherwise releases only entries
    /// whose targets have been reclaimed already.
    pub fn sweep(&mut self, full: bool) -> usize {
        let len = self.entries.len();

        if full {
            for (_, handle) in self.entries.drain() {
                self.weaks.recover(handle);
            }

            self.resident.clear();
        } else {
            let weaks = &mut self.weaks;
            self.entries.retain(|_, &mut handle| {
                if weaks.is_valid(handle) {
                    true
                } else {
                    weaks.recover(handle);
                    false
                }
            });
        }

        len - self.entries.len()
    }

    /// Returns true if `asset` has an entry, alive or not.
    #[inline]
    pub fn contains(&self, asset: &str) -> bool {
        self.entries.contains_key(asset)
    }

    /// Returns true if `asset` has an entry whose target is alive.
    #[inline]
    pub fn is_valid(&self, asset: &str) -> bool {
        self.entries
            .get(asset)
            .map(|&v| self.weaks.is_valid(v))
            .unwrap_or(false)
    }

    /// Returns true if `asset` was preloaded and has not been handed out yet.
    #[inline]
    pub fn is_resident(&self, asset: &str) -> bool {
        self.resident.contains_key(asset)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the iterator over every asset name with an entry.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|v| v.as_str())
    }
}
