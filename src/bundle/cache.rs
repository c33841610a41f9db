use crate::utils::hash::FastHashMap;

use super::Bundle;

/// Name-keyed table of resolved bundles. A name is present iff its fetch has
/// completed; failed fetches are kept as empty entries so every waiter makes
/// progress. There is no eviction, entries live until `unload_all`.
#[derive(Default)]
pub struct BundleCache {
    bundles: FastHashMap<String, Option<Bundle>>,
}

impl BundleCache {
    pub fn new() -> Self {
        BundleCache {
            bundles: FastHashMap::default(),
        }
    }

    /// Returns the bundle if it has been loaded successfully.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&Bundle> {
        self.bundles.get(name).and_then(|v| v.as_ref())
    }

    /// Returns true if the fetch of `name` has completed, successfully or not.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.bundles.contains_key(name)
    }

    /// Returns true if the fetch of `name` has completed with an error.
    #[inline]
    pub fn is_failed(&self, name: &str) -> bool {
        self.bundles.get(name).map(|v| v.is_none()).unwrap_or(false)
    }

    /// Publishes the result of a completed fetch. A second publish under the same
    /// name is ignored.
    pub fn put<T: Into<String>>(&mut self, name: T, bundle: Option<Bundle>) {
        let name = name.into();
        if self.bundles.contains_key(&name) {
            warn!("[BundleCache] Bundle {} has been cached already.", name);
            if let Some(bundle) = bundle {
                bundle.unload(false);
            }
            return;
        }

        trace!("[BundleCache] Put {} (loaded: {}).", name, bundle.is_some());
        self.bundles.insert(name, bundle);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    /// Returns the iterator over every cached name.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bundles.keys().map(|v| v.as_str())
    }

    /// Returns the iterator over every successfully loaded bundle.
    pub fn bundles(&self) -> impl Iterator<Item = &Bundle> {
        self.bundles.values().filter_map(|v| v.as_ref())
    }

    /// Unloads every cached bundle and clears the table.
    pub fn unload_all(&mut self) {
        for (_, v) in self.bundles.drain() {
            if let Some(bundle) = v {
                bundle.unload(true);
            }
        }
    }
}
