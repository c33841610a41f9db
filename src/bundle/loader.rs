use inlinable_string::InlinableString;
use smallvec::SmallVec;

use crate::request::queue::RequestQueue;
use crate::utils::object_pool::Recycle;

use super::cache::BundleCache;
use super::Bundle;

impl_handle!(BundleLoaderHandle);

/// Waits for a bundle and its whole dependency closure to be resolved.
///
/// The loader goes `initialized -> waiting -> complete`. Completion only happens
/// inside `update`, even if every member was cached during `init`. Disposing a
/// loader never aborts the fetches it waits on, others might share them.
pub struct BundleLoader {
    sequence: u32,
    name: String,
    bundle: Option<Bundle>,
    waiting: SmallVec<[InlinableString; 8]>,
    total: usize,
    done: bool,
}

impl Recycle for BundleLoader {
    fn recycle(&mut self) {
        self.name.clear();
        self.bundle = None;
        self.waiting.clear();
        self.total = 0;
        self.done = false;
    }
}

impl BundleLoader {
    pub(crate) fn new(sequence: u32) -> Self {
        BundleLoader {
            sequence,
            name: String::new(),
            bundle: None,
            waiting: SmallVec::new(),
            total: 0,
            done: false,
        }
    }

    /// Records every member of the closure of `name` that is not cached yet.
    pub(crate) fn init(&mut self, name: &str, dependencies: &[String], cache: &BundleCache) {
        self.name.push_str(name);

        let members = dependencies.iter().map(|v| v.as_str()).chain(Some(name));
        for v in members {
            if v.is_empty() || cache.contains(v) {
                continue;
            }

            if !self.waiting.iter().any(|w| AsRef::<str>::as_ref(w) == v) {
                self.waiting.push(v.into());
            }
        }

        self.total = self.waiting.len();
    }

    /// Completes straight away with `bundle`.
    pub(crate) fn init_resolved(&mut self, name: &str, bundle: Option<Bundle>) {
        self.name.push_str(name);
        self.bundle = bundle;
        self.done = true;
    }

    /// Drops every member that has been cached since the last update. Returns true
    /// if the loader completes during this call.
    pub(crate) fn update(&mut self, cache: &BundleCache) -> bool {
        if self.done {
            return false;
        }

        self.waiting.retain(|v| !cache.contains(AsRef::<str>::as_ref(v)));
        if !self.waiting.is_empty() {
            return false;
        }

        self.bundle = cache.get(&self.name).cloned();
        self.done = true;
        true
    }

    #[inline]
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Returns the loaded bundle once completed. Failed bundles are `None`.
    #[inline]
    pub fn bundle(&self) -> Option<&Bundle> {
        self.bundle.as_ref()
    }

    /// Returns the names this loader still waits on.
    pub fn waiting(&self) -> impl Iterator<Item = &str> {
        self.waiting.iter().map(|v| AsRef::<str>::as_ref(v))
    }

    /// Approximate progress in `[0, 1]`.
    pub fn progress(&self, queue: &RequestQueue) -> f32 {
        if self.done {
            return 1.0;
        }

        if self.total == 0 {
            return 0.99;
        }

        let resolved = (self.total - self.waiting.len()) as f32;
        let pending: f32 = self
            .waiting
            .iter()
            .filter_map(|v| queue.progress_of(AsRef::<str>::as_ref(v)))
            .sum();

        ((resolved + pending) / self.total as f32).min(0.99)
    }
}
