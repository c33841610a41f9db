//! Reusable reclaimable references.
//!
//! A `WeakEntryPool` hands out generation-checked handles to `Weak` slots. The
//! pool knows nothing about caching, it only answers whether a target is still
//! alive. Recovered slots keep their allocation and are handed out again.

use std::any::Any;
use std::sync::{Arc, Weak};

use crate::utils::object_pool::{ObjectPool, Recycle};

use super::Asset;

impl_handle!(WeakEntryHandle);

pub struct WeakEntry {
    target: Option<Weak<dyn Any + Send + Sync>>,
}

impl Recycle for WeakEntry {
    #[inline]
    fn recycle(&mut self) {
        self.target = None;
    }
}

impl WeakEntry {
    #[inline]
    pub fn upgrade(&self) -> Option<Asset> {
        self.target.as_ref().and_then(|v| v.upgrade())
    }
}

#[derive(Default)]
pub struct WeakEntryPool {
    entries: ObjectPool<WeakEntryHandle, WeakEntry>,
}

impl WeakEntryPool {
    pub fn new() -> Self {
        WeakEntryPool {
            entries: ObjectPool::new(),
        }
    }

    /// Takes a slot from the pool and points it at `target`.
    pub fn get(&mut self, target: &Asset) -> WeakEntryHandle {
        let handle = self.entries.create(|_| WeakEntry { target: None });

        if let Some(entry) = self.entries.get_mut(handle) {
            entry.target = Some(Arc::downgrade(target));
        }

        handle
    }

    /// Returns the target if the slot is alive, and its target has not been
    /// reclaimed yet.
    #[inline]
    pub fn upgrade(&self, handle: WeakEntryHandle) -> Option<Asset> {
        self.entries.get(handle).and_then(|v| v.upgrade())
    }

    #[inline]
    pub fn is_valid(&self, handle: WeakEntryHandle) -> bool {
        self.upgrade(handle).is_some()
    }

    /// Returns the slot to the pool.
    #[inline]
    pub fn recover(&mut self, handle: WeakEntryHandle) -> bool {
        self.entries.free(handle)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of slots ever allocated.
    #[inline]
    pub fn spawned(&self) -> usize {
        self.entries.spawned()
    }
}
