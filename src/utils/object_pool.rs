use super::handle::HandleLike;
use super::handle_pool::{HandlePool, Iter};

/// Objects that could be put back into an `ObjectPool` and handed out again.
/// `recycle` must drop every reference the object holds while keeping its
/// allocations (buffers, lists) around for the next user.
pub trait Recycle {
    fn recycle(&mut self);
}

/// A named object collections. Freeing a handle recycles the attached `T` in
/// place instead of dropping it, and the next `create` hands the same object out
/// again, so steady-state churn does not touch the allocator.
///
/// Every object ever spawned receives a monotonically increasing sequence id,
/// starting from 1.
pub struct ObjectPool<H: HandleLike, T: Recycle> {
    handles: HandlePool<H>,
    entries: Vec<T>,
    sequence: u32,
}

impl<H: HandleLike, T: Recycle> Default for ObjectPool<H, T> {
    fn default() -> Self {
        ObjectPool::new()
    }
}

impl<H: HandleLike, T: Recycle> ObjectPool<H, T> {
    /// Constructs a new, empty `ObjectPool`.
    pub fn new() -> Self {
        ObjectPool {
            handles: HandlePool::new(),
            entries: Vec::new(),
            sequence: 0,
        }
    }

    /// Constructs a new `ObjectPool` with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        ObjectPool {
            handles: HandlePool::with_capacity(capacity),
            entries: Vec::with_capacity(capacity),
            sequence: 0,
        }
    }

    /// Takes a recycled object out of the pool, or spawns a new one with the
    /// next sequence id if every slot is in use. Callers are expected to `init`
    /// the returned object before using it.
    pub fn create<F>(&mut self, spawn: F) -> H
    where
        F: FnOnce(u32) -> T,
    {
        let (handle, fresh) = self.handles.create();

        if fresh {
            self.sequence += 1;
            self.entries.push(spawn(self.sequence));
        }

        handle
    }

    /// Returns mutable reference to internal value with name `Handle`.
    #[inline]
    pub fn get_mut(&mut self, handle: H) -> Option<&mut T> {
        if self.handles.contains(handle) {
            self.entries.get_mut(handle.index() as usize)
        } else {
            None
        }
    }

    /// Returns immutable reference to internal value with name `Handle`.
    #[inline]
    pub fn get(&self, handle: H) -> Option<&T> {
        if self.handles.contains(handle) {
            self.entries.get(handle.index() as usize)
        } else {
            None
        }
    }

    /// Returns true if this `Handle` was created by `ObjectPool`, and has not been
    /// freed yet.
    #[inline]
    pub fn contains(&self, handle: H) -> bool {
        self.handles.contains(handle)
    }

    /// Recycles the value with name `Handle`. Returns false if the handle is stale.
    pub fn free(&mut self, handle: H) -> bool {
        if self.handles.free(handle) {
            self.entries[handle.index() as usize].recycle();
            true
        } else {
            false
        }
    }

    /// Returns the total number of alive handle in this `ObjectPool`.
    #[inline]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Checks if the pool is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of objects ever spawned by this pool.
    #[inline]
    pub fn spawned(&self) -> usize {
        self.entries.len()
    }

    /// Returns an iterator over alive handles.
    #[inline]
    pub fn iter(&self) -> Iter<H> {
        self.handles.iter()
    }

    /// Returns an iterator over alive handles and their values.
    pub fn values(&self) -> impl Iterator<Item = (H, &T)> {
        let entries = &self.entries;
        self.handles
            .iter()
            .map(move |h| (h, &entries[h.index() as usize]))
    }
}
