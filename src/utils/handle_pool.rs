use std::cmp::Ordering;
use std::collections::binary_heap::BinaryHeap;
use std::marker::PhantomData;

use super::handle::HandleLike;

#[derive(PartialEq, Eq)]
struct InverseIndex(u32);

impl PartialOrd for InverseIndex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InverseIndex {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.cmp(&self.0)
    }
}

/// `HandlePool` manages the manipulations of a `Handle` collection, which are
/// created with a continuous `index` field. It also have the ability to find
/// out the current status of a specified `Handle`.
///
/// An odd version means the slot is alive. Freed indices are handed out again
/// lowest first, which keeps the backing storage of pools compact.
pub struct HandlePool<H: HandleLike> {
    versions: Vec<u32>,
    frees: BinaryHeap<InverseIndex>,
    _phantom: PhantomData<H>,
}

impl<H: HandleLike> Default for HandlePool<H> {
    fn default() -> Self {
        HandlePool::new()
    }
}

impl<H: HandleLike> HandlePool<H> {
    /// Constructs a new, empty `HandlePool`.
    pub fn new() -> Self {
        HandlePool {
            versions: Vec::new(),
            frees: BinaryHeap::new(),
            _phantom: PhantomData,
        }
    }

    /// Constructs a new `HandlePool` with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        HandlePool {
            versions: Vec::with_capacity(capacity),
            frees: BinaryHeap::with_capacity(capacity),
            _phantom: PhantomData,
        }
    }

    /// Creates a unused `Handle`. Returns true in the second field if the
    /// index has never been used before.
    pub fn create(&mut self) -> (H, bool) {
        if let Some(InverseIndex(index)) = self.frees.pop() {
            // Reuses the lowest free slot.
            let index = index as usize;
            self.versions[index] += 1;
            (H::new(index as u32, self.versions[index]), false)
        } else {
            self.versions.push(1);
            (H::new(self.versions.len() as u32 - 1, 1), true)
        }
    }

    /// Returns true if this `Handle` was created by `HandlePool`, and has not been
    /// freed yet.
    #[inline]
    pub fn contains(&self, handle: H) -> bool {
        let index = handle.index() as usize;
        self.is_alive_at(index) && (self.versions[index] == handle.version())
    }

    #[inline]
    fn is_alive_at(&self, index: usize) -> bool {
        (index < self.versions.len()) && ((self.versions[index] & 0x1) == 1)
    }

    /// Recycles the `Handle` index, and mark its version as dead.
    pub fn free(&mut self, handle: H) -> bool {
        if !self.contains(handle) {
            false
        } else {
            self.versions[handle.index() as usize] += 1;
            self.frees.push(InverseIndex(handle.index()));
            true
        }
    }

    /// Returns the total number of alive handle in this `HandlePool`.
    #[inline]
    pub fn len(&self) -> usize {
        self.versions.len() - self.frees.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of slots ever created, alive or not.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.versions.len()
    }

    /// Returns an iterator over alive handles, in index order.
    #[inline]
    pub fn iter(&self) -> Iter<H> {
        Iter {
            versions: &self.versions,
            index: 0,
            _phantom: PhantomData,
        }
    }
}

/// Immutable `HandlePool` iterator, this struct is created by `iter` method on `HandlePool`.
pub struct Iter<'a, H: HandleLike> {
    versions: &'a [u32],
    index: usize,
    _phantom: PhantomData<H>,
}

impl<'a, H: HandleLike> Iterator for Iter<'a, H> {
    type Item = H;

    fn next(&mut self) -> Option<H> {
        while self.index < self.versions.len() {
            let i = self.index;
            self.index += 1;

            let v = self.versions[i];
            if v & 0x1 == 1 {
                return Some(H::new(i as u32, v));
            }
        }

        None
    }
}
