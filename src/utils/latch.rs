use std::sync::{Condvar, Mutex};

/// A latch starts as unset and eventually carries a value. Fetch backends set it
/// from whatever thread completes the I/O; the tick only polls it with
/// `is_set` and `take`, and never blocks. `wait` exists for hosts that need to
/// block outside of the tick, like tooling.
pub struct LockLatch<T> {
    m: Mutex<LatchState<T>>,
    v: Condvar,
}

enum LatchState<T> {
    NotReady,
    Ready(T),
    Taken,
}

impl<T> Default for LockLatch<T> {
    fn default() -> Self {
        LockLatch::new()
    }
}

impl<T> LockLatch<T> {
    #[inline]
    pub fn new() -> Self {
        LockLatch {
            m: Mutex::new(LatchState::NotReady),
            v: Condvar::new(),
        }
    }

    /// Sets the latch, signalling others. Only the first value is kept.
    pub fn set(&self, value: T) {
        let mut guard = self.m.lock().unwrap();
        if let LatchState::NotReady = *guard {
            *guard = LatchState::Ready(value);
            self.v.notify_all();
        }
    }

    /// Test if the latch is set.
    #[inline]
    pub fn is_set(&self) -> bool {
        match *self.m.lock().unwrap() {
            LatchState::NotReady => false,
            _ => true,
        }
    }

    /// Takes the value out of a set latch. Returns `None` if the latch has not
    /// been set yet, or the value has been taken already.
    pub fn take(&self) -> Option<T> {
        let mut guard = self.m.lock().unwrap();
        match ::std::mem::replace(&mut *guard, LatchState::Taken) {
            LatchState::Ready(v) => Some(v),
            LatchState::NotReady => {
                *guard = LatchState::NotReady;
                None
            }
            LatchState::Taken => None,
        }
    }

    /// Block until latch is set.
    pub fn wait(&self) {
        let mut guard = self.m.lock().unwrap();
        while let LatchState::NotReady = *guard {
            guard = self.v.wait(guard).unwrap();
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn basic() {
        let latch = LockLatch::new();
        assert!(!latch.is_set());
        assert_eq!(latch.take(), None);

        latch.set(1);
        latch.set(2);
        assert!(latch.is_set());
        assert_eq!(latch.take(), Some(1));
        assert_eq!(latch.take(), None);
        assert!(latch.is_set());
    }

    #[test]
    fn wait() {
        let latch = Arc::new(LockLatch::new());
        let tx = latch.clone();
        let t = thread::spawn(move || tx.set("done"));

        latch.wait();
        assert_eq!(latch.take(), Some("done"));
        t.join().unwrap();
    }
}
