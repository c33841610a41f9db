//! Commonly used utilities like handles, pools and latches.

#[macro_use]
pub mod handle;
pub mod handle_pool;
pub mod hash;
pub mod latch;
pub mod object_pool;

pub mod prelude {
    pub use super::handle::{Handle, HandleLike};
    pub use super::handle_pool::HandlePool;
    pub use super::hash::{FastHashMap, FastHashSet};
    pub use super::latch::LockLatch;
    pub use super::object_pool::{ObjectPool, Recycle};
}
