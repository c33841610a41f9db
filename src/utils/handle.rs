use std::fmt;
use std::fmt::Debug;
use std::hash::Hash;

/// A slot address inside one of the pools. The slot `index` gets reused once
/// freed, while `version` is bumped on every create and free, so a handle kept
/// past its free stops resolving.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle {
    index: u32,
    version: u32,
}

impl Handle {
    #[inline]
    pub fn new(index: u32, version: u32) -> Self {
        Handle { index, version }
    }

    /// Returns false for the default handle, which no pool ever hands out.
    #[inline]
    pub fn is_valid(self) -> bool {
        self.version > 0
    }

    #[inline]
    pub fn index(self) -> u32 {
        self.index
    }

    #[inline]
    pub fn version(self) -> u32 {
        self.version
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.index, self.version)
    }
}

/// Anything the pools could address their slots with.
pub trait HandleLike: Debug + Copy + Hash + PartialEq + Eq + Send + Sync {
    fn new(index: u32, version: u32) -> Self;
    fn index(&self) -> u32;
    fn version(&self) -> u32;
}

impl HandleLike for Handle {
    #[inline]
    fn new(index: u32, version: u32) -> Self {
        Handle { index, version }
    }

    #[inline]
    fn index(&self) -> u32 {
        self.index
    }

    #[inline]
    fn version(&self) -> u32 {
        self.version
    }
}

/// Declares a named handle for one pool, so loader, request and weak entry
/// handles could not be passed to each other's pools.
#[macro_export]
macro_rules! impl_handle {
    ($name:ident) => {
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name($crate::utils::handle::Handle);

        impl From<$crate::utils::handle::Handle> for $name {
            fn from(handle: $crate::utils::handle::Handle) -> Self {
                $name(handle)
            }
        }

        impl $crate::utils::handle::HandleLike for $name {
            #[inline]
            fn new(index: u32, version: u32) -> Self {
                $name($crate::utils::handle::Handle::new(index, version))
            }

            #[inline]
            fn index(&self) -> u32 {
                self.0.index()
            }

            #[inline]
            fn version(&self) -> u32 {
                self.0.version()
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                write!(f, "{}{}", stringify!($name), self.0)
            }
        }
    };
}
