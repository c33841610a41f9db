//! Assets extracted from bundles, and the caches and loaders around them.

pub mod cache;
pub mod loader;
pub mod weak;

use std::any::Any;
use std::fmt;
use std::str;
use std::sync::Arc;

/// A named object extracted from a bundle. The pipeline never interprets the
/// content, consumers downcast it to whatever their bundles produce.
pub type Asset = Arc<dyn Any + Send + Sync>;

/// Downcasts an asset into its concrete type.
#[inline]
pub fn downcast<T: Any + Send + Sync>(asset: &Asset) -> Option<Arc<T>> {
    asset.clone().downcast::<T>().ok()
}

/// The asset type produced by `BinaryBundle`, and by raw fetches.
pub struct RawAsset {
    name: String,
    bytes: Box<[u8]>,
}

impl RawAsset {
    pub fn new<T: Into<String>>(name: T, bytes: Box<[u8]>) -> Self {
        RawAsset {
            name: name.into(),
            bytes,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the content as UTF-8 text.
    #[inline]
    pub fn text(&self) -> Option<&str> {
        str::from_utf8(&self.bytes).ok()
    }
}

impl fmt::Debug for RawAsset {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "RawAsset({}, {} bytes)", self.name, self.bytes.len())
    }
}
