//! Runtime loading and caching of packaged assets.
//!
//! Content is shipped as _bundles_, archives holding a set of named assets. A bundle may
//! depend on other bundles, and those dependencies are recorded in a `Manifest`. Logical
//! asset paths are mapped to `(bundle, asset)` pairs by a `PathMapping`. Both are loaded
//! from dedicated bundles when the pipeline initializes.
//!
//! # Requests
//!
//! Every fetch goes through a throttled `RequestQueue`. Urls are dispatched by their schema
//! to a pluggable `VFS`, which completes a `FetchState` latch from whatever thread it likes.
//! Requests with identical keys are shared, and resolved bundles are kept in a `BundleCache`
//! until teardown.
//!
//! # Loaders
//!
//! Loads are asynchronous and tick driven. The host calls `Pipeline::advance` once per frame,
//! which polls the queue, then the bundle loaders, then the asset loaders. Loaded assets are
//! shared through a weak cache, so an asset lives exactly as long as the caller holds it.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use assetbundle::prelude::*;
//!
//! let mut schemas = SchemaResolver::new();
//! schemas.add("file", Arc::new(Dir::new()))?;
//!
//! let urls = LocalFirstResolver::new("file://packaged/");
//! let mut sys = AssetSystem::networked(BundleParams::default(), schemas, urls);
//! sys.initialize();
//! ```

#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

#[macro_use]
pub mod utils;

pub mod errors;
pub mod settings;

pub mod manifest;
pub mod mapping;
pub mod url;

pub mod bundle;
pub mod asset;
pub mod request;
pub mod vfs;

pub mod pipeline;

pub mod prelude {
    pub use crate::asset::cache::AssetCache;
    pub use crate::asset::loader::{AssetLoader, AssetLoaderHandle};
    pub use crate::asset::{downcast, Asset, RawAsset};
    pub use crate::bundle::cache::BundleCache;
    pub use crate::bundle::loader::{BundleLoader, BundleLoaderHandle};
    pub use crate::bundle::{BinaryBundle, Bundle, BundleBuilder, BundleData};
    pub use crate::errors::FetchError;
    pub use crate::manifest::{DependencyResolver, Manifest};
    pub use crate::mapping::{PathMapping, PathResolver};
    pub use crate::pipeline::{AssetSystem, InitState, Pipeline};
    pub use crate::pipeline::{BundleManager, DirectDirectory, DirectPipeline, DirectReader};
    pub use crate::request::queue::RequestQueue;
    pub use crate::request::{FetchKind, FetchRequest, RequestHandle, RequestParams};
    pub use crate::settings::{BundleParams, PreloadPolicy};
    pub use crate::url::{LocalFirstResolver, UrlResolver};
    pub use crate::vfs::dir::Dir;
    pub use crate::vfs::memory::Memory;
    pub use crate::vfs::{SchemaResolver, VFS};
}
