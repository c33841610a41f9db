//! Functions for loading the configuration of the bundle pipeline.

use std::io::Read;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::*;

/// Controls which completed bundles get their assets resolved eagerly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreloadPolicy {
    /// Every non-scene bundle.
    All,
    /// Only the listed bundles.
    Only(Vec<String>),
    Disabled,
}

impl PreloadPolicy {
    pub fn accepts(&self, bundle: &str) -> bool {
        match *self {
            PreloadPolicy::All => true,
            PreloadPolicy::Only(ref names) => names.iter().any(|v| v == bundle),
            PreloadPolicy::Disabled => false,
        }
    }
}

impl Default for PreloadPolicy {
    fn default() -> Self {
        PreloadPolicy::All
    }
}

/// A structure containing configuration data for the bundle pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleParams {
    /// The maximum number of fetches running at the same time.
    pub max_concurrent_requests: usize,
    /// The bundle carrying the dependency manifest.
    pub manifest_bundle: String,
    /// The asset inside `manifest_bundle` holding the encoded manifest.
    pub manifest_asset: String,
    /// The bundle carrying the asset path mapping.
    pub mapping_bundle: String,
    /// The asset inside `mapping_bundle` holding the mapping text.
    pub mapping_asset: String,
    /// Prefix turning a package path into the path an asset is stored under
    /// inside its bundle.
    pub assets_folder: String,
    /// Default timeout of `download_asset_bundle`.
    pub bundle_download_timeout: Duration,
    pub preload: PreloadPolicy,
}

impl Default for BundleParams {
    fn default() -> Self {
        BundleParams {
            max_concurrent_requests: 5,
            manifest_bundle: "assetbundles".to_owned(),
            manifest_asset: "manifest.bytes".to_owned(),
            mapping_bundle: "assetspathmapping.assetbundle".to_owned(),
            mapping_asset: "assetspathmapping.json".to_owned(),
            assets_folder: "Assets/AssetsPackage/".to_owned(),
            bundle_download_timeout: Duration::from_secs(20),
            preload: PreloadPolicy::All,
        }
    }
}

impl BundleParams {
    /// Loads parameters from a JSON document. Missing fields keep their default
    /// values.
    pub fn from_json<R: Read>(file: R) -> Result<Self> {
        let params: BundleParams = serde_json::from_reader(file)?;

        if params.max_concurrent_requests == 0 {
            bail!("`max_concurrent_requests` must be at least 1.");
        }

        Ok(params)
    }

    /// Converts a package path into the path used inside bundles.
    #[inline]
    pub fn package_to_assets_path(&self, path: &str) -> String {
        format!("{}{}", self.assets_folder, path)
    }
}
