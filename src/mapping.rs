//! Lookup from logical asset paths to the bundles carrying them.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::errors::*;
use crate::utils::hash::FastHashMap;

/// Read-only lookup from a logical asset path to its owning bundle and the asset
/// name inside that bundle.
pub trait PathResolver: Send + Sync {
    /// Resolves `path` into `(bundle, asset)`.
    fn resolve(&self, path: &str) -> Option<(&str, &str)>;

    /// Returns the bundle which carries the asset named `asset`.
    fn bundle_of(&self, asset: &str) -> Option<&str>;

    /// Returns every asset name declared for `bundle`.
    fn assets_of(&self, bundle: &str) -> Vec<&str>;
}

/// A single entry of the path mapping document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMappingItem {
    pub path: String,
    pub bundle: String,
    pub asset: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PathMappingData {
    assets: Vec<PathMappingItem>,
}

/// The default `PathResolver`, decoded from a JSON document like:
///
/// ```json
/// { "assets": [ { "path": "ui/login.prefab", "bundle": "ui.assetbundle", "asset": "ui/login.prefab" } ] }
/// ```
#[derive(Debug, Default, Clone)]
pub struct PathMapping {
    items: Vec<PathMappingItem>,
    paths: FastHashMap<String, usize>,
    assets: FastHashMap<String, usize>,
    bundles: FastHashMap<String, Vec<usize>>,
}

impl PathMapping {
    pub fn new() -> Self {
        PathMapping::default()
    }

    /// Adds a mapping entry. Every path and asset name could only be declared
    /// once.
    pub fn add<T1, T2, T3>(&mut self, path: T1, bundle: T2, asset: T3) -> Result<()>
    where
        T1: Into<String>,
        T2: Into<String>,
        T3: Into<String>,
    {
        let item = PathMappingItem {
            path: path.into(),
            bundle: bundle.into(),
            asset: asset.into(),
        };

        if self.paths.contains_key(&item.path) {
            bail!("[PathMapping] Path {} has been declared twice.", item.path);
        }

        if self.assets.contains_key(&item.asset) {
            bail!("[PathMapping] Asset {} has been declared twice.", item.asset);
        }

        let index = self.items.len();
        self.paths.insert(item.path.clone(), index);
        self.assets.insert(item.asset.clone(), index);
        self.bundles
            .entry(item.bundle.clone())
            .or_insert_with(Vec::new)
            .push(index);
        self.items.push(item);
        Ok(())
    }

    /// Decodes the mapping from a JSON document.
    pub fn from_json<R: Read>(file: R) -> Result<Self> {
        let data: PathMappingData = serde_json::from_reader(file)?;

        let mut mapping = PathMapping::new();
        for v in data.assets {
            mapping.add(v.path, v.bundle, v.asset)?;
        }

        Ok(mapping)
    }

    /// Decodes the mapping from JSON text.
    #[inline]
    pub fn from_str(text: &str) -> Result<Self> {
        Self::from_json(text.as_bytes())
    }

    /// Encodes the mapping into JSON text.
    pub fn to_json(&self) -> Result<String> {
        let data = PathMappingData {
            assets: self.items.clone(),
        };

        Ok(serde_json::to_string_pretty(&data)?)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl PathResolver for PathMapping {
    fn resolve(&self, path: &str) -> Option<(&str, &str)> {
        self.paths.get(path).map(|&index| {
            let v = &self.items[index];
            (v.bundle.as_str(), v.asset.as_str())
        })
    }

    fn bundle_of(&self, asset: &str) -> Option<&str> {
        self.assets
            .get(asset)
            .map(|&index| self.items[index].bundle.as_str())
    }

    fn assets_of(&self, bundle: &str) -> Vec<&str> {
        match self.bundles.get(bundle) {
            Some(indices) => indices
                .iter()
                .map(|&index| self.items[index].asset.as_str())
                .collect(),
            None => Vec::new(),
        }
    }
}
