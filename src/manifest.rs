//! Manifest for all the bundles in the build.
//!
//! The manifest is the authoritative table of bundle-to-bundle dependency edges.
//! It is populated once during initialization and never mutated afterwards. The
//! on-disk layout is a `MAGIC` header followed by a `bincode` encoded item list,
//! where every item refers its direct dependencies by index.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use uuid::Uuid;

use crate::errors::*;
use crate::utils::hash::{FastHashMap, FastHashSet};

pub const MAGIC: [u8; 8] = [b'M', b'N', b'F', b'T', b' ', 0, 0, 1];

/// Read-only lookup from a bundle name to the ordered list of every bundle it
/// depends on transitively.
pub trait DependencyResolver: Send + Sync {
    /// Returns the transitive dependencies of `bundle`, dependencies before
    /// dependents, without duplicates and without `bundle` itself. Unknown
    /// bundles have no dependencies.
    fn dependencies(&self, bundle: &str) -> Vec<String>;
}

/// A manifest item in the build.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ManifestItem {
    pub name: String,
    pub uuid: Uuid,
    pub dependencies: SmallVec<[usize; 4]>,
}

#[derive(Serialize, Deserialize)]
struct ManifestData {
    items: Vec<ManifestItem>,
}

/// Manifest for all the bundles in the build.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    items: Vec<ManifestItem>,
    names: FastHashMap<String, usize>,
}

impl Manifest {
    pub fn new() -> Self {
        Manifest::default()
    }

    /// Registers a bundle. Dependencies must have been added before their
    /// dependents, which keeps the dependency graph acyclic.
    pub fn add<T: AsRef<str>>(&mut self, name: T, uuid: Uuid, dependencies: &[&str]) -> Result<()> {
        let name = name.as_ref();
        if self.names.contains_key(name) {
            bail!("[Manifest] Bundle {} has been added already.", name);
        }

        let mut indices: SmallVec<[usize; 4]> = SmallVec::new();
        for &v in dependencies {
            if v == name {
                warn!("[Manifest] Bundle {} declares itself as dependency.", name);
                continue;
            }

            match self.names.get(v) {
                Some(&index) => {
                    if !indices.contains(&index) {
                        indices.push(index);
                    }
                }
                None => bail!(
                    "[Manifest] Dependency {} of {} must be added before its dependents.",
                    v,
                    name
                ),
            }
        }

        self.names.insert(name.to_owned(), self.items.len());
        self.items.push(ManifestItem {
            name: name.to_owned(),
            uuid,
            dependencies: indices,
        });

        Ok(())
    }

    /// Decodes a manifest from `file`.
    pub fn load_from(mut file: &mut dyn Read) -> Result<Manifest> {
        let mut buf = [0; 8];
        file.read_exact(&mut buf)?;

        // MAGIC: [u8; 8]
        if buf[..] != MAGIC[..] {
            bail!("[Manifest] MAGIC number not match.");
        }

        let data: ManifestData = bincode::deserialize_from(&mut file)?;

        let mut names = FastHashMap::default();
        for (index, v) in data.items.iter().enumerate() {
            if v.dependencies.iter().any(|&d| d >= index) {
                bail!("[Manifest] Bundle {} has malformed dependencies.", v.name);
            }

            if names.insert(v.name.clone(), index).is_some() {
                bail!("[Manifest] Bundle {} has been declared twice.", v.name);
            }
        }

        Ok(Manifest {
            items: data.items,
            names,
        })
    }

    /// Encodes this manifest into `file`.
    pub fn write_to(&self, mut file: &mut dyn Write) -> Result<()> {
        file.write_all(&MAGIC)?;

        let data = ManifestData {
            items: self.items.clone(),
        };

        bincode::serialize_into(&mut file, &data)?;
        Ok(())
    }

    /// Encodes this manifest into a byte buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    #[inline]
    pub fn contains<T: AsRef<str>>(&self, name: T) -> bool {
        self.names.contains_key(name.as_ref())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the content id of bundle.
    #[inline]
    pub fn uuid<T: AsRef<str>>(&self, name: T) -> Option<Uuid> {
        self.names
            .get(name.as_ref())
            .map(|&index| self.items[index].uuid)
    }

    /// Returns the iterator over all the bundle names in the build.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|v| v.name.as_str())
    }

    /// Returns the direct dependencies of bundle.
    pub fn direct_dependencies<T: AsRef<str>>(&self, name: T) -> Vec<&str> {
        match self.names.get(name.as_ref()) {
            Some(&index) => self.items[index]
                .dependencies
                .iter()
                .map(|&v| self.items[v].name.as_str())
                .collect(),
            None => Vec::new(),
        }
    }

    fn visit(&self, index: usize, visited: &mut FastHashSet<usize>, out: &mut Vec<String>) {
        for &v in &self.items[index].dependencies {
            if visited.insert(v) {
                self.visit(v, visited, out);
                out.push(self.items[v].name.clone());
            }
        }
    }
}

impl DependencyResolver for Manifest {
    fn dependencies(&self, bundle: &str) -> Vec<String> {
        let mut out = Vec::new();

        if let Some(&index) = self.names.get(bundle) {
            let mut visited = FastHashSet::default();
            visited.insert(index);
            self.visit(index, &mut visited, &mut out);
        }

        out
    }
}
