//! Loaded bundles and the default binary bundle container.
//!
//! A `Bundle` is a cheap, cloneable handle to loaded bundle content. The content
//! itself is opaque to the pipeline and accessed through `BundleData`, so hosts
//! could plug in their own container formats. `BinaryBundle` is the default one:
//!
//! ```text
//! MAGIC: [u8; 8] | header length: u32 (LE) | header: bincode | body
//! ```
//!
//! where the header lists the bundle name, its scene-only flag, its declared
//! dependencies and a table of `(asset, offset, length)` entries into the body.

pub mod cache;
pub mod loader;

use std::fmt;
use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::asset::{Asset, RawAsset};
use crate::errors::*;
use crate::utils::hash::FastHashMap;

pub const MAGIC: [u8; 8] = [b'B', b'N', b'D', b'L', b' ', 0, 0, 1];

/// The content of a loaded bundle.
pub trait BundleData: Send + Sync {
    /// Scene-only bundles could not yield queryable assets.
    fn is_scene_only(&self) -> bool;

    /// Returns the declared dependency names.
    fn dependencies(&self) -> &[String];

    /// Returns the names of every asset in this bundle.
    fn asset_names(&self) -> Vec<&str>;

    /// Loads the asset stored under `name`.
    fn load_asset(&self, name: &str) -> Option<Asset>;

    /// Releases the content. With `all` set, assets created from this bundle
    /// should be released as well, if the container is able to do so.
    fn unload(&self, _all: bool) {}
}

/// A cheap handle to loaded bundle content.
#[derive(Clone)]
pub struct Bundle {
    name: Arc<str>,
    data: Arc<dyn BundleData>,
}

impl Bundle {
    pub fn new<T, D>(name: T, data: D) -> Self
    where
        T: AsRef<str>,
        D: BundleData + 'static,
    {
        Bundle {
            name: name.as_ref().into(),
            data: Arc::new(data),
        }
    }

    #[inline]
    pub fn from_shared<T: AsRef<str>>(name: T, data: Arc<dyn BundleData>) -> Self {
        Bundle {
            name: name.as_ref().into(),
            data,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn data(&self) -> &Arc<dyn BundleData> {
        &self.data
    }

    #[inline]
    pub fn is_scene_only(&self) -> bool {
        self.data.is_scene_only()
    }

    #[inline]
    pub fn dependencies(&self) -> &[String] {
        self.data.dependencies()
    }

    #[inline]
    pub fn asset_names(&self) -> Vec<&str> {
        self.data.asset_names()
    }

    #[inline]
    pub fn load_asset(&self, name: &str) -> Option<Asset> {
        self.data.load_asset(name)
    }

    #[inline]
    pub fn unload(&self, all: bool) {
        self.data.unload(all)
    }

    /// Returns true if both handles refer to the same content.
    #[inline]
    pub fn ptr_eq(&self, rhs: &Bundle) -> bool {
        Arc::ptr_eq(&self.data, &rhs.data)
    }
}

impl fmt::Debug for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Bundle")
            .field("name", &self.name)
            .field("scene_only", &self.data.is_scene_only())
            .finish()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    pub name: String,
    pub offset: u64,
    pub len: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct BundleHeader {
    pub name: String,
    pub scene_only: bool,
    pub dependencies: Vec<String>,
    pub entries: Vec<BundleEntry>,
}

enum Storage {
    Memory { bytes: Box<[u8]>, body: usize },
    File { path: PathBuf, body: u64 },
}

/// The default bundle container. It is either fully resident in memory, or only
/// has its header resident and reads payloads from disk on demand.
pub struct BinaryBundle {
    header: BundleHeader,
    index: FastHashMap<String, usize>,
    storage: Mutex<Option<Storage>>,
}

impl BinaryBundle {
    /// Reads the header from a stream holding `total` bytes.
    fn read_header(file: &mut dyn Read, total: u64) -> Result<(BundleHeader, u64)> {
        let mut buf = [0; 8];
        file.read_exact(&mut buf)?;

        // MAGIC: [u8; 8]
        if buf[..] != MAGIC[..] {
            return Err(FetchError::Malformed("bundle MAGIC number not match".into()).into());
        }

        let len = file.read_u32::<LittleEndian>()?;
        if u64::from(len) > total.saturating_sub(12) {
            let err = format!("bundle header of {} bytes exceeds the {} available", len, total);
            return Err(FetchError::Malformed(err).into());
        }

        let mut header = vec![0; len as usize];
        file.read_exact(&mut header)?;

        let header: BundleHeader = bincode::deserialize(&header)?;
        Ok((header, 12 + u64::from(len)))
    }

    fn with_storage(header: BundleHeader, storage: Storage, body_len: Option<u64>) -> Result<Self> {
        let mut index = FastHashMap::default();
        for (i, v) in header.entries.iter().enumerate() {
            if let Some(body_len) = body_len {
                if v.offset.saturating_add(v.len) > body_len {
                    let err = format!("entry {} of bundle {} out of bounds", v.name, header.name);
                    return Err(FetchError::Malformed(err).into());
                }
            }

            index.insert(v.name.clone(), i);
        }

        Ok(BinaryBundle {
            header,
            index,
            storage: Mutex::new(Some(storage)),
        })
    }

    /// Decodes a fully resident bundle.
    pub fn from_bytes<T: Into<Box<[u8]>>>(bytes: T) -> Result<Self> {
        let bytes = bytes.into();
        let (header, body) = Self::read_header(&mut &bytes[..], bytes.len() as u64)?;

        let body_len = bytes.len() as u64 - body;
        let storage = Storage::Memory {
            bytes,
            body: body as usize,
        };

        Self::with_storage(header, storage, Some(body_len))
    }

    /// Reads just the header of the bundle file at `path`. Payloads are read from
    /// disk when assets get loaded.
    pub fn open_header<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = fs::File::open(path)?;
        let total = file.metadata()?.len();
        let (header, body) = Self::read_header(&mut file, total)?;

        let body_len = total.saturating_sub(body);
        let storage = Storage::File {
            path: path.to_owned(),
            body,
        };

        Self::with_storage(header, storage, Some(body_len))
    }

    #[inline]
    pub fn header(&self) -> &BundleHeader {
        &self.header
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.header.name
    }

    /// Returns true if the payload storage is still resident.
    pub fn is_loaded(&self) -> bool {
        self.storage.lock().unwrap().is_some()
    }

    fn read(&self, entry: &BundleEntry) -> Result<Box<[u8]>> {
        let storage = self.storage.lock().unwrap();
        match *storage {
            Some(Storage::Memory { ref bytes, body }) => {
                let from = body + entry.offset as usize;
                Ok(bytes[from..from + entry.len as usize].into())
            }
            Some(Storage::File { ref path, body }) => {
                let mut file = fs::File::open(path)?;
                file.seek(SeekFrom::Start(body + entry.offset))?;

                let mut buf = vec![0; entry.len as usize];
                file.read_exact(&mut buf)?;
                Ok(buf.into_boxed_slice())
            }
            None => bail!("Bundle {} has been unloaded.", self.header.name),
        }
    }
}

impl BundleData for BinaryBundle {
    #[inline]
    fn is_scene_only(&self) -> bool {
        self.header.scene_only
    }

    #[inline]
    fn dependencies(&self) -> &[String] {
        &self.header.dependencies
    }

    fn asset_names(&self) -> Vec<&str> {
        self.header
            .entries
            .iter()
            .map(|v| v.name.as_str())
            .collect()
    }

    fn load_asset(&self, name: &str) -> Option<Asset> {
        let entry = &self.header.entries[*self.index.get(name)?];
        match self.read(entry) {
            Ok(bytes) => Some(Arc::new(RawAsset::new(name, bytes))),
            Err(err) => {
                error!("Failed to read {} from bundle {}. {}", name, self.header.name, err);
                None
            }
        }
    }

    fn unload(&self, _: bool) {
        *self.storage.lock().unwrap() = None;
    }
}

/// Writes bundles in the `BinaryBundle` layout.
#[derive(Debug, Default, Clone)]
pub struct BundleBuilder {
    header: BundleHeader,
    body: Vec<u8>,
}

impl BundleBuilder {
    pub fn new<T: Into<String>>(name: T) -> Self {
        BundleBuilder {
            header: BundleHeader {
                name: name.into(),
                ..Default::default()
            },
            body: Vec::new(),
        }
    }

    pub fn scene_only(mut self, scene_only: bool) -> Self {
        self.header.scene_only = scene_only;
        self
    }

    pub fn with_dependency<T: Into<String>>(mut self, name: T) -> Self {
        self.header.dependencies.push(name.into());
        self
    }

    pub fn with_asset<T: Into<String>>(mut self, name: T, bytes: &[u8]) -> Self {
        self.header.entries.push(BundleEntry {
            name: name.into(),
            offset: self.body.len() as u64,
            len: bytes.len() as u64,
        });

        self.body.extend_from_slice(bytes);
        self
    }

    pub fn write_to(&self, file: &mut dyn Write) -> Result<()> {
        let header = bincode::serialize(&self.header)?;

        file.write_all(&MAGIC)?;
        file.write_u32::<LittleEndian>(header.len() as u32)?;
        file.write_all(&header)?;
        file.write_all(&self.body)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.body.len() + 64);
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    /// Decodes the written bundle straight away.
    pub fn build(&self) -> Result<Bundle> {
        let data = BinaryBundle::from_bytes(self.to_bytes()?)?;
        Ok(Bundle::new(&self.header.name, data))
    }
}
