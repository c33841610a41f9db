//! Pluggable fetch backends, selected by the schema of request urls.

pub mod dir;
pub mod memory;

pub use self::dir::Dir;
pub use self::memory::Memory;

use std::sync::Arc;

use crate::bundle::BinaryBundle;
use crate::errors::*;
use crate::request::{FetchKind, FetchState, Payload, Response};
use crate::utils::hash::FastHashMap;

/// A fetch backend. Implementations complete `state` exactly once, from any
/// thread, and may report progress through it in between.
pub trait VFS: Send + Sync + 'static {
    fn request(&self, kind: FetchKind, url: &str, state: Arc<FetchState>);
}

/// Splits `url` into its schema and the rest, e.g. `file:///a/b` into `file` and
/// `/a/b`.
pub fn split_schema(url: &str) -> Option<(&str, &str)> {
    let index = url.find("://")?;
    if index == 0 {
        return None;
    }

    Some((&url[..index], &url[index + 3..]))
}

/// Decodes fetched bytes according to the fetch strategy.
pub fn decode(kind: FetchKind, bytes: Box<[u8]>) -> Response {
    match kind {
        FetchKind::Raw => Ok(Payload::Bytes(bytes)),
        FetchKind::Bundle | FetchKind::BundleHeader => {
            let bundle = BinaryBundle::from_bytes(bytes)?;
            Ok(Payload::Bundle(Arc::new(bundle)))
        }
    }
}

/// Registry of backends keyed by url schema.
#[derive(Default, Clone)]
pub struct SchemaResolver {
    schemas: FastHashMap<String, Arc<dyn VFS>>,
}

impl SchemaResolver {
    pub fn new() -> Self {
        SchemaResolver {
            schemas: FastHashMap::default(),
        }
    }

    /// Registers `vfs` as the backend of urls starting with `schema://`.
    pub fn add<T: Into<String>>(&mut self, schema: T, vfs: Arc<dyn VFS>) -> Result<()> {
        let schema = schema.into();
        if self.schemas.contains_key(&schema) {
            bail!("Schema {} has been registered already.", schema);
        }

        self.schemas.insert(schema, vfs);
        Ok(())
    }

    #[inline]
    pub fn contains(&self, schema: &str) -> bool {
        self.schemas.contains_key(schema)
    }

    /// Returns the backend serving `url`.
    pub fn locate(&self, url: &str) -> Option<&Arc<dyn VFS>> {
        let (schema, _) = split_schema(url)?;
        self.schemas.get(schema)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn schema() {
        assert_eq!(split_schema("file:///a/b"), Some(("file", "/a/b")));
        assert_eq!(split_schema("mem://ui"), Some(("mem", "ui")));
        assert_eq!(split_schema("ui"), None);
        assert_eq!(split_schema("://ui"), None);

        let mut schemas = SchemaResolver::new();
        schemas.add("mem", Arc::new(Memory::new())).unwrap();
        assert!(schemas.add("mem", Arc::new(Memory::new())).is_err());
        assert!(schemas.locate("mem://ui").is_some());
        assert!(schemas.locate("http://ui").is_none());
    }
}
