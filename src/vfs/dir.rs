use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use crate::bundle::BinaryBundle;
use crate::errors::*;
use crate::request::{FetchKind, FetchState, Payload, Response};

use super::{split_schema, VFS};

const CHUNK_SIZE: usize = 64 * 1024;

/// Local file backend for `file://` urls. Every fetch runs on its own thread, the
/// result is observed by the queue on a later tick.
#[derive(Debug, Default, Clone, Copy)]
pub struct Dir {}

impl Dir {
    pub fn new() -> Self {
        Dir {}
    }

    fn load_from(kind: FetchKind, location: &Path, state: &FetchState) -> Response {
        if !location.is_file() {
            let err = FetchError::NotFound(location.display().to_string());
            return Err(err.into());
        }

        if kind == FetchKind::BundleHeader {
            let bundle = BinaryBundle::open_header(location)?;
            return Ok(Payload::Bundle(Arc::new(bundle)));
        }

        let mut file = fs::File::open(location)?;
        let len = file.metadata()?.len() as usize;

        let mut buf = Vec::with_capacity(len);
        let mut chunk = vec![0; CHUNK_SIZE];
        loop {
            let n = file.read(&mut chunk)?;
            if n == 0 {
                break;
            }

            buf.extend_from_slice(&chunk[..n]);
            if len > 0 {
                state.set_progress(buf.len() as f32 / len as f32);
            }
        }

        super::decode(kind, buf.into_boxed_slice())
    }
}

impl VFS for Dir {
    fn request(&self, kind: FetchKind, url: &str, state: Arc<FetchState>) {
        let location = match split_schema(url) {
            Some((_, path)) => PathBuf::from(path),
            None => PathBuf::from(url),
        };

        let rx = state.clone();
        let spawned = thread::Builder::new()
            .name("assetbundle-dir".into())
            .spawn(move || {
                let response = Dir::load_from(kind, &location, &rx);
                rx.set(response);
            });

        if let Err(err) = spawned {
            state.set(Err(err.into()));
        }
    }
}
