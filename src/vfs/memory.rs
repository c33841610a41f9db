use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::bundle::BundleData;
use crate::errors::*;
use crate::request::{FetchKind, FetchState, Payload, Response};
use crate::utils::hash::FastHashMap;

use super::{split_schema, VFS};

#[derive(Clone)]
enum Entry {
    Bytes(Arc<[u8]>),
    Bundle(Arc<dyn BundleData>),
    Fail(String),
}

struct Pending {
    path: String,
    kind: FetchKind,
    state: Arc<FetchState>,
}

/// In-process backend, usually registered under `mem://`. It either completes
/// fetches right away, or, when `deferred`, holds them until `complete` is
/// called, which makes the scheduling of fetches fully deterministic.
#[derive(Default)]
pub struct Memory {
    entries: Mutex<FastHashMap<String, Entry>>,
    pending: Mutex<Vec<Pending>>,
    fetches: Mutex<FastHashMap<String, usize>>,
    total: AtomicUsize,
    deferred: bool,
}

impl Memory {
    /// Creates a backend which completes fetches immediately.
    pub fn new() -> Self {
        Memory::default()
    }

    /// Creates a backend which holds fetches until `complete`.
    pub fn deferred() -> Self {
        Memory {
            deferred: true,
            ..Default::default()
        }
    }

    /// Stores raw bytes under `path`. Bundle fetches decode them as `BinaryBundle`.
    pub fn insert<T: Into<String>>(&self, path: T, bytes: &[u8]) {
        let entry = Entry::Bytes(bytes.into());
        self.entries.lock().unwrap().insert(path.into(), entry);
    }

    /// Stores already decoded bundle content under `path`.
    pub fn insert_bundle<T: Into<String>>(&self, path: T, data: Arc<dyn BundleData>) {
        let entry = Entry::Bundle(data);
        self.entries.lock().unwrap().insert(path.into(), entry);
    }

    /// Makes every fetch of `path` fail with `reason`.
    pub fn insert_failure<T: Into<String>, R: Into<String>>(&self, path: T, reason: R) {
        let entry = Entry::Fail(reason.into());
        self.entries.lock().unwrap().insert(path.into(), entry);
    }

    pub fn remove(&self, path: &str) {
        self.entries.lock().unwrap().remove(path);
    }

    fn respond(&self, kind: FetchKind, path: &str) -> Response {
        let entry = self.entries.lock().unwrap().get(path).cloned();
        match entry {
            Some(Entry::Bytes(bytes)) => super::decode(kind, Box::from(&bytes[..])),
            Some(Entry::Bundle(data)) => match kind {
                FetchKind::Raw => bail!("{} is a decoded bundle.", path),
                _ => Ok(Payload::Bundle(data)),
            },
            Some(Entry::Fail(reason)) => bail!("{}", reason),
            None => Err(FetchError::NotFound(path.to_owned()).into()),
        }
    }

    /// Completes every held fetch of `path`. Returns the number of completed
    /// fetches.
    pub fn complete(&self, path: &str) -> usize {
        let completed: Vec<_> = {
            let mut pending = self.pending.lock().unwrap();
            let (completed, rest): (Vec<Pending>, Vec<Pending>) =
                pending.drain(..).partition(|v| v.path == path);
            *pending = rest;
            completed
        };

        for v in &completed {
            v.state.set(self.respond(v.kind, &v.path));
        }

        completed.len()
    }

    /// Completes every held fetch.
    pub fn complete_all(&self) -> usize {
        let completed: Vec<_> = self.pending.lock().unwrap().drain(..).collect();
        for v in &completed {
            v.state.set(self.respond(v.kind, &v.path));
        }

        completed.len()
    }

    /// Returns the number of held fetches.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Returns the paths of held fetches in the order they were issued.
    pub fn pending_paths(&self) -> Vec<String> {
        self.pending
            .lock()
            .unwrap()
            .iter()
            .map(|v| v.path.clone())
            .collect()
    }

    /// Returns how many times `path` has been fetched.
    pub fn fetches(&self, path: &str) -> usize {
        self.fetches.lock().unwrap().get(path).cloned().unwrap_or(0)
    }

    /// Returns the total number of fetches.
    pub fn total_fetches(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

impl VFS for Memory {
    fn request(&self, kind: FetchKind, url: &str, state: Arc<FetchState>) {
        let path = split_schema(url).map(|(_, v)| v).unwrap_or(url).to_owned();

        self.total.fetch_add(1, Ordering::SeqCst);
        *self
            .fetches
            .lock()
            .unwrap()
            .entry(path.clone())
            .or_insert(0) += 1;

        if self.deferred {
            state.set_progress(0.5);
            self.pending.lock().unwrap().push(Pending { path, kind, state });
        } else {
            state.set(self.respond(kind, &path));
        }
    }
}
