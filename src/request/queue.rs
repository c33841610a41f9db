use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use crate::bundle::cache::BundleCache;
use crate::errors::*;
use crate::utils::hash::FastHashMap;
use crate::utils::object_pool::ObjectPool;
use crate::vfs::SchemaResolver;

use super::{FetchRequest, FetchState, RequestHandle, RequestParams, RequestStatus};

/// Admits fetch requests, bounds the number of concurrently active fetches and
/// drains the backlog in arrival order as slots free up.
///
/// There is at most one queued or active request per key. Cached and uncached
/// requests are keyed apart, so a raw download of a bundle never stands in for
/// the fetch that publishes it. Completed cached requests publish their bundle (or an empty entry on failure) into the
/// `BundleCache` and return to the pool. Uncached requests stay around until
/// the caller disposes them.
pub struct RequestQueue {
    requests: ObjectPool<RequestHandle, FetchRequest>,
    requesting: FastHashMap<String, RequestHandle>,
    uncached: FastHashMap<String, RequestHandle>,
    backlog: VecDeque<RequestHandle>,
    active: Vec<RequestHandle>,
    completed: Vec<RequestHandle>,
    max_active: usize,
    schemas: SchemaResolver,
}

impl RequestQueue {
    pub fn new(max_active: usize, schemas: SchemaResolver) -> Self {
        RequestQueue {
            requests: ObjectPool::new(),
            requesting: FastHashMap::default(),
            uncached: FastHashMap::default(),
            backlog: VecDeque::new(),
            active: Vec::new(),
            completed: Vec::new(),
            max_active: max_active.max(1),
            schemas,
        }
    }

    /// Creates a request for `key`. If `key` has been requested already, the
    /// existing request is returned unchanged.
    pub fn enqueue(&mut self, key: &str, url: &str, params: RequestParams) -> RequestHandle {
        let mut params = params;
        if !params.is_bundle {
            params.no_cache = true;
        }

        let keys = if params.no_cache {
            &mut self.uncached
        } else {
            &mut self.requesting
        };

        if let Some(&handle) = keys.get(key) {
            warn!("[RequestQueue] {} has been requested already.", key);
            return handle;
        }

        let handle = self.requests.create(FetchRequest::new);
        if let Some(request) = self.requests.get_mut(handle) {
            request.init(key, url, params);
        }

        trace!("[RequestQueue] Enqueue {} from {}.", key, url);
        keys.insert(key.to_owned(), handle);
        self.backlog.push_back(handle);
        handle
    }

    /// Polls every active request, publishes the completed ones and then admits
    /// queued requests until the active set is full. Returns the number of
    /// requests completed during this pass.
    pub fn advance(&mut self, cache: &mut BundleCache) -> usize {
        let now = Instant::now();

        {
            let requests = &mut self.requests;
            let completed = &mut self.completed;
            self.active.retain(|&handle| {
                let done = requests.get_mut(handle).map(|v| v.poll(now)).unwrap_or(true);
                if done {
                    completed.push(handle);
                }

                !done
            });
        }

        let num = self.completed.len();
        for handle in self.completed.drain(..) {
            let (free, key, bundle) = match self.requests.get_mut(handle) {
                Some(request) => {
                    let params = request.params();
                    if params.no_cache {
                        (request.is_disposed(), request.key().to_owned(), None)
                    } else {
                        (true, request.key().to_owned(), Some(request.take_bundle()))
                    }
                }
                None => continue,
            };

            let keys = if bundle.is_some() {
                &mut self.requesting
            } else {
                &mut self.uncached
            };

            if keys.get(&key) == Some(&handle) {
                keys.remove(&key);
            }

            if let Some(bundle) = bundle {
                cache.put(key, bundle);
            }

            if free {
                self.requests.free(handle);
            }
        }

        while self.active.len() < self.max_active {
            match self.backlog.pop_front() {
                Some(handle) => self.start(handle, now),
                None => break,
            }
        }

        num
    }

    fn start(&mut self, handle: RequestHandle, now: Instant) {
        if let Some(request) = self.requests.get_mut(handle) {
            let state = Arc::new(FetchState::new());
            request.start(state.clone(), now);

            match self.schemas.locate(request.url()) {
                Some(vfs) => vfs.request(request.params().kind(), request.url(), state),
                None => {
                    let err = FetchError::SchemaNotSupported(request.url().to_owned());
                    state.set(Err(err.into()));
                }
            }

            self.active.push(handle);
        }
    }

    /// Returns the request to the pool. Queued requests are dropped from the
    /// backlog, in-flight ones get recycled as soon as their fetch completes.
    /// Cached requests are owned by the queue and could not be disposed.
    pub fn dispose(&mut self, handle: RequestHandle) -> bool {
        let (status, key) = match self.requests.get_mut(handle) {
            Some(request) => {
                if !request.params().no_cache {
                    warn!(
                        "[RequestQueue] Cached request {} could not be disposed.",
                        request.key()
                    );
                    return false;
                }

                request.set_disposed();
                (request.status(), request.key().to_owned())
            }
            None => return false,
        };

        match status {
            RequestStatus::Queued => {
                self.backlog.retain(|&v| v != handle);
                if self.uncached.get(&key) == Some(&handle) {
                    self.uncached.remove(&key);
                }

                self.requests.free(handle)
            }
            RequestStatus::Active => true,
            _ => self.requests.free(handle),
        }
    }

    #[inline]
    pub fn get(&self, handle: RequestHandle) -> Option<&FetchRequest> {
        self.requests.get(handle)
    }

    /// Returns the handle of the queued or active request of `key`, preferring
    /// the cached one.
    #[inline]
    pub fn find(&self, key: &str) -> Option<RequestHandle> {
        self.requesting
            .get(key)
            .or_else(|| self.uncached.get(key))
            .cloned()
    }

    /// Returns true if a cached request of `key` is queued or active. Once this
    /// turns false after an enqueue, the bundle cache contains `key`.
    #[inline]
    pub fn is_active(&self, key: &str) -> bool {
        self.requesting.contains_key(key)
    }

    /// Returns true if any request of `key`, cached or not, is queued or active.
    #[inline]
    pub fn is_requested(&self, key: &str) -> bool {
        self.requesting.contains_key(key) || self.uncached.contains_key(key)
    }

    /// Returns the progress of the cached request of `key` if exists.
    pub fn progress_of(&self, key: &str) -> Option<f32> {
        self.requesting
            .get(key)
            .and_then(|&v| self.requests.get(v))
            .map(|v| v.progress())
    }

    /// Returns true if nothing is queued or active.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.active.is_empty() && self.backlog.is_empty()
    }

    #[inline]
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    #[inline]
    pub fn queued_len(&self) -> usize {
        self.backlog.len()
    }

    /// Returns the number of requests alive in the pool, including completed
    /// uncached ones that have not been disposed yet.
    #[inline]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    #[inline]
    pub fn max_active(&self) -> usize {
        self.max_active
    }

    #[inline]
    pub fn schemas(&self) -> &SchemaResolver {
        &self.schemas
    }

    /// Returns the iterator over every queued or active key.
    pub fn requesting(&self) -> impl Iterator<Item = &str> {
        self.requesting
            .keys()
            .chain(self.uncached.keys())
            .map(|v| v.as_str())
    }

    /// Returns the iterator over the keys waiting in the backlog, in order.
    pub fn queued(&self) -> impl Iterator<Item = &str> {
        let requests = &self.requests;
        self.backlog
            .iter()
            .filter_map(move |&v| requests.get(v))
            .map(|v| v.key())
    }

    /// Returns the iterator over every alive request.
    pub fn requests(&self) -> impl Iterator<Item = (RequestHandle, &FetchRequest)> {
        self.requests.values()
    }
}
