//! Fetch requests and the throttled queue driving them.
//!
//! A `FetchRequest` is a pooled unit of work. It is created on demand, queued,
//! admitted into the active set, started on a `VFS` backend and polled once per
//! tick until the backend reports a response through its `FetchState`.

pub mod queue;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use std::str;

use crate::bundle::{Bundle, BundleData};
use crate::errors::*;
use crate::utils::latch::LockLatch;
use crate::utils::object_pool::Recycle;

/// The fetch strategy of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKind {
    /// Full bundle content.
    Bundle,
    /// Just enough of a local bundle to enumerate its metadata.
    BundleHeader,
    /// Generic bytes or text.
    Raw,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestParams {
    pub is_bundle: bool,
    /// The result is handed to the caller instead of the bundle cache.
    pub no_cache: bool,
    pub header_only: bool,
    /// Only honoured by raw fetches.
    pub timeout: Option<Duration>,
}

impl RequestParams {
    /// Cached bundle fetch.
    #[inline]
    pub fn bundle(header_only: bool) -> Self {
        RequestParams {
            is_bundle: true,
            no_cache: false,
            header_only,
            timeout: None,
        }
    }

    /// Uncached raw fetch.
    #[inline]
    pub fn raw(timeout: Option<Duration>) -> Self {
        RequestParams {
            is_bundle: false,
            no_cache: true,
            header_only: false,
            timeout,
        }
    }

    #[inline]
    pub fn uncached(mut self) -> Self {
        self.no_cache = true;
        self
    }

    #[inline]
    pub fn kind(&self) -> FetchKind {
        match (self.is_bundle, self.header_only) {
            (true, true) => FetchKind::BundleHeader,
            (true, false) => FetchKind::Bundle,
            _ => FetchKind::Raw,
        }
    }
}

/// What a backend delivers on success.
pub enum Payload {
    Bundle(Arc<dyn BundleData>),
    Bytes(Box<[u8]>),
}

pub type Response = ::std::result::Result<Payload, failure::Error>;

/// The channel between a backend and the request it serves. Backends could
/// complete it from any thread, the queue only polls it during ticks.
pub struct FetchState {
    latch: LockLatch<Response>,
    progress: AtomicU32,
}

impl Default for FetchState {
    fn default() -> Self {
        FetchState::new()
    }
}

impl FetchState {
    pub fn new() -> Self {
        FetchState {
            latch: LockLatch::new(),
            progress: AtomicU32::new(0f32.to_bits()),
        }
    }

    /// Completes the fetch. Only the first response is kept.
    #[inline]
    pub fn set(&self, response: Response) {
        self.set_progress(1.0);
        self.latch.set(response);
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.latch.is_set()
    }

    #[inline]
    pub fn take(&self) -> Option<Response> {
        self.latch.take()
    }

    /// Blocks until the fetch completes.
    #[inline]
    pub fn wait(&self) {
        self.latch.wait()
    }

    #[inline]
    pub fn set_progress(&self, progress: f32) {
        let progress = progress.max(0.0).min(1.0);
        self.progress.store(progress.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub fn progress(&self) -> f32 {
        f32::from_bits(self.progress.load(Ordering::Relaxed))
    }
}

impl_handle!(RequestHandle);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Idle,
    Queued,
    Active,
    Done,
}

/// A pooled fetch request.
pub struct FetchRequest {
    sequence: u32,
    key: String,
    url: String,
    params: RequestParams,
    status: RequestStatus,
    state: Option<Arc<FetchState>>,
    started: Option<Instant>,
    bundle: Option<Bundle>,
    bytes: Option<Box<[u8]>>,
    error: Option<String>,
    disposed: bool,
}

impl Recycle for FetchRequest {
    fn recycle(&mut self) {
        self.key.clear();
        self.url.clear();
        self.params = RequestParams::default();
        self.status = RequestStatus::Idle;
        self.state = None;
        self.started = None;
        self.bundle = None;
        self.bytes = None;
        self.error = None;
        self.disposed = false;
    }
}

impl FetchRequest {
    pub(crate) fn new(sequence: u32) -> Self {
        FetchRequest {
            sequence,
            key: String::new(),
            url: String::new(),
            params: RequestParams::default(),
            status: RequestStatus::Idle,
            state: None,
            started: None,
            bundle: None,
            bytes: None,
            error: None,
            disposed: false,
        }
    }

    pub(crate) fn init(&mut self, key: &str, url: &str, params: RequestParams) {
        self.key.push_str(key);
        self.url.push_str(url);
        self.params = params;
        self.status = RequestStatus::Queued;
    }

    pub(crate) fn start(&mut self, state: Arc<FetchState>, now: Instant) {
        debug!("[FetchRequest] Start {} ({:?}).", self.url, self.params.kind());
        self.state = Some(state);
        self.started = Some(now);
        self.status = RequestStatus::Active;
    }

    /// Polls the backend, returns true if the request reached its final state.
    pub(crate) fn poll(&mut self, now: Instant) -> bool {
        match self.status {
            RequestStatus::Done => return true,
            RequestStatus::Active => {}
            _ => return false,
        }

        let response = match self.state.as_ref().and_then(|v| v.take()) {
            Some(response) => response,
            None => {
                let expired = match (self.params.timeout, self.started) {
                    (Some(timeout), Some(started)) if !self.params.is_bundle => {
                        now.duration_since(started) >= timeout
                    }
                    _ => false,
                };

                if !expired {
                    return false;
                }

                Err(FetchError::Timeout(self.params.timeout.unwrap_or_default()).into())
            }
        };

        self.complete(response);
        true
    }

    /// Finishes the request with `response` straight away.
    pub(crate) fn complete(&mut self, response: Response) {
        self.status = RequestStatus::Done;
        self.state = None;

        match response {
            Ok(Payload::Bundle(data)) => {
                if self.params.is_bundle {
                    self.bundle = Some(Bundle::from_shared(&self.key, data));
                } else {
                    self.fail(format_err!("Expected bytes but got a bundle."));
                }
            }
            Ok(Payload::Bytes(bytes)) => {
                if self.params.is_bundle {
                    self.fail(format_err!("Expected a bundle but got raw bytes."));
                } else {
                    self.bytes = Some(bytes);
                }
            }
            Err(err) => self.fail(err),
        }
    }

    fn fail(&mut self, err: failure::Error) {
        error!("[FetchRequest] Failed to fetch {}. {}", self.url, err);
        self.error = Some(err.to_string());
    }

    #[inline]
    pub(crate) fn take_bundle(&mut self) -> Option<Bundle> {
        self.bundle.take()
    }

    #[inline]
    pub(crate) fn set_disposed(&mut self) {
        self.disposed = true;
    }

    #[inline]
    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// The monotonically increasing id of the pooled object.
    #[inline]
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[inline]
    pub fn params(&self) -> RequestParams {
        self.params
    }

    #[inline]
    pub fn status(&self) -> RequestStatus {
        self.status
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.status == RequestStatus::Done
    }

    pub fn progress(&self) -> f32 {
        match self.status {
            RequestStatus::Done => 1.0,
            RequestStatus::Active => self.state.as_ref().map(|v| v.progress()).unwrap_or(0.0),
            _ => 0.0,
        }
    }

    /// Time elapsed since the request was started.
    pub fn elapsed(&self) -> Option<Duration> {
        self.started.map(|v| v.elapsed())
    }

    #[inline]
    pub fn bundle(&self) -> Option<&Bundle> {
        self.bundle.as_ref()
    }

    #[inline]
    pub fn bytes(&self) -> Option<&[u8]> {
        self.bytes.as_ref().map(|v| &v[..])
    }

    #[inline]
    pub fn text(&self) -> Option<&str> {
        self.bytes().and_then(|v| str::from_utf8(v).ok())
    }

    /// Returns the recorded error, if the fetch failed.
    #[inline]
    pub fn error(&self) -> Option<&str> {
        self.error.as_ref().map(|v| v.as_str())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn timeout() {
        let mut request = FetchRequest::new(1);
        request.init("a", "mem://a", RequestParams::raw(Some(Duration::from_millis(0))));

        let now = Instant::now();
        assert!(!request.poll(now));

        request.start(Arc::new(FetchState::new()), now);
        assert!(request.poll(now));
        assert!(request.is_done());
        assert!(request.error().is_some());
        assert!(request.bytes().is_none());

        request.recycle();
        assert_eq!(request.status(), RequestStatus::Idle);
        assert!(request.error().is_none());
        assert_eq!(request.sequence(), 1);
    }

    #[test]
    fn payload_kind() {
        let mut request = FetchRequest::new(1);
        request.init("a", "mem://a", RequestParams::bundle(false));
        request.complete(Ok(Payload::Bytes(vec![1, 2, 3].into_boxed_slice())));
        assert!(request.error().is_some());
        assert!(request.bundle().is_none());

        let mut request = FetchRequest::new(2);
        request.init("a", "mem://a", RequestParams::raw(None));
        request.complete(Ok(Payload::Bytes(b"text".to_vec().into_boxed_slice())));
        assert_eq!(request.text(), Some("text"));
        assert_eq!(request.progress(), 1.0);
    }
}
