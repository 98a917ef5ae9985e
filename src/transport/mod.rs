//! Transport trait — the seam between the pipeline and the wire
//!
//! The pipeline hands a fully prepared request to a `Transport` and gets
//! back either a raw response (any HTTP status) or a transport error
//! (the call never produced a status). `HttpTransport` talks to a real
//! backend over reqwest; `MemoryTransport` is scriptable for tests and
//! single-process use.

use crate::transform::PreparedRequest;
use async_trait::async_trait;
use bytes::Bytes;

pub mod http;
pub mod memory;

/// Decoded body of a raw response
#[derive(Debug, Clone)]
pub enum ResponseBody {
    /// No body
    Empty,
    /// Structured body
    Json(serde_json::Value),
    /// Binary body (undecoded)
    Binary(Bytes),
}

/// Raw result of a transport call that produced an HTTP status
///
/// Success and error statuses both arrive this way; the pipeline decides
/// what counts as success.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Numeric HTTP status
    pub status: u16,

    /// Status text as reported by the backend
    pub status_text: String,

    /// Decoded body
    pub body: ResponseBody,
}

impl RawResponse {
    /// Build a JSON response
    pub fn json(status: u16, status_text: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            body: ResponseBody::Json(body),
        }
    }
}

/// A call that never produced an HTTP status
#[derive(Debug, Clone)]
pub struct TransportError {
    /// URL of the failed call
    pub url: String,

    /// Transport-level description
    pub message: String,

    /// The transport gave up waiting rather than failing to connect
    pub timed_out: bool,
}

impl TransportError {
    /// Connection-level failure
    pub fn connection(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            message: message.into(),
            timed_out: false,
        }
    }

    /// Timeout failure
    pub fn timeout(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            message: "request timed out".to_string(),
            timed_out: true,
        }
    }
}

/// Core trait for transports
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a prepared request; at most one attempt, no retry
    async fn send(&self, request: PreparedRequest) -> Result<RawResponse, TransportError>;

    /// Transport name (e.g. "http", "memory")
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: PreparedRequest) -> Result<RawResponse, TransportError> {
        (**self).send(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Connectivity probe consulted before dispatch
///
/// Mirrors the browser's online/offline signal. The default probe always
/// reports online; tests script it to exercise the fail-fast path.
pub trait ConnectivityProbe: Send + Sync {
    /// Whether the process currently has network connectivity
    fn is_online(&self) -> bool;
}

impl<T: ConnectivityProbe + ?Sized> ConnectivityProbe for std::sync::Arc<T> {
    fn is_online(&self) -> bool {
        (**self).is_online()
    }
}

/// Probe that always reports online
#[derive(Default)]
pub struct AlwaysOnline;

impl ConnectivityProbe for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}

/// Probe backed by a shared flag, for tests and host integration
pub struct SharedProbe {
    online: std::sync::atomic::AtomicBool,
}

impl SharedProbe {
    /// Create a probe with an initial state
    pub fn new(online: bool) -> Self {
        Self {
            online: std::sync::atomic::AtomicBool::new(online),
        }
    }

    /// Update the connectivity state
    pub fn set_online(&self, online: bool) {
        self.online
            .store(online, std::sync::atomic::Ordering::SeqCst);
    }
}

impl ConnectivityProbe for SharedProbe {
    fn is_online(&self) -> bool {
        self.online.load(std::sync::atomic::Ordering::SeqCst)
    }
}
