//! Error types for entity-client

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a failed pipeline call
///
/// Every failure that leaves the pipeline carries exactly one kind.
/// The kind drives side effects (notification, session teardown) and
/// lets callers react without inspecting status codes themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    /// No network connectivity at dispatch time — never dispatched
    Offline,
    /// The sanitizer flagged the outbound body — never dispatched
    InvalidInput,
    /// Transport-level failure, no HTTP status (status 0)
    ConnectionUnavailable,
    /// HTTP 400
    BadRequest,
    /// HTTP 401 — always tears the session down
    Unauthorized,
    /// HTTP 402/404/409/500 and any other error status
    ServerError,
    /// Failure body was an undecoded binary blob
    Opaque,
    /// Request never completed within the transport's limits
    Timeout,
}

/// A failed pipeline call, carried inside the response envelope
///
/// `status` is 0 for failures that never reached the backend.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("{kind:?} (status {status}): {message}")]
pub struct ApiError {
    /// Failure classification
    pub kind: FailureKind,

    /// HTTP status, or 0 when the call never reached the backend
    pub status: u16,

    /// Human-readable message (server-supplied where available)
    pub message: String,

    /// Decoded failure body, if the server sent one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

impl ApiError {
    /// Create an error with no body detail
    pub fn new(kind: FailureKind, status: u16, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
            detail: None,
        }
    }

    /// Attach a decoded failure body
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::new(FailureKind::Unauthorized, 401, "session expired");
        let rendered = err.to_string();
        assert!(rendered.contains("Unauthorized"));
        assert!(rendered.contains("401"));
        assert!(rendered.contains("session expired"));
    }

    #[test]
    fn test_error_serialization() {
        let err = ApiError::new(FailureKind::ServerError, 500, "boom")
            .with_detail(serde_json::json!({"message": "boom"}));

        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"kind\":\"serverError\""));
        assert!(json.contains("\"status\":500"));

        let parsed: ApiError = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.kind, FailureKind::ServerError);
        assert_eq!(parsed.detail.unwrap()["message"], "boom");
    }

    #[test]
    fn test_detail_skipped_when_absent() {
        let err = ApiError::new(FailureKind::Offline, 0, "offline");
        let json = serde_json::to_string(&err).unwrap();
        assert!(!json.contains("detail"));
    }
}
