//! Error classifier — failure taxonomy and declared side effects
//!
//! `classify` is a pure mapping from a transport/HTTP failure to a
//! `FailureKind` plus declarative side effects. Executing the effects
//! (notifying the user, tearing the session down) is the pipeline's job,
//! through its injected collaborators.

use crate::error::FailureKind;
use crate::notify::NotificationRequest;
use bytes::Bytes;

/// Decoded body of a failed call
#[derive(Debug, Clone)]
pub enum FailureBody {
    /// No body
    Empty,
    /// Structured body
    Json(serde_json::Value),
    /// Undecoded binary blob
    Binary(Bytes),
}

/// A failed call, before classification
#[derive(Debug, Clone)]
pub struct Failure {
    /// HTTP status, 0 for connection-level failures
    pub status: u16,

    /// Status text as reported by the backend
    pub status_text: String,

    /// Failure body
    pub body: FailureBody,

    /// The transport gave up waiting rather than failing to connect
    pub timed_out: bool,
}

/// Effects the classifier asks the pipeline to execute
#[derive(Debug, Clone)]
pub enum SideEffect {
    /// Show a notification to the user
    Notify(NotificationRequest),
    /// Tear the session down (logout + downstream navigation)
    Logout,
}

/// Result of classifying a failure
#[derive(Debug, Clone)]
pub struct Classification {
    /// Taxonomy kind
    pub kind: FailureKind,

    /// Human-readable message (server-supplied where available)
    pub message: String,

    /// Decoded failure body to carry into the envelope
    pub detail: Option<serde_json::Value>,

    /// Effects to execute, in order
    pub effects: Vec<SideEffect>,
}

const GENERIC_FAILURE: &str = "The request could not be completed";

/// Classify a failure into a kind, message, and side effects
///
/// `silent` suppresses the server-error notification for endpoints on
/// the configured silent-failure list. Binary bodies classify as
/// `Opaque`; run `reclassify_opaque` to decode them best-effort.
pub fn classify(failure: &Failure, silent: bool) -> Classification {
    if let FailureBody::Binary(_) = failure.body {
        return Classification {
            kind: FailureKind::Opaque,
            message: GENERIC_FAILURE.to_string(),
            detail: None,
            effects: Vec::new(),
        };
    }

    let message = server_message(failure);
    let detail = match &failure.body {
        FailureBody::Json(value) => Some(value.clone()),
        _ => None,
    };

    if failure.timed_out {
        // The monitor owns slow-backend messaging; no notification here.
        return Classification {
            kind: FailureKind::Timeout,
            message,
            detail,
            effects: Vec::new(),
        };
    }

    match failure.status {
        0 => Classification {
            kind: FailureKind::ConnectionUnavailable,
            message,
            detail,
            effects: Vec::new(),
        },
        400 => Classification {
            kind: FailureKind::BadRequest,
            effects: vec![SideEffect::Notify(NotificationRequest::error(
                "Request rejected",
                message.clone(),
            ))],
            message,
            detail,
        },
        401 => Classification {
            kind: FailureKind::Unauthorized,
            effects: vec![
                SideEffect::Notify(NotificationRequest::error(
                    "Session expired",
                    message.clone(),
                )),
                SideEffect::Logout,
            ],
            message,
            detail,
        },
        _ => {
            let mut effects = Vec::new();
            if !silent {
                effects.push(SideEffect::Notify(NotificationRequest::error(
                    "Request failed",
                    message.clone(),
                )));
            }
            Classification {
                kind: FailureKind::ServerError,
                message,
                detail,
                effects,
            }
        }
    }
}

/// Classification for a call blocked by the connectivity precheck
pub fn offline() -> Classification {
    Classification {
        kind: FailureKind::Offline,
        message: "No network connection".to_string(),
        detail: None,
        effects: Vec::new(),
    }
}

/// Classification for a body the sanitizer flagged
pub fn invalid_input(pattern: &str) -> Classification {
    let message = format!("Input rejected: {}", pattern);
    Classification {
        kind: FailureKind::InvalidInput,
        effects: vec![SideEffect::Notify(NotificationRequest::warning(
            "Invalid input",
            message.clone(),
        ))],
        message,
        detail: None,
    }
}

/// Decode a binary failure body and classify the result
///
/// Best-effort text → JSON decode; an undecodable body surfaces the
/// original opaque classification instead of hiding the failure.
pub async fn reclassify_opaque(failure: &Failure, silent: bool) -> Classification {
    let FailureBody::Binary(raw) = &failure.body else {
        return classify(failure, silent);
    };

    let decoded = std::str::from_utf8(raw)
        .ok()
        .and_then(|text| serde_json::from_str::<serde_json::Value>(text).ok());

    match decoded {
        Some(value) => {
            let decoded_failure = Failure {
                body: FailureBody::Json(value),
                ..failure.clone()
            };
            classify(&decoded_failure, silent)
        }
        None => {
            tracing::debug!(
                status = failure.status,
                "Opaque failure body could not be decoded"
            );
            classify(failure, silent)
        }
    }
}

/// Pull a message out of a failure body, falling back to status text
fn server_message(failure: &Failure) -> String {
    if let FailureBody::Json(value) = &failure.body {
        for key in ["message", "error", "detail"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                if !text.is_empty() {
                    return text.to_string();
                }
            }
        }
    }
    if !failure.status_text.is_empty() {
        return failure.status_text.clone();
    }
    GENERIC_FAILURE.to_string()
}
