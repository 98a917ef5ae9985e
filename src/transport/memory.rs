//! In-memory transport for testing and single-process use
//!
//! Responses are scripted ahead of time and consumed in order; every
//! prepared request is recorded so tests can assert on what went out.
//! An optional per-response delay makes completion-order scenarios
//! reproducible under a paused clock.

use crate::transform::PreparedRequest;
use crate::transport::{RawResponse, ResponseBody, Transport, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

struct Scripted {
    result: Result<RawResponse, TransportError>,
    delay: Duration,
}

/// Scriptable transport
///
/// An exhausted script answers `200 {}` so incidental calls in a test
/// don't need explicit entries.
#[derive(Default)]
pub struct MemoryTransport {
    script: Mutex<VecDeque<Scripted>>,
    sent: Mutex<Vec<PreparedRequest>>,
}

impl MemoryTransport {
    /// Queue a JSON response
    pub fn enqueue_json(&self, status: u16, body: serde_json::Value) {
        self.enqueue_json_delayed(status, body, Duration::ZERO);
    }

    /// Queue a JSON response that completes after a delay
    pub fn enqueue_json_delayed(&self, status: u16, body: serde_json::Value, delay: Duration) {
        self.push(Scripted {
            result: Ok(RawResponse {
                status,
                status_text: status_text_for(status).to_string(),
                body: ResponseBody::Json(body),
            }),
            delay,
        });
    }

    /// Queue a full raw response
    pub fn enqueue_response(&self, response: RawResponse) {
        self.push(Scripted {
            result: Ok(response),
            delay: Duration::ZERO,
        });
    }

    /// Queue a transport error
    pub fn enqueue_error(&self, error: TransportError) {
        self.push(Scripted {
            result: Err(error),
            delay: Duration::ZERO,
        });
    }

    /// Requests sent so far, in dispatch order
    pub fn sent(&self) -> Vec<PreparedRequest> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Number of requests sent
    pub fn sent_count(&self) -> usize {
        self.sent.lock().map(|s| s.len()).unwrap_or(0)
    }

    fn push(&self, scripted: Scripted) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(scripted);
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, request: PreparedRequest) -> Result<RawResponse, TransportError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(request);
        }

        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match next {
            Some(scripted) => {
                if !scripted.delay.is_zero() {
                    tokio::time::sleep(scripted.delay).await;
                }
                scripted.result
            }
            None => Ok(RawResponse::json(200, "OK", serde_json::json!({}))),
        }
    }

    fn name(&self) -> &str {
        "memory"
    }
}

fn status_text_for(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        300 => "Multiple Choices",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        404 => "Not Found",
        409 => "Conflict",
        500 => "Internal Server Error",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::attach;
    use crate::types::Method;
    use std::collections::BTreeMap;

    fn prepared(url: &str) -> PreparedRequest {
        attach(Method::Get, url.to_string(), BTreeMap::new(), None, None)
    }

    #[tokio::test]
    async fn test_scripted_responses_in_order() {
        let transport = MemoryTransport::default();
        transport.enqueue_json(200, serde_json::json!({"n": 1}));
        transport.enqueue_json(500, serde_json::json!({"n": 2}));

        let first = transport.send(prepared("https://t/a")).await.unwrap();
        let second = transport.send(prepared("https://t/b")).await.unwrap();

        assert_eq!(first.status, 200);
        assert_eq!(second.status, 500);
        assert_eq!(second.status_text, "Internal Server Error");
    }

    #[tokio::test]
    async fn test_exhausted_script_defaults_ok() {
        let transport = MemoryTransport::default();
        let response = transport.send(prepared("https://t/a")).await.unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_requests_recorded() {
        let transport = MemoryTransport::default();
        transport.send(prepared("https://t/a")).await.unwrap();
        transport.send(prepared("https://t/b")).await.unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].url, "https://t/a");
        assert_eq!(sent[1].url, "https://t/b");
    }

    #[tokio::test]
    async fn test_scripted_error() {
        let transport = MemoryTransport::default();
        transport.enqueue_error(TransportError::connection("https://t/a", "refused"));

        let result = transport.send(prepared("https://t/a")).await;
        assert!(result.unwrap_err().message.contains("refused"));
    }
}
