//! User notification requests
//!
//! The pipeline emits notification *requests*; rendering is external.
//! `DedupNotifier` applies the caller-side duplicate suppression window
//! before delegating to the real renderer.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Screen placement hint for the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    TopLeft,
    #[default]
    TopRight,
    BottomLeft,
    BottomRight,
}

/// A request to show a notification to the user
#[derive(Debug, Clone)]
pub struct NotificationRequest {
    /// Severity (maps to the renderer's visual kind)
    pub severity: Severity,

    /// Terse headline
    pub summary: String,

    /// Longer detail text (often server-supplied)
    pub detail: String,

    /// Placement hint
    pub placement: Placement,
}

impl NotificationRequest {
    /// Create an error notification with default placement
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            placement: Placement::default(),
        }
    }

    /// Create a warning notification with default placement
    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            placement: Placement::default(),
        }
    }
}

/// Trait for notification renderers
///
/// Fire-and-forget: implementations must not fail the calling pipeline.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Request a notification
    async fn notify(&self, request: NotificationRequest);
}

/// Duplicate-suppressing wrapper around a notifier
///
/// Suppresses a notification when one with the same severity and detail
/// was delivered within the window (3 s by default). Suppression lives
/// on the emitting side by contract — renderers stay dumb.
pub struct DedupNotifier {
    inner: std::sync::Arc<dyn Notifier>,
    window: Duration,
    recent: Mutex<HashMap<(Severity, String), Instant>>,
}

impl DedupNotifier {
    /// Wrap a notifier with the default 3-second window
    pub fn new(inner: std::sync::Arc<dyn Notifier>) -> Self {
        Self::with_window(inner, Duration::from_secs(3))
    }

    /// Wrap a notifier with an explicit window
    pub fn with_window(inner: std::sync::Arc<dyn Notifier>, window: Duration) -> Self {
        Self {
            inner,
            window,
            recent: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl Notifier for DedupNotifier {
    async fn notify(&self, request: NotificationRequest) {
        let key = (request.severity, request.detail.clone());
        let now = Instant::now();

        {
            let mut recent = self.recent.lock().await;
            if let Some(last) = recent.get(&key) {
                if now.duration_since(*last) < self.window {
                    tracing::debug!(detail = %request.detail, "Duplicate notification suppressed");
                    return;
                }
            }
            recent.insert(key, now);
            recent.retain(|_, last| now.duration_since(*last) < self.window);
        }

        self.inner.notify(request).await;
    }
}

/// In-memory notifier for testing — records every delivered request
#[derive(Default)]
pub struct MemoryNotifier {
    delivered: Mutex<Vec<NotificationRequest>>,
}

impl MemoryNotifier {
    /// Requests delivered so far
    pub async fn delivered(&self) -> Vec<NotificationRequest> {
        self.delivered.lock().await.clone()
    }

    /// Number of requests delivered
    pub async fn count(&self) -> usize {
        self.delivered.lock().await.len()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn notify(&self, request: NotificationRequest) {
        tracing::debug!(
            severity = ?request.severity,
            summary = %request.summary,
            "Notification requested"
        );
        self.delivered.lock().await.push(request);
    }
}
