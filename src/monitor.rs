//! Startup/liveness monitor — cold-backend detection
//!
//! Tracks in-flight request ids and their start times. A request still
//! pending after the slow threshold flips `backend_slow` on; once nothing
//! is pending the flag clears after a short debounce so back-to-back
//! requests don't make it flicker. Process-lifetime and re-enterable —
//! there is no terminal state.
//!
//! The pending map is shared process-wide state, mutated only through
//! the start/end hooks the pipeline calls.

use crate::error::FailureKind;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use uuid::Uuid;

/// Monitors pending requests to detect a slow or cold backend
pub struct LivenessMonitor {
    /// Pending request id → start time
    pending: Arc<Mutex<HashMap<Uuid, Instant>>>,

    /// Current `backend_slow` value, observable via `subscribe`
    slow: Arc<watch::Sender<bool>>,

    /// Pending age after which the backend counts as slow
    threshold: Duration,

    /// Quiet period before the flag clears once nothing is pending
    debounce: Duration,
}

impl LivenessMonitor {
    /// Create a monitor with explicit timings
    pub fn new(threshold: Duration, debounce: Duration) -> Self {
        let (slow, _) = watch::channel(false);
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            slow: Arc::new(slow),
            threshold,
            debounce,
        }
    }

    /// Observe `backend_slow` transitions
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.slow.subscribe()
    }

    /// Current `backend_slow` value
    pub fn is_slow(&self) -> bool {
        *self.slow.borrow()
    }

    /// Number of requests currently pending
    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Record a request dispatch and arm its slow check
    ///
    /// The check fires at start + threshold and flips the flag on iff the
    /// id is still pending at that point, which yields at most one signal
    /// per stretch of pending entries.
    pub fn request_started(&self, id: Uuid) {
        let started = Instant::now();
        if let Ok(mut pending) = self.pending.lock() {
            pending.insert(id, started);
        }

        let pending = self.pending.clone();
        let slow = self.slow.clone();
        // Deadline anchored at dispatch, not at the task's first poll.
        let deadline = started + self.threshold;
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let still_pending = pending.lock().map(|p| p.contains_key(&id)).unwrap_or(false);
            if still_pending {
                set_flag(&slow, true, "pending request exceeded slow threshold");
            }
        });
    }

    /// Record a successful completion
    ///
    /// When the last pending request finishes, the flag clears after the
    /// debounce — unless a new request starts inside the window.
    pub fn request_succeeded(&self, id: Uuid) {
        let now_empty = self.remove(id);
        if !now_empty {
            return;
        }

        let pending = self.pending.clone();
        let slow = self.slow.clone();
        let deadline = Instant::now() + self.debounce;
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let still_empty = pending.lock().map(|p| p.is_empty()).unwrap_or(false);
            if still_empty {
                set_flag(&slow, false, "no pending requests");
            }
        });
    }

    /// Record a failed completion
    ///
    /// Connection-level and timeout failures flip the flag on immediately,
    /// regardless of how many requests remain pending. Other failures only
    /// release the pending entry — a responding backend clears the flag
    /// through the success path.
    pub fn request_failed(&self, id: Uuid, kind: FailureKind) {
        self.remove(id);
        if matches!(
            kind,
            FailureKind::ConnectionUnavailable | FailureKind::Timeout
        ) {
            set_flag(&self.slow, true, "connection-level failure");
        }
    }

    /// User-acknowledged override — force the flag off
    pub fn dismiss(&self) {
        set_flag(&self.slow, false, "dismissed");
    }

    /// Remove a pending entry; returns whether the map is now empty
    fn remove(&self, id: Uuid) -> bool {
        match self.pending.lock() {
            Ok(mut pending) => {
                pending.remove(&id);
                pending.is_empty()
            }
            Err(_) => false,
        }
    }
}

impl Default for LivenessMonitor {
    fn default() -> Self {
        Self::new(Duration::from_millis(5000), Duration::from_millis(500))
    }
}

fn set_flag(slow: &watch::Sender<bool>, value: bool, reason: &str) {
    let changed = slow.send_if_modified(|current| {
        if *current == value {
            false
        } else {
            *current = value;
            true
        }
    });
    if changed {
        tracing::info!(backend_slow = value, reason, "Liveness state changed");
    }
}
