//! Session collaborators — credential storage and teardown
//!
//! The pipeline reads credentials through `CredentialStore` and reports
//! session-invalidating failures through `SessionEvents`. Both are seams:
//! browsers back them with persistent storage and navigation, tests and
//! single-process use get the in-memory implementations.

use async_trait::async_trait;
use std::sync::RwLock;

/// Trait for persisted credential storage
///
/// Holds at most one credential. Presence of a credential doubles as the
/// "is authenticated" marker. No token refresh protocol is in scope.
pub trait CredentialStore: Send + Sync {
    /// Current credential, if any
    fn get(&self) -> Option<String>;

    /// Store a credential
    fn set(&self, credential: String);

    /// Remove the stored credential
    fn remove(&self);
}

/// Trait for session lifecycle side effects
///
/// `logout` is invoked for every session-invalidating failure (HTTP 401),
/// independent of whether the calling code observes the error itself.
/// Implementations typically clear credentials and navigate away.
#[async_trait]
pub trait SessionEvents: Send + Sync {
    /// Tear the session down
    async fn logout(&self);
}

/// In-memory credential store for testing and single-process use
#[derive(Default)]
pub struct MemoryCredentialStore {
    credential: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    /// Create a store pre-loaded with a credential
    pub fn with_credential(credential: impl Into<String>) -> Self {
        Self {
            credential: RwLock::new(Some(credential.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<String> {
        self.credential.read().ok().and_then(|c| c.clone())
    }

    fn set(&self, credential: String) {
        if let Ok(mut slot) = self.credential.write() {
            *slot = Some(credential);
        }
    }

    fn remove(&self) {
        if let Ok(mut slot) = self.credential.write() {
            *slot = None;
        }
    }
}

/// Session handler that clears a credential store on logout
///
/// Counts logouts so tests can assert the side effect fired.
pub struct MemorySession {
    credentials: std::sync::Arc<dyn CredentialStore>,
    logouts: std::sync::atomic::AtomicUsize,
}

impl MemorySession {
    /// Create a session handler over a credential store
    pub fn new(credentials: std::sync::Arc<dyn CredentialStore>) -> Self {
        Self {
            credentials,
            logouts: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Number of logouts performed
    pub fn logout_count(&self) -> usize {
        self.logouts.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionEvents for MemorySession {
    async fn logout(&self) {
        self.credentials.remove();
        self.logouts
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        tracing::info!("Session torn down");
    }
}
