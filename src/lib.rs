//! # entity-client
//!
//! Typed entity stores and a middleware request pipeline for HTTP backends.
//!
//! ## Overview
//!
//! `entity-client` is the data layer of a client application: every
//! outbound call runs through one pipeline (input sanitization,
//! credential injection, error classification, slow-backend detection)
//! and resolves to a normalized envelope; per-entity state lives in
//! generic stores with a four-state lifecycle observers can subscribe to.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use entity_client::{Client, ClientConfig, HttpTransport, Pipeline};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Clone, Deserialize)]
//! struct User { id: String, name: String }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::new("https://api.example.com").with_env_suffix("api/v2");
//! let client = Client::new(Pipeline::builder(config, HttpTransport::new()?).build());
//!
//! // A typed store over one entity endpoint
//! let users = client.store::<User>("users");
//! users.fetch(&[("page", "1")]).await;
//!
//! println!("loading: {}", users.snapshot().loading);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **Pipeline** — runs the ordered middleware chain around every call
//! - **EntityStore** — generic reactive state container per entity type
//! - **Transport** trait — wire seam (`HttpTransport`, `MemoryTransport`)
//! - **LivenessMonitor** — pending-request tracking for cold backends
//! - **classify** — pure failure taxonomy with declarative side effects
//! - **sanitize** — heuristic injection classifier for outbound payloads

pub mod classify;
pub mod config;
pub mod error;
pub mod monitor;
pub mod notify;
pub mod pipeline;
pub mod sanitize;
pub mod session;
pub mod store;
pub mod transform;
pub mod transport;
pub mod types;

// Re-export core types
pub use config::ClientConfig;
pub use error::{ApiError, FailureKind, Result};
pub use monitor::LivenessMonitor;
pub use notify::{NotificationRequest, Notifier, Placement, Severity};
pub use pipeline::{Client, Pipeline, PipelineBuilder};
pub use session::{CredentialStore, SessionEvents};
pub use store::{EntityState, EntityStore, StoreStatus};
pub use transform::PreparedRequest;
pub use transport::{ConnectivityProbe, RawResponse, Transport, TransportError};
pub use types::{Body, Envelope, FormData, Method, Request, ResponseHeader};

// Re-export transports and in-memory collaborators for convenience
pub use notify::{DedupNotifier, MemoryNotifier};
pub use session::{MemoryCredentialStore, MemorySession};
pub use transport::http::HttpTransport;
pub use transport::memory::MemoryTransport;
pub use transport::{AlwaysOnline, SharedProbe};
