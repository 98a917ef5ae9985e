//! Generic entity store — a four-state container over the pipeline
//!
//! One store instance owns the state for one entity type: last payload,
//! last envelope, loading flag, last error, and whether at least one
//! fetch has succeeded since the last reset. Observers subscribe through
//! a watch channel; the status (`Idle`/`Loading`/`Ready`/`Error`) is
//! derived from the field combination, never stored.
//!
//! Concurrent `fetch`/`submit` calls are fenced: each call takes a
//! monotonically increasing generation and a completion whose generation
//! is no longer the latest is discarded instead of applied.

use crate::error::{ApiError, FailureKind};
use crate::pipeline::Pipeline;
use crate::types::{Envelope, Request};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Observable state of one entity store
#[derive(Debug, Clone)]
pub struct EntityState<T> {
    /// Last known payload, or the configured initial value
    pub data: Option<T>,

    /// Last envelope that was applied, success or failure
    pub response: Option<Envelope>,

    /// A fetch or submit is in flight
    pub loading: bool,

    /// Last failure, cleared when a new call starts
    pub error: Option<ApiError>,

    /// At least one fetch succeeded since the last reset
    pub initialised: bool,
}

/// Lifecycle status derived from the state fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStatus {
    Idle,
    Loading,
    Ready,
    Error,
}

impl<T> EntityState<T> {
    /// Derive the lifecycle status
    ///
    /// A store whose configured initial value is `Some` reports `Ready`
    /// as soon as any data is present.
    pub fn status(&self) -> StoreStatus {
        if self.loading {
            StoreStatus::Loading
        } else if self.error.is_some() {
            StoreStatus::Error
        } else if self.initialised || self.data.is_some() {
            StoreStatus::Ready
        } else {
            StoreStatus::Idle
        }
    }
}

/// Generic per-entity-type state container built on the pipeline
pub struct EntityStore<T> {
    pipeline: Arc<Pipeline>,
    read_endpoint: String,
    create_endpoint: Option<String>,
    initial: Option<T>,
    state: watch::Sender<EntityState<T>>,
    generation: AtomicU64,
}

impl<T> EntityStore<T>
where
    T: Clone + Send + Sync + DeserializeOwned + 'static,
{
    /// Create a store reading from `read_endpoint`
    pub fn new(pipeline: Arc<Pipeline>, read_endpoint: impl Into<String>) -> Self {
        let (state, _) = watch::channel(EntityState {
            data: None,
            response: None,
            loading: false,
            error: None,
            initialised: false,
        });
        Self {
            pipeline,
            read_endpoint: read_endpoint.into(),
            create_endpoint: None,
            initial: None,
            state,
            generation: AtomicU64::new(0),
        }
    }

    /// Use a distinct endpoint for `submit`
    pub fn with_create_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.create_endpoint = Some(endpoint.into());
        self
    }

    /// Configure the value `data` resets to
    pub fn with_initial(mut self, initial: T) -> Self {
        self.initial = Some(initial.clone());
        self.state.send_modify(|state| state.data = Some(initial));
        self
    }

    /// Observe state changes
    pub fn subscribe(&self) -> watch::Receiver<EntityState<T>> {
        self.state.subscribe()
    }

    /// Current state
    pub fn snapshot(&self) -> EntityState<T> {
        self.state.borrow().clone()
    }

    /// Fetch the entity from the read endpoint
    ///
    /// Resets the state before dispatch (no stale data is shown as fresh)
    /// and applies exactly one terminal update — unless a later call was
    /// issued meanwhile, in which case this call's result is discarded.
    pub async fn fetch(&self, params: &[(&str, &str)]) -> Envelope {
        let mut request = Request::get(&self.read_endpoint);
        for (key, value) in params {
            request = request.with_param(*key, *value);
        }
        self.run(request).await
    }

    /// Submit a body to the create endpoint (or the read endpoint)
    pub async fn submit(&self, body: serde_json::Value, params: &[(&str, &str)]) -> Envelope {
        let endpoint = self
            .create_endpoint
            .as_deref()
            .unwrap_or(&self.read_endpoint);
        let mut request = Request::post(endpoint).with_json(body);
        for (key, value) in params {
            request = request.with_param(*key, *value);
        }
        self.run(request).await
    }

    /// Install an authoritative value without a network call
    ///
    /// Used when the caller already holds fresh data (e.g. after an edit
    /// confirmed by a different call). Clears any error, does not touch
    /// `initialised`.
    pub fn set_local(&self, value: T) {
        self.state.send_modify(|state| {
            state.data = Some(value);
            state.loading = false;
            state.error = None;
        });
    }

    /// Discard data, response, and error — back to idle
    ///
    /// A no-op on an already idle store. An in-flight call's result is
    /// discarded when it lands.
    pub fn reset(&self) {
        {
            let state = self.state.borrow();
            // Locally-set data makes the store Ready, so it must be cleared.
            if state.status() == StoreStatus::Idle && state.response.is_none() {
                return;
            }
        }

        // Invalidate any in-flight completion.
        self.generation.fetch_add(1, Ordering::SeqCst);
        let initial = self.initial.clone();
        self.state.send_modify(|state| {
            state.data = initial;
            state.response = None;
            state.loading = false;
            state.error = None;
            state.initialised = false;
        });
        tracing::debug!(endpoint = %self.read_endpoint, "Store reset");
    }

    async fn run(&self, request: Request) -> Envelope {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let initial = self.initial.clone();
        self.state.send_modify(|state| {
            state.data = initial;
            state.response = None;
            state.loading = true;
            state.error = None;
            state.initialised = false;
        });

        let envelope = self.pipeline.execute(request).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(
                endpoint = %self.read_endpoint,
                generation,
                "Stale completion discarded"
            );
            return envelope;
        }

        self.apply(envelope.clone());
        envelope
    }

    fn apply(&self, envelope: Envelope) {
        if envelope.header.success {
            let decoded = envelope
                .data
                .clone()
                .map(|value| serde_json::from_value::<T>(value));

            match decoded {
                Some(Ok(data)) => {
                    self.state.send_modify(|state| {
                        state.data = Some(data);
                        state.response = Some(envelope);
                        state.loading = false;
                        state.error = None;
                        state.initialised = true;
                    });
                }
                // A success envelope whose body doesn't match the declared
                // payload type is a failure from the store's point of view.
                _ => {
                    let error = ApiError::new(
                        FailureKind::Opaque,
                        envelope.header.status,
                        "response body did not match the expected shape",
                    );
                    let initial = self.initial.clone();
                    self.state.send_modify(|state| {
                        state.data = initial;
                        state.response = Some(envelope);
                        state.loading = false;
                        state.error = Some(error);
                        state.initialised = false;
                    });
                }
            }
        } else {
            let error = envelope.error.clone().unwrap_or_else(|| {
                ApiError::new(
                    FailureKind::ServerError,
                    envelope.header.status,
                    "request failed",
                )
            });
            let initial = self.initial.clone();
            self.state.send_modify(|state| {
                state.data = initial;
                state.response = Some(envelope);
                state.loading = false;
                state.error = Some(error);
                state.initialised = false;
            });
        }
    }
}
