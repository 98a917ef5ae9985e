//! Request pipeline — every outbound call passes through here
//!
//! `Pipeline::execute` runs the strictly ordered middleware chain:
//! connectivity precheck, path placeholder resolution, sanitizer pass for
//! mutating methods, credential attachment, liveness hooks, transport
//! call, and envelope normalization with classifier-driven side effects.
//! At most one transport attempt per call; retries belong to the caller.
//!
//! `Client` is the high-level entry point: it bundles the configuration
//! and collaborators and hands out entity stores.

use crate::classify::{self, Classification, Failure, FailureBody, SideEffect};
use crate::config::ClientConfig;
use crate::error::{ApiError, FailureKind};
use crate::monitor::LivenessMonitor;
use crate::notify::{DedupNotifier, MemoryNotifier, Notifier};
use crate::session::{CredentialStore, MemoryCredentialStore, MemorySession, SessionEvents};
use crate::store::EntityStore;
use crate::transform::attach;
use crate::transport::{AlwaysOnline, ConnectivityProbe, ResponseBody, Transport};
use crate::types::{is_success_status, Envelope, Request};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// The request-processing pipeline
pub struct Pipeline {
    config: ClientConfig,
    transport: Box<dyn Transport>,
    connectivity: Box<dyn ConnectivityProbe>,
    credentials: Arc<dyn CredentialStore>,
    notifier: DedupNotifier,
    session: Arc<dyn SessionEvents>,
    monitor: LivenessMonitor,
}

impl Pipeline {
    /// Start building a pipeline over a transport
    pub fn builder(config: ClientConfig, transport: impl Transport + 'static) -> PipelineBuilder {
        PipelineBuilder {
            config,
            transport: Box::new(transport),
            connectivity: Box::new(AlwaysOnline),
            credentials: None,
            notifier: None,
            session: None,
        }
    }

    /// The liveness monitor fed by this pipeline's hooks
    pub fn monitor(&self) -> &LivenessMonitor {
        &self.monitor
    }

    /// The credential store consulted on every call
    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    /// Execute one outbound call
    ///
    /// Always resolves to an envelope: failures are classified, their
    /// side effects run, and the result is normalized — never thrown.
    pub async fn execute(&self, request: Request) -> Envelope {
        // 1. Connectivity precheck — fail fast, never dispatched.
        if !self.connectivity.is_online() {
            tracing::warn!(path = %request.path, "Dispatch blocked: offline");
            return self.local_failure(request, classify::offline(), 0).await;
        }

        // 2. Placeholder resolution.
        let (path, params) = match request.resolve_path() {
            Ok(resolved) => resolved,
            Err(name) => {
                let error = ApiError::new(
                    FailureKind::BadRequest,
                    400,
                    format!("unresolved path parameter: {}", name),
                );
                tracing::warn!(path = %request.path, parameter = %name, "Unresolved path placeholder");
                return Envelope::local_failure(request, error, "Bad Request");
            }
        };

        if request.mock {
            return self.execute_mock(request, &path).await;
        }

        // 3. Sanitizer pass for mutating methods.
        if request.method.is_mutating() {
            if let Some(body) = &request.body {
                let verdict = crate::sanitize::inspect_body(body);
                if let Some(pattern) = verdict.pattern {
                    tracing::warn!(path = %path, pattern, "Outbound body flagged");
                    return self
                        .local_failure(request, classify::invalid_input(pattern), 400)
                        .await;
                }
            }
        }

        // 4. URL build + credential attachment.
        let url = match self.build_url(&path, &params, request.use_suffix) {
            Ok(url) => url,
            Err(message) => {
                let error = ApiError::new(FailureKind::BadRequest, 400, message);
                return Envelope::local_failure(request, error, "Bad Request");
            }
        };
        let credential = self.credentials.get();
        let prepared = attach(
            request.method,
            url,
            request.headers.clone(),
            request.body.clone(),
            credential.as_deref(),
        );

        // 5–6. Liveness start hook, then the transport call.
        let id = Uuid::new_v4();
        if request.show_loader {
            self.monitor.request_started(id);
        }
        tracing::debug!(id = %id, method = request.method.as_str(), path = %path, "Dispatching");

        let outcome = self.transport.send(prepared).await;

        // 7. Normalize, classify on failure, run hooks and effects.
        match outcome {
            Ok(raw) if is_success_status(raw.status) => {
                if request.show_loader {
                    self.monitor.request_succeeded(id);
                }
                let status = raw.status;
                let status_text = raw.status_text;
                let data = decode_success_body(raw.body);
                Envelope::success(request, data, status, status_text)
            }
            Ok(raw) => {
                let failure = Failure {
                    status: raw.status,
                    status_text: raw.status_text.clone(),
                    body: match raw.body {
                        ResponseBody::Empty => FailureBody::Empty,
                        ResponseBody::Json(value) => FailureBody::Json(value),
                        ResponseBody::Binary(bytes) => FailureBody::Binary(bytes),
                    },
                    timed_out: false,
                };
                let silent = self.config.is_silent_path(&path);
                let mut classification = classify::classify(&failure, silent);
                if classification.kind == FailureKind::Opaque {
                    classification = classify::reclassify_opaque(&failure, silent).await;
                }
                self.monitor.request_failed(id, classification.kind);
                self.run_effects(&classification.effects).await;

                let error = to_api_error(&classification, failure.status);
                tracing::warn!(
                    id = %id,
                    status = failure.status,
                    kind = ?classification.kind,
                    "Request failed"
                );
                Envelope::failure(request, error, raw.status_text)
            }
            Err(transport_error) => {
                let failure = Failure {
                    status: 0,
                    status_text: String::new(),
                    body: FailureBody::Empty,
                    timed_out: transport_error.timed_out,
                };
                let classification = classify::classify(&failure, false);
                self.monitor.request_failed(id, classification.kind);
                self.run_effects(&classification.effects).await;

                tracing::warn!(
                    id = %id,
                    url = %transport_error.url,
                    error = %transport_error.message,
                    "Transport failure"
                );
                let error = ApiError::new(classification.kind, 0, transport_error.message);
                Envelope::failure(request, error, "")
            }
        }
    }

    /// One-off GET outside any store
    pub async fn get(&self, path: impl Into<String>) -> Envelope {
        self.execute(Request::get(path)).await
    }

    /// One-off POST outside any store
    pub async fn post(&self, path: impl Into<String>, body: serde_json::Value) -> Envelope {
        self.execute(Request::post(path).with_json(body)).await
    }

    /// One-off PUT outside any store
    pub async fn put(&self, path: impl Into<String>, body: serde_json::Value) -> Envelope {
        self.execute(Request::put(path).with_json(body)).await
    }

    /// One-off PATCH outside any store
    pub async fn patch(&self, path: impl Into<String>, body: serde_json::Value) -> Envelope {
        self.execute(Request::patch(path).with_json(body)).await
    }

    /// One-off DELETE outside any store
    pub async fn delete(&self, path: impl Into<String>) -> Envelope {
        self.execute(Request::delete(path)).await
    }

    /// Resolve a mocked request from the static mock-data directory
    ///
    /// Convention: `<mock_dir>/<lastPathSegment>.json`. A missing or
    /// unparsable resource surfaces as a not-found envelope, not a fault.
    async fn execute_mock(&self, request: Request, path: &str) -> Envelope {
        let segment = path.trim_end_matches('/').rsplit('/').next().unwrap_or("");
        let file = Path::new(&self.config.mock_dir).join(format!("{}.json", segment));

        let payload = match tokio::fs::read(&file).await {
            Ok(bytes) => serde_json::from_slice::<serde_json::Value>(&bytes).ok(),
            Err(_) => None,
        };

        match payload {
            Some(data) => {
                tracing::debug!(resource = %segment, "Mock resource resolved");
                Envelope::success(request, data, 200, "OK")
            }
            None => {
                tracing::warn!(resource = %segment, file = %file.display(), "Mock resource missing");
                let error = ApiError::new(
                    FailureKind::ServerError,
                    404,
                    format!("mock resource not found: {}", segment),
                );
                Envelope::failure(request, error, "Not Found")
            }
        }
    }

    /// Build the absolute URL: base + optional suffix + path + query
    fn build_url(
        &self,
        path: &str,
        params: &std::collections::BTreeMap<String, String>,
        use_suffix: bool,
    ) -> Result<String, String> {
        let mut full = self.config.base_url.trim_end_matches('/').to_string();
        if use_suffix {
            if let Some(suffix) = &self.config.env_suffix {
                full.push('/');
                full.push_str(suffix.trim_matches('/'));
            }
        }
        full.push('/');
        full.push_str(path.trim_start_matches('/'));

        let mut url = reqwest::Url::parse(&full).map_err(|e| format!("invalid URL {}: {}", full, e))?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url.to_string())
    }

    /// Wrap a fail-fast classification in a local envelope
    async fn local_failure(
        &self,
        request: Request,
        classification: Classification,
        status: u16,
    ) -> Envelope {
        self.run_effects(&classification.effects).await;
        let error = to_api_error(&classification, status);
        Envelope::local_failure(request, error, "")
    }

    /// Execute declared side effects through the injected collaborators
    async fn run_effects(&self, effects: &[SideEffect]) {
        for effect in effects {
            match effect {
                SideEffect::Notify(request) => self.notifier.notify(request.clone()).await,
                SideEffect::Logout => self.session.logout().await,
            }
        }
    }
}

fn to_api_error(classification: &Classification, status: u16) -> ApiError {
    let mut error = ApiError::new(classification.kind, status, classification.message.clone());
    if let Some(detail) = &classification.detail {
        error = error.with_detail(detail.clone());
    }
    error
}

fn decode_success_body(body: ResponseBody) -> serde_json::Value {
    match body {
        ResponseBody::Json(value) => value,
        ResponseBody::Empty => serde_json::Value::Null,
        // Best-effort: a mislabelled JSON body still decodes, anything
        // else is surfaced as null data on a success envelope.
        ResponseBody::Binary(bytes) => serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null),
    }
}

/// Builder for a pipeline and its collaborators
pub struct PipelineBuilder {
    config: ClientConfig,
    transport: Box<dyn Transport>,
    connectivity: Box<dyn ConnectivityProbe>,
    credentials: Option<Arc<dyn CredentialStore>>,
    notifier: Option<Arc<dyn Notifier>>,
    session: Option<Arc<dyn SessionEvents>>,
}

impl PipelineBuilder {
    /// Use a custom connectivity probe
    pub fn connectivity(mut self, probe: impl ConnectivityProbe + 'static) -> Self {
        self.connectivity = Box::new(probe);
        self
    }

    /// Use a custom credential store
    pub fn credentials(mut self, credentials: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Use a custom notifier (wrapped in the dedup window)
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Use a custom session handler
    pub fn session(mut self, session: Arc<dyn SessionEvents>) -> Self {
        self.session = Some(session);
        self
    }

    /// Assemble the pipeline
    pub fn build(self) -> Pipeline {
        let credentials = self
            .credentials
            .unwrap_or_else(|| Arc::new(MemoryCredentialStore::default()));
        let notifier = self
            .notifier
            .unwrap_or_else(|| Arc::new(MemoryNotifier::default()));
        let session = self
            .session
            .unwrap_or_else(|| Arc::new(MemorySession::new(credentials.clone())));
        let monitor =
            LivenessMonitor::new(self.config.slow_threshold, self.config.clear_debounce);

        Pipeline {
            config: self.config,
            transport: self.transport,
            connectivity: self.connectivity,
            credentials,
            notifier: DedupNotifier::new(notifier),
            session,
            monitor,
        }
    }
}

/// High-level client — bundles a pipeline and hands out entity stores
pub struct Client {
    pipeline: Arc<Pipeline>,
}

impl Client {
    /// Wrap a built pipeline
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    /// The shared pipeline
    pub fn pipeline(&self) -> Arc<Pipeline> {
        self.pipeline.clone()
    }

    /// The liveness monitor
    pub fn monitor(&self) -> &LivenessMonitor {
        self.pipeline.monitor()
    }

    /// Create an entity store reading from `endpoint`
    pub fn store<T>(&self, endpoint: impl Into<String>) -> EntityStore<T>
    where
        T: Clone + Send + Sync + serde::de::DeserializeOwned + 'static,
    {
        EntityStore::new(self.pipeline.clone(), endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory::MemoryTransport;

    fn test_pipeline(transport: MemoryTransport) -> Pipeline {
        Pipeline::builder(ClientConfig::new("https://api.example.com"), transport).build()
    }

    #[tokio::test]
    async fn test_url_includes_suffix_and_query() {
        let transport = MemoryTransport::default();
        let pipeline = Pipeline::builder(
            ClientConfig::new("https://api.example.com/").with_env_suffix("api/v2"),
            transport,
        )
        .build();

        let url = pipeline
            .build_url(
                "users",
                &[("page".to_string(), "2".to_string())].into_iter().collect(),
                true,
            )
            .unwrap();
        assert_eq!(url, "https://api.example.com/api/v2/users?page=2");
    }

    #[tokio::test]
    async fn test_url_without_suffix() {
        let transport = MemoryTransport::default();
        let pipeline = Pipeline::builder(
            ClientConfig::new("https://api.example.com").with_env_suffix("api/v2"),
            transport,
        )
        .build();

        let url = pipeline
            .build_url("health", &Default::default(), false)
            .unwrap();
        assert_eq!(url, "https://api.example.com/health");
    }

    #[tokio::test]
    async fn test_success_envelope() {
        let transport = MemoryTransport::default();
        transport.enqueue_json(200, serde_json::json!({"id": "1"}));
        let pipeline = test_pipeline(transport);

        let envelope = pipeline.get("users").await;
        assert!(envelope.header.success);
        assert_eq!(envelope.data.unwrap()["id"], "1");
        assert!(envelope.error.is_none());
    }

    #[tokio::test]
    async fn test_placeholder_failure_is_local() {
        let transport = MemoryTransport::default();
        let pipeline = test_pipeline(transport);

        let envelope = pipeline.execute(Request::get("users/:id")).await;
        assert!(envelope.local);
        assert_eq!(envelope.header.status, 400);
        assert_eq!(envelope.error.unwrap().kind, FailureKind::BadRequest);
    }
}
