//! Pipeline integration tests
//!
//! End-to-end tests exercising the full middleware chain over the
//! in-memory transport: fail-fast paths, credential attachment, error
//! classification with side effects, liveness hooks, mock-mode
//! resolution, and notification dedup.

use entity_client::{
    Client, ClientConfig, FailureKind, MemoryCredentialStore, MemoryNotifier, MemorySession,
    MemoryTransport, Pipeline, Request, Severity, SharedProbe,
};
use entity_client::session::CredentialStore;
use std::sync::Arc;

struct Harness {
    transport: Arc<MemoryTransport>,
    notifier: Arc<MemoryNotifier>,
    session: Arc<MemorySession>,
    credentials: Arc<MemoryCredentialStore>,
    probe: Arc<SharedProbe>,
    client: Client,
}

fn harness_with(config: ClientConfig) -> Harness {
    let transport = Arc::new(MemoryTransport::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let credentials = Arc::new(MemoryCredentialStore::default());
    let session = Arc::new(MemorySession::new(credentials.clone()));
    let probe = Arc::new(SharedProbe::new(true));

    let pipeline = Pipeline::builder(config, transport.clone())
        .connectivity(probe.clone())
        .credentials(credentials.clone())
        .notifier(notifier.clone())
        .session(session.clone())
        .build();

    Harness {
        transport,
        notifier,
        session,
        credentials,
        probe,
        client: Client::new(pipeline),
    }
}

fn harness() -> Harness {
    harness_with(ClientConfig::new("https://api.example.com"))
}

// ─── Envelope normalization ──────────────────────────────────────

#[tokio::test]
async fn test_success_only_for_expected_statuses() {
    for (status, expect_success) in [
        (200, true),
        (201, true),
        (300, true),
        (204, false),
        (400, false),
        (500, false),
    ] {
        let h = harness();
        h.transport.enqueue_json(status, serde_json::json!({}));

        let envelope = h.client.pipeline().get("users").await;
        assert_eq!(
            envelope.header.success, expect_success,
            "status {}",
            status
        );
        assert_eq!(envelope.header.status, status);
        assert_eq!(envelope.error.is_none(), expect_success);
    }
}

#[tokio::test]
async fn test_envelope_shape_identical_on_failure() {
    let h = harness();
    h.transport
        .enqueue_json(500, serde_json::json!({"message": "boom"}));

    let envelope = h.client.pipeline().get("users").await;
    assert!(envelope.data.is_none());
    assert!(!envelope.local);
    let error = envelope.error.unwrap();
    assert_eq!(error.kind, FailureKind::ServerError);
    assert_eq!(error.message, "boom");
    assert_eq!(error.detail.unwrap()["message"], "boom");
}

// ─── Fail-fast paths ─────────────────────────────────────────────

#[tokio::test]
async fn test_offline_precheck_never_dispatches() {
    let h = harness();
    h.probe.set_online(false);

    let envelope = h.client.pipeline().get("users").await;

    assert!(envelope.local);
    assert_eq!(envelope.header.status, 0);
    assert_eq!(envelope.error.unwrap().kind, FailureKind::Offline);
    assert_eq!(h.transport.sent_count(), 0);
}

#[tokio::test]
async fn test_flagged_body_never_dispatches() {
    let h = harness();

    let envelope = h
        .client
        .pipeline()
        .post(
            "comments",
            serde_json::json!({"text": "<script>document.cookie</script>"}),
        )
        .await;

    assert!(envelope.local);
    assert_eq!(envelope.header.status, 400);
    assert_eq!(envelope.error.unwrap().kind, FailureKind::InvalidInput);
    assert_eq!(h.transport.sent_count(), 0);

    let delivered = h.notifier.delivered().await;
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].severity, Severity::Warning);
}

#[tokio::test]
async fn test_clean_get_skips_sanitizer() {
    // GET carries no body; a flagged query value is not the sanitizer's
    // concern on non-mutating methods.
    let h = harness();
    h.transport.enqueue_json(200, serde_json::json!({}));

    let envelope = h
        .client
        .pipeline()
        .execute(Request::get("search").with_param("q", "eval(x)"))
        .await;
    assert!(envelope.header.success);
    assert_eq!(h.transport.sent_count(), 1);
}

// ─── Placeholder resolution & URL building ───────────────────────

#[tokio::test]
async fn test_placeholder_resolved_and_removed_from_query() {
    let h = harness();
    h.transport.enqueue_json(200, serde_json::json!({}));

    h.client
        .pipeline()
        .execute(
            Request::get("users/:id/roles")
                .with_param("id", "42")
                .with_param("page", "2"),
        )
        .await;

    let sent = h.transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].url,
        "https://api.example.com/users/42/roles?page=2"
    );
}

#[tokio::test]
async fn test_env_suffix_applied_per_request_flag() {
    let h = harness_with(
        ClientConfig::new("https://api.example.com").with_env_suffix("api/v2"),
    );
    h.transport.enqueue_json(200, serde_json::json!({}));
    h.transport.enqueue_json(200, serde_json::json!({}));

    h.client.pipeline().execute(Request::get("users")).await;
    h.client
        .pipeline()
        .execute(Request::get("health").without_suffix())
        .await;

    let sent = h.transport.sent();
    assert_eq!(sent[0].url, "https://api.example.com/api/v2/users");
    assert_eq!(sent[1].url, "https://api.example.com/health");
}

// ─── Credential attachment ───────────────────────────────────────

#[tokio::test]
async fn test_bearer_header_from_credential_store() {
    let h = harness();
    h.credentials.set("tok-abc".to_string());
    h.transport.enqueue_json(200, serde_json::json!({}));

    h.client.pipeline().get("users").await;

    let sent = h.transport.sent();
    assert_eq!(sent[0].headers["Authorization"], "Bearer tok-abc");
    assert!(sent[0].include_credentials);
}

// ─── Classification side effects ─────────────────────────────────

#[tokio::test]
async fn test_unauthorized_tears_session_down() {
    let h = harness();
    h.credentials.set("tok-abc".to_string());
    h.transport
        .enqueue_json(401, serde_json::json!({"message": "token expired"}));

    let envelope = h.client.pipeline().get("users").await;

    assert_eq!(envelope.error.unwrap().kind, FailureKind::Unauthorized);
    assert_eq!(h.session.logout_count(), 1);
    assert!(h.credentials.get().is_none());
    assert_eq!(h.notifier.count().await, 1);
}

#[tokio::test]
async fn test_connection_failure_no_notification() {
    let h = harness();
    h.transport.enqueue_error(
        entity_client::TransportError::connection("https://api.example.com/users", "refused"),
    );

    let envelope = h.client.pipeline().get("users").await;

    assert_eq!(
        envelope.error.unwrap().kind,
        FailureKind::ConnectionUnavailable
    );
    assert_eq!(envelope.header.status, 0);
    // The liveness monitor owns unavailable-backend messaging.
    assert_eq!(h.notifier.count().await, 0);
    assert!(h.client.monitor().is_slow());
}

#[tokio::test]
async fn test_bad_request_notifies_with_server_message() {
    let h = harness();
    h.transport
        .enqueue_json(400, serde_json::json!({"message": "name is required"}));

    h.client
        .pipeline()
        .post("users", serde_json::json!({"name": ""}))
        .await;

    let delivered = h.notifier.delivered().await;
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].detail, "name is required");
}

#[tokio::test]
async fn test_silent_path_suppresses_server_error_notification() {
    let h = harness_with(
        ClientConfig::new("https://api.example.com").with_silent_path("telemetry/ping"),
    );
    h.transport.enqueue_json(500, serde_json::json!({}));
    h.transport.enqueue_json(500, serde_json::json!({}));

    h.client.pipeline().get("telemetry/ping").await;
    assert_eq!(h.notifier.count().await, 0);

    h.client.pipeline().get("users").await;
    assert_eq!(h.notifier.count().await, 1);
}

#[tokio::test]
async fn test_opaque_failure_body_decoded_and_reclassified() {
    use entity_client::transport::{RawResponse, ResponseBody};

    let h = harness();
    h.transport.enqueue_response(RawResponse {
        status: 500,
        status_text: "Internal Server Error".to_string(),
        body: ResponseBody::Binary(bytes::Bytes::from_static(b"{\"message\":\"boom\"}")),
    });

    let envelope = h.client.pipeline().get("users").await;

    let error = envelope.error.unwrap();
    assert_eq!(error.kind, FailureKind::ServerError);
    assert_eq!(error.message, "boom");
}

#[tokio::test]
async fn test_undecodable_opaque_body_surfaced_as_is() {
    use entity_client::transport::{RawResponse, ResponseBody};

    let h = harness();
    h.transport.enqueue_response(RawResponse {
        status: 500,
        status_text: "Internal Server Error".to_string(),
        body: ResponseBody::Binary(bytes::Bytes::from_static(b"\xff\xfe\xfd")),
    });

    let envelope = h.client.pipeline().get("users").await;
    assert_eq!(envelope.error.unwrap().kind, FailureKind::Opaque);
}

// ─── Notification dedup ──────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_duplicate_failure_notifications_suppressed() {
    let h = harness();
    h.transport
        .enqueue_json(500, serde_json::json!({"message": "boom"}));
    h.transport
        .enqueue_json(500, serde_json::json!({"message": "boom"}));

    h.client.pipeline().get("users").await;
    tokio::time::advance(std::time::Duration::from_secs(1)).await;
    h.client.pipeline().get("users").await;

    assert_eq!(h.notifier.count().await, 1);
}

// ─── Mock mode ───────────────────────────────────────────────────

#[tokio::test]
async fn test_mock_resource_resolved_by_last_path_segment() {
    let dir = std::env::temp_dir().join(format!("entity-client-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("users.json"),
        serde_json::to_vec(&serde_json::json!([{"id": "1", "name": "x"}])).unwrap(),
    )
    .unwrap();

    let mut config = ClientConfig::new("https://api.example.com");
    config.mock_dir = dir.to_string_lossy().into_owned();
    let h = harness_with(config);

    let envelope = h
        .client
        .pipeline()
        .execute(Request::get("api/users").mocked())
        .await;

    assert!(envelope.header.success);
    assert!(envelope.mock);
    assert_eq!(envelope.data.unwrap()[0]["name"], "x");
    // The transport is bypassed entirely.
    assert_eq!(h.transport.sent_count(), 0);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_missing_mock_resource_is_not_found_envelope() {
    let dir = std::env::temp_dir().join(format!("entity-client-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();

    let mut config = ClientConfig::new("https://api.example.com");
    config.mock_dir = dir.to_string_lossy().into_owned();
    let h = harness_with(config);

    let envelope = h
        .client
        .pipeline()
        .execute(Request::get("nothing-here").mocked())
        .await;

    assert!(!envelope.header.success);
    assert_eq!(envelope.header.status, 404);
    assert!(envelope.error.is_some());

    std::fs::remove_dir_all(&dir).unwrap();
}

// ─── Liveness hooks ──────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_loader_opt_out_skips_slow_tracking() {
    let h = harness();
    h.transport.enqueue_json_delayed(
        200,
        serde_json::json!({}),
        std::time::Duration::from_millis(6000),
    );

    let pipeline = h.client.pipeline();
    let call =
        tokio::spawn(async move { pipeline.execute(Request::get("poll").without_loader()).await });
    tokio::task::yield_now().await;
    assert_eq!(h.client.monitor().pending_count(), 0);

    tokio::time::advance(std::time::Duration::from_millis(5001)).await;
    tokio::task::yield_now().await;
    assert!(!h.client.monitor().is_slow());

    call.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_slow_backend_detected_through_pipeline() {
    let h = harness();
    h.transport.enqueue_json_delayed(
        200,
        serde_json::json!({}),
        std::time::Duration::from_millis(6000),
    );

    let pipeline = h.client.pipeline();
    let call = tokio::spawn(async move { pipeline.get("users").await });
    tokio::task::yield_now().await;

    tokio::time::advance(std::time::Duration::from_millis(5001)).await;
    tokio::task::yield_now().await;
    assert!(h.client.monitor().is_slow());

    call.await.unwrap();
    tokio::time::advance(std::time::Duration::from_millis(600)).await;
    tokio::task::yield_now().await;
    assert!(!h.client.monitor().is_slow());
}
