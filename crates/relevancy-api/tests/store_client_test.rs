#![allow(clippy::unwrap_used)]
// Integration tests for `StoreClient` and `EventStreamHandle` using wiremock.

use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use relevancy_api::{
    Error, EventStreamHandle, ReconnectConfig, StoreClient, StoreEvent, StorePath, TransportConfig,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, StoreClient) {
    let server = MockServer::start().await;
    let root = Url::parse(&server.uri()).unwrap();
    let client = StoreClient::with_client(
        reqwest::Client::new(),
        root,
        Some("test-token".to_string().into()),
    );
    (server, client)
}

// ── Reads ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_sends_auth_and_decodes() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/sites/acme.json"))
        .and(query_param("auth", "test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Acme Outdoor",
            "cases": { "boots": { "name": "Boots", ".priority": -1700000000000_i64 } }
        })))
        .mount(&server)
        .await;

    let value: Option<serde_json::Value> =
        client.get(&StorePath::site("acme").unwrap()).await.unwrap();

    let value = value.unwrap();
    assert_eq!(value["name"], "Acme Outdoor");
    assert_eq!(value["cases"]["boots"]["name"], "Boots");
}

#[tokio::test]
async fn test_get_missing_path_is_none() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/sites/nowhere.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&server)
        .await;

    let value: Option<serde_json::Value> = client
        .get(&StorePath::site("nowhere").unwrap())
        .await
        .unwrap();

    assert!(value.is_none());
}

#[tokio::test]
async fn test_get_garbage_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/sites/acme.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result: Result<Option<serde_json::Value>, _> =
        client.get(&StorePath::site("acme").unwrap()).await;

    match result {
        Err(Error::Deserialization { body, .. }) => assert_eq!(body, "<html>oops</html>"),
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_get_with_priority_requests_export_format() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/sites/acme/cases.json"))
        .and(query_param("format", "export"))
        .and(query_param("auth", "test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "boots": { "name": "Boots", ".priority": -2 },
            "tents": { "name": "Tents", ".priority": -1 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let value: Option<serde_json::Value> = client
        .get_with_priority(&StorePath::cases("acme").unwrap())
        .await
        .unwrap();

    assert_eq!(value.unwrap()["boots"][".priority"], -2);
}

// ── Writes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_put_case() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/sites/acme/cases/boots.json"))
        .and(query_param("auth", "test-token"))
        .and(body_json(json!({ "name": "Boots" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "Boots" })))
        .expect(1)
        .mount(&server)
        .await;

    client
        .put(
            &StorePath::case("acme", "boots").unwrap(),
            &json!({ "name": "Boots" }),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_case() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/sites/acme/cases/boots.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .expect(1)
        .mount(&server)
        .await;

    client
        .delete(&StorePath::case("acme", "boots").unwrap())
        .await
        .unwrap();
}

// ── Error mapping ───────────────────────────────────────────────────

#[tokio::test]
async fn test_unauthorized_maps_to_authentication() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "error": "Unauthorized request." })),
        )
        .mount(&server)
        .await;

    let result: Result<Option<serde_json::Value>, _> =
        client.get(&StorePath::site("acme").unwrap()).await;

    match result {
        Err(Error::Authentication { message }) => assert_eq!(message, "Unauthorized request."),
        other => panic!("expected Authentication error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_forbidden_maps_to_permission_denied() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({ "error": "Permission denied" })),
        )
        .mount(&server)
        .await;

    let result = client
        .delete(&StorePath::case("acme", "boots").unwrap())
        .await;

    match result {
        Err(Error::PermissionDenied { path }) => assert_eq!(path, "/sites/acme/cases/boots"),
        other => panic!("expected PermissionDenied error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let err = client
        .put(&StorePath::case("acme", "boots").unwrap(), &json!({}))
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::Api { status: 503, ref message } if message == "upstream unavailable")
    );
    assert!(err.is_transient());
}

// ── Event stream ────────────────────────────────────────────────────

#[tokio::test]
async fn test_event_stream_broadcasts_put() {
    let (server, client) = setup().await;

    let body = concat!(
        "event: put\n",
        "data: {\"path\":\"/\",\"data\":{\"cases\":{\"boots\":{\"name\":\"Boots\"}}}}\n",
        "\n",
        "event: keep-alive\n",
        "data: null\n",
        "\n",
    );

    Mock::given(method("GET"))
        .and(path("/sites/acme.json"))
        .and(header("accept", "text/event-stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let url = client.url_for(&StorePath::site("acme").unwrap()).unwrap();
    let cancel = CancellationToken::new();
    let reconnect = ReconnectConfig {
        initial_delay: Duration::from_millis(50),
        max_delay: Duration::from_millis(200),
        max_retries: Some(2),
    };
    let handle =
        EventStreamHandle::connect(url, &TransportConfig::default(), reconnect, cancel.clone())
            .unwrap();
    let mut rx = handle.subscribe();

    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();

    match &*event {
        StoreEvent::Put { path, data } => {
            assert_eq!(path, "/");
            assert_eq!(data["cases"]["boots"]["name"], "Boots");
        }
        other => panic!("expected Put event, got: {other:?}"),
    }

    handle.shutdown();
}

// ── Secrets ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_transport_error_omits_auth_token() {
    // Nothing listens on port 1, so the request fails before any response.
    let client = StoreClient::with_client(
        reqwest::Client::new(),
        Url::parse("http://127.0.0.1:1").unwrap(),
        Some("TOPSECRET123".to_string().into()),
    );

    let err = client
        .get::<serde_json::Value>(&StorePath::site("acme").unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Transport(_)));
    let shown = format!("{err} {err:?}");
    assert!(!shown.contains("TOPSECRET123"), "token leaked: {shown}");
    assert!(shown.contains("127.0.0.1"), "host should stay visible: {shown}");
}
