#![allow(clippy::unwrap_used)]
// Integration tests for `SiteSession` and `CaseController` against a mock store.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use relevancy_core::{
    CaseController, CaseControllerConfig, CaseId, CaseRemover, ConfirmOutcome, ConfirmRequest,
    Confirmation, ConnectionState, CoreError, LiveSite, RemoveOutcome, SessionConfig, SiteSession,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup(site_doc: serde_json::Value) -> (MockServer, SessionConfig) {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sites/acme.json"))
        .and(query_param("format", "export"))
        .respond_with(ResponseTemplate::new(200).set_body_json(site_doc))
        .mount(&server)
        .await;

    let mut config = SessionConfig::new(Url::parse(&server.uri()).unwrap(), "acme");
    config.streaming = false;
    (server, config)
}

struct AlwaysConfirm;

#[async_trait]
impl Confirmation for AlwaysConfirm {
    async fn confirm(&self, _request: &ConfirmRequest) -> Result<ConfirmOutcome, CoreError> {
        Ok(ConfirmOutcome::Confirmed)
    }

    async fn acknowledge(&self, _message: &str) {}
}

fn controller_for(session: &SiteSession) -> CaseController {
    CaseController::new(
        Arc::new(session.clone()) as Arc<dyn LiveSite>,
        Arc::new(session.clone()) as Arc<dyn CaseRemover>,
        Arc::new(AlwaysConfirm),
        CaseControllerConfig::default(),
    )
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_connect_loads_site_document() {
    let (_server, config) = setup(json!({
        "name": "Acme Outdoor",
        "cases": { "boots": { "name": "Boots", ".priority": -5 } }
    }))
    .await;

    let session = SiteSession::new(config);
    session.connect().await.unwrap();
    assert_eq!(*session.connection_state().borrow(), ConnectionState::Connected);

    let site = session.snapshot();
    assert_eq!(site.display_name(), "Acme Outdoor");
    assert_eq!(site.case(&CaseId::from("boots")).unwrap().priority_value(), Some(-5.0));

    session.disconnect().await;
    assert_eq!(*session.connection_state().borrow(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_missing_site_reads_as_empty() {
    let (_server, config) = setup(serde_json::Value::Null).await;

    let cases = SiteSession::oneshot(config, |session| async move {
        Ok(session.snapshot().cases.len())
    })
    .await
    .unwrap();

    assert_eq!(cases, 0);
}

#[tokio::test]
async fn test_unauthorized_connect_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "Permission denied" })))
        .mount(&server)
        .await;

    let mut config = SessionConfig::new(Url::parse(&server.uri()).unwrap(), "acme");
    config.streaming = false;
    let session = SiteSession::new(config);

    let err = session.connect().await.unwrap_err();
    assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
    assert_eq!(*session.connection_state().borrow(), ConnectionState::Failed);
}

// ── Writes through the controller ───────────────────────────────────

#[tokio::test]
async fn test_add_case_puts_to_store() {
    let (server, config) = setup(json!({})).await;

    Mock::given(method("PUT"))
        .and(path("/sites/acme/cases/boots.json"))
        .and(body_partial_json(json!({ "name": "Boots" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "Boots" })))
        .expect(1)
        .mount(&server)
        .await;

    SiteSession::oneshot(config, |session| async move {
        let ctrl = controller_for(&session);
        let id = ctrl.add_case(Some("Boots"))?;
        assert!(session.snapshot().contains(&id));
        session.flush().await
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_failed_write_surfaces_on_flush() {
    let (server, config) = setup(json!({})).await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(500).set_body_string("write failed"))
        .mount(&server)
        .await;

    let result = SiteSession::oneshot(config, |session| async move {
        controller_for(&session).add_case(Some("Boots"))?;
        session.flush().await
    })
    .await;

    assert!(matches!(result, Err(CoreError::Api { status: Some(500), .. })));
}

#[tokio::test]
async fn test_remove_case_deletes_from_store() {
    let (server, config) = setup(json!({ "cases": { "boots": { "name": "Boots" } } })).await;

    Mock::given(method("DELETE"))
        .and(path("/sites/acme/cases/boots.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = SiteSession::oneshot(config, |session| async move {
        controller_for(&session)
            .remove_case(&CaseId::from("boots"))
            .await
    })
    .await
    .unwrap();

    assert_eq!(outcome, RemoveOutcome::Removed);
}

#[tokio::test]
async fn test_insert_after_disconnect_is_rejected() {
    let (_server, config) = setup(json!({})).await;
    let session = SiteSession::new(config);
    session.connect().await.unwrap();
    session.disconnect().await;

    let err = session
        .insert_case(CaseId::from("boots"), relevancy_core::Case::new("Boots"))
        .unwrap_err();
    assert!(matches!(err, CoreError::SessionClosed));
}

#[tokio::test]
async fn test_unaddressable_name_never_reaches_mirror_or_store() {
    let (server, config) = setup(json!({})).await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let session = SiteSession::new(config);
    session.connect().await.unwrap();
    let ctrl = controller_for(&session);

    for name in ["Boots/Winter", "v1.2", "#1", "a$b", "[x]"] {
        let err = ctrl.add_case(Some(name)).unwrap_err();
        assert!(matches!(err, CoreError::CaseNameRejected { .. }), "{name}: {err:?}");
        assert_eq!(ctrl.current_alert(), Some(relevancy_core::Alert::name_rejected()));
    }
    assert!(session.snapshot().cases.is_empty());

    session.flush().await.unwrap();
    session.disconnect().await;
}

#[tokio::test]
async fn test_insert_with_nested_key_leaves_mirror_untouched() {
    let (_server, config) = setup(json!({})).await;
    let session = SiteSession::new(config);
    session.connect().await.unwrap();

    let id = CaseId::from("boots/winter");
    let err = session
        .insert_case(id.clone(), relevancy_core::Case::new("Boots/Winter"))
        .unwrap_err();

    assert!(matches!(err, CoreError::Config { .. }));
    assert!(!session.snapshot().contains(&id));
    assert!(session.snapshot().cases.is_empty());
    session.disconnect().await;
}

#[tokio::test]
async fn test_add_on_closed_session_returns_error_and_keeps_input() {
    let (_server, config) = setup(json!({})).await;
    let session = SiteSession::new(config);
    let ctrl = controller_for(&session);
    ctrl.set_new_case_name("Boots");

    let err = ctrl.add_case(Some("Boots")).unwrap_err();

    assert!(matches!(err, CoreError::SessionClosed));
    assert_eq!(ctrl.current_alert(), None);
    assert_eq!(*ctrl.new_case_name().borrow(), "Boots");
    assert!(session.snapshot().cases.is_empty());
}
