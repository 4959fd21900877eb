// ── Case collection controller ──
//
// Mediates operator intent (add / remove a case) against a live site and
// drives the transient alert shown after each add. The view reads `alert`
// and `new_case_name` through watch receivers and calls `add_case` /
// `remove_case`; everything else happens through the collaborators.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::binding::{CaseRemover, ConfirmOutcome, ConfirmRequest, Confirmation, LiveSite};
use crate::config::CaseControllerConfig;
use crate::error::CoreError;
use crate::model::{Alert, Case, CaseId};
use crate::stream::SiteStream;

/// Result of a remove request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// Confirmed and deleted from the store.
    Removed,
    /// The operator cancelled or dismissed the confirmation.
    Kept,
}

/// Controller for one site's case collection.
pub struct CaseController {
    site: Arc<dyn LiveSite>,
    remover: Arc<dyn CaseRemover>,
    confirmation: Arc<dyn Confirmation>,
    config: CaseControllerConfig,
    alert: Arc<watch::Sender<Option<Alert>>>,
    new_case_name: watch::Sender<String>,
    /// Bumped on every add; a pending alert clear only fires if it still
    /// holds the generation it was scheduled for.
    generation: Arc<AtomicU64>,
}

impl CaseController {
    pub fn new(
        site: Arc<dyn LiveSite>,
        remover: Arc<dyn CaseRemover>,
        confirmation: Arc<dyn Confirmation>,
        config: CaseControllerConfig,
    ) -> Self {
        let (alert, _) = watch::channel(None);
        let (new_case_name, _) = watch::channel(String::new());

        Self {
            site,
            remover,
            confirmation,
            config,
            alert: Arc::new(alert),
            new_case_name,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn site_id(&self) -> &str {
        self.site.site_id()
    }

    pub fn config(&self) -> &CaseControllerConfig {
        &self.config
    }

    /// Subscribe to the bound site.
    pub fn site(&self) -> SiteStream {
        self.site.subscribe()
    }

    // ── Bound view state ─────────────────────────────────────────────

    pub fn alert(&self) -> watch::Receiver<Option<Alert>> {
        self.alert.subscribe()
    }

    pub fn current_alert(&self) -> Option<Alert> {
        self.alert.borrow().clone()
    }

    pub fn new_case_name(&self) -> watch::Receiver<String> {
        self.new_case_name.subscribe()
    }

    pub fn set_new_case_name(&self, name: impl Into<String>) {
        self.new_case_name.send_replace(name.into());
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Add a case named `case_name` under the bound site.
    ///
    /// Empty names, names the store cannot use as a key, and names whose
    /// lowercased form already exists are rejected with the danger alert.
    /// On success the case is inserted locally (the live binding pushes it
    /// to the store), the success alert is shown, the input is cleared, and
    /// the alert is scheduled to clear after `alert_timeout`. A failed
    /// insert leaves the alert cleared and returns the error.
    ///
    /// Must be called within a Tokio runtime for the alert clear to be
    /// scheduled.
    pub fn add_case(&self, case_name: Option<&str>) -> Result<CaseId, CoreError> {
        let name = case_name.unwrap_or_default();
        let id = CaseId::from_name(name);

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.alert.send_replace(None);

        if !id.is_storable() || self.site.snapshot().contains(&id) {
            debug!(case = %id, "case name rejected");
            self.alert.send_replace(Some(Alert::name_rejected()));
            return Err(CoreError::CaseNameRejected {
                name: name.to_owned(),
            });
        }

        let case = if self.config.ordering {
            Case::newest_first(name, chrono::Utc::now())
        } else {
            Case::new(name)
        };
        // A failed insert is not a name problem: the alert stays cleared and
        // the error goes back to the caller, which reports it on its own
        // surface (CLI diagnostic, TUI notification).
        if let Err(e) = self.site.insert_case(id.clone(), case) {
            warn!(case = %id, error = %e, "case insert failed");
            return Err(e);
        }
        info!(site = self.site.site_id(), case = %id, "case added");

        self.alert.send_replace(Some(Alert::case_added()));
        self.new_case_name.send_replace(String::new());
        self.schedule_alert_clear(generation);

        Ok(id)
    }

    /// Ask for confirmation, then delete `sites/<site>/cases/<id>`.
    ///
    /// Nothing is removed locally: the live mirror drops the entry when the
    /// store reports the delete. The alert is never touched.
    pub async fn remove_case(&self, id: &CaseId) -> Result<RemoveOutcome, CoreError> {
        let request = ConfirmRequest::remove_case(id);

        match self.confirmation.confirm(&request).await? {
            ConfirmOutcome::Confirmed => {}
            outcome => {
                debug!(case = %id, ?outcome, "case removal not confirmed");
                return Ok(RemoveOutcome::Kept);
            }
        }

        if let Err(e) = self.remover.remove_case(id).await {
            warn!(case = %id, error = %e, "case removal failed");
            return Err(e);
        }
        info!(site = self.site.site_id(), case = %id, "case removed");

        self.confirmation
            .acknowledge(&format!("The \"{id}\" case has been deleted."))
            .await;
        Ok(RemoveOutcome::Removed)
    }

    // ── Internals ────────────────────────────────────────────────────

    fn schedule_alert_clear(&self, generation: u64) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime; alert will not clear automatically");
            return;
        };

        let alert = Arc::clone(&self.alert);
        let current = Arc::clone(&self.generation);
        let delay = self.config.alert_timeout;

        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            // Checked under the channel lock so a concurrent add wins.
            alert.send_if_modified(|value| {
                if current.load(Ordering::SeqCst) == generation && value.is_some() {
                    *value = None;
                    true
                } else {
                    false
                }
            });
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::model::{AlertType, Site};
    use crate::store::SiteStore;

    // ── Fakes ────────────────────────────────────────────────────────

    struct FakeSite {
        store: SiteStore,
        closed: bool,
    }

    impl FakeSite {
        fn with(doc: serde_json::Value) -> Arc<Self> {
            let store = SiteStore::new("acme");
            store.replace(doc);
            Arc::new(Self {
                store,
                closed: false,
            })
        }

        fn closed(doc: serde_json::Value) -> Arc<Self> {
            let store = SiteStore::new("acme");
            store.replace(doc);
            Arc::new(Self {
                store,
                closed: true,
            })
        }
    }

    impl LiveSite for FakeSite {
        fn site_id(&self) -> &str {
            self.store.site_id()
        }

        fn snapshot(&self) -> Arc<Site> {
            self.store.snapshot()
        }

        fn subscribe(&self) -> SiteStream {
            self.store.subscribe()
        }

        fn insert_case(&self, id: CaseId, case: Case) -> Result<(), CoreError> {
            if self.closed {
                return Err(CoreError::SessionClosed);
            }
            self.store.set_case(&id, &case)
        }
    }

    #[derive(Default)]
    struct FakeRemover {
        removed: Mutex<Vec<CaseId>>,
        fail: bool,
    }

    #[async_trait]
    impl CaseRemover for FakeRemover {
        async fn remove_case(&self, id: &CaseId) -> Result<(), CoreError> {
            if self.fail {
                return Err(CoreError::PermissionDenied {
                    path: format!("/sites/acme/cases/{id}"),
                });
            }
            self.removed.lock().unwrap().push(id.clone());
            Ok(())
        }
    }

    struct ScriptedConfirm {
        outcome: ConfirmOutcome,
        asked: Mutex<Vec<String>>,
        acknowledged: Mutex<Vec<String>>,
    }

    impl ScriptedConfirm {
        fn answering(outcome: ConfirmOutcome) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                asked: Mutex::new(Vec::new()),
                acknowledged: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Confirmation for ScriptedConfirm {
        async fn confirm(&self, request: &ConfirmRequest) -> Result<ConfirmOutcome, CoreError> {
            self.asked.lock().unwrap().push(request.message.clone());
            Ok(self.outcome)
        }

        async fn acknowledge(&self, message: &str) {
            self.acknowledged.lock().unwrap().push(message.to_owned());
        }
    }

    fn controller(
        site: &Arc<FakeSite>,
        remover: &Arc<FakeRemover>,
        confirm: &Arc<ScriptedConfirm>,
    ) -> CaseController {
        CaseController::new(
            Arc::clone(site) as Arc<dyn LiveSite>,
            Arc::clone(remover) as Arc<dyn CaseRemover>,
            Arc::clone(confirm) as Arc<dyn Confirmation>,
            CaseControllerConfig::default(),
        )
    }

    fn fixture(doc: serde_json::Value) -> (Arc<FakeSite>, Arc<FakeRemover>, CaseController) {
        let site = FakeSite::with(doc);
        let remover = Arc::new(FakeRemover::default());
        let confirm = ScriptedConfirm::answering(ConfirmOutcome::Confirmed);
        let ctrl = controller(&site, &remover, &confirm);
        (site, remover, ctrl)
    }

    // ── add_case ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn add_new_case_inserts_and_shows_success() {
        let (site, _, ctrl) = fixture(json!({}));
        ctrl.set_new_case_name("Boots");

        let id = ctrl.add_case(Some("Boots")).unwrap();

        assert_eq!(id.as_str(), "boots");
        let snapshot = site.snapshot();
        assert_eq!(snapshot.case(&id).unwrap().name, "Boots");
        assert!(snapshot.case(&id).unwrap().priority_value().unwrap() < 0.0);
        assert_eq!(ctrl.current_alert(), Some(Alert::case_added()));
        assert_eq!(*ctrl.new_case_name().borrow(), "");
    }

    #[tokio::test]
    async fn add_existing_name_in_any_case_is_rejected() {
        let (site, _, ctrl) = fixture(json!({ "cases": { "boots": { "name": "Boots" } } }));
        ctrl.set_new_case_name("BOOTS");
        let before = site.snapshot();

        let err = ctrl.add_case(Some("BOOTS")).unwrap_err();

        assert!(matches!(err, CoreError::CaseNameRejected { .. }));
        assert_eq!(site.snapshot(), before);
        assert_eq!(ctrl.current_alert().unwrap().kind, AlertType::Error);
        assert_eq!(*ctrl.new_case_name().borrow(), "BOOTS");
    }

    #[tokio::test]
    async fn add_name_with_reserved_key_characters_is_rejected() {
        let (site, _, ctrl) = fixture(json!({}));
        ctrl.set_new_case_name("Boots/Winter");

        for name in ["Boots/Winter", "v1.2", "#1", "a$b", "[x]"] {
            let err = ctrl.add_case(Some(name)).unwrap_err();
            assert!(matches!(err, CoreError::CaseNameRejected { .. }), "{name}");
        }

        assert!(site.snapshot().cases.is_empty());
        assert_eq!(ctrl.current_alert(), Some(Alert::name_rejected()));
        assert_eq!(*ctrl.new_case_name().borrow(), "Boots/Winter");
    }

    #[tokio::test]
    async fn failed_insert_returns_error_without_alert() {
        let site = FakeSite::closed(json!({}));
        let remover = Arc::new(FakeRemover::default());
        let confirm = ScriptedConfirm::answering(ConfirmOutcome::Confirmed);
        let ctrl = controller(&site, &remover, &confirm);
        ctrl.set_new_case_name("Boots");

        let err = ctrl.add_case(Some("Boots")).unwrap_err();

        assert!(matches!(err, CoreError::SessionClosed));
        assert_eq!(ctrl.current_alert(), None);
        assert_eq!(*ctrl.new_case_name().borrow(), "Boots");
        assert!(site.snapshot().cases.is_empty());
    }

    #[tokio::test]
    async fn add_empty_or_missing_name_is_rejected() {
        let (site, _, ctrl) = fixture(json!({}));

        assert!(ctrl.add_case(Some("")).is_err());
        assert!(ctrl.add_case(None).is_err());

        assert!(site.snapshot().cases.is_empty());
        assert_eq!(ctrl.current_alert(), Some(Alert::name_rejected()));
    }

    #[tokio::test]
    async fn ordering_can_be_disabled() {
        let site = FakeSite::with(json!({}));
        let remover = Arc::new(FakeRemover::default());
        let confirm = ScriptedConfirm::answering(ConfirmOutcome::Confirmed);
        let ctrl = CaseController::new(
            Arc::clone(&site) as Arc<dyn LiveSite>,
            remover as Arc<dyn CaseRemover>,
            confirm as Arc<dyn Confirmation>,
            CaseControllerConfig {
                ordering: false,
                ..CaseControllerConfig::default()
            },
        );

        ctrl.add_case(Some("Tents")).unwrap();

        assert_eq!(site.store.document(), json!({ "cases": { "tents": { "name": "Tents" } } }));
    }

    // ── Alert timer ──────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn success_alert_clears_after_timeout() {
        let (_, _, ctrl) = fixture(json!({}));
        ctrl.add_case(Some("Boots")).unwrap();

        tokio::time::sleep(Duration::from_millis(4999)).await;
        assert!(ctrl.current_alert().is_some());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(ctrl.current_alert(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn danger_alert_is_never_auto_cleared() {
        let (_, _, ctrl) = fixture(json!({}));
        ctrl.add_case(Some("Boots")).unwrap();
        tokio::time::sleep(Duration::from_millis(1000)).await;

        // Rejected add supersedes the pending clear of the success alert.
        ctrl.add_case(Some("boots")).unwrap_err();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(ctrl.current_alert(), Some(Alert::name_rejected()));
    }

    #[tokio::test(start_paused = true)]
    async fn newer_add_restarts_the_clear_timer() {
        let (_, _, ctrl) = fixture(json!({}));
        ctrl.add_case(Some("Boots")).unwrap();
        tokio::time::sleep(Duration::from_millis(3000)).await;
        ctrl.add_case(Some("Tents")).unwrap();

        // The first timer fires at 5000 ms but belongs to a stale add.
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(ctrl.current_alert(), Some(Alert::case_added()));

        tokio::time::sleep(Duration::from_millis(2600)).await;
        assert_eq!(ctrl.current_alert(), None);
    }

    // ── remove_case ──────────────────────────────────────────────────

    #[tokio::test]
    async fn confirmed_remove_deletes_once_and_acknowledges() {
        let site = FakeSite::with(json!({ "cases": { "boots": { "name": "Boots" } } }));
        let remover = Arc::new(FakeRemover::default());
        let confirm = ScriptedConfirm::answering(ConfirmOutcome::Confirmed);
        let ctrl = controller(&site, &remover, &confirm);

        let outcome = ctrl.remove_case(&CaseId::from("boots")).await.unwrap();

        assert_eq!(outcome, RemoveOutcome::Removed);
        assert_eq!(*remover.removed.lock().unwrap(), vec![CaseId::from("boots")]);
        assert_eq!(
            *confirm.asked.lock().unwrap(),
            vec![r#"Do you really want to delete the "boots" case?"#.to_owned()]
        );
        assert_eq!(confirm.acknowledged.lock().unwrap().len(), 1);
        // No optimistic local delete.
        assert!(site.snapshot().contains(&CaseId::from("boots")));
        assert_eq!(ctrl.current_alert(), None);
    }

    #[tokio::test]
    async fn cancelled_or_dismissed_remove_issues_nothing() {
        for outcome in [ConfirmOutcome::Cancelled, ConfirmOutcome::Dismissed] {
            let site = FakeSite::with(json!({ "cases": { "boots": { "name": "Boots" } } }));
            let remover = Arc::new(FakeRemover::default());
            let confirm = ScriptedConfirm::answering(outcome);
            let ctrl = controller(&site, &remover, &confirm);

            let result = ctrl.remove_case(&CaseId::from("boots")).await.unwrap();

            assert_eq!(result, RemoveOutcome::Kept);
            assert!(remover.removed.lock().unwrap().is_empty());
            assert!(confirm.acknowledged.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn failed_remove_is_returned_and_alert_untouched() {
        let site = FakeSite::with(json!({ "cases": { "boots": { "name": "Boots" } } }));
        let remover = Arc::new(FakeRemover {
            fail: true,
            ..FakeRemover::default()
        });
        let confirm = ScriptedConfirm::answering(ConfirmOutcome::Confirmed);
        let ctrl = controller(&site, &remover, &confirm);

        let err = ctrl.remove_case(&CaseId::from("boots")).await.unwrap_err();

        assert!(matches!(err, CoreError::PermissionDenied { .. }));
        assert!(confirm.acknowledged.lock().unwrap().is_empty());
        assert_eq!(ctrl.current_alert(), None);
    }
}
