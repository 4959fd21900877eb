// ── Reactive site store ──
//
// Mirrors one site document as a raw JSON tree and republishes a typed
// `Site` snapshot through a `watch` channel after every effective change.
// Writers: the session's initial load, the event-stream bridge, and the
// controller's optimistic inserts.

mod document;

use std::sync::{Arc, Mutex, PoisonError};

use relevancy_api::StoreEvent;
use serde_json::Value;
use tokio::sync::watch;
use tracing::trace;

use crate::error::CoreError;
use crate::model::{Case, CaseId, Site};
use crate::stream::SiteStream;

/// Live mirror of one site document.
pub struct SiteStore {
    site_id: String,
    document: Mutex<Value>,
    snapshot: watch::Sender<Arc<Site>>,
}

impl SiteStore {
    pub fn new(site_id: impl Into<String>) -> Self {
        let site_id = site_id.into();
        let (snapshot, _) = watch::channel(Arc::new(Site::empty(site_id.clone())));

        Self {
            site_id,
            document: Mutex::new(Value::Null),
            snapshot,
        }
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Replace the whole document (initial load or resync).
    pub fn replace(&self, value: Value) {
        self.mutate(|doc| document::set_at(doc, &[], value));
    }

    /// Set the node at `path` (relative to the site) to `data`; `null` deletes.
    pub fn apply_put(&self, path: &str, data: Value) {
        self.mutate(|doc| document::set_at(doc, &document::split_path(path), data));
    }

    /// Merge the children of `data` into the node at `path`.
    pub fn apply_patch(&self, path: &str, data: Value) {
        self.mutate(|doc| document::merge_at(doc, &document::split_path(path), data));
    }

    /// Apply a change reported by the event stream.
    pub fn apply_event(&self, event: &StoreEvent) {
        match event {
            StoreEvent::Put { path, data } => self.apply_put(path, data.clone()),
            StoreEvent::Patch { path, data } => self.apply_patch(path, data.clone()),
        }
    }

    /// Insert or overwrite one case locally.
    pub fn set_case(&self, id: &CaseId, case: &Case) -> Result<(), CoreError> {
        let value = serde_json::to_value(case)
            .map_err(|e| CoreError::Internal(format!("failed to encode case: {e}")))?;
        self.mutate(|doc| document::set_at(doc, &["cases", id.as_str()], value));
        Ok(())
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Arc<Site> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> SiteStream {
        SiteStream::new(self.snapshot.subscribe())
    }

    /// Copy of the raw document tree.
    pub fn document(&self) -> Value {
        self.lock().clone()
    }

    // ── Internals ────────────────────────────────────────────────────

    fn lock(&self) -> std::sync::MutexGuard<'_, Value> {
        self.document.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mutate(&self, f: impl FnOnce(&mut Value)) {
        let site = {
            let mut doc = self.lock();
            f(&mut *doc);
            Site::from_document(&self.site_id, &doc)
        };

        let changed = self.snapshot.send_if_modified(|current| {
            if **current == site {
                false
            } else {
                *current = Arc::new(site);
                true
            }
        });
        trace!(site = %self.site_id, changed, "site document updated");
    }
}
