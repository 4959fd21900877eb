// ── Reactive site stream ──
//
// Subscription type for consuming site changes from the SiteStore.

use std::sync::Arc;

use tokio::sync::watch;

use crate::model::Site;

/// A subscription to one site document.
///
/// Provides both point-in-time snapshot access and reactive change
/// notification via the `changed()` method.
pub struct SiteStream {
    current: Arc<Site>,
    receiver: watch::Receiver<Arc<Site>>,
}

impl SiteStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<Site>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Get the snapshot captured at creation time (or at the last `changed()`).
    pub fn current(&self) -> &Arc<Site> {
        &self.current
    }

    /// Get the latest snapshot (may have changed since creation).
    pub fn latest(&self) -> Arc<Site> {
        self.receiver.borrow().clone()
    }

    /// Whether a newer snapshot is waiting.
    pub fn has_changed(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` if the store has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<Site>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }
}
