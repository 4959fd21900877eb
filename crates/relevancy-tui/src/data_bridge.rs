//! Data bridge -- connects the site session and case controller to TUI actions.
//!
//! Runs as a background task: connects the session, then forwards every
//! site snapshot, alert change, input reset and connection-state
//! transition as an [`Action`] through the TUI's action channel.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use relevancy_core::{CaseController, ConnectionState, SiteSession};

use crate::action::Action;

pub async fn spawn_data_bridge(
    session: SiteSession,
    controller: Arc<CaseController>,
    action_tx: mpsc::UnboundedSender<Action>,
    cancel: CancellationToken,
) {
    let _ = action_tx.send(Action::Connecting);

    if let Err(e) = session.connect().await {
        warn!(error = %e, "failed to connect to store");
        let _ = action_tx.send(Action::Disconnected(e.to_string()));
        return;
    }
    let _ = action_tx.send(Action::Connected);

    let mut site = controller.site();
    let mut alert = controller.alert();
    let mut new_case_name = controller.new_case_name();
    let mut conn_state = session.connection_state();

    let _ = action_tx.send(Action::SiteUpdated(site.latest()));

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            Some(snapshot) = site.changed() => {
                debug!(cases = snapshot.cases.len(), "dispatching SiteUpdated");
                let _ = action_tx.send(Action::SiteUpdated(snapshot));
            }
            Ok(()) = alert.changed() => {
                let current = alert.borrow_and_update().clone();
                let _ = action_tx.send(Action::AlertChanged(current));
            }
            Ok(()) = new_case_name.changed() => {
                let name = new_case_name.borrow_and_update().clone();
                let _ = action_tx.send(Action::NewCaseNameChanged(name));
            }
            Ok(()) = conn_state.changed() => {
                let state = conn_state.borrow_and_update().clone();
                let action = match state {
                    ConnectionState::Connected => Action::Connected,
                    ConnectionState::Connecting => Action::Connecting,
                    ConnectionState::Reconnecting { attempt } => Action::Reconnecting(attempt),
                    ConnectionState::Disconnected => Action::Disconnected("disconnected".into()),
                    ConnectionState::Failed => Action::Disconnected("connection failed".into()),
                };
                let _ = action_tx.send(action);
            }
        }
    }

    session.disconnect().await;
    debug!("data bridge shut down");
}
