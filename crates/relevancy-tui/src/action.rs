//! All possible UI actions. Actions are the sole mechanism for state mutation.

use std::sync::Arc;

use relevancy_core::{Alert, CaseId, ConfirmOutcome, Site};

use crate::dialog::PendingConfirm;

/// Notification severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

/// A toast notification.
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
}

impl Notification {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NotificationLevel::Error,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NotificationLevel::Info,
        }
    }
}

#[derive(Debug)]
pub enum Action {
    // ── Lifecycle ────────────────────────────────────────────────────
    Quit,
    Tick,
    Render,
    Resize(u16, u16),

    // ── Connection ───────────────────────────────────────────────────
    Connecting,
    Connected,
    Reconnecting(u32),
    Disconnected(String),

    // ── Bound state from the controller ──────────────────────────────
    SiteUpdated(Arc<Site>),
    AlertChanged(Option<Alert>),
    NewCaseNameChanged(String),

    // ── Operator intent ──────────────────────────────────────────────
    EditNewCaseName(String),
    AddCase(String),
    RequestRemove(CaseId),

    // ── Dialogs ──────────────────────────────────────────────────────
    ShowConfirm(PendingConfirm),
    ConfirmAnswer(ConfirmOutcome),
    Acknowledge(String),
    DismissAcknowledgement,
    Notify(Notification),
    ToggleHelp,
}
