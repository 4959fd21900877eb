// ── Transient alert feedback ──

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

pub const CASE_ADDED_MESSAGE: &str = "case added";
pub const NAME_REJECTED_MESSAGE: &str = "please use a different name";

/// Visual class of an alert (maps to a color in the UI).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AlertClass {
    Success,
    Danger,
}

/// Outcome label shown alongside the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum AlertType {
    Success,
    Error,
}

/// Feedback from the last add attempt. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub class: AlertClass,
    #[serde(rename = "type")]
    pub kind: AlertType,
    pub message: String,
}

impl Alert {
    pub fn case_added() -> Self {
        Self {
            class: AlertClass::Success,
            kind: AlertType::Success,
            message: CASE_ADDED_MESSAGE.into(),
        }
    }

    pub fn name_rejected() -> Self {
        Self {
            class: AlertClass::Danger,
            kind: AlertType::Error,
            message: NAME_REJECTED_MESSAGE.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == AlertType::Success
    }
}
