// ── Controller collaborator contracts ──
//
// The case controller never talks to the store or the terminal directly.
// It receives these capabilities as constructor parameters: a live site
// handle, a remover for case subtrees, and a confirmation surface.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::model::{Case, CaseId, Site};
use crate::stream::SiteStream;

/// A bound, live-updating site document.
pub trait LiveSite: Send + Sync {
    /// Key of the bound site.
    fn site_id(&self) -> &str;

    /// The site as currently mirrored.
    fn snapshot(&self) -> Arc<Site>;

    /// Subscribe to snapshot changes.
    fn subscribe(&self) -> SiteStream;

    /// Insert a case into the local mirror and queue the remote write.
    fn insert_case(&self, id: CaseId, case: Case) -> Result<(), CoreError>;
}

/// Issues deletes against `sites/<site>/cases/<id>`.
#[async_trait]
pub trait CaseRemover: Send + Sync {
    async fn remove_case(&self, id: &CaseId) -> Result<(), CoreError>;
}

/// What the operator decided when asked to confirm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Confirmed,
    Cancelled,
    /// The prompt was closed without an explicit choice.
    Dismissed,
}

/// A yes/no question put to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmRequest {
    pub title: String,
    pub message: String,
    /// Confirming destroys data; UIs render it in a warning color.
    pub destructive: bool,
}

impl ConfirmRequest {
    pub fn remove_case(id: &CaseId) -> Self {
        Self {
            title: "Delete case".into(),
            message: format!("Do you really want to delete the \"{id}\" case?"),
            destructive: true,
        }
    }
}

/// The operator-facing confirmation surface (terminal prompt, modal dialog).
#[async_trait]
pub trait Confirmation: Send + Sync {
    /// Ask and wait for an answer.
    async fn confirm(&self, request: &ConfirmRequest) -> Result<ConfirmOutcome, CoreError>;

    /// Tell the operator a confirmed action finished.
    async fn acknowledge(&self, message: &str);
}
