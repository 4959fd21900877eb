//! Modal confirmation and acknowledgement dialogs.
//!
//! [`TuiConfirmation`] is the controller's confirmation surface: it posts a
//! [`PendingConfirm`] to the app loop and awaits the operator's answer on a
//! oneshot channel. The app owns the modal while it is open.

use async_trait::async_trait;
use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use relevancy_core::{ConfirmOutcome, ConfirmRequest, Confirmation, CoreError};

use crate::action::Action;
use crate::theme;

/// An open confirmation modal and the channel its answer goes back on.
#[derive(Debug)]
pub struct PendingConfirm {
    pub request: ConfirmRequest,
    reply: oneshot::Sender<ConfirmOutcome>,
}

impl PendingConfirm {
    /// Close the modal with `outcome`.
    pub fn resolve(self, outcome: ConfirmOutcome) {
        if self.reply.send(outcome).is_err() {
            debug!("confirmation requester went away");
        }
    }
}

pub struct TuiConfirmation {
    action_tx: mpsc::UnboundedSender<Action>,
}

impl TuiConfirmation {
    pub fn new(action_tx: mpsc::UnboundedSender<Action>) -> Self {
        Self { action_tx }
    }
}

#[async_trait]
impl Confirmation for TuiConfirmation {
    async fn confirm(&self, request: &ConfirmRequest) -> Result<ConfirmOutcome, CoreError> {
        let (reply, rx) = oneshot::channel();
        self.action_tx
            .send(Action::ShowConfirm(PendingConfirm {
                request: request.clone(),
                reply,
            }))
            .map_err(|_| CoreError::Confirmation {
                message: "the terminal UI has shut down".into(),
            })?;

        // A modal dropped unanswered (app exiting) counts as dismissed.
        Ok(rx.await.unwrap_or(ConfirmOutcome::Dismissed))
    }

    async fn acknowledge(&self, message: &str) {
        let _ = self.action_tx.send(Action::Acknowledge(message.to_owned()));
    }
}

// ── Rendering ────────────────────────────────────────────────────────

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height);
    let x = area.width.saturating_sub(width) / 2;
    let y = area.height.saturating_sub(height) / 2;
    Rect::new(area.x + x, area.y + y, width, height)
}

/// Centered yes/no modal. Destructive requests get a red border.
pub fn render_confirm(frame: &mut Frame, area: Rect, request: &ConfirmRequest) {
    let dialog_area = centered(area, 60, 7);
    frame.render_widget(Clear, dialog_area);

    let border = if request.destructive {
        theme::DANGER
    } else {
        theme::WARNING
    };
    let block = Block::default()
        .title(format!(" {} ", request.title))
        .title_style(theme::title_style())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(theme::SURFACE));

    let text = vec![
        Line::from(Span::styled(
            request.message.clone(),
            Style::default().fg(theme::TEXT),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("y ", theme::key_hint_key()),
            Span::styled("confirm    ", theme::key_hint()),
            Span::styled("n ", theme::key_hint_key()),
            Span::styled("cancel    ", theme::key_hint()),
            Span::styled("Esc ", theme::key_hint_key()),
            Span::styled("dismiss", theme::key_hint()),
        ]),
    ];
    frame.render_widget(
        Paragraph::new(text).block(block).wrap(Wrap { trim: true }),
        dialog_area,
    );
}

/// Centered message box closed by any key.
pub fn render_acknowledgement(frame: &mut Frame, area: Rect, message: &str) {
    let dialog_area = centered(area, 56, 5);
    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .title(" Done ")
        .title_style(theme::title_style())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme::SUCCESS))
        .style(Style::default().bg(theme::SURFACE));

    let text = vec![
        Line::from(Span::styled(message.to_owned(), Style::default().fg(theme::TEXT))),
        Line::from(Span::styled("press any key", theme::key_hint())),
    ];
    frame.render_widget(
        Paragraph::new(text).block(block).wrap(Wrap { trim: true }),
        dialog_area,
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use relevancy_core::CaseId;

    #[tokio::test]
    async fn confirm_waits_for_modal_answer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let confirmation = TuiConfirmation::new(tx);
        let request = ConfirmRequest::remove_case(&CaseId::from("boots"));

        let answer = tokio::spawn(async move { confirmation.confirm(&request).await });

        let Some(Action::ShowConfirm(pending)) = rx.recv().await else {
            panic!("expected a confirmation modal");
        };
        assert_eq!(
            pending.request.message,
            "Do you really want to delete the \"boots\" case?"
        );
        pending.resolve(ConfirmOutcome::Cancelled);

        assert_eq!(answer.await.unwrap().unwrap(), ConfirmOutcome::Cancelled);
    }

    #[tokio::test]
    async fn dropped_modal_counts_as_dismissed() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let confirmation = TuiConfirmation::new(tx);
        let request = ConfirmRequest::remove_case(&CaseId::from("boots"));

        let answer = tokio::spawn(async move { confirmation.confirm(&request).await });
        drop(rx.recv().await);

        assert_eq!(answer.await.unwrap().unwrap(), ConfirmOutcome::Dismissed);
    }

    #[tokio::test]
    async fn closed_app_is_an_error() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let confirmation = TuiConfirmation::new(tx);
        let request = ConfirmRequest::remove_case(&CaseId::from("boots"));

        assert!(matches!(
            confirmation.confirm(&request).await,
            Err(CoreError::Confirmation { .. })
        ));
    }

    #[tokio::test]
    async fn acknowledge_posts_message() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        TuiConfirmation::new(tx).acknowledge("done").await;
        assert!(matches!(rx.recv().await, Some(Action::Acknowledge(m)) if m == "done"));
    }
}
