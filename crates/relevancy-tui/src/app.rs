//! Application core -- event loop, action dispatch, overlays.

use std::sync::Arc;
use std::time::{Duration, Instant};

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use relevancy_core::{
    CaseController, CaseControllerConfig, ConfirmOutcome, CoreError, RemoveOutcome, SiteSession,
};

use crate::action::{Action, Notification, NotificationLevel};
use crate::component::Component;
use crate::dialog::{self, PendingConfirm, TuiConfirmation};
use crate::event::{Event, EventReader};
use crate::screens::cases::CasesScreen;
use crate::theme;
use crate::tui::Tui;

const NOTIFICATION_TTL: Duration = Duration::from_secs(3);
const BRIDGE_SHUTDOWN: Duration = Duration::from_secs(2);

/// Connection status as seen by the TUI.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting(u32),
}

/// Top-level application state and event loop.
pub struct App {
    session: SiteSession,
    controller: Arc<CaseController>,
    screen: CasesScreen,
    running: bool,
    connection_status: ConnectionStatus,
    /// Last connection failure, shown in the status bar.
    connection_error: Option<String>,
    help_visible: bool,
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
    /// Cancellation token for the data bridge task.
    data_cancel: CancellationToken,
    /// Open confirmation modal (blocks other input while active).
    pending_confirm: Option<PendingConfirm>,
    /// Open acknowledgement dialog, closed by any key.
    acknowledgement: Option<String>,
    /// Active notification toast with display timestamp.
    notification: Option<(Notification, Instant)>,
}

impl App {
    pub fn new(session: SiteSession, controller_config: CaseControllerConfig) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();

        let live = Arc::new(session.clone());
        let controller = Arc::new(CaseController::new(
            live.clone(),
            live,
            Arc::new(TuiConfirmation::new(action_tx.clone())),
            controller_config,
        ));
        let screen = CasesScreen::new(controller.site_id());

        Self {
            session,
            controller,
            screen,
            running: true,
            connection_status: ConnectionStatus::default(),
            connection_error: None,
            help_visible: false,
            action_tx,
            action_rx,
            data_cancel: CancellationToken::new(),
            pending_confirm: None,
            acknowledgement: None,
            notification: None,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?;
        tui.enter()?;
        self.screen.init(self.action_tx.clone())?;

        let bridge = {
            let session = self.session.clone();
            let controller = Arc::clone(&self.controller);
            let cancel = self.data_cancel.clone();
            let tx = self.action_tx.clone();
            tokio::spawn(async move {
                crate::data_bridge::spawn_data_bridge(session, controller, tx, cancel).await;
            })
        };

        let mut events = EventReader::new(
            Duration::from_millis(250), // 4 Hz tick
            Duration::from_millis(33),  // ~30 FPS render
        );

        info!(site = self.controller.site_id(), "TUI event loop started");

        while self.running {
            let Some(event) = events.next().await else {
                break;
            };

            match event {
                Event::Key(key) => {
                    if let Some(action) = self.handle_key_event(key)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Paste(text) => {
                    if let Some(action) = self.handle_paste(&text)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Resize(w, h) => self.action_tx.send(Action::Resize(w, h))?,
                Event::Tick => self.action_tx.send(Action::Tick)?,
                Event::Render => self.action_tx.send(Action::Render)?,
            }

            while let Ok(action) = self.action_rx.try_recv() {
                let render = matches!(action, Action::Render);
                self.process_action(action)?;

                if render {
                    tui.draw(|frame| self.render(frame))?;
                }
            }
        }

        // Answer any open modal so the waiting removal can finish.
        if let Some(pending) = self.pending_confirm.take() {
            pending.resolve(ConfirmOutcome::Dismissed);
        }
        self.data_cancel.cancel();
        events.stop();
        if tokio::time::timeout(BRIDGE_SHUTDOWN, bridge).await.is_err() {
            warn!("data bridge did not shut down in time");
        }
        info!("TUI event loop ended");
        Ok(())
    }

    // ── Input ────────────────────────────────────────────────────────

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Ok(Some(Action::Quit));
        }

        if self.pending_confirm.is_some() {
            let outcome = match key.code {
                KeyCode::Char('y' | 'Y') | KeyCode::Enter => Some(ConfirmOutcome::Confirmed),
                KeyCode::Char('n' | 'N') => Some(ConfirmOutcome::Cancelled),
                KeyCode::Esc => Some(ConfirmOutcome::Dismissed),
                _ => None,
            };
            return Ok(outcome.map(Action::ConfirmAnswer));
        }

        if self.acknowledgement.is_some() {
            return Ok(Some(Action::DismissAcknowledgement));
        }

        if self.help_visible {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?' | 'q')) {
                return Ok(Some(Action::ToggleHelp));
            }
            return Ok(None);
        }

        if !self.screen.captures_text() {
            match key.code {
                KeyCode::Char('q') => return Ok(Some(Action::Quit)),
                KeyCode::Char('?') => return Ok(Some(Action::ToggleHelp)),
                _ => {}
            }
        }

        self.screen.handle_key_event(key)
    }

    fn handle_paste(&mut self, text: &str) -> Result<Option<Action>> {
        let modal_open = self.pending_confirm.is_some()
            || self.acknowledgement.is_some()
            || self.help_visible;
        if modal_open || !self.screen.captures_text() {
            return Ok(None);
        }
        self.screen.handle_paste(text)
    }

    // ── Dispatch ─────────────────────────────────────────────────────

    fn process_action(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Quit => self.running = false,
            Action::Tick => {
                if self
                    .notification
                    .as_ref()
                    .is_some_and(|(_, shown)| shown.elapsed() >= NOTIFICATION_TTL)
                {
                    self.notification = None;
                }
            }
            Action::Render | Action::Resize(..) => {}

            Action::Connecting => self.connection_status = ConnectionStatus::Connecting,
            Action::Connected => {
                self.connection_status = ConnectionStatus::Connected;
                self.connection_error = None;
            }
            Action::Reconnecting(attempt) => {
                self.connection_status = ConnectionStatus::Reconnecting(attempt);
            }
            Action::Disconnected(reason) => {
                warn!(%reason, "store connection lost");
                self.connection_status = ConnectionStatus::Disconnected;
                self.connection_error = Some(reason);
            }

            Action::EditNewCaseName(name) => self.controller.set_new_case_name(name),
            Action::AddCase(name) => self.add_case(&name),
            Action::RequestRemove(id) => {
                let controller = Arc::clone(&self.controller);
                let tx = self.action_tx.clone();
                tokio::spawn(async move {
                    match controller.remove_case(&id).await {
                        Ok(RemoveOutcome::Removed) => debug!(case = %id, "case removed"),
                        Ok(RemoveOutcome::Kept) => {
                            let _ = tx.send(Action::Notify(Notification::info(format!(
                                "Case '{id}' kept"
                            ))));
                        }
                        Err(e) => {
                            let _ = tx.send(Action::Notify(Notification::error(format!(
                                "Remove failed: {e}"
                            ))));
                        }
                    }
                });
            }

            Action::ShowConfirm(pending) => {
                if let Some(previous) = self.pending_confirm.replace(pending) {
                    previous.resolve(ConfirmOutcome::Dismissed);
                }
            }
            Action::ConfirmAnswer(outcome) => {
                if let Some(pending) = self.pending_confirm.take() {
                    pending.resolve(outcome);
                }
            }
            Action::Acknowledge(message) => self.acknowledgement = Some(message),
            Action::DismissAcknowledgement => self.acknowledgement = None,
            Action::Notify(notification) => {
                self.notification = Some((notification, Instant::now()));
            }
            Action::ToggleHelp => self.help_visible = !self.help_visible,

            bound @ (Action::SiteUpdated(_)
            | Action::AlertChanged(_)
            | Action::NewCaseNameChanged(_)) => {
                if let Some(follow_up) = self.screen.update(&bound)? {
                    self.action_tx.send(follow_up)?;
                }
            }
        }
        Ok(())
    }

    fn add_case(&mut self, name: &str) {
        match self.controller.add_case(Some(name)) {
            Ok(id) => debug!(case = %id, "case queued"),
            // The controller already raised the danger alert.
            Err(CoreError::CaseNameRejected { .. }) => {}
            Err(e) => {
                self.notification = Some((
                    Notification::error(format!("Add failed: {e}")),
                    Instant::now(),
                ));
            }
        }
    }

    // ── Rendering ────────────────────────────────────────────────────

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        let layout = Layout::vertical([
            Constraint::Min(1),    // content
            Constraint::Length(1), // status bar
        ])
        .split(area);

        self.screen.render(frame, layout[0]);
        self.render_status_bar(frame, layout[1]);

        if let Some((notif, _)) = &self.notification {
            Self::render_notification(frame, area, notif);
        }
        if let Some(message) = &self.acknowledgement {
            dialog::render_acknowledgement(frame, area, message);
        }
        if let Some(pending) = &self.pending_confirm {
            dialog::render_confirm(frame, area, &pending.request);
        }
        if self.help_visible {
            Self::render_help_overlay(frame, area);
        }
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let connection_indicator = match &self.connection_status {
            ConnectionStatus::Connected => {
                Span::styled("● connected", Style::default().fg(theme::SUCCESS))
            }
            ConnectionStatus::Disconnected => {
                Span::styled("○ disconnected", Style::default().fg(theme::DANGER))
            }
            ConnectionStatus::Reconnecting(attempt) => Span::styled(
                format!("◐ reconnecting ({attempt})"),
                Style::default().fg(theme::WARNING),
            ),
            ConnectionStatus::Connecting => {
                Span::styled("◐ connecting", Style::default().fg(theme::WARNING))
            }
        };

        let mut spans = vec![
            Span::raw(" "),
            connection_indicator,
            Span::styled(
                format!(" │ {} ", self.session.config().root),
                theme::key_hint(),
            ),
        ];
        if let Some(err) = &self.connection_error {
            spans.push(Span::styled(
                format!("│ {err}"),
                Style::default().fg(theme::DANGER),
            ));
        }

        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_help_overlay(frame: &mut Frame, area: Rect) {
        let help_width = 50u16.min(area.width.saturating_sub(4));
        let help_height = 16u16.min(area.height.saturating_sub(4));
        let x = (area.width.saturating_sub(help_width)) / 2;
        let y = (area.height.saturating_sub(help_height)) / 2;
        let help_area = Rect::new(area.x + x, area.y + y, help_width, help_height);

        frame.render_widget(Clear, help_area);

        let block = Block::default()
            .title(" Keyboard Shortcuts ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused())
            .style(Style::default().bg(theme::SURFACE));

        let entry = |key: &'static str, label: &'static str| {
            Line::from(vec![
                Span::styled(format!("  {key:<10}"), theme::key_hint_key()),
                Span::styled(label, theme::key_hint()),
            ])
        };
        let heading = |text: &'static str| {
            Line::from(Span::styled(text, Style::default().fg(theme::HIGHLIGHT)))
        };

        let help_text = vec![
            Line::from(""),
            heading("  New case"),
            entry("Enter", "Add the typed name"),
            entry("Tab/Esc", "Move to the case list"),
            entry("Ctrl+U", "Clear the field"),
            Line::from(""),
            heading("  Case list"),
            entry("j/k ↑/↓", "Move up/down"),
            entry("g/G", "Top / bottom"),
            entry("d/Del", "Delete selected case"),
            entry("a/Tab", "Back to the name field"),
            Line::from(""),
            heading("  Global"),
            entry("?", "This help"),
            entry("q/Ctrl+C", "Quit"),
        ];

        frame.render_widget(Paragraph::new(help_text).block(block), help_area);
    }

    fn render_notification(frame: &mut Frame, area: Rect, notif: &Notification) {
        let msg_len = u16::try_from(notif.message.chars().count()).unwrap_or(u16::MAX);
        let width = msg_len
            .saturating_add(6)
            .clamp(20, 60)
            .min(area.width.saturating_sub(2));
        let height = 3u16;

        let x = area.width.saturating_sub(width + 1);
        let y = area.height.saturating_sub(height + 2); // above status bar
        let toast_area = Rect::new(area.x + x, area.y + y, width, height);

        let (border_color, icon) = match notif.level {
            NotificationLevel::Error => (theme::DANGER, "✗"),
            NotificationLevel::Info => (theme::HIGHLIGHT, "·"),
        };

        frame.render_widget(Clear, toast_area);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(border_color))
            .style(Style::default().bg(theme::SURFACE));

        let inner = block.inner(toast_area);
        frame.render_widget(block, toast_area);

        let line = Line::from(vec![
            Span::styled(format!(" {icon} "), Style::default().fg(border_color)),
            Span::styled(notif.message.as_str(), Style::default().fg(theme::TEXT)),
        ]);
        frame.render_widget(Paragraph::new(line), inner);
    }
}
