//! Cases screen -- new-case input, alert banner, and the live case list.

use std::sync::Arc;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Position, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, TableState};
use tui_input::{Input, InputRequest};

use relevancy_core::{Alert, Case, CaseId, Site};

use crate::action::Action;
use crate::component::Component;
use crate::theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Input,
    List,
}

pub struct CasesScreen {
    site: Arc<Site>,
    /// Display order: unprioritized first, then newest first.
    cases: Vec<(CaseId, Case)>,
    table_state: TableState,
    input: Input,
    focus: Focus,
    alert: Option<Alert>,
}

impl CasesScreen {
    pub fn new(site_id: &str) -> Self {
        Self {
            site: Arc::new(Site::empty(site_id)),
            cases: Vec::new(),
            table_state: TableState::default(),
            input: Input::default(),
            focus: Focus::Input,
            alert: None,
        }
    }

    fn set_site(&mut self, site: Arc<Site>) {
        self.cases = site
            .ordered_cases()
            .into_iter()
            .map(|(id, case)| (id.clone(), case.clone()))
            .collect();
        self.site = site;

        let selected = self.table_state.selected().unwrap_or(0);
        if self.cases.is_empty() {
            self.table_state.select(None);
        } else {
            self.table_state
                .select(Some(selected.min(self.cases.len() - 1)));
        }
    }

    fn selected_case(&self) -> Option<&CaseId> {
        self.table_state
            .selected()
            .and_then(|i| self.cases.get(i))
            .map(|(id, _)| id)
    }

    fn move_selection(&mut self, delta: isize) {
        if self.cases.is_empty() {
            return;
        }
        let current = self.table_state.selected().unwrap_or(0);
        let next = current
            .saturating_add_signed(delta)
            .min(self.cases.len() - 1);
        self.table_state.select(Some(next));
    }

    fn handle_input_key(&mut self, key: KeyEvent) -> Option<Action> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let request = match key.code {
            KeyCode::Enter => return Some(Action::AddCase(self.input.value().to_owned())),
            KeyCode::Esc | KeyCode::Tab | KeyCode::Down => {
                self.focus = Focus::List;
                if self.table_state.selected().is_none() && !self.cases.is_empty() {
                    self.table_state.select(Some(0));
                }
                return None;
            }
            KeyCode::Char('u') if ctrl => InputRequest::DeleteLine,
            KeyCode::Char('w') if ctrl => InputRequest::DeletePrevWord,
            KeyCode::Char(c) if !ctrl => InputRequest::InsertChar(c),
            KeyCode::Backspace => InputRequest::DeletePrevChar,
            KeyCode::Delete => InputRequest::DeleteNextChar,
            KeyCode::Left => InputRequest::GoToPrevChar,
            KeyCode::Right => InputRequest::GoToNextChar,
            KeyCode::Home => InputRequest::GoToStart,
            KeyCode::End => InputRequest::GoToEnd,
            _ => return None,
        };

        let before = self.input.value().to_owned();
        self.input.handle(request);
        (self.input.value() != before)
            .then(|| Action::EditNewCaseName(self.input.value().to_owned()))
    }

    fn handle_list_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('g') | KeyCode::Home => self.move_selection(isize::MIN),
            KeyCode::Char('G') | KeyCode::End => self.move_selection(isize::MAX),
            KeyCode::Char('d' | 'x') | KeyCode::Delete => {
                return self.selected_case().cloned().map(Action::RequestRemove);
            }
            KeyCode::Tab | KeyCode::Char('a' | 'i' | '/') => self.focus = Focus::Input,
            _ => {}
        }
        None
    }

    // ── Rendering ────────────────────────────────────────────────────

    fn render_input(&self, frame: &mut Frame, area: Rect) {
        let focused = self.focus == Focus::Input;
        let block = Block::default()
            .title(" New case ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if focused {
                theme::border_focused()
            } else {
                theme::border_default()
            });
        let inner = block.inner(area);

        let width = usize::from(inner.width.max(1));
        let scroll = self.input.visual_scroll(width);
        let paragraph = Paragraph::new(self.input.value())
            .style(Style::default().fg(theme::HIGHLIGHT))
            .scroll((0, u16::try_from(scroll).unwrap_or(u16::MAX)))
            .block(block);
        frame.render_widget(paragraph, area);

        if focused {
            let offset = self.input.visual_cursor().saturating_sub(scroll);
            let x = inner.x + u16::try_from(offset).unwrap_or(u16::MAX);
            frame.set_cursor_position(Position::new(x.min(inner.right()), inner.y));
        }
    }

    fn render_alert(&self, frame: &mut Frame, area: Rect) {
        let line = match &self.alert {
            Some(alert) => {
                let color = theme::alert_color(alert.is_success());
                Line::from(vec![
                    Span::styled(
                        format!(" [{}] ", alert.kind),
                        Style::default().fg(color).add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(alert.message.clone(), Style::default().fg(color)),
                ])
            }
            None => Line::from(""),
        };
        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_list(&self, frame: &mut Frame, area: Rect) {
        let focused = self.focus == Focus::List;
        let block = Block::default()
            .title(format!(
                " {} · {} cases ",
                self.site.display_name(),
                self.cases.len()
            ))
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if focused {
                theme::border_focused()
            } else {
                theme::border_default()
            });

        if self.cases.is_empty() {
            let empty = Paragraph::new(Line::from(Span::styled(
                "  No cases yet. Type a name above and press Enter.",
                theme::key_hint(),
            )))
            .block(block);
            frame.render_widget(empty, area);
            return;
        }

        let header = Row::new(vec![Cell::from("Key"), Cell::from("Name")])
            .style(theme::table_header());
        let rows = self.cases.iter().map(|(id, case)| {
            Row::new(vec![
                Cell::from(id.to_string()),
                Cell::from(case.name.clone()),
            ])
            .style(theme::table_row())
        });

        let table = Table::new(rows, [Constraint::Percentage(40), Constraint::Percentage(60)])
            .header(header)
            .block(block)
            .row_highlight_style(theme::table_selected())
            .highlight_symbol("▸ ");

        let mut state = self.table_state.clone();
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn render_hints(&self, frame: &mut Frame, area: Rect) {
        let hints: &[(&str, &str)] = match self.focus {
            Focus::Input => &[("Enter", "add"), ("Tab", "list"), ("Ctrl+C", "quit")],
            Focus::List => &[
                ("j/k", "move"),
                ("d", "delete"),
                ("a", "new case"),
                ("?", "help"),
                ("q", "quit"),
            ],
        };
        let mut spans = vec![Span::raw(" ")];
        for (key, label) in hints {
            spans.push(Span::styled(format!("{key} "), theme::key_hint_key()));
            spans.push(Span::styled(format!("{label}  "), theme::key_hint()));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}

impl Component for CasesScreen {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        Ok(match self.focus {
            Focus::Input => self.handle_input_key(key),
            Focus::List => self.handle_list_key(key),
        })
    }

    fn handle_paste(&mut self, text: &str) -> Result<Option<Action>> {
        // Case names are single-line.
        let pasted: Vec<char> = text.chars().filter(|c| !c.is_control()).collect();
        if pasted.is_empty() {
            return Ok(None);
        }
        for c in pasted {
            self.input.handle(InputRequest::InsertChar(c));
        }
        Ok(Some(Action::EditNewCaseName(self.input.value().to_owned())))
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::SiteUpdated(site) => self.set_site(Arc::clone(site)),
            Action::AlertChanged(alert) => self.alert.clone_from(alert),
            // Echoes of our own edits can lag behind typing; only the
            // controller's reset after a successful add is applied.
            Action::NewCaseNameChanged(name) if name.is_empty() => self.input.reset(),
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let layout = Layout::vertical([
            Constraint::Length(3), // input
            Constraint::Length(1), // alert
            Constraint::Min(3),    // list
            Constraint::Length(1), // hints
        ])
        .split(area);

        self.render_input(frame, layout[0]);
        self.render_alert(frame, layout[1]);
        self.render_list(frame, layout[2]);
        self.render_hints(frame, layout[3]);
    }

    fn captures_text(&self) -> bool {
        self.focus == Focus::Input
    }
}
