//! Palette and semantic styling for the TUI.

use ratatui::style::{Color, Modifier, Style};

// ── Palette ───────────────────────────────────────────────────────────

pub const ACCENT: Color = Color::Rgb(189, 147, 249); // #bd93f9
pub const HIGHLIGHT: Color = Color::Rgb(139, 233, 253); // #8be9fd
pub const WARNING: Color = Color::Rgb(255, 184, 108); // #ffb86c
pub const SUCCESS: Color = Color::Rgb(80, 250, 123); // #50fa7b
pub const DANGER: Color = Color::Rgb(255, 85, 85); // #ff5555
pub const TEXT: Color = Color::Rgb(220, 222, 230); // #dcdee6
pub const MUTED: Color = Color::Rgb(110, 118, 150); // #6e7696
pub const SURFACE_RAISED: Color = Color::Rgb(52, 55, 70); // #343746
pub const SURFACE: Color = Color::Rgb(33, 34, 44); // #21222c

// ── Semantic Styles ───────────────────────────────────────────────────

pub fn title_style() -> Style {
    Style::default().fg(HIGHLIGHT).add_modifier(Modifier::BOLD)
}

pub fn border_focused() -> Style {
    Style::default().fg(ACCENT)
}

pub fn border_default() -> Style {
    Style::default().fg(MUTED)
}

pub fn table_header() -> Style {
    Style::default()
        .fg(HIGHLIGHT)
        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
}

pub fn table_row() -> Style {
    Style::default().fg(TEXT)
}

pub fn table_selected() -> Style {
    Style::default()
        .fg(ACCENT)
        .bg(SURFACE_RAISED)
        .add_modifier(Modifier::BOLD)
}

pub fn key_hint() -> Style {
    Style::default().fg(MUTED)
}

pub fn key_hint_key() -> Style {
    Style::default().fg(HIGHLIGHT).add_modifier(Modifier::BOLD)
}

/// Alert banner color for a success or danger class.
pub fn alert_color(success: bool) -> Color {
    if success { SUCCESS } else { DANGER }
}
