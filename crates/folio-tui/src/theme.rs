//! Inkwell palette and semantic styling for the console.

use ratatui::style::{Color, Modifier, Style};

// ── Core Palette ──────────────────────────────────────────────────────

pub const PARCHMENT: Color = Color::Rgb(235, 219, 178); // #ebdbb2
pub const SPINE_GOLD: Color = Color::Rgb(250, 189, 47); // #fabd2f
pub const INK_BLUE: Color = Color::Rgb(131, 165, 152); // #83a598
pub const LEATHER_RED: Color = Color::Rgb(204, 92, 75); // #cc5c4b
pub const SUCCESS_GREEN: Color = Color::Rgb(152, 195, 121); // #98c379
pub const ERROR_RED: Color = Color::Rgb(224, 108, 117); // #e06c75

// ── Extended Palette ──────────────────────────────────────────────────

pub const DIM_TEXT: Color = Color::Rgb(168, 153, 132); // #a89984
pub const BORDER_GRAY: Color = Color::Rgb(102, 92, 84); // #665c54
pub const BG_HIGHLIGHT: Color = Color::Rgb(60, 56, 54); // #3c3836

// ── Semantic Styles ───────────────────────────────────────────────────

/// Title text for blocks/panels.
pub fn title_style() -> Style {
    Style::default().fg(SPINE_GOLD).add_modifier(Modifier::BOLD)
}

/// Border for a focused panel.
pub fn border_focused() -> Style {
    Style::default().fg(SPINE_GOLD)
}

/// Border for an unfocused panel.
pub fn border_default() -> Style {
    Style::default().fg(BORDER_GRAY)
}

/// Table header row.
pub fn table_header() -> Style {
    Style::default()
        .fg(INK_BLUE)
        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
}

/// Normal table row text.
pub fn table_row() -> Style {
    Style::default().fg(PARCHMENT)
}

/// Selected / highlighted table row.
pub fn table_selected() -> Style {
    Style::default()
        .fg(SPINE_GOLD)
        .bg(BG_HIGHLIGHT)
        .add_modifier(Modifier::BOLD)
}

/// Active tab in the tab bar.
pub fn tab_active() -> Style {
    Style::default().fg(SPINE_GOLD).add_modifier(Modifier::BOLD)
}

/// Inactive tab in the tab bar.
pub fn tab_inactive() -> Style {
    Style::default().fg(DIM_TEXT)
}

/// Status bar text.
pub fn status_bar() -> Style {
    Style::default().fg(DIM_TEXT)
}

/// Key hint text (e.g., "q quit  ? help").
pub fn key_hint() -> Style {
    Style::default().fg(BORDER_GRAY)
}

/// Key hint key character.
pub fn key_hint_key() -> Style {
    Style::default().fg(INK_BLUE).add_modifier(Modifier::BOLD)
}

/// Form field label with input focus.
pub fn field_focused() -> Style {
    Style::default().fg(SPINE_GOLD).add_modifier(Modifier::BOLD)
}

/// Form field label without focus.
pub fn field_label() -> Style {
    Style::default().fg(DIM_TEXT)
}

/// Form field value text.
pub fn field_value() -> Style {
    Style::default().fg(PARCHMENT)
}

/// Style for a loan status cell.
pub fn status_style(status: &str) -> Style {
    match status {
        "active" => Style::default().fg(INK_BLUE),
        "returned" => Style::default().fg(SUCCESS_GREEN),
        "overdue" => Style::default().fg(ERROR_RED).add_modifier(Modifier::BOLD),
        _ => Style::default().fg(PARCHMENT),
    }
}
