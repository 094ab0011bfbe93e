//! Toast notification overlay.
//!
//! One toast at a time, bottom-right, replacing whatever was showing.
//! The app auto-dismisses it after a few seconds.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap};

use folio_core::{Notification, Severity};

use crate::theme;

/// Render the active notification into the bottom-right corner of `area`.
pub fn render_toast(frame: &mut Frame, area: Rect, notification: &Notification) {
    let (color, title) = match notification.severity {
        Severity::Info => (theme::INK_BLUE, " info "),
        Severity::Success => (theme::SUCCESS_GREEN, " ok "),
        Severity::Error => (theme::ERROR_RED, " error "),
    };

    let msg_len = u16::try_from(notification.message.len()).unwrap_or(u16::MAX);
    let width = msg_len
        .saturating_add(4)
        .clamp(24, area.width.saturating_sub(4).max(24))
        .min(60);
    let lines = msg_len / width.saturating_sub(2).max(1) + 1;
    let height = lines.saturating_add(2).min(6);

    let x = area.right().saturating_sub(width + 1);
    let y = area.bottom().saturating_sub(height + 1);
    let toast_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, toast_area);

    let block = Block::default()
        .title(title)
        .title_style(Style::default().fg(color))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color));

    let body = Paragraph::new(Line::from(notification.message.clone()))
        .style(Style::default().fg(theme::PARCHMENT))
        .wrap(Wrap { trim: true })
        .block(block);

    frame.render_widget(body, toast_area);
}
