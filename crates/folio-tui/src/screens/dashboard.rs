//! Dashboard — entity counts and loan health at a glance.
//!
//! All numbers come straight from list metadata; nothing is computed
//! client-side beyond rendering.

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use folio_core::{ApiClient, ListQuery};

use crate::action::{Action, DashboardStats};
use crate::component::Component;
use crate::screen::ScreenId;
use crate::theme;

pub struct DashboardScreen {
    client: ApiClient,
    action_tx: Option<UnboundedSender<Action>>,
    focused: bool,
    stats: Option<DashboardStats>,
    loading: bool,
}

impl DashboardScreen {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            action_tx: None,
            focused: false,
            stats: None,
            loading: false,
        }
    }

    /// Fetch entity counts. Six cheap single-row list calls; the totals
    /// ride in on pagination meta, falling back to the row count for
    /// endpoints that reply with bare arrays.
    fn spawn_fetch(&mut self) {
        if self.loading {
            return;
        }
        self.loading = true;
        let Some(tx) = self.action_tx.clone() else {
            return;
        };
        let client = self.client.clone();
        tokio::spawn(async move {
            let count = |endpoint: &'static str| {
                let client = client.clone();
                async move {
                    match client
                        .list_page(endpoint, &ListQuery::new().page(1).per_page(1))
                        .await
                    {
                        Ok(page) => page
                            .meta
                            .and_then(|m| m.total_data)
                            .unwrap_or(page.records.len() as u64),
                        Err(e) => {
                            warn!(endpoint, error = %e, "dashboard count failed");
                            0
                        }
                    }
                }
            };

            let (books, borrowers, loans, products, categories, overdue_loans) = tokio::join!(
                count("/books"),
                count("/borrowers"),
                count("/loans"),
                count("/products"),
                count("/categories"),
                count("/loans/overdue"),
            );

            let _ = tx.send(Action::StatsUpdated(DashboardStats {
                books,
                borrowers,
                loans,
                products,
                categories,
                overdue_loans,
            }));
        });
    }

    fn render_card(
        frame: &mut Frame,
        area: Rect,
        title: &str,
        value: Option<u64>,
        color: Color,
        hint: &str,
    ) {
        let block = Block::default()
            .title(format!(" {title} "))
            .title_style(Style::default().fg(color))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_default());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let value_text = value.map_or_else(|| "—".to_owned(), |v| v.to_string());
        let lines = vec![
            Line::from(Span::styled(
                value_text,
                Style::default()
                    .fg(color)
                    .add_modifier(ratatui::style::Modifier::BOLD),
            )),
            Line::from(Span::styled(hint.to_owned(), theme::key_hint())),
        ];
        frame.render_widget(Paragraph::new(lines), inner);
    }
}

impl Component for DashboardScreen {
    fn init(&mut self, action_tx: UnboundedSender<Action>) -> Result<()> {
        self.action_tx = Some(action_tx);
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if key.code == KeyCode::Char('r') {
            self.spawn_fetch();
        }
        Ok(None)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::StatsUpdated(stats) => {
                self.stats = Some(*stats);
                self.loading = false;
            }
            Action::SwitchScreen(ScreenId::Dashboard) | Action::LoggedIn => {
                self.spawn_fetch();
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Dashboard ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if self.focused {
                theme::border_focused()
            } else {
                theme::border_default()
            });
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::vertical([
            Constraint::Length(4),
            Constraint::Length(4),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(inner);

        let top = Layout::horizontal([
            Constraint::Percentage(33),
            Constraint::Percentage(33),
            Constraint::Percentage(34),
        ])
        .split(rows[0]);
        let bottom = Layout::horizontal([
            Constraint::Percentage(33),
            Constraint::Percentage(33),
            Constraint::Percentage(34),
        ])
        .split(rows[1]);

        let s = self.stats;
        Self::render_card(
            frame,
            top[0],
            "Books",
            s.map(|s| s.books),
            theme::INK_BLUE,
            "titles in the catalog",
        );
        Self::render_card(
            frame,
            top[1],
            "Borrowers",
            s.map(|s| s.borrowers),
            theme::INK_BLUE,
            "registered borrowers",
        );
        Self::render_card(
            frame,
            top[2],
            "Loans",
            s.map(|s| s.loans),
            theme::SPINE_GOLD,
            "all loans on record",
        );
        Self::render_card(
            frame,
            bottom[0],
            "Overdue",
            s.map(|s| s.overdue_loans),
            theme::ERROR_RED,
            "loans past their deadline",
        );
        Self::render_card(
            frame,
            bottom[1],
            "Products",
            s.map(|s| s.products),
            theme::PARCHMENT,
            "retail products",
        );
        Self::render_card(
            frame,
            bottom[2],
            "Categories",
            s.map(|s| s.categories),
            theme::PARCHMENT,
            "product categories",
        );

        let status = if self.loading {
            "fetching counts…"
        } else {
            ""
        };
        frame.render_widget(
            Paragraph::new(Span::styled(status, theme::key_hint())),
            rows[2],
        );

        let hints = Line::from(vec![
            Span::styled("  r ", theme::key_hint_key()),
            Span::styled("refresh  ", theme::key_hint()),
            Span::styled("2-6 ", theme::key_hint_key()),
            Span::styled("open a resource screen", theme::key_hint()),
        ]);
        frame.render_widget(Paragraph::new(hints), rows[3]);
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    fn id(&self) -> &str {
        "Dashboard"
    }
}
