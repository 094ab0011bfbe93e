//! Generic resource screen — one descriptor-driven table + form dialog,
//! instantiated for books, borrowers, products, and categories. All the
//! CRUD behavior lives in `folio_core::TableController`; this component
//! only translates keys into controller calls and paints the state.

use std::sync::Arc;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, BorderType, Borders, Cell, Clear, Paragraph, Row, Table, TableState,
};
use tokio::sync::mpsc::UnboundedSender;
use tui_input::Input;
use tui_input::backend::crossterm::EventHandler;

use folio_core::{
    EditSession, FieldKind, FieldSpec, ListMeta, ListQuery, Notification, Record, TableController,
};

use crate::action::{Action, ConfirmAction};
use crate::component::Component;
use crate::screen::ScreenId;
use crate::theme;
use crate::widgets::centered_rect;

const PAGE_SIZE: u32 = 10;

/// UI-side state of the open form dialog. The form values themselves
/// live in the controller's session; this only tracks cursors.
struct FormState {
    fields: Vec<FieldSpec>,
    inputs: Vec<Input>,
    flags: Vec<bool>,
    selected: usize,
}

impl FormState {
    fn from_session(fields: Vec<FieldSpec>, values: &Record) -> Self {
        let inputs = fields
            .iter()
            .map(|f| Input::new(values.display(f.name)))
            .collect();
        let flags = fields
            .iter()
            .map(|f| {
                values
                    .get(f.name)
                    .and_then(serde_json::Value::as_bool)
                    .unwrap_or(false)
            })
            .collect();
        Self {
            fields,
            inputs,
            flags,
            selected: 0,
        }
    }

    fn next_field(&mut self) {
        self.selected = (self.selected + 1) % self.fields.len();
    }

    fn prev_field(&mut self) {
        self.selected = (self.selected + self.fields.len() - 1) % self.fields.len();
    }
}

/// Convert a form input's text into the JSON value submitted for the
/// field. Integers that parse go as numbers; everything else stays text
/// (the backend coerces the rest).
fn field_value(kind: FieldKind, text: &str) -> serde_json::Value {
    match kind {
        FieldKind::Integer => text
            .trim()
            .parse::<i64>()
            .map_or_else(|_| serde_json::Value::String(text.to_owned()), Into::into),
        _ => serde_json::Value::String(text.to_owned()),
    }
}

/// Render an ISO timestamp as `YYYY-MM-DD HH:MM`; anything unparsable
/// passes through untouched.
pub fn fmt_timestamp(raw: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(raw).map_or_else(
        |_| raw.to_owned(),
        |dt| dt.format("%Y-%m-%d %H:%M").to_string(),
    )
}

fn looks_like_timestamp(field: &str) -> bool {
    field.ends_with("_at") || field.ends_with("_deadline")
}

pub struct ResourceScreen {
    id: ScreenId,
    controller: TableController,
    action_tx: Option<UnboundedSender<Action>>,
    focused: bool,
    rows: Arc<Vec<Record>>,
    meta: Option<ListMeta>,
    busy: bool,
    table_state: TableState,
    page: u32,
    view_idx: usize,
    search_term: String,
    search_input: Option<Input>,
    form: Option<FormState>,
    pending_delete: Option<String>,
}

impl ResourceScreen {
    pub fn new(id: ScreenId, controller: TableController) -> Self {
        let mut table_state = TableState::default();
        table_state.select(Some(0));
        Self {
            id,
            controller,
            action_tx: None,
            focused: false,
            rows: Arc::new(Vec::new()),
            meta: None,
            busy: false,
            table_state,
            page: 1,
            view_idx: 0,
            search_term: String::new(),
            search_input: None,
            form: None,
            pending_delete: None,
        }
    }

    fn selected_record(&self) -> Option<Record> {
        let idx = self.table_state.selected().unwrap_or(0);
        self.rows.get(idx).cloned()
    }

    fn move_selection(&mut self, delta: i64) {
        if self.rows.is_empty() {
            return;
        }
        let current = i64::try_from(self.table_state.selected().unwrap_or(0)).unwrap_or(0);
        let max = i64::try_from(self.rows.len() - 1).unwrap_or(0);
        let next = (current + delta).clamp(0, max);
        self.table_state
            .select(usize::try_from(next).ok());
    }

    /// Rebuild the controller's query from page + search term and refresh.
    fn apply_query_and_refresh(&self) {
        let mut query = ListQuery::new().page(self.page).per_page(PAGE_SIZE);
        if !self.search_term.is_empty() {
            query = query.name_contains(&self.search_term);
        }
        self.controller.set_query(query);
        self.spawn_refresh();
    }

    fn spawn_refresh(&self) {
        let controller = self.controller.clone();
        tokio::spawn(async move {
            controller.refresh().await;
        });
    }

    /// Cycle to the next list sub-view, when the descriptor has any
    /// (e.g. the books "Available" view).
    fn cycle_view(&mut self) {
        let count = self.controller.descriptor().views.len();
        if count < 2 {
            return;
        }
        self.view_idx = (self.view_idx + 1) % count;
        let endpoint = self.controller.descriptor().views[self.view_idx].endpoint;
        self.controller.set_list_endpoint(endpoint);
        self.page = 1;
        self.apply_query_and_refresh();
    }

    fn total_pages(&self) -> u32 {
        self.meta
            .as_ref()
            .and_then(|m| m.total_page)
            .and_then(|p| u32::try_from(p).ok())
            .unwrap_or(1)
            .max(1)
    }

    fn open_form(&mut self) {
        if let Some(values) = self.controller.session().values() {
            self.form = Some(FormState::from_session(
                self.controller.descriptor().form_fields.clone(),
                values,
            ));
        }
    }

    /// Export the products CSV next to the cwd. Only wired for the
    /// products screen.
    fn spawn_export(&self) {
        let Some(tx) = self.action_tx.clone() else {
            return;
        };
        let client = self.controller.client().clone();
        tokio::spawn(async move {
            match client.export("/products/export", &ListQuery::new()).await {
                Ok(bytes) => {
                    let path = "products-export.csv";
                    match std::fs::write(path, bytes) {
                        Ok(()) => {
                            let _ = tx.send(Action::Notify(Notification::success(format!(
                                "Exported to {path}"
                            ))));
                        }
                        Err(e) => {
                            let _ = tx.send(Action::Notify(Notification::error(format!(
                                "Error writing export: {e}"
                            ))));
                        }
                    }
                }
                Err(e) => {
                    let _ = tx.send(Action::Notify(Notification::error(format!(
                        "Error exporting products: {e}"
                    ))));
                }
            }
        });
    }

    // ── Key handling ─────────────────────────────────────────────

    fn handle_form_key(&mut self, key: KeyEvent) -> Option<Action> {
        let session = self.controller.session();
        if session.is_submitting() {
            // The dialog is frozen while the request is in flight; the
            // submit outcome reopens or closes it.
            return None;
        }
        let form = self.form.as_mut()?;

        match key.code {
            KeyCode::Esc => {
                self.controller.cancel();
                self.form = None;
            }
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.prev_field(),
            KeyCode::Enter => {
                let controller = self.controller.clone();
                tokio::spawn(async move {
                    controller.submit().await;
                });
            }
            KeyCode::Char(' ')
                if form.fields.get(form.selected).map(|f| f.kind) == Some(FieldKind::Flag) =>
            {
                let idx = form.selected;
                form.flags[idx] = !form.flags[idx];
                let name = form.fields[idx].name;
                let value = serde_json::Value::Bool(form.flags[idx]);
                self.controller.set_field(name, value);
            }
            _ => {
                let idx = form.selected;
                if let Some(field) = form.fields.get(idx) {
                    if field.kind != FieldKind::Flag {
                        form.inputs[idx]
                            .handle_event(&crossterm::event::Event::Key(key));
                        let value = field_value(field.kind, form.inputs[idx].value());
                        self.controller.set_field(field.name, value);
                    }
                }
            }
        }
        None
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Option<Action> {
        let input = self.search_input.as_mut()?;
        match key.code {
            KeyCode::Esc => {
                self.search_input = None;
            }
            KeyCode::Enter => {
                self.search_term = input.value().to_owned();
                self.search_input = None;
                self.page = 1;
                self.apply_query_and_refresh();
            }
            _ => {
                input.handle_event(&crossterm::event::Event::Key(key));
            }
        }
        None
    }

    // ── Rendering ────────────────────────────────────────────────

    fn render_table(&self, frame: &mut Frame, area: Rect) {
        let descriptor = self.controller.descriptor();

        let title = if self.busy {
            format!(" {} · loading… ", descriptor.title)
        } else {
            let total = self
                .meta
                .as_ref()
                .and_then(|m| m.total_data)
                .unwrap_or(self.rows.len() as u64);
            format!(" {} · {} total ", descriptor.title, total)
        };

        let block = Block::default()
            .title(title)
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

        let has_views = descriptor.views.len() > 1;
        let layout = if has_views {
            Layout::vertical([
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(inner)
        } else {
            Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).split(inner)
        };
        let (tabs_area, table_area, hints_area) = if has_views {
            (Some(layout[0]), layout[1], layout[2])
        } else {
            (None, layout[0], layout[1])
        };

        if let Some(tabs_area) = tabs_area {
            let labels: Vec<&str> = descriptor.views.iter().map(|v| v.label).collect();
            frame.render_widget(
                Paragraph::new(crate::widgets::sub_tabs::render_sub_tabs(
                    &labels,
                    self.view_idx,
                )),
                tabs_area,
            );
        }

        let header = Row::new(
            descriptor
                .columns
                .iter()
                .map(|c| Cell::from(c.title))
                .collect::<Vec<_>>(),
        )
        .style(theme::table_header());

        let rows: Vec<Row> = self
            .rows
            .iter()
            .map(|record| {
                Row::new(
                    descriptor
                        .columns
                        .iter()
                        .map(|col| {
                            let raw = record.display(col.field);
                            let text = if looks_like_timestamp(col.field) {
                                fmt_timestamp(&raw)
                            } else {
                                raw
                            };
                            if col.field == "status" {
                                let style = theme::status_style(&text);
                                Cell::from(text).style(style)
                            } else {
                                Cell::from(text)
                            }
                        })
                        .collect::<Vec<_>>(),
                )
                .style(theme::table_row())
            })
            .collect();

        let widths: Vec<Constraint> = descriptor
            .columns
            .iter()
            .map(|c| Constraint::Length(c.width))
            .collect();

        let table = Table::new(rows, widths)
            .header(header)
            .row_highlight_style(theme::table_selected());

        let mut state = self.table_state.clone();
        frame.render_stateful_widget(table, table_area, &mut state);

        self.render_hints(frame, hints_area);
    }

    fn render_hints(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![
            Span::styled("  j/k ", theme::key_hint_key()),
            Span::styled("navigate  ", theme::key_hint()),
            Span::styled("a ", theme::key_hint_key()),
            Span::styled("add  ", theme::key_hint()),
            Span::styled("e ", theme::key_hint_key()),
            Span::styled("edit  ", theme::key_hint()),
            Span::styled("d ", theme::key_hint_key()),
            Span::styled("delete  ", theme::key_hint()),
            Span::styled("/ ", theme::key_hint_key()),
            Span::styled("search  ", theme::key_hint()),
            Span::styled("n/p ", theme::key_hint_key()),
            Span::styled(
                format!("page {}/{}  ", self.page, self.total_pages()),
                theme::key_hint(),
            ),
            Span::styled("r ", theme::key_hint_key()),
            Span::styled("refresh", theme::key_hint()),
        ];
        if self.controller.descriptor().views.len() > 1 {
            spans.push(Span::styled("  f ", theme::key_hint_key()));
            spans.push(Span::styled("view", theme::key_hint()));
        }
        if self.controller.descriptor().endpoint == "/products" {
            spans.push(Span::styled("  x ", theme::key_hint_key()));
            spans.push(Span::styled("export", theme::key_hint()));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_search_bar(&self, frame: &mut Frame, area: Rect, input: &Input) {
        let block = Block::default()
            .title(" Search (name contains) ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused());
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(
            Paragraph::new(format!("{}▌", input.value())).style(theme::field_value()),
            inner,
        );
    }

    fn render_form(&self, frame: &mut Frame, area: Rect, form: &FormState, session: &EditSession) {
        let descriptor = self.controller.descriptor();
        let field_count = u16::try_from(form.fields.len()).unwrap_or(u16::MAX);
        let overlay = centered_rect(area, 56, field_count + 6);
        frame.render_widget(Clear, overlay);

        let title = if session.is_submitting() {
            format!(" saving {}… ", descriptor.noun.to_lowercase())
        } else if session.is_editing() {
            format!(" Edit {} ", descriptor.noun)
        } else {
            format!(" Create New {} ", descriptor.noun)
        };

        let block = Block::default()
            .title(title)
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Double)
            .border_style(theme::border_focused());
        let inner = block.inner(overlay);
        frame.render_widget(block, overlay);

        let mut lines = Vec::new();
        for (idx, field) in form.fields.iter().enumerate() {
            let is_focused = idx == form.selected && !session.is_submitting();
            let marker = if is_focused { "▸ " } else { "  " };
            let label_style = if is_focused {
                theme::field_focused()
            } else {
                theme::field_label()
            };
            let required = if field.required { "*" } else { " " };
            let value = if field.kind == FieldKind::Flag {
                if form.flags.get(idx).copied().unwrap_or(false) {
                    "[x]".to_owned()
                } else {
                    "[ ]".to_owned()
                }
            } else if is_focused {
                format!("{}▌", form.inputs[idx].value())
            } else {
                form.inputs[idx].value().to_owned()
            };
            lines.push(Line::from(vec![
                Span::styled(
                    format!("{marker}{:<16}{required} ", field.label),
                    label_style,
                ),
                Span::styled(value, theme::field_value()),
            ]));
        }

        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("  Tab ", theme::key_hint_key()),
            Span::styled("next  ", theme::key_hint()),
            Span::styled("Space ", theme::key_hint_key()),
            Span::styled("toggle  ", theme::key_hint()),
            Span::styled("Enter ", theme::key_hint_key()),
            Span::styled("save  ", theme::key_hint()),
            Span::styled("Esc ", theme::key_hint_key()),
            Span::styled("cancel", theme::key_hint()),
        ]));

        frame.render_widget(Paragraph::new(lines), inner);
    }
}

impl Component for ResourceScreen {
    fn init(&mut self, action_tx: UnboundedSender<Action>) -> Result<()> {
        self.action_tx = Some(action_tx);
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.form.is_some() {
            return Ok(self.handle_form_key(key));
        }
        if self.search_input.is_some() {
            return Ok(self.handle_search_key(key));
        }

        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('g') => self.table_state.select(Some(0)),
            KeyCode::Char('G') => {
                if !self.rows.is_empty() {
                    self.table_state.select(Some(self.rows.len() - 1));
                }
            }
            KeyCode::Char('r') => self.spawn_refresh(),
            KeyCode::Char('f') => self.cycle_view(),
            KeyCode::Char('a') => {
                self.controller.begin_create();
                self.open_form();
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(record) = self.selected_record() {
                    self.controller.begin_edit(&record);
                    self.open_form();
                }
            }
            KeyCode::Char('d') => {
                if let Some(record) = self.selected_record() {
                    if let Some(id) = record.id_segment() {
                        let noun = self.controller.descriptor().noun.to_lowercase();
                        let label = format!("this {noun} (#{id})");
                        self.pending_delete = Some(id.clone());
                        return Ok(Some(Action::ShowConfirm(ConfirmAction::DeleteRecord {
                            screen: self.id,
                            id,
                            label,
                        })));
                    }
                }
            }
            KeyCode::Char('/') => {
                self.search_input = Some(Input::new(self.search_term.clone()));
            }
            KeyCode::Char('n') => {
                if self.page < self.total_pages() {
                    self.page += 1;
                    self.apply_query_and_refresh();
                }
            }
            KeyCode::Char('p') => {
                if self.page > 1 {
                    self.page -= 1;
                    self.apply_query_and_refresh();
                }
            }
            KeyCode::Char('x')
                if self.controller.descriptor().endpoint == "/products" =>
            {
                self.spawn_export();
            }
            _ => {}
        }
        Ok(None)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::RowsUpdated(screen, rows) if *screen == self.id => {
                self.rows = rows.clone();
                let max = self.rows.len().saturating_sub(1);
                if self.table_state.selected().unwrap_or(0) > max {
                    self.table_state.select(Some(max));
                }
            }
            Action::MetaUpdated(screen, meta) if *screen == self.id => {
                self.meta = meta.clone();
            }
            Action::BusyUpdated(screen, busy) if *screen == self.id => {
                self.busy = *busy;
            }
            Action::SwitchScreen(screen) if *screen == self.id => {
                self.apply_query_and_refresh();
            }
            Action::ConfirmYes => {
                if let Some(id) = self.pending_delete.take() {
                    let controller = self.controller.clone();
                    tokio::spawn(async move {
                        controller.remove(&id).await;
                    });
                }
            }
            Action::ConfirmNo => {
                self.pending_delete = None;
            }
            Action::Tick => {
                // The session closes on submit success; drop the dialog
                // cursor state with it.
                if self.form.is_some() && !self.controller.session().is_open() {
                    self.form = None;
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let (search_area, table_area) = if self.search_input.is_some() {
            let layout =
                Layout::vertical([Constraint::Length(3), Constraint::Min(5)]).split(area);
            (Some(layout[0]), layout[1])
        } else {
            (None, area)
        };

        self.render_table(frame, table_area);

        if let (Some(bar), Some(input)) = (search_area, self.search_input.as_ref()) {
            self.render_search_bar(frame, bar, input);
        }

        let session = self.controller.session();
        if session.is_open() {
            if let Some(form) = self.form.as_ref() {
                self.render_form(frame, area, form, &session);
            }
        }
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    fn wants_exclusive_input(&self) -> bool {
        self.form.is_some() || self.search_input.is_some()
    }

    fn id(&self) -> &str {
        self.controller.descriptor().title
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_render_compact() {
        assert_eq!(
            fmt_timestamp("2024-06-15T10:30:00Z"),
            "2024-06-15 10:30"
        );
        assert_eq!(fmt_timestamp("not a date"), "not a date");
        assert_eq!(fmt_timestamp(""), "");
    }

    #[test]
    fn integers_submit_as_numbers_when_parsable() {
        assert_eq!(field_value(FieldKind::Integer, "42"), serde_json::json!(42));
        assert_eq!(
            field_value(FieldKind::Integer, "4x"),
            serde_json::json!("4x")
        );
        assert_eq!(
            field_value(FieldKind::Text, "42"),
            serde_json::json!("42")
        );
    }
}
