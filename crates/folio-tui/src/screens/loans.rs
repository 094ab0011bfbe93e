//! Loans screen — the specialized table with dependent-entity search.
//!
//! Layers the loan-specific flows over the generic table: status
//! sub-views, a create/edit dialog with two debounced typeahead panes
//! (book, borrower), and the return/mark-overdue actions with their
//! status gating.

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
    Dependent, ListMeta, LoanController, LoanView, Record, book_label, borrower_label,
};

use crate::action::{Action, ConfirmAction};
use crate::component::Component;
use crate::screen::ScreenId;
use crate::theme;
use crate::widgets::{centered_rect, sub_tabs};

/// Max typeahead options shown per pane.
const OPTION_ROWS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormFocus {
    Book,
    Borrower,
    Deadline,
}

impl FormFocus {
    fn next(self) -> Self {
        match self {
            Self::Book => Self::Borrower,
            Self::Borrower => Self::Deadline,
            Self::Deadline => Self::Book,
        }
    }

    fn prev(self) -> Self {
        match self {
            Self::Book => Self::Deadline,
            Self::Borrower => Self::Book,
            Self::Deadline => Self::Borrower,
        }
    }
}

struct LoanFormState {
    focus: FormFocus,
    book_input: Input,
    borrower_input: Input,
    deadline_input: Input,
    book_cursor: usize,
    borrower_cursor: usize,
}

impl LoanFormState {
    fn new(deadline: String) -> Self {
        Self {
            focus: FormFocus::Book,
            book_input: Input::default(),
            borrower_input: Input::default(),
            deadline_input: Input::new(deadline),
            book_cursor: 0,
            borrower_cursor: 0,
        }
    }
}

pub struct LoansScreen {
    controller: LoanController,
    action_tx: Option<UnboundedSender<Action>>,
    focused: bool,
    rows: Arc<Vec<Record>>,
    meta: Option<ListMeta>,
    busy: bool,
    table_state: TableState,
    book_options: Arc<Vec<Record>>,
    borrower_options: Arc<Vec<Record>>,
    book_searching: bool,
    borrower_searching: bool,
    form: Option<LoanFormState>,
    pending_delete: Option<String>,
}

impl LoansScreen {
    pub fn new(controller: LoanController) -> Self {
        let mut table_state = TableState::default();
        table_state.select(Some(0));
        Self {
            controller,
            action_tx: None,
            focused: false,
            rows: Arc::new(Vec::new()),
            meta: None,
            busy: false,
            table_state,
            book_options: Arc::new(Vec::new()),
            borrower_options: Arc::new(Vec::new()),
            book_searching: false,
            borrower_searching: false,
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
        self.table_state
            .select(usize::try_from((current + delta).clamp(0, max)).ok());
    }

    fn spawn_refresh(&self) {
        let controller = self.controller.clone();
        tokio::spawn(async move {
            controller.table().refresh().await;
        });
    }

    fn cycle_view(&self) {
        let views = LoanView::ALL;
        let idx = views
            .iter()
            .position(|&v| v == self.controller.view())
            .unwrap_or(0);
        let next = views[(idx + 1) % views.len()];
        let controller = self.controller.clone();
        tokio::spawn(async move {
            controller.set_view(next).await;
        });
    }

    fn open_create_form(&mut self) {
        self.controller.begin_create();
        let deadline = self
            .controller
            .table()
            .session()
            .values()
            .map(|v| v.display("return_deadline"))
            .unwrap_or_default();
        self.form = Some(LoanFormState::new(deadline));
    }

    fn open_edit_form(&mut self, record: Record) {
        let deadline = record.display("return_deadline");
        // Open the session now so the dialog shows this frame; the
        // controller re-opens it and hydrates the chips in the
        // background. Hydration failures degrade to empty selections
        // and never block the dialog.
        self.controller.table().begin_edit(&record);
        self.form = Some(LoanFormState::new(deadline));
        let controller = self.controller.clone();
        tokio::spawn(async move {
            controller.begin_edit(&record).await;
        });
    }

    // ── Form key handling ────────────────────────────────────────

    fn options_for(&self, which: Dependent) -> &Arc<Vec<Record>> {
        match which {
            Dependent::Book => &self.book_options,
            Dependent::Borrower => &self.borrower_options,
        }
    }

    #[allow(clippy::too_many_lines)]
    fn handle_form_key(&mut self, key: KeyEvent) -> Option<Action> {
        if self.controller.table().session().is_submitting() {
            return None;
        }
        let focus = self.form.as_ref()?.focus;

        match key.code {
            KeyCode::Esc => {
                self.controller.cancel();
                self.form = None;
                return None;
            }
            KeyCode::Tab => {
                if let Some(form) = self.form.as_mut() {
                    form.focus = form.focus.next();
                }
                return None;
            }
            KeyCode::BackTab => {
                if let Some(form) = self.form.as_mut() {
                    form.focus = form.focus.prev();
                }
                return None;
            }
            _ => {}
        }

        match focus {
            FormFocus::Book | FormFocus::Borrower => {
                let which = if focus == FormFocus::Book {
                    Dependent::Book
                } else {
                    Dependent::Borrower
                };
                let options = match which {
                    Dependent::Book => self.book_options.clone(),
                    Dependent::Borrower => self.borrower_options.clone(),
                };
                let form = self.form.as_mut()?;
                let (input, cursor) = if which == Dependent::Book {
                    (&mut form.book_input, &mut form.book_cursor)
                } else {
                    (&mut form.borrower_input, &mut form.borrower_cursor)
                };

                match key.code {
                    KeyCode::Down => {
                        if !options.is_empty() {
                            *cursor = (*cursor + 1).min(options.len() - 1);
                        }
                    }
                    KeyCode::Up => {
                        *cursor = cursor.saturating_sub(1);
                    }
                    KeyCode::Enter => {
                        if let Some(record) = options.get(*cursor).cloned() {
                            self.controller.select(which, Some(record));
                        }
                    }
                    _ => {
                        input.handle_event(&crossterm::event::Event::Key(key));
                        let text = input.value().to_owned();
                        *cursor = 0;
                        self.controller.set_search_text(which, &text);
                    }
                }
            }
            FormFocus::Deadline => match key.code {
                KeyCode::Enter => {
                    let controller = self.controller.clone();
                    tokio::spawn(async move {
                        controller.submit().await;
                    });
                }
                _ => {
                    let form = self.form.as_mut()?;
                    form.deadline_input
                        .handle_event(&crossterm::event::Event::Key(key));
                    let value =
                        serde_json::Value::String(form.deadline_input.value().to_owned());
                    self.controller.table().set_field("return_deadline", value);
                }
            },
        }
        None
    }

    // ── Rendering ────────────────────────────────────────────────

    fn render_table(&self, frame: &mut Frame, area: Rect) {
        let descriptor = self.controller.table().descriptor();

        let title = if self.busy {
            " Loans · loading… ".to_owned()
        } else {
            let total = self
                .meta
                .as_ref()
                .and_then(|m| m.total_data)
                .unwrap_or(self.rows.len() as u64);
            format!(" Loans · {total} total ")
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

        let layout = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(inner);

        // Status sub-views
        let labels: Vec<&str> = LoanView::ALL.iter().map(|v| v.label()).collect();
        let active = LoanView::ALL
            .iter()
            .position(|&v| v == self.controller.view())
            .unwrap_or(0);
        frame.render_widget(
            Paragraph::new(sub_tabs::render_sub_tabs(&labels, active)),
            layout[0],
        );

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
                            let text = if col.field.ends_with("_at")
                                || col.field == "return_deadline"
                            {
                                super::resource::fmt_timestamp(&raw)
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
        frame.render_stateful_widget(table, layout[1], &mut state);

        let hints = Line::from(vec![
            Span::styled("  j/k ", theme::key_hint_key()),
            Span::styled("navigate  ", theme::key_hint()),
            Span::styled("f ", theme::key_hint_key()),
            Span::styled("view  ", theme::key_hint()),
            Span::styled("a ", theme::key_hint_key()),
            Span::styled("add  ", theme::key_hint()),
            Span::styled("e ", theme::key_hint_key()),
            Span::styled("edit  ", theme::key_hint()),
            Span::styled("d ", theme::key_hint_key()),
            Span::styled("delete  ", theme::key_hint()),
            Span::styled("R ", theme::key_hint_key()),
            Span::styled("return  ", theme::key_hint()),
            Span::styled("O ", theme::key_hint_key()),
            Span::styled("overdue  ", theme::key_hint()),
            Span::styled("r ", theme::key_hint_key()),
            Span::styled("refresh", theme::key_hint()),
        ]);
        frame.render_widget(Paragraph::new(hints), layout[2]);
    }

    #[allow(clippy::too_many_lines)]
    fn render_form(&self, frame: &mut Frame, area: Rect, form: &LoanFormState) {
        let session = self.controller.table().session();
        let overlay = centered_rect(area, 76, 22);
        frame.render_widget(Clear, overlay);

        let title = if session.is_submitting() {
            " saving loan… "
        } else if session.is_editing() {
            " Edit Loan "
        } else {
            " Create New Loan "
        };

        let block = Block::default()
            .title(title)
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Double)
            .border_style(theme::border_focused());
        let inner = block.inner(overlay);
        frame.render_widget(block, overlay);

        let rows = Layout::vertical([
            Constraint::Min(10),
            Constraint::Length(3),
            Constraint::Length(2),
        ])
        .split(inner);
        let panes =
            Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(rows[0]);

        self.render_search_pane(frame, panes[0], form, Dependent::Book);
        self.render_search_pane(frame, panes[1], form, Dependent::Borrower);

        // Deadline field
        let deadline_focused = form.focus == FormFocus::Deadline && !session.is_submitting();
        let deadline_block = Block::default()
            .title(" Return Deadline ")
            .title_style(if deadline_focused {
                theme::field_focused()
            } else {
                theme::field_label()
            })
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if deadline_focused {
                theme::border_focused()
            } else {
                theme::border_default()
            });
        let deadline_inner = deadline_block.inner(rows[1]);
        frame.render_widget(deadline_block, rows[1]);
        let deadline_text = if deadline_focused {
            format!("{}▌", form.deadline_input.value())
        } else {
            form.deadline_input.value().to_owned()
        };
        frame.render_widget(
            Paragraph::new(deadline_text).style(theme::field_value()),
            deadline_inner,
        );

        // Guard status + hints
        let guard = if session.is_editing() || self.controller.can_submit() {
            Span::styled("ready to save", theme::field_focused())
        } else {
            Span::styled(
                "select a book and a borrower to enable saving",
                theme::key_hint(),
            )
        };
        let lines = vec![
            Line::from(guard),
            Line::from(vec![
                Span::styled("Tab ", theme::key_hint_key()),
                Span::styled("pane  ", theme::key_hint()),
                Span::styled("↑/↓ ", theme::key_hint_key()),
                Span::styled("option  ", theme::key_hint()),
                Span::styled("Enter ", theme::key_hint_key()),
                Span::styled("select / save  ", theme::key_hint()),
                Span::styled("Esc ", theme::key_hint_key()),
                Span::styled("cancel", theme::key_hint()),
            ]),
        ];
        frame.render_widget(Paragraph::new(lines), rows[2]);
    }

    fn render_search_pane(
        &self,
        frame: &mut Frame,
        area: Rect,
        form: &LoanFormState,
        which: Dependent,
    ) {
        let (title, input, cursor, searching) = match which {
            Dependent::Book => (
                " Select Book ",
                &form.book_input,
                form.book_cursor,
                self.book_searching,
            ),
            Dependent::Borrower => (
                " Select Borrower ",
                &form.borrower_input,
                form.borrower_cursor,
                self.borrower_searching,
            ),
        };
        let pane_focus = match which {
            Dependent::Book => form.focus == FormFocus::Book,
            Dependent::Borrower => form.focus == FormFocus::Borrower,
        };

        let block = Block::default()
            .title(title)
            .title_style(if pane_focus {
                theme::field_focused()
            } else {
                theme::field_label()
            })
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if pane_focus {
                theme::border_focused()
            } else {
                theme::border_default()
            });
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let mut lines = Vec::new();

        // Query line
        let query = if pane_focus {
            format!("? {}▌", input.value())
        } else {
            format!("? {}", input.value())
        };
        lines.push(Line::from(Span::styled(query, theme::field_value())));

        // Option list (or guidance)
        let options = self.options_for(which);
        if searching {
            lines.push(Line::from(Span::styled("searching…", theme::key_hint())));
        } else if options.is_empty() {
            let hint = if input.value().chars().count() < folio_core::SEARCH_MIN_CHARS {
                "type at least 3 characters to search"
            } else {
                "no matches"
            };
            lines.push(Line::from(Span::styled(hint, theme::key_hint())));
        } else {
            for (idx, option) in options.iter().take(OPTION_ROWS).enumerate() {
                let label = match which {
                    Dependent::Book => book_label(option),
                    Dependent::Borrower => borrower_label(option),
                };
                let style = if pane_focus && idx == cursor {
                    theme::table_selected()
                } else {
                    theme::table_row()
                };
                lines.push(Line::from(Span::styled(format!("  {label}"), style)));
            }
        }

        // Selected chip
        if let Some(selected) = self.controller.selected(which) {
            lines.push(Line::from(""));
            let chip = match which {
                Dependent::Book => format!(
                    "✓ {}  avail {}/{}",
                    book_label(&selected),
                    selected.display("available_stock"),
                    selected.display("stock"),
                ),
                Dependent::Borrower => format!("✓ {}", borrower_label(&selected)),
            };
            lines.push(Line::from(Span::styled(
                chip,
                ratatui::style::Style::default().fg(theme::SUCCESS_GREEN),
            )));
        }

        frame.render_widget(Paragraph::new(lines), inner);
    }
}

impl Component for LoansScreen {
    fn init(&mut self, action_tx: UnboundedSender<Action>) -> Result<()> {
        self.action_tx = Some(action_tx);
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.form.is_some() {
            return Ok(self.handle_form_key(key));
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
            KeyCode::Char('a') => self.open_create_form(),
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(record) = self.selected_record() {
                    self.open_edit_form(record);
                }
            }
            KeyCode::Char('d') => {
                if let Some(record) = self.selected_record() {
                    if let Some(id) = record.id_segment() {
                        self.pending_delete = Some(id.clone());
                        return Ok(Some(Action::ShowConfirm(ConfirmAction::DeleteRecord {
                            screen: ScreenId::Loans,
                            id: id.clone(),
                            label: format!("this loan (#{id})"),
                        })));
                    }
                }
            }
            KeyCode::Char('R') => {
                // Unavailable once returned — gated here at the call site.
                if let Some(record) = self.selected_record() {
                    if LoanController::can_return(&record) {
                        if let Some(id) = record.id_segment() {
                            let controller = self.controller.clone();
                            tokio::spawn(async move {
                                controller.return_book(&id).await;
                            });
                        }
                    }
                }
            }
            KeyCode::Char('O') => {
                if let Some(record) = self.selected_record() {
                    if LoanController::can_mark_overdue(&record) {
                        if let Some(id) = record.id_segment() {
                            let controller = self.controller.clone();
                            tokio::spawn(async move {
                                controller.mark_overdue(&id).await;
                            });
                        }
                    }
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::RowsUpdated(ScreenId::Loans, rows) => {
                self.rows = rows.clone();
                let max = self.rows.len().saturating_sub(1);
                if self.table_state.selected().unwrap_or(0) > max {
                    self.table_state.select(Some(max));
                }
            }
            Action::MetaUpdated(ScreenId::Loans, meta) => {
                self.meta = meta.clone();
            }
            Action::BusyUpdated(ScreenId::Loans, busy) => {
                self.busy = *busy;
            }
            Action::SearchOptionsUpdated(which, options) => match which {
                Dependent::Book => {
                    self.book_options = options.clone();
                    if let Some(form) = self.form.as_mut() {
                        form.book_cursor = 0;
                    }
                }
                Dependent::Borrower => {
                    self.borrower_options = options.clone();
                    if let Some(form) = self.form.as_mut() {
                        form.borrower_cursor = 0;
                    }
                }
            },
            Action::SearchingUpdated(which, searching) => match which {
                Dependent::Book => self.book_searching = *searching,
                Dependent::Borrower => self.borrower_searching = *searching,
            },
            Action::SwitchScreen(ScreenId::Loans) => self.spawn_refresh(),
            Action::ConfirmYes => {
                if let Some(id) = self.pending_delete.take() {
                    let controller = self.controller.clone();
                    tokio::spawn(async move {
                        controller.table().remove(&id).await;
                    });
                }
            }
            Action::ConfirmNo => {
                self.pending_delete = None;
            }
            Action::Tick => {
                if self.form.is_some() && !self.controller.table().session().is_open() {
                    self.form = None;
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        self.render_table(frame, area);
        if self.controller.table().session().is_open() {
            if let Some(form) = self.form.as_ref() {
                self.render_form(frame, area, form);
            }
        }
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    fn wants_exclusive_input(&self) -> bool {
        self.form.is_some()
    }

    fn id(&self) -> &str {
        "Loans"
    }
}
