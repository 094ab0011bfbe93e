//! Login screen — username/password → OAuth password grant.
//!
//! Entered on start when no cached session exists, and re-entered
//! whenever the gateway's 401 chokepoint tears the session down.

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph};
use secrecy::SecretString;
use tokio::sync::mpsc::UnboundedSender;
use tui_input::Input;
use tui_input::backend::crossterm::EventHandler;

use folio_core::{ApiClient, Credentials, Notification};

use crate::action::Action;
use crate::component::Component;
use crate::theme;
use crate::widgets::centered_rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Username,
    Password,
}

pub struct LoginScreen {
    client: ApiClient,
    action_tx: Option<UnboundedSender<Action>>,
    username: Input,
    password: Input,
    focus: Field,
    submitting: bool,
}

impl LoginScreen {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            action_tx: None,
            username: Input::default(),
            password: Input::default(),
            focus: Field::Username,
            submitting: false,
        }
    }

    fn spawn_login(&mut self) {
        if self.submitting || self.username.value().trim().is_empty() {
            return;
        }
        self.submitting = true;

        let Some(tx) = self.action_tx.clone() else {
            return;
        };
        let client = self.client.clone();
        let credentials = Credentials {
            username: self.username.value().trim().to_owned(),
            password: SecretString::from(self.password.value().to_owned()),
        };
        tokio::spawn(async move {
            match client.authenticate(&credentials).await {
                Ok(_) => {
                    let _ = tx.send(Action::LoggedIn);
                }
                Err(e) => {
                    let _ = tx.send(Action::Notify(Notification::error(e.to_string())));
                    // Re-enable the form for another attempt.
                    let _ = tx.send(Action::LoggedOut);
                }
            }
        });
    }
}

impl Component for LoginScreen {
    fn init(&mut self, action_tx: UnboundedSender<Action>) -> Result<()> {
        self.action_tx = Some(action_tx);
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.submitting {
            return Ok(None);
        }
        match key.code {
            KeyCode::Tab | KeyCode::Down | KeyCode::Up | KeyCode::BackTab => {
                self.focus = match self.focus {
                    Field::Username => Field::Password,
                    Field::Password => Field::Username,
                };
            }
            KeyCode::Enter => match self.focus {
                Field::Username => self.focus = Field::Password,
                Field::Password => self.spawn_login(),
            },
            _ => {
                let input = match self.focus {
                    Field::Username => &mut self.username,
                    Field::Password => &mut self.password,
                };
                input.handle_event(&crossterm::event::Event::Key(key));
            }
        }
        Ok(None)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::LoggedIn => {
                self.submitting = false;
                self.password = Input::default();
            }
            Action::LoggedOut | Action::SessionExpired => {
                self.submitting = false;
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let overlay = centered_rect(area, 46, 10);
        frame.render_widget(Clear, overlay);

        let block = Block::default()
            .title(" folio · sign in ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Double)
            .border_style(theme::border_focused());
        let inner = block.inner(overlay);
        frame.render_widget(block, overlay);

        let rows = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);

        let field_line = |label: &str, value: String, focused: bool| {
            let marker = if focused { "▸ " } else { "  " };
            let style = if focused {
                theme::field_focused()
            } else {
                theme::field_label()
            };
            let shown = if focused {
                format!("{value}▌")
            } else {
                value
            };
            Line::from(vec![
                Span::styled(format!("{marker}{label:<10} "), style),
                Span::styled(shown, theme::field_value()),
            ])
        };

        let masked = "•".repeat(self.password.value().chars().count());
        frame.render_widget(
            Paragraph::new(field_line(
                "Username",
                self.username.value().to_owned(),
                self.focus == Field::Username && !self.submitting,
            )),
            rows[1],
        );
        frame.render_widget(
            Paragraph::new(field_line(
                "Password",
                masked,
                self.focus == Field::Password && !self.submitting,
            )),
            rows[2],
        );

        let status = if self.submitting {
            Line::from(Span::styled("signing in…", theme::key_hint()))
        } else {
            Line::from(vec![
                Span::styled("  Enter ", theme::key_hint_key()),
                Span::styled("sign in  ", theme::key_hint()),
                Span::styled("Tab ", theme::key_hint_key()),
                Span::styled("switch field  ", theme::key_hint()),
                Span::styled("Ctrl+C ", theme::key_hint_key()),
                Span::styled("quit", theme::key_hint()),
            ])
        };
        frame.render_widget(Paragraph::new(status), rows[4]);
    }

    fn wants_exclusive_input(&self) -> bool {
        true
    }

    fn id(&self) -> &str {
        "Login"
    }
}
