//! Application core — event loop, screen management, action dispatch.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use folio_core::{ApiClient, LoanController, Notification, TableController};

use crate::action::{Action, ConfirmAction};
use crate::bridge;
use crate::component::Component;
use crate::event::{Event, EventReader};
use crate::screen::ScreenId;
use crate::screens::create_screens;
use crate::theme;
use crate::tui::Tui;
use crate::widgets::{centered_rect, toast};

/// How long a toast stays up before auto-dismissing.
const TOAST_DURATION: Duration = Duration::from_secs(6);

/// Top-level application state and event loop.
pub struct App {
    active_screen: ScreenId,
    screens: HashMap<ScreenId, Box<dyn Component>>,
    running: bool,
    help_visible: bool,
    terminal_size: (u16, u16),
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
    client: ApiClient,
    tables: Vec<(ScreenId, TableController)>,
    loans: LoanController,
    bridge_cancel: CancellationToken,
    pending_confirm: Option<ConfirmAction>,
    notification: Option<(Notification, Instant)>,
}

impl App {
    pub fn new(client: ApiClient) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let (screens, tables, loans) = create_screens(&client);

        // A cached session skips the login screen; any 401 sends us back.
        let active_screen = if client.tokens().is_authenticated() {
            ScreenId::Dashboard
        } else {
            ScreenId::Login
        };

        Self {
            active_screen,
            screens: screens.into_iter().collect(),
            running: true,
            help_visible: false,
            terminal_size: (0, 0),
            action_tx,
            action_rx,
            client,
            tables,
            loans,
            bridge_cancel: CancellationToken::new(),
            pending_confirm: None,
            notification: None,
        }
    }

    fn init_screens(&mut self) -> Result<()> {
        for screen in self.screens.values_mut() {
            screen.init(self.action_tx.clone())?;
        }
        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            screen.set_focused(true);
        }
        Ok(())
    }

    fn wire_bridges(&self) {
        for (id, table) in &self.tables {
            bridge::bridge_table(*id, table, &self.action_tx, &self.bridge_cancel);
        }
        bridge::bridge_loans(&self.loans, &self.action_tx, &self.bridge_cancel);
        bridge::bridge_session(self.client.tokens(), &self.action_tx, &self.bridge_cancel);
    }

    /// Run the main event loop.
    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?;
        tui.enter()?;
        self.terminal_size = tui.size().unwrap_or((80, 24));
        self.init_screens()?;
        self.wire_bridges();

        // Kick the initial screen so it loads its data.
        self.action_tx.send(Action::SwitchScreen(self.active_screen))?;

        let mut events = EventReader::new(
            Duration::from_millis(250), // 4 Hz tick
            Duration::from_millis(33),  // ~30 FPS render
        );

        info!("console event loop started");

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
                Event::Resize(w, h) => {
                    self.action_tx.send(Action::Resize(w, h))?;
                }
                Event::Tick => {
                    self.action_tx.send(Action::Tick)?;
                }
                Event::Render => {
                    self.action_tx.send(Action::Render)?;
                }
            }

            // Drain and process all queued actions
            while let Ok(action) = self.action_rx.try_recv() {
                self.process_action(&action)?;

                if let Action::Render = action {
                    tui.draw(|frame| self.render(frame))?;
                }
            }
        }

        self.bridge_cancel.cancel();
        events.stop();
        info!("console event loop ended");
        Ok(())
    }

    /// Map a key event to an action. Global keys are handled here;
    /// screen-specific keys are delegated to the active screen.
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        // Ctrl+C always quits.
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            return Ok(Some(Action::Quit));
        }

        // Login captures everything else.
        if self.active_screen == ScreenId::Login {
            if let Some(screen) = self.screens.get_mut(&ScreenId::Login) {
                return screen.handle_key_event(key);
            }
            return Ok(None);
        }

        // Confirmation dialog captures all input.
        if self.pending_confirm.is_some() {
            return match key.code {
                KeyCode::Char('y' | 'Y') => Ok(Some(Action::ConfirmYes)),
                KeyCode::Char('n' | 'N') | KeyCode::Esc => Ok(Some(Action::ConfirmNo)),
                _ => Ok(None),
            };
        }

        if self.help_visible {
            return match key.code {
                KeyCode::Esc | KeyCode::Char('?') => Ok(Some(Action::ToggleHelp)),
                _ => Ok(None),
            };
        }

        // An open dialog or search bar sees every key first.
        let exclusive = self
            .screens
            .get(&self.active_screen)
            .is_some_and(|s| s.wants_exclusive_input());
        if exclusive {
            if let Some(screen) = self.screens.get_mut(&self.active_screen) {
                return screen.handle_key_event(key);
            }
        }

        // Global keys.
        match key.code {
            KeyCode::Char('q') => return Ok(Some(Action::Quit)),
            KeyCode::Char('?') => return Ok(Some(Action::ToggleHelp)),
            KeyCode::Char('L') => {
                self.spawn_logout();
                return Ok(None);
            }
            KeyCode::Char(c @ '1'..='6') => {
                let n = c.to_digit(10).and_then(|d| u8::try_from(d).ok()).unwrap_or(0);
                if let Some(screen) = ScreenId::from_number(n) {
                    return Ok(Some(Action::SwitchScreen(screen)));
                }
            }
            KeyCode::Tab => {
                return Ok(Some(Action::SwitchScreen(self.active_screen.next())));
            }
            KeyCode::BackTab => {
                return Ok(Some(Action::SwitchScreen(self.active_screen.prev())));
            }
            _ => {}
        }

        // Delegate to the active screen.
        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            return screen.handle_key_event(key);
        }
        Ok(None)
    }

    fn spawn_logout(&self) {
        let client = self.client.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            match client.logout().await {
                Ok(()) => {
                    let _ = tx.send(Action::Notify(Notification::info("Signed out")));
                }
                Err(e) => {
                    // Tokens are cleared locally even when revoke fails.
                    client.tokens().clear();
                    let _ = tx.send(Action::Notify(Notification::error(format!(
                        "Sign-out incomplete: {e}"
                    ))));
                }
            }
            let _ = tx.send(Action::LoggedOut);
        });
    }

    fn set_active(&mut self, id: ScreenId) {
        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            screen.set_focused(false);
        }
        self.active_screen = id;
        if let Some(screen) = self.screens.get_mut(&id) {
            screen.set_focused(true);
        }
    }

    /// Forward an action to every screen, re-queueing any follow-ups.
    fn forward_to_screens(&mut self, action: &Action) -> Result<()> {
        for screen in self.screens.values_mut() {
            if let Some(follow_up) = screen.update(action)? {
                self.action_tx.send(follow_up)?;
            }
        }
        Ok(())
    }

    fn process_action(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Quit => {
                self.running = false;
            }
            Action::Render => {}
            Action::Resize(w, h) => {
                self.terminal_size = (*w, *h);
            }
            Action::Tick => {
                if self
                    .notification
                    .as_ref()
                    .is_some_and(|(_, shown_at)| shown_at.elapsed() >= TOAST_DURATION)
                {
                    self.notification = None;
                }
                self.forward_to_screens(action)?;
            }
            Action::SwitchScreen(id) => {
                self.set_active(*id);
                self.forward_to_screens(action)?;
            }
            Action::SessionExpired => {
                self.notification = Some((
                    Notification::error("Session expired — sign in again"),
                    Instant::now(),
                ));
                self.set_active(ScreenId::Login);
                self.forward_to_screens(action)?;
            }
            Action::LoggedIn => {
                self.notification =
                    Some((Notification::success("Signed in"), Instant::now()));
                self.set_active(ScreenId::Dashboard);
                self.forward_to_screens(action)?;
            }
            Action::LoggedOut => {
                if !self.client.tokens().is_authenticated() {
                    self.set_active(ScreenId::Login);
                }
                self.forward_to_screens(action)?;
            }
            Action::ShowConfirm(confirm) => {
                self.pending_confirm = Some(confirm.clone());
            }
            Action::ConfirmYes | Action::ConfirmNo => {
                self.pending_confirm = None;
                self.forward_to_screens(action)?;
            }
            Action::Notify(notification) => {
                // Newer replaces older; there is no queue.
                self.notification = Some((notification.clone(), Instant::now()));
            }
            Action::DismissNotification => {
                self.notification = None;
            }
            Action::ToggleHelp => {
                self.help_visible = !self.help_visible;
            }
            _ => {
                self.forward_to_screens(action)?;
            }
        }
        Ok(())
    }

    // ── Rendering ────────────────────────────────────────────────

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        if self.active_screen == ScreenId::Login {
            if let Some(screen) = self.screens.get(&ScreenId::Login) {
                screen.render(frame, area);
            }
            if let Some((notification, _)) = &self.notification {
                toast::render_toast(frame, area, notification);
            }
            return;
        }

        let layout = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(area);

        self.render_tab_bar(frame, layout[0]);

        if let Some(screen) = self.screens.get(&self.active_screen) {
            screen.render(frame, layout[1]);
        }

        self.render_status_bar(frame, layout[2]);

        if self.help_visible {
            self.render_help(frame, area);
        }
        if let Some(confirm) = &self.pending_confirm {
            Self::render_confirm(frame, area, confirm);
        }
        if let Some((notification, _)) = &self.notification {
            toast::render_toast(frame, area, notification);
        }
    }

    fn render_tab_bar(&self, frame: &mut Frame, area: Rect) {
        let narrow = area.width < 100;
        let mut spans = vec![Span::styled(" folio ", theme::title_style())];
        for screen in ScreenId::ALL {
            let label = if narrow {
                screen.label_short()
            } else {
                screen.label()
            };
            let text = format!(" {}:{} ", screen.number(), label);
            let style = if screen == self.active_screen {
                theme::tab_active()
            } else {
                theme::tab_inactive()
            };
            spans.push(Span::styled(text, style));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let auth = if self.client.tokens().is_authenticated() {
            Span::styled("● signed in", ratatui::style::Style::default().fg(theme::SUCCESS_GREEN))
        } else {
            Span::styled("○ signed out", ratatui::style::Style::default().fg(theme::ERROR_RED))
        };
        let line = Line::from(vec![
            Span::styled(format!(" {} ", self.client.base_url()), theme::status_bar()),
            auth,
            Span::styled("   q ", theme::key_hint_key()),
            Span::styled("quit  ", theme::key_hint()),
            Span::styled("? ", theme::key_hint_key()),
            Span::styled("help  ", theme::key_hint()),
            Span::styled("L ", theme::key_hint_key()),
            Span::styled("logout  ", theme::key_hint()),
            Span::styled("Tab ", theme::key_hint_key()),
            Span::styled("next screen", theme::key_hint()),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_help(&self, frame: &mut Frame, area: Rect) {
        let overlay = centered_rect(area, 52, 16);
        frame.render_widget(Clear, overlay);
        let block = Block::default()
            .title(" Keys ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused());
        let inner = block.inner(overlay);
        frame.render_widget(block, overlay);

        let key = theme::key_hint_key();
        let txt = theme::key_hint();
        let lines = vec![
            Line::from(vec![Span::styled("1-6    ", key), Span::styled("switch screen", txt)]),
            Line::from(vec![Span::styled("j/k    ", key), Span::styled("move selection", txt)]),
            Line::from(vec![Span::styled("a/e/d  ", key), Span::styled("add / edit / delete", txt)]),
            Line::from(vec![Span::styled("/      ", key), Span::styled("search by name", txt)]),
            Line::from(vec![Span::styled("n/p    ", key), Span::styled("next / previous page", txt)]),
            Line::from(vec![Span::styled("r      ", key), Span::styled("refresh the table", txt)]),
            Line::from(vec![Span::styled("f      ", key), Span::styled("cycle loan status view", txt)]),
            Line::from(vec![Span::styled("R/O    ", key), Span::styled("return / mark overdue (loans)", txt)]),
            Line::from(vec![Span::styled("x      ", key), Span::styled("export CSV (products)", txt)]),
            Line::from(vec![Span::styled("L      ", key), Span::styled("sign out", txt)]),
            Line::from(vec![Span::styled("q      ", key), Span::styled("quit", txt)]),
            Line::from(""),
            Line::from(Span::styled("Esc or ? closes this help", txt)),
        ];
        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn render_confirm(frame: &mut Frame, area: Rect, confirm: &ConfirmAction) {
        let overlay = centered_rect(area, 50, 6);
        frame.render_widget(Clear, overlay);
        let block = Block::default()
            .title(" Confirm ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Double)
            .border_style(ratatui::style::Style::default().fg(theme::LEATHER_RED));
        let inner = block.inner(overlay);
        frame.render_widget(block, overlay);

        let lines = vec![
            Line::from(Span::styled(confirm.to_string(), theme::field_value())),
            Line::from(""),
            Line::from(vec![
                Span::styled("y ", theme::key_hint_key()),
                Span::styled("yes  ", theme::key_hint()),
                Span::styled("n/Esc ", theme::key_hint_key()),
                Span::styled("no", theme::key_hint()),
            ]),
        ];
        frame.render_widget(Paragraph::new(lines), inner);
    }
}
