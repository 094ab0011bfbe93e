//! All possible UI actions. Actions are the sole mechanism for state
//! mutation in the console.

use std::fmt;
use std::sync::Arc;

use folio_core::{Dependent, ListMeta, Notification, Record};

use crate::screen::ScreenId;

/// Entity counts shown on the dashboard, all fetched from list metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardStats {
    pub books: u64,
    pub borrowers: u64,
    pub loans: u64,
    pub products: u64,
    pub categories: u64,
    pub overdue_loans: u64,
}

/// Pending confirmation action.
#[derive(Debug, Clone)]
pub enum ConfirmAction {
    DeleteRecord {
        screen: ScreenId,
        id: String,
        label: String,
    },
}

impl fmt::Display for ConfirmAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeleteRecord { label, .. } => {
                write!(f, "Are you sure you want to delete {label}?")
            }
        }
    }
}

/// Every state transition in the console is expressed as an Action.
#[derive(Debug, Clone)]
pub enum Action {
    // ── Lifecycle ──────────────────────────────────────────────────
    Quit,
    Tick,
    Render,
    Resize(u16, u16),

    // ── Navigation ────────────────────────────────────────────────
    SwitchScreen(ScreenId),

    // ── Controller state (forwarded from folio-core watch channels) ─
    RowsUpdated(ScreenId, Arc<Vec<Record>>),
    MetaUpdated(ScreenId, Option<ListMeta>),
    BusyUpdated(ScreenId, bool),
    SearchOptionsUpdated(Dependent, Arc<Vec<Record>>),
    SearchingUpdated(Dependent, bool),

    // ── Auth ──────────────────────────────────────────────────────
    /// The token store's session-expired signal fired (any 401).
    /// The single redirect-to-login trigger.
    SessionExpired,
    LoggedIn,
    LoggedOut,

    // ── Dashboard ─────────────────────────────────────────────────
    StatsUpdated(DashboardStats),

    // ── Confirm dialog ────────────────────────────────────────────
    ShowConfirm(ConfirmAction),
    ConfirmYes,
    ConfirmNo,

    // ── Notifications ─────────────────────────────────────────────
    Notify(Notification),
    DismissNotification,

    // ── Help ──────────────────────────────────────────────────────
    ToggleHelp,
}
