//! Bridge — forwards `folio-core` watch channels into TUI actions.
//!
//! Each controller exposes rows, pagination meta, busy state, and
//! notifications as `watch` channels; the loan controller adds the two
//! search-option channels; the token store adds the session-expired
//! signal. One small forwarding task per channel turns every change
//! into an [`Action`] on the app loop.

use tokio::sync::{mpsc::UnboundedSender, watch};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use folio_core::{Dependent, LoanController, TableController, TokenStore};

use crate::action::Action;
use crate::screen::ScreenId;

/// Spawn a task forwarding every change on `rx` as `map(value)`.
fn forward<T, F>(
    mut rx: watch::Receiver<T>,
    tx: UnboundedSender<Action>,
    cancel: CancellationToken,
    map: F,
) where
    T: Clone + Send + Sync + 'static,
    F: Fn(T) -> Action + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let value = rx.borrow_and_update().clone();
                    if tx.send(map(value)).is_err() {
                        break;
                    }
                }
            }
        }
    });
}

/// Wire one table controller's channels to the action loop.
pub fn bridge_table(
    screen: ScreenId,
    table: &TableController,
    tx: &UnboundedSender<Action>,
    cancel: &CancellationToken,
) {
    forward(table.rows(), tx.clone(), cancel.clone(), move |rows| {
        Action::RowsUpdated(screen, rows)
    });
    forward(table.meta(), tx.clone(), cancel.clone(), move |meta| {
        Action::MetaUpdated(screen, meta)
    });
    forward(table.busy(), tx.clone(), cancel.clone(), move |busy| {
        Action::BusyUpdated(screen, busy)
    });
    forward(table.notices(), tx.clone(), cancel.clone(), |notice| {
        notice.map_or(Action::DismissNotification, Action::Notify)
    });
}

/// Wire the loan controller's search channels on top of its table.
pub fn bridge_loans(
    loans: &LoanController,
    tx: &UnboundedSender<Action>,
    cancel: &CancellationToken,
) {
    bridge_table(ScreenId::Loans, loans.table(), tx, cancel);
    for which in [Dependent::Book, Dependent::Borrower] {
        forward(loans.options(which), tx.clone(), cancel.clone(), move |o| {
            Action::SearchOptionsUpdated(which, o)
        });
        forward(
            loans.searching(which),
            tx.clone(),
            cancel.clone(),
            move |s| Action::SearchingUpdated(which, s),
        );
    }
}

/// Wire the token store's session-expired signal.
///
/// Only the `false → true` transition redirects; a re-login resets the
/// flag without producing an action.
pub fn bridge_session(
    tokens: &TokenStore,
    tx: &UnboundedSender<Action>,
    cancel: &CancellationToken,
) {
    let mut rx = tokens.session_expired();
    let tx = tx.clone();
    let cancel = cancel.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let expired = *rx.borrow_and_update();
                    if expired {
                        debug!("session expired signal — redirecting to login");
                        if tx.send(Action::SessionExpired).is_err() {
                            break;
                        }
                    }
                }
            }
        }
    });
}
