// ── Loan table controller ──
//
// Specializes the generic table controller for the loan resource:
// debounced typeahead search over the two dependent entities (books,
// borrowers), edit-session hydration, a create-submission guard, and
// the return/mark-overdue state-transition actions. Status transitions
// themselves are computed upstream; the console only gates and
// displays them.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

use folio_api::{ApiClient, ListQuery, Record};

use crate::catalog;
use crate::debounce::Debouncer;
use crate::notify::Notification;
use crate::session::EditSession;
use crate::table::{TableController, upstream_message};

/// Delay after the last keystroke before a dependent search fires.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Minimum query length that issues a request. Shorter non-empty input
/// clears the option list locally, as does empty input.
pub const SEARCH_MIN_CHARS: usize = 3;

/// Loan status sub-views, each backed by its own list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoanView {
    #[default]
    All,
    Active,
    Overdue,
    DueSoon,
    Returned,
}

impl LoanView {
    pub const ALL: [Self; 5] = [
        Self::All,
        Self::Active,
        Self::Overdue,
        Self::DueSoon,
        Self::Returned,
    ];

    pub fn endpoint(self) -> &'static str {
        match self {
            Self::All => "/loans",
            Self::Active => "/loans/active",
            Self::Overdue => "/loans/overdue",
            Self::DueSoon => "/loans/due_soon",
            Self::Returned => "/loans/returned",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Active => "Active",
            Self::Overdue => "Overdue",
            Self::DueSoon => "Due Soon",
            Self::Returned => "Returned",
        }
    }
}

/// Which dependent entity a search targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependent {
    Book,
    Borrower,
}

impl Dependent {
    /// The form field a selection writes its id into.
    fn id_field(self) -> &'static str {
        match self {
            Self::Book => "book_id",
            Self::Borrower => "borrower_id",
        }
    }

    /// The resource queried for detail lookups and search.
    fn lookup_endpoint(self) -> &'static str {
        match self {
            Self::Book => "/books",
            Self::Borrower => "/borrowers",
        }
    }

    /// The list endpoint the typeahead hits. Available books come from a
    /// dedicated view so already-exhausted stock never shows up.
    fn search_endpoint(self) -> &'static str {
        match self {
            Self::Book => "/books/available",
            Self::Borrower => "/borrowers",
        }
    }
}

/// Per-dependent search state: a debounced query, a reactive option
/// list, and the currently selected record (kept for display only).
struct SearchState {
    options: watch::Sender<Arc<Vec<Record>>>,
    searching: watch::Sender<bool>,
    selected: Mutex<Option<Record>>,
    debounce: Debouncer,
}

impl SearchState {
    fn new() -> Self {
        let (options, _) = watch::channel(Arc::new(Vec::new()));
        let (searching, _) = watch::channel(false);
        Self {
            options,
            searching,
            selected: Mutex::new(None),
            debounce: Debouncer::new(SEARCH_DEBOUNCE),
        }
    }

    fn clear(&self) {
        self.debounce.cancel();
        self.searching.send_replace(false);
        self.options.send_replace(Arc::new(Vec::new()));
        *self.selected.lock().expect("selection lock poisoned") = None;
    }
}

/// Controller for the loans screen.
///
/// Wraps the generic [`TableController`] (same list/session lifecycle)
/// and layers the loan-specific flows on top.
#[derive(Clone)]
pub struct LoanController {
    inner: Arc<LoanInner>,
}

struct LoanInner {
    table: TableController,
    client: ApiClient,
    view: Mutex<LoanView>,
    book: SearchState,
    borrower: SearchState,
}

impl LoanInner {
    fn search(&self, which: Dependent) -> &SearchState {
        match which {
            Dependent::Book => &self.book,
            Dependent::Borrower => &self.borrower,
        }
    }
}

impl LoanController {
    pub fn new(client: ApiClient) -> Self {
        let table = TableController::new(client.clone(), catalog::loans());
        Self {
            inner: Arc::new(LoanInner {
                table,
                client,
                view: Mutex::new(LoanView::All),
                book: SearchState::new(),
                borrower: SearchState::new(),
            }),
        }
    }

    /// The underlying generic controller (rows, notices, set_field, …).
    pub fn table(&self) -> &TableController {
        &self.inner.table
    }

    // ── Status sub-views ─────────────────────────────────────────

    pub fn view(&self) -> LoanView {
        *self.inner.view.lock().expect("view lock poisoned")
    }

    /// Switch the list to a status sub-view and refresh it.
    pub async fn set_view(&self, view: LoanView) {
        *self.inner.view.lock().expect("view lock poisoned") = view;
        self.inner.table.set_list_endpoint(view.endpoint());
        self.inner.table.refresh().await;
    }

    // ── Dependent search ─────────────────────────────────────────

    /// React to a keystroke in one of the search inputs.
    ///
    /// Empty input and input below [`SEARCH_MIN_CHARS`] both clear the
    /// option list locally without a request; longer input restarts the
    /// debounce window, and only the last restart within the window
    /// issues a request.
    pub fn set_search_text(&self, which: Dependent, text: &str) {
        let state = self.inner.search(which);

        if text.chars().count() < SEARCH_MIN_CHARS {
            state.debounce.cancel();
            state.searching.send_replace(false);
            state.options.send_replace(Arc::new(Vec::new()));
            return;
        }

        let term = text.to_owned();
        let inner = Arc::clone(&self.inner);
        state.debounce.schedule(async move {
            let state = inner.search(which);
            state.searching.send_replace(true);

            let query = ListQuery::new().search(&term);
            match inner.client.list_all(which.search_endpoint(), &query).await {
                Ok(records) => {
                    debug!(?which, term = %term, hits = records.len(), "search resolved");
                    state.options.send_replace(Arc::new(records));
                }
                Err(e) => {
                    state.options.send_replace(Arc::new(Vec::new()));
                    inner.table.notify(Notification::error(format!(
                        "Error searching {}: {}",
                        match which {
                            Dependent::Book => "available books",
                            Dependent::Borrower => "borrowers",
                        },
                        upstream_message(&e)
                    )));
                }
            }
            state.searching.send_replace(false);
        });
    }

    pub fn options(&self, which: Dependent) -> watch::Receiver<Arc<Vec<Record>>> {
        self.inner.search(which).options.subscribe()
    }

    pub fn searching(&self, which: Dependent) -> watch::Receiver<bool> {
        self.inner.search(which).searching.subscribe()
    }

    /// Pick (or clear) the selected dependent record. The id lands in
    /// the session's `book_id`/`borrower_id` form field; the record
    /// itself is retained only for chip rendering, never submitted.
    pub fn select(&self, which: Dependent, record: Option<Record>) {
        let id = record
            .as_ref()
            .and_then(|r| r.id().cloned())
            .unwrap_or_else(|| Value::String(String::new()));
        *self
            .inner
            .search(which)
            .selected
            .lock()
            .expect("selection lock poisoned") = record;
        self.inner.table.set_field(which.id_field(), id);
    }

    pub fn selected(&self, which: Dependent) -> Option<Record> {
        self.inner
            .search(which)
            .selected
            .lock()
            .expect("selection lock poisoned")
            .clone()
    }

    // ── Session lifecycle ────────────────────────────────────────

    /// Open a create session with cleared search state.
    pub fn begin_create(&self) {
        self.inner.book.clear();
        self.inner.borrower.clear();
        self.inner.table.begin_create();
    }

    /// Open an edit session and hydrate the selected book/borrower
    /// chips via two independent lookups.
    ///
    /// Either lookup failing is logged and degrades to an empty
    /// selection; the dialog opens regardless.
    pub async fn begin_edit(&self, record: &Record) {
        self.inner.book.clear();
        self.inner.borrower.clear();
        self.inner.table.begin_edit(record);

        let book_id = field_segment(record, "book_id");
        let borrower_id = field_segment(record, "borrower_id");

        let (book, borrower) = tokio::join!(
            self.hydrate(Dependent::Book, book_id),
            self.hydrate(Dependent::Borrower, borrower_id),
        );

        *self
            .inner
            .book
            .selected
            .lock()
            .expect("selection lock poisoned") = book;
        *self
            .inner
            .borrower
            .selected
            .lock()
            .expect("selection lock poisoned") = borrower;
    }

    async fn hydrate(&self, which: Dependent, id: Option<String>) -> Option<Record> {
        let id = id?;
        match self
            .inner
            .client
            .get_one(which.lookup_endpoint(), &id)
            .await
        {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(?which, id = %id, error = %e, "hydration lookup failed");
                None
            }
        }
    }

    pub fn cancel(&self) {
        self.inner.book.clear();
        self.inner.borrower.clear();
        self.inner.table.cancel();
    }

    // ── Submit guard ─────────────────────────────────────────────

    /// Whether submit may be invoked right now. A create session is
    /// blocked until both a book and a borrower have been selected; the
    /// required-field rule still applies on top at dispatch.
    pub fn can_submit(&self) -> bool {
        match self.inner.table.session() {
            EditSession::Creating { .. } => {
                self.selected(Dependent::Book).is_some()
                    && self.selected(Dependent::Borrower).is_some()
            }
            EditSession::Editing { .. } => true,
            _ => false,
        }
    }

    /// Submit the open session; a no-op while the create guard blocks.
    pub async fn submit(&self) {
        if !self.can_submit() {
            return;
        }
        self.inner.table.submit().await;
    }

    // ── State-transition actions ─────────────────────────────────

    /// Return-book is unavailable once a loan is already returned.
    pub fn can_return(loan: &Record) -> bool {
        loan.str_field("status") != Some("returned")
    }

    /// Mark-overdue is unavailable for returned or already-overdue loans.
    pub fn can_mark_overdue(loan: &Record) -> bool {
        !matches!(loan.str_field("status"), Some("returned" | "overdue"))
    }

    /// `PATCH /loans/{id}/return_book`, then refresh.
    pub async fn return_book(&self, id: &str) {
        match self
            .inner
            .client
            .patch(&format!("/loans/{id}/return_book"), None)
            .await
        {
            Ok(_) => {
                self.inner
                    .table
                    .notify(Notification::success("Book returned successfully"));
                self.inner.table.refresh().await;
            }
            Err(e) => {
                self.inner.table.notify(Notification::error(format!(
                    "Error returning book: {}",
                    upstream_message(&e)
                )));
            }
        }
    }

    /// `PATCH /loans/{id}/mark_overdue`, then refresh.
    pub async fn mark_overdue(&self, id: &str) {
        match self
            .inner
            .client
            .patch(&format!("/loans/{id}/mark_overdue"), None)
            .await
        {
            Ok(_) => {
                self.inner
                    .table
                    .notify(Notification::success("Loan marked as overdue"));
                self.inner.table.refresh().await;
            }
            Err(e) => {
                self.inner.table.notify(Notification::error(format!(
                    "Error marking loan as overdue: {}",
                    upstream_message(&e)
                )));
            }
        }
    }
}

/// Option label for a book: `"{name} ({isbn})"`.
pub fn book_label(record: &Record) -> String {
    format!("{} ({})", record.display("name"), record.display("isbn"))
}

/// Option label for a borrower: `"{name} ({id_card_number})"`.
pub fn borrower_label(record: &Record) -> String {
    format!(
        "{} ({})",
        record.display("name"),
        record.display("id_card_number")
    )
}

/// A record field rendered as a URL path segment, for the hydration
/// lookups (ids come back both numeric and stringly).
fn field_segment(record: &Record, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn loan(status: &str) -> Record {
        Record::from_value(json!({"id": 1, "status": status})).unwrap()
    }

    #[test]
    fn return_action_is_gated_on_status() {
        assert!(LoanController::can_return(&loan("active")));
        assert!(LoanController::can_return(&loan("overdue")));
        assert!(!LoanController::can_return(&loan("returned")));
    }

    #[test]
    fn mark_overdue_is_gated_on_status() {
        assert!(LoanController::can_mark_overdue(&loan("active")));
        assert!(!LoanController::can_mark_overdue(&loan("overdue")));
        assert!(!LoanController::can_mark_overdue(&loan("returned")));
    }

    #[test]
    fn option_labels_combine_name_and_identifier() {
        let book = Record::from_value(
            json!({"id": 5, "name": "Tom Sawyer", "isbn": "123", "stock": 3, "available_stock": 1}),
        )
        .unwrap();
        assert_eq!(book_label(&book), "Tom Sawyer (123)");

        let borrower =
            Record::from_value(json!({"id": 2, "name": "Ada", "id_card_number": "C-77"})).unwrap();
        assert_eq!(borrower_label(&borrower), "Ada (C-77)");
    }

    #[test]
    fn field_segment_skips_empty_ids() {
        let rec = Record::from_value(json!({"book_id": "", "borrower_id": 4})).unwrap();
        assert!(field_segment(&rec, "book_id").is_none());
        assert_eq!(field_segment(&rec, "borrower_id").unwrap(), "4");
        assert!(field_segment(&rec, "missing").is_none());
    }

    #[test]
    fn every_view_has_a_distinct_endpoint() {
        let mut seen = std::collections::HashSet::new();
        for view in LoanView::ALL {
            assert!(seen.insert(view.endpoint()));
        }
    }
}
