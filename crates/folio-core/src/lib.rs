//! `folio-core` — descriptor-driven CRUD orchestration for the folio console.
//!
//! The reusable heart of the console: a generic [`TableController`] that
//! owns the list → edit → submit → refresh lifecycle for any REST
//! resource described by a [`ResourceDescriptor`], and a
//! [`LoanController`] specialization layering debounced dependent-entity
//! search and the loan state-transition actions on top.
//!
//! Controllers are independent per screen — no cross-page shared state —
//! and expose their row sets, busy flags, and notifications as `watch`
//! channels for the UI to observe.

mod catalog;
mod debounce;
mod descriptor;
mod error;
mod loan;
mod notify;
mod session;
mod table;

pub use catalog::{books, borrowers, categories, loans, products};
pub use debounce::Debouncer;
pub use descriptor::{ColumnSpec, FieldKind, FieldSpec, ListShape, ResourceDescriptor, ViewSpec};
pub use error::CoreError;
pub use loan::{
    Dependent, LoanController, LoanView, SEARCH_DEBOUNCE, SEARCH_MIN_CHARS, book_label,
    borrower_label,
};
pub use notify::{Notification, Severity};
pub use session::EditSession;
pub use table::TableController;

// Gateway types screens interact with directly.
pub use folio_api::{
    ApiClient, ApiConfig, Credentials, Error as ApiError, ListMeta, ListQuery, Record, TokenPair,
    TokenStore, TransportConfig,
};
