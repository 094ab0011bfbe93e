#![allow(clippy::unwrap_used)]
// Integration tests for the table controllers using wiremock.

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use folio_core::{
    ApiClient, ApiConfig, ColumnSpec, Dependent, FieldKind, FieldSpec, ListShape, LoanController,
    Record, ResourceDescriptor, Severity, TableController, TokenStore, book_label, books,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let config = ApiConfig {
        base_url: Url::parse(&server.uri()).unwrap(),
        client_id: "console-client".into(),
        client_secret: "console-secret".to_owned().into(),
    };
    let client = ApiClient::with_client(reqwest::Client::new(), config, TokenStore::new());
    (server, client)
}

fn record(value: serde_json::Value) -> Record {
    Record::from_value(value).unwrap()
}

/// A minimal descriptor whose defaults satisfy its own required fields,
/// so a create can be submitted untouched.
fn preseeded_books() -> ResourceDescriptor {
    ResourceDescriptor {
        title: "Books",
        noun: "Item",
        endpoint: "/books",
        envelope: Some("book"),
        list_shape: ListShape::Enveloped,
        views: Vec::new(),
        columns: vec![ColumnSpec {
            field: "name",
            title: "Name",
            width: 20,
        }],
        form_fields: vec![
            FieldSpec {
                name: "name",
                label: "Name",
                kind: FieldKind::Text,
                required: true,
                help: "",
            },
            FieldSpec {
                name: "stock",
                label: "Stock",
                kind: FieldKind::Integer,
                required: false,
                help: "",
            },
        ],
        defaults: record(json!({"name": "Dune", "stock": 1})),
    }
}

// ── List lifecycle ──────────────────────────────────────────────────

#[tokio::test]
async fn refresh_replaces_rows_from_enveloped_list() {
    let (server, client) = setup().await;
    let table = TableController::new(client, books());

    Mock::given(method("GET"))
        .and(path("/api/v1/books"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 1, "name": "Dune"}, {"id": 2, "name": "Hyperion"}],
            "meta": {"total_page": 1, "total_data": 2, "current_page": 1}
        })))
        .mount(&server)
        .await;

    table.refresh().await;

    let rows = table.rows_snapshot();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].display("name"), "Hyperion");
    assert_eq!(table.meta().borrow().as_ref().unwrap().total_data, Some(2));
}

#[tokio::test]
async fn malformed_list_payload_renders_empty_not_error() {
    let (server, client) = setup().await;
    let table = TableController::new(client, books());

    Mock::given(method("GET"))
        .and(path("/api/v1/books"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": 42})))
        .mount(&server)
        .await;

    table.refresh().await;

    assert!(table.rows_snapshot().is_empty());
    // Coercion is not a failure: no error notification.
    assert!(table.notices().borrow().is_none());
}

#[tokio::test]
async fn failed_refresh_keeps_prior_rows_and_notifies() {
    let (server, client) = setup().await;
    let table = TableController::new(client, books());

    Mock::given(method("GET"))
        .and(path("/api/v1/books"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 1, "name": "Dune"}]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/books"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "boom"})))
        .mount(&server)
        .await;

    table.refresh().await;
    assert_eq!(table.rows_snapshot().len(), 1);

    table.refresh().await;

    let rows = table.rows_snapshot();
    assert_eq!(rows.len(), 1, "prior rows must survive a failed refresh");
    let notice = table.notices().borrow().clone().unwrap();
    assert_eq!(notice.severity, Severity::Error);
    assert!(notice.message.contains("boom"));
}

// ── Create / edit sessions ──────────────────────────────────────────

#[tokio::test]
async fn untouched_create_submits_exactly_the_defaults() {
    let (server, client) = setup().await;
    let table = TableController::new(client, preseeded_books());

    Mock::given(method("POST"))
        .and(path("/api/v1/books"))
        .and(body_json(json!({"book": {"name": "Dune", "stock": 1}})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 1, "name": "Dune", "stock": 1
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/books"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    table.begin_create();
    table.submit().await;

    assert!(!table.session().is_open());
    let notice = table.notices().borrow().clone().unwrap();
    assert_eq!(notice.severity, Severity::Success);
    assert_eq!(notice.message, "Item created successfully");
}

#[tokio::test]
async fn session_defaults_are_copies_not_aliases() {
    let (server, client) = setup().await;
    drop(server);
    let table = TableController::new(client, preseeded_books());

    table.begin_create();
    table.set_field("name", json!("Mutated"));
    table.cancel();

    table.begin_create();
    assert_eq!(
        table.session().values().unwrap().display("name"),
        "Dune",
        "descriptor defaults must be untouched by prior sessions"
    );
}

#[tokio::test]
async fn edit_submit_puts_full_merged_values_under_envelope() {
    let (server, client) = setup().await;
    let table = TableController::new(client, books());

    let existing = record(json!({
        "id": 7, "name": "Dune", "description": "", "isbn": "111", "stock": 2
    }));

    Mock::given(method("PUT"))
        .and(path("/api/v1/books/7"))
        .and(body_json(json!({"book": {
            "id": 7, "name": "Dune Messiah", "description": "", "isbn": "222", "stock": 2
        }})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7, "name": "Dune Messiah"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/books"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    table.begin_edit(&existing);
    table.set_field("name", json!("Dune Messiah"));
    table.set_field("isbn", json!("222"));
    table.submit().await;

    assert!(!table.session().is_open());
}

#[tokio::test]
async fn failed_submit_keeps_the_session_open_for_resubmission() {
    let (server, client) = setup().await;
    let table = TableController::new(client, books());

    Mock::given(method("POST"))
        .and(path("/api/v1/books"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"message": "isbn already taken"})),
        )
        .mount(&server)
        .await;

    table.begin_create();
    table.set_field("name", json!("Dune"));
    table.set_field("isbn", json!("dup"));
    table.set_field("stock", json!(1));
    table.submit().await;

    let session = table.session();
    assert!(session.is_open(), "failed submit must leave the dialog up");
    assert_eq!(session.values().unwrap().display("isbn"), "dup");
    let notice = table.notices().borrow().clone().unwrap();
    assert!(notice.message.contains("isbn already taken"));
}

#[tokio::test]
async fn empty_required_field_blocks_dispatch() {
    let (server, client) = setup().await;
    let table = TableController::new(client, books());

    table.begin_create();
    table.submit().await;

    // Validation fires before dispatch: nothing reached the backend.
    assert!(server.received_requests().await.unwrap().is_empty());
    assert!(table.session().is_open());
    let notice = table.notices().borrow().clone().unwrap();
    assert_eq!(notice.severity, Severity::Error);
    assert!(notice.message.contains("required"));
}

#[tokio::test]
async fn set_field_without_session_is_a_no_op() {
    let (server, client) = setup().await;
    drop(server);
    let table = TableController::new(client, books());

    table.set_field("name", json!("ghost"));
    assert!(table.session().values().is_none());
}

// ── Delete ──────────────────────────────────────────────────────────

#[tokio::test]
async fn remove_deletes_then_refreshes() {
    let (server, client) = setup().await;
    let table = TableController::new(client, books());

    Mock::given(method("DELETE"))
        .and(path("/api/v1/books/9"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/books"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    table.remove("9").await;

    let notice = table.notices().borrow().clone().unwrap();
    assert_eq!(notice.message, "Item deleted successfully");
}

#[tokio::test]
async fn failed_remove_notifies_without_refreshing() {
    let (server, client) = setup().await;
    let table = TableController::new(client, books());

    Mock::given(method("DELETE"))
        .and(path("/api/v1/books/9"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({"message": "has loans"})))
        .mount(&server)
        .await;

    table.remove("9").await;

    // Only the DELETE reached the backend; no refresh followed.
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
    let notice = table.notices().borrow().clone().unwrap();
    assert!(notice.message.contains("has loans"));
}

// ── Notifications ───────────────────────────────────────────────────

#[tokio::test]
async fn newer_notification_replaces_older() {
    let (server, client) = setup().await;
    drop(server);
    let table = TableController::new(client, books());

    table.notify(folio_core::Notification::info("first"));
    table.notify(folio_core::Notification::error("second"));

    assert_eq!(table.notices().borrow().clone().unwrap().message, "second");

    table.dismiss_notice();
    assert!(table.notices().borrow().is_none());
}

// ── Loan specialization ─────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn debounced_search_fires_once_for_the_final_text() {
    let (server, client) = setup().await;
    let loans = LoanController::new(client);

    Mock::given(method("GET"))
        .and(path("/api/v1/books/available"))
        .and(query_param("search", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 5, "name": "Tom Sawyer", "isbn": "123", "stock": 3, "available_stock": 1}
        ])))
        .mount(&server)
        .await;

    let mut options = loans.options(Dependent::Book);
    options.borrow_and_update();

    // Two chars: clears locally, never issues a request.
    loans.set_search_text(Dependent::Book, "ab");
    // Third char within the window: the only request that may fire.
    loans.set_search_text(Dependent::Book, "abc");

    let hits = loop {
        options.changed().await.unwrap();
        let current = options.borrow_and_update().clone();
        if !current.is_empty() {
            break current;
        }
    };

    assert_eq!(hits.len(), 1);
    assert_eq!(book_label(&hits[0]), "Tom Sawyer (123)");

    let requests = server.received_requests().await.unwrap();
    let searches: Vec<_> = requests
        .iter()
        .filter(|r| r.url.path() == "/api/v1/books/available")
        .collect();
    assert_eq!(searches.len(), 1, "intermediate states must never fire");
    assert!(searches[0].url.query().unwrap().contains("search=abc"));
}

#[tokio::test(start_paused = true)]
async fn short_and_empty_queries_clear_locally_without_requests() {
    let (server, client) = setup().await;
    let loans = LoanController::new(client);

    loans.set_search_text(Dependent::Borrower, "ab");
    loans.set_search_text(Dependent::Borrower, "");
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;

    assert!(loans.options(Dependent::Borrower).borrow().is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn create_guard_requires_both_selections() {
    let (server, client) = setup().await;
    let loans = LoanController::new(client);

    loans.begin_create();
    assert!(!loans.can_submit());

    loans.select(
        Dependent::Book,
        Some(record(json!({"id": 5, "name": "Tom Sawyer", "isbn": "123"}))),
    );
    assert!(!loans.can_submit(), "book alone must not unblock submit");

    loans.submit().await;
    assert!(
        server.received_requests().await.unwrap().is_empty(),
        "guarded submit must not dispatch"
    );
    assert!(loans.table().session().is_open());

    loans.select(
        Dependent::Borrower,
        Some(record(json!({"id": 2, "name": "Ada", "id_card_number": "C-77"}))),
    );
    assert!(loans.can_submit());

    // Selections landed in the session's form values.
    let values = loans.table().session().values().cloned().unwrap();
    assert_eq!(values.display("book_id"), "5");
    assert_eq!(values.display("borrower_id"), "2");
}

#[tokio::test]
async fn edit_hydrates_both_selections_independently() {
    let (server, client) = setup().await;
    let loans = LoanController::new(client);

    Mock::given(method("GET"))
        .and(path("/api/v1/books/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"id": 5, "name": "Tom Sawyer", "isbn": "123"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/borrowers/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 2, "name": "Ada", "id_card_number": "C-77"
        })))
        .mount(&server)
        .await;

    let loan = record(json!({"id": 9, "book_id": 5, "borrower_id": 2, "status": "active"}));
    loans.begin_edit(&loan).await;

    assert_eq!(
        loans.selected(Dependent::Book).unwrap().display("name"),
        "Tom Sawyer"
    );
    assert_eq!(
        loans.selected(Dependent::Borrower).unwrap().display("name"),
        "Ada"
    );
    assert!(loans.can_submit(), "edit sessions are not guarded");
}

#[tokio::test]
async fn failed_hydration_degrades_to_empty_selection() {
    let (server, client) = setup().await;
    let loans = LoanController::new(client);

    Mock::given(method("GET"))
        .and(path("/api/v1/books/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 5, "name": "Tom Sawyer"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/borrowers/2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let loan = record(json!({"id": 9, "book_id": 5, "borrower_id": 2, "status": "active"}));
    loans.begin_edit(&loan).await;

    assert!(loans.selected(Dependent::Book).is_some());
    assert!(loans.selected(Dependent::Borrower).is_none());
    assert!(
        loans.table().session().is_open(),
        "hydration failure must never block the dialog"
    );
}

#[tokio::test]
async fn return_book_patches_and_refreshes() {
    let (server, client) = setup().await;
    let loans = LoanController::new(client);

    Mock::given(method("PATCH"))
        .and(path("/api/v1/loans/4/return_book"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 4, "status": "returned"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/loans"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 4, "status": "returned"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    loans.return_book("4").await;

    let rows = loans.table().rows_snapshot();
    assert_eq!(rows[0].display("status"), "returned");
    assert_eq!(
        loans.table().notices().borrow().clone().unwrap().message,
        "Book returned successfully"
    );
}

#[tokio::test]
async fn sub_views_swap_the_list_endpoint() {
    let (server, client) = setup().await;
    let loans = LoanController::new(client);

    Mock::given(method("GET"))
        .and(path("/api/v1/loans/overdue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 8, "status": "overdue"}]
        })))
        .mount(&server)
        .await;

    loans.set_view(folio_core::LoanView::Overdue).await;

    let rows = loans.table().rows_snapshot();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].display("status"), "overdue");
}
