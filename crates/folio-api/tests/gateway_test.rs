#![allow(clippy::unwrap_used)]
// Integration tests for `ApiClient` using wiremock.

use secrecy::ExposeSecret;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use folio_api::{ApiClient, ApiConfig, Credentials, Error, ListQuery, Record, TokenPair, TokenStore};

// ── Helpers ─────────────────────────────────────────────────────────

fn record(value: serde_json::Value) -> Record {
    Record::from_value(value).unwrap()
}

fn pair(access: &str, refresh: &str) -> TokenPair {
    TokenPair {
        access_token: access.to_owned().into(),
        refresh_token: refresh.to_owned().into(),
    }
}

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

// ── List shape tolerance ────────────────────────────────────────────

#[tokio::test]
async fn list_all_unwraps_envelope() {
    let (server, client) = setup().await;

    let envelope = json!({
        "data": [
            {"id": 1, "name": "Dune", "isbn": "978-0441172719"},
            {"id": 2, "name": "Hyperion", "isbn": "978-0553283686"}
        ],
        "meta": {"total_page": 1, "total_data": 2, "current_page": 1}
    });

    Mock::given(method("GET"))
        .and(path("/api/v1/books"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&envelope))
        .mount(&server)
        .await;

    let books = client.list_all("/books", &ListQuery::new()).await.unwrap();

    assert_eq!(books.len(), 2);
    assert_eq!(books[0].display("name"), "Dune");
}

#[tokio::test]
async fn list_all_accepts_bare_arrays() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/books/available"))
        .and(query_param("search", "tom"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 5, "name": "Tom Sawyer", "isbn": "123", "stock": 3, "available_stock": 1}
        ])))
        .mount(&server)
        .await;

    let books = client
        .list_all("/books/available", &ListQuery::new().search("tom"))
        .await
        .unwrap();

    assert_eq!(books.len(), 1);
    assert_eq!(books[0].display("isbn"), "123");
}

#[tokio::test]
async fn list_all_coerces_malformed_payloads_to_empty() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/books"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": "not-a-list"})))
        .mount(&server)
        .await;

    let books = client.list_all("/books", &ListQuery::new()).await.unwrap();
    assert!(books.is_empty());
}

#[tokio::test]
async fn list_page_carries_pagination_meta() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/products"))
        .and(query_param("page", "2"))
        .and(query_param("per_page", "10"))
        .and(query_param("q[name_cont]", "lamp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 11, "name": "Desk lamp"}],
            "meta": {"total_page": 4, "total_data": 31, "current_page": 2}
        })))
        .mount(&server)
        .await;

    let page = client
        .list_page(
            "/products",
            &ListQuery::new().page(2).per_page(10).name_contains("lamp"),
        )
        .await
        .unwrap();

    assert_eq!(page.records.len(), 1);
    assert_eq!(page.meta.unwrap().total_page, Some(4));
}

// ── Bearer injection ────────────────────────────────────────────────

#[tokio::test]
async fn requests_carry_bearer_token_when_present() {
    let (server, client) = setup().await;
    client.tokens().issue(pair("tok-123", "ref-123"));

    Mock::given(method("GET"))
        .and(path("/api/v1/borrowers"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    client
        .list_all("/borrowers", &ListQuery::new())
        .await
        .unwrap();
}

// ── Envelope wrapping ───────────────────────────────────────────────

#[tokio::test]
async fn create_wraps_fields_under_envelope_key() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/books"))
        .and(body_json(json!({
            "book": {"name": "Dune", "isbn": "978-0441172719", "stock": 1}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 7, "name": "Dune", "isbn": "978-0441172719", "stock": 1
        })))
        .mount(&server)
        .await;

    let created = client
        .create_one(
            "/books",
            Some("book"),
            &record(json!({"name": "Dune", "isbn": "978-0441172719", "stock": 1})),
        )
        .await
        .unwrap();

    assert_eq!(created.id_segment().unwrap(), "7");
}

#[tokio::test]
async fn update_puts_enveloped_body_by_id() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/borrowers/3"))
        .and(body_json(json!({"borrower": {"name": "Ada", "email": "ada@example.com"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 3, "name": "Ada", "email": "ada@example.com"
        })))
        .mount(&server)
        .await;

    let updated = client
        .update_one(
            "/borrowers",
            Some("borrower"),
            "3",
            &record(json!({"name": "Ada", "email": "ada@example.com"})),
        )
        .await
        .unwrap();

    assert_eq!(updated.display("name"), "Ada");
}

#[tokio::test]
async fn unknown_resources_post_unwrapped() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/widgets"))
        .and(body_json(json!({"name": "sprocket"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1, "name": "sprocket"})))
        .mount(&server)
        .await;

    client
        .create_one("/widgets", None, &record(json!({"name": "sprocket"})))
        .await
        .unwrap();
}

// ── Delete / patch ──────────────────────────────────────────────────

#[tokio::test]
async fn delete_sends_no_body() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/v1/books/9"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    client.delete_one("/books", "9").await.unwrap();
}

#[tokio::test]
async fn patch_hits_action_path_without_envelope() {
    let (server, client) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/api/v1/loans/4/return_book"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 4, "status": "returned"
        })))
        .mount(&server)
        .await;

    let loan = client.patch("/loans/4/return_book", None).await.unwrap();
    assert_eq!(loan.display("status"), "returned");
}

// ── 401 chokepoint ──────────────────────────────────────────────────

#[tokio::test]
async fn unauthorized_clears_tokens_and_signals_once() {
    let (server, client) = setup().await;
    client.tokens().issue(pair("stale", "stale-r"));
    let expired = client.tokens().session_expired();

    Mock::given(method("GET"))
        .and(path("/api/v1/loans"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client.list_all("/loans", &ListQuery::new()).await.unwrap_err();
    assert!(matches!(err, Error::SessionExpired));
    assert!(err.is_auth_expired());
    assert!(client.tokens().access_token().is_none());
    assert!(*expired.borrow());

    // Re-login resets the signal; a later success must not re-raise it.
    Mock::given(method("POST"))
        .and(path("/oauth/token/issue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh", "refresh_token": "fresh-r"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/books"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    client
        .authenticate(&Credentials {
            username: "admin".into(),
            password: "pw".to_owned().into(),
        })
        .await
        .unwrap();
    assert!(!*expired.borrow());

    client.list_all("/books", &ListQuery::new()).await.unwrap();
    assert!(!*expired.borrow());
}

#[tokio::test]
async fn other_failures_propagate_with_status_and_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/books"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"message": "isbn already taken"})),
        )
        .mount(&server)
        .await;

    let err = client
        .create_one("/books", Some("book"), &record(json!({"isbn": "dup"})))
        .await
        .unwrap_err();

    match err {
        Error::Request { status, ref body } => {
            assert_eq!(status, 422);
            assert!(body.contains("isbn already taken"));
        }
        other => panic!("expected Request error, got: {other:?}"),
    }
    assert_eq!(err.server_message().unwrap(), "isbn already taken");
}

// ── OAuth lifecycle ─────────────────────────────────────────────────

#[tokio::test]
async fn authenticate_posts_password_grant_and_stores_tokens() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token/issue"))
        .and(body_json(json!({
            "grant_type": "password",
            "client_id": "console-client",
            "client_secret": "console-secret",
            "username": "admin",
            "password": "hunter2",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "acc-1", "refresh_token": "ref-1"
        })))
        .mount(&server)
        .await;

    let issued = client
        .authenticate(&Credentials {
            username: "admin".into(),
            password: "hunter2".to_owned().into(),
        })
        .await
        .unwrap();

    assert_eq!(issued.access_token.expose_secret(), "acc-1");
    assert_eq!(
        client.tokens().access_token().unwrap().expose_secret(),
        "acc-1"
    );
}

#[tokio::test]
async fn failed_login_is_an_auth_error_not_a_teardown() {
    let (server, client) = setup().await;
    client.tokens().issue(pair("existing", "existing-r"));
    let expired = client.tokens().session_expired();

    Mock::given(method("POST"))
        .and(path("/oauth/token/issue"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "invalid_grant"})),
        )
        .mount(&server)
        .await;

    let err = client
        .authenticate(&Credentials {
            username: "admin".into(),
            password: "wrong".to_owned().into(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Authentication { .. }));
    // The auth root bypasses the chokepoint: no teardown, no redirect.
    assert!(client.tokens().access_token().is_some());
    assert!(!*expired.borrow());
}

#[tokio::test]
async fn refresh_rotates_the_stored_pair() {
    let (server, client) = setup().await;
    client.tokens().issue(pair("old", "old-r"));

    Mock::given(method("POST"))
        .and(path("/oauth/token/refresh"))
        .and(body_json(json!({
            "grant_type": "refresh_token",
            "refresh_token": "old-r",
            "client_id": "console-client",
            "client_secret": "console-secret",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new", "refresh_token": "new-r"
        })))
        .mount(&server)
        .await;

    let refresh = client.tokens().refresh_token().unwrap();
    client.refresh(&refresh).await.unwrap();

    assert_eq!(
        client.tokens().access_token().unwrap().expose_secret(),
        "new"
    );
}

#[tokio::test]
async fn logout_revokes_and_clears() {
    let (server, client) = setup().await;
    client.tokens().issue(pair("acc", "ref"));

    Mock::given(method("POST"))
        .and(path("/oauth/revoke"))
        .and(body_json(json!({
            "token": "acc",
            "client_id": "console-client",
            "client_secret": "console-secret",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    client.logout().await.unwrap();
    assert!(!client.tokens().is_authenticated());
}
