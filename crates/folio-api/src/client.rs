// Gateway HTTP client
//
// Wraps `reqwest::Client` with catalog-specific URL construction, request
// envelope wrapping, response envelope unwrapping, and the single 401
// chokepoint. Auth-root calls (OAuth token lifecycle) live in `auth.rs`
// as inherent methods to keep this module focused on resource mechanics.

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::query::ListQuery;
use crate::record::Record;
use crate::token::TokenStore;
use crate::transport::TransportConfig;

/// Static client configuration: where the backend lives and which OAuth
/// application this console identifies as.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Backend root, e.g. `http://localhost:3001`. Resource endpoints hang
    /// off `{base}/api/v1`; the OAuth endpoints sit on the bare root.
    pub base_url: Url,
    pub client_id: String,
    pub client_secret: SecretString,
}

/// Pagination metadata delivered alongside enveloped list responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
pub struct ListMeta {
    #[serde(default)]
    pub total_page: Option<u64>,
    #[serde(default)]
    pub total_data: Option<u64>,
    #[serde(default)]
    pub current_page: Option<u64>,
}

/// One page of list results.
///
/// `meta` is present only when the endpoint wrapped its payload in the
/// `{data, meta}` envelope; bare-array endpoints carry no paging info.
/// `enveloped` records which of the two shapes the endpoint actually
/// returned, so callers can flag endpoints whose shape is undocumented.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub records: Vec<Record>,
    pub meta: Option<ListMeta>,
    pub enveloped: bool,
}

impl ListPage {
    /// Interpret a response body as a list page.
    ///
    /// Tolerates both shapes the backend emits — `{data: [...], meta: {...}}`
    /// and a bare array — and coerces anything else to an empty page so that
    /// table rendering never fails on malformed upstream data.
    fn from_body(body: &str) -> Self {
        let Ok(value) = serde_json::from_str::<Value>(body) else {
            warn!("list payload is not JSON — rendering empty");
            return Self::default();
        };
        match value {
            Value::Array(items) => Self {
                records: collect_records(items),
                meta: None,
                enveloped: false,
            },
            Value::Object(mut map) => {
                let records = match map.remove("data") {
                    Some(Value::Array(items)) => collect_records(items),
                    _ => {
                        warn!("list payload has no data array — rendering empty");
                        Vec::new()
                    }
                };
                let meta = map
                    .remove("meta")
                    .and_then(|m| serde_json::from_value(m).ok());
                Self {
                    records,
                    meta,
                    enveloped: true,
                }
            }
            _ => {
                warn!("list payload is neither array nor envelope — rendering empty");
                Self::default()
            }
        }
    }
}

fn collect_records(items: Vec<Value>) -> Vec<Record> {
    items.into_iter().filter_map(Record::from_value).collect()
}

/// HTTP client for the catalog's resource API.
///
/// Every request attaches the bearer token from the injected [`TokenStore`]
/// when one is present. Every response is inspected for HTTP 401: the store
/// is expired (clear + session-expired signal) and the call fails with
/// [`Error::SessionExpired`] — once per 401, never retried. All other
/// non-2xx responses propagate as [`Error::Request`].
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ApiConfig,
    tokens: TokenStore,
    timeout_secs: u64,
}

impl ApiClient {
    /// Create a new client from config and an injected token store.
    pub fn new(
        config: ApiConfig,
        tokens: TokenStore,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            config,
            tokens,
            timeout_secs: transport.timeout.as_secs(),
        })
    }

    /// Create a client with a pre-built `reqwest::Client` (tests).
    pub fn with_client(http: reqwest::Client, config: ApiConfig, tokens: TokenStore) -> Self {
        Self {
            http,
            config,
            tokens,
            timeout_secs: 10,
        }
    }

    /// The injected token store.
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// The backend root URL.
    pub fn base_url(&self) -> &Url {
        &self.config.base_url
    }

    pub(crate) fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a resource URL: `{base}/api/v1{endpoint}`.
    pub(crate) fn api_url(&self, endpoint: &str) -> Url {
        let base = self.config.base_url.as_str().trim_end_matches('/');
        let full = format!("{base}/api/v1{endpoint}");
        Url::parse(&full).expect("invalid API URL")
    }

    /// Build an auth-root URL: `{base}{path}`.
    pub(crate) fn auth_url(&self, path: &str) -> Url {
        let base = self.config.base_url.as_str().trim_end_matches('/');
        let full = format!("{base}{path}");
        Url::parse(&full).expect("invalid auth URL")
    }

    // ── Request plumbing ─────────────────────────────────────────────

    /// Attach the bearer token (if any) and dispatch, funnelling every
    /// response through the 401 chokepoint.
    pub(crate) async fn send(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, Error> {
        let builder = match self.tokens.access_token() {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        };

        let resp = builder.send().await.map_err(|e| self.map_transport(e))?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            // Clear credentials and raise the redirect signal. A stale-token
            // request racing a concurrent clear lands here too; expire() is
            // idempotent so observers see a single transition.
            self.tokens.expire();
            return Err(Error::SessionExpired);
        }

        Ok(resp)
    }

    fn map_transport(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            Error::Transport(e)
        }
    }

    /// Convert a non-2xx response into `Error::Request`.
    async fn request_error(resp: reqwest::Response) -> Error {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Error::Request { status, body }
    }

    /// Decode a record from a response body, unwrapping the `{data: {...}}`
    /// wrapper some detail endpoints use.
    fn record_from_body(body: &str) -> Result<Record, Error> {
        let value: Value =
            serde_json::from_str(body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: body.to_owned(),
            })?;
        let value = match value {
            Value::Object(mut map) if map.get("data").is_some_and(Value::is_object) => {
                map.remove("data").unwrap_or(Value::Null)
            }
            other => other,
        };
        Record::from_value(value).ok_or_else(|| Error::Deserialization {
            message: "expected a JSON object".into(),
            body: body.to_owned(),
        })
    }

    /// Wrap create/update fields under the resource envelope key, when the
    /// descriptor configures one.
    fn envelope_body(envelope: Option<&str>, fields: &Record) -> Value {
        match envelope {
            Some(key) => json!({ key: fields }),
            None => Value::Object(fields.0.clone()),
        }
    }

    // ── Resource operations ──────────────────────────────────────────

    /// GET a list endpoint, returning records plus pagination meta.
    pub async fn list_page(&self, endpoint: &str, query: &ListQuery) -> Result<ListPage, Error> {
        let url = self.api_url(endpoint);
        debug!("GET {}", url);

        let mut builder = self.http.get(url);
        if !query.is_empty() {
            builder = builder.query(query.pairs());
        }
        let resp = self.send(builder).await?;

        if !resp.status().is_success() {
            return Err(Self::request_error(resp).await);
        }

        let body = resp.text().await.map_err(|e| self.map_transport(e))?;
        Ok(ListPage::from_body(&body))
    }

    /// GET a list endpoint, returning just the records.
    pub async fn list_all(&self, endpoint: &str, query: &ListQuery) -> Result<Vec<Record>, Error> {
        Ok(self.list_page(endpoint, query).await?.records)
    }

    /// GET a single record by id.
    pub async fn get_one(&self, endpoint: &str, id: &str) -> Result<Record, Error> {
        let url = self.api_url(&format!("{endpoint}/{id}"));
        debug!("GET {}", url);

        let resp = self.send(self.http.get(url)).await?;
        if !resp.status().is_success() {
            return Err(Self::request_error(resp).await);
        }
        let body = resp.text().await.map_err(|e| self.map_transport(e))?;
        Self::record_from_body(&body)
    }

    /// POST a new record, wrapped under `envelope` when configured.
    pub async fn create_one(
        &self,
        endpoint: &str,
        envelope: Option<&str>,
        fields: &Record,
    ) -> Result<Record, Error> {
        let url = self.api_url(endpoint);
        debug!("POST {}", url);

        let body = Self::envelope_body(envelope, fields);
        let resp = self.send(self.http.post(url).json(&body)).await?;
        if !resp.status().is_success() {
            return Err(Self::request_error(resp).await);
        }
        let body = resp.text().await.map_err(|e| self.map_transport(e))?;
        Self::record_from_body(&body)
    }

    /// PUT an updated record, wrapped under `envelope` when configured.
    pub async fn update_one(
        &self,
        endpoint: &str,
        envelope: Option<&str>,
        id: &str,
        fields: &Record,
    ) -> Result<Record, Error> {
        let url = self.api_url(&format!("{endpoint}/{id}"));
        debug!("PUT {}", url);

        let body = Self::envelope_body(envelope, fields);
        let resp = self.send(self.http.put(url).json(&body)).await?;
        if !resp.status().is_success() {
            return Err(Self::request_error(resp).await);
        }
        let body = resp.text().await.map_err(|e| self.map_transport(e))?;
        Self::record_from_body(&body)
    }

    /// DELETE a record by id. No body either way.
    pub async fn delete_one(&self, endpoint: &str, id: &str) -> Result<(), Error> {
        let url = self.api_url(&format!("{endpoint}/{id}"));
        debug!("DELETE {}", url);

        let resp = self.send(self.http.delete(url)).await?;
        if !resp.status().is_success() {
            return Err(Self::request_error(resp).await);
        }
        Ok(())
    }

    /// Generic PATCH for state-transition actions, e.g.
    /// `/loans/{id}/return_book`. No envelope; an empty object is sent
    /// when no body is supplied.
    pub async fn patch(&self, path: &str, body: Option<&Value>) -> Result<Record, Error> {
        let url = self.api_url(path);
        debug!("PATCH {}", url);

        let payload = body.cloned().unwrap_or_else(|| json!({}));
        let resp = self.send(self.http.patch(url).json(&payload)).await?;
        if !resp.status().is_success() {
            return Err(Self::request_error(resp).await);
        }
        let body = resp.text().await.map_err(|e| self.map_transport(e))?;
        Self::record_from_body(&body)
    }

    /// GET an export endpoint returning a raw blob (e.g. the products CSV).
    pub async fn export(&self, endpoint: &str, query: &ListQuery) -> Result<Vec<u8>, Error> {
        let url = self.api_url(endpoint);
        debug!("GET {} (export)", url);

        let mut builder = self.http.get(url);
        if !query.is_empty() {
            builder = builder.query(query.pairs());
        }
        let resp = self.send(builder).await?;
        if !resp.status().is_success() {
            return Err(Self::request_error(resp).await);
        }
        let bytes = resp.bytes().await.map_err(|e| self.map_transport(e))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_page_tolerates_bare_arrays() {
        let page = ListPage::from_body(r#"[{"id": 1}, {"id": 2}]"#);
        assert_eq!(page.records.len(), 2);
        assert!(page.meta.is_none());
    }

    #[test]
    fn list_page_unwraps_envelope_with_meta() {
        let body = json!({
            "data": [{"id": 5, "name": "Dune"}],
            "meta": {"total_page": 3, "total_data": 25, "current_page": 1}
        })
        .to_string();
        let page = ListPage::from_body(&body);
        assert_eq!(page.records.len(), 1);
        let meta = page.meta.unwrap();
        assert_eq!(meta.total_page, Some(3));
        assert_eq!(meta.current_page, Some(1));
    }

    #[test]
    fn list_page_coerces_malformed_payloads_to_empty() {
        for body in [r#""oops""#, "42", r#"{"data": "nope"}"#, "{", r#"{"other": []}"#] {
            let page = ListPage::from_body(body);
            assert!(page.records.is_empty(), "body {body:?} should coerce to empty");
        }
    }

    #[test]
    fn list_page_skips_non_object_items() {
        let page = ListPage::from_body(r#"[{"id": 1}, 7, "x"]"#);
        assert_eq!(page.records.len(), 1);
    }

    #[test]
    fn envelope_body_wraps_only_when_configured() {
        let mut fields = Record::new();
        fields.insert("name", json!("Dune"));

        let wrapped = ApiClient::envelope_body(Some("book"), &fields);
        assert_eq!(wrapped, json!({"book": {"name": "Dune"}}));

        let bare = ApiClient::envelope_body(None, &fields);
        assert_eq!(bare, json!({"name": "Dune"}));
    }

    #[test]
    fn record_from_body_unwraps_data_object() {
        let rec = ApiClient::record_from_body(r#"{"data": {"id": 9, "name": "Tom"}}"#).unwrap();
        assert_eq!(rec.display("name"), "Tom");

        let raw = ApiClient::record_from_body(r#"{"id": 9}"#).unwrap();
        assert_eq!(raw.id_segment().unwrap(), "9");
    }
}
