//! `folio-api` — async client for the folio catalog REST API.
//!
//! A thin gateway normalizing all HTTP interaction with the backend:
//! bearer-token injection from an injected [`TokenStore`], resource
//! envelope wrapping (`{book: …}`, `{loan: …}`), `{data, meta}` response
//! unwrapping, and centralized 401 handling (credentials cleared, a
//! session-expired signal raised exactly once per 401).
//!
//! The OAuth token lifecycle (`/oauth/token/issue`, `/oauth/token/refresh`,
//! `/oauth/revoke`) runs against the bare backend root and bypasses the
//! 401 chokepoint.

mod auth;
mod client;
mod error;
mod query;
mod record;
mod token;
mod transport;

pub use auth::Credentials;
pub use client::{ApiClient, ApiConfig, ListMeta, ListPage};
pub use error::Error;
pub use query::ListQuery;
pub use record::Record;
pub use token::{TokenPair, TokenStore};
pub use transport::{TlsMode, TransportConfig};
