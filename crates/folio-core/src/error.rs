// ── Core error types ──
//
// User-facing errors from folio-core. Consumers never see raw HTTP or
// JSON parse failures directly; the `From<folio_api::Error>` impl
// translates transport-layer errors into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Client-side check caught before dispatch: a required form field
    /// is empty.
    #[error("{label} is required")]
    Validation { label: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// The session was torn down by a 401; the UI returns to login.
    #[error("Session expired -- sign in again")]
    SessionExpired,

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Cannot reach the backend: {reason}")]
    ConnectionFailed { reason: String },

    /// Any other API rejection, carrying the upstream message when the
    /// body had one.
    #[error("{message}")]
    Api {
        message: String,
        status: Option<u16>,
    },
}

impl From<folio_api::Error> for CoreError {
    fn from(err: folio_api::Error) -> Self {
        match err {
            folio_api::Error::Authentication { message } => {
                Self::AuthenticationFailed { message }
            }
            folio_api::Error::SessionExpired => Self::SessionExpired,
            folio_api::Error::Timeout { timeout_secs } => Self::Timeout { timeout_secs },
            folio_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    Self::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    Self::ConnectionFailed {
                        reason: e.to_string(),
                    }
                } else {
                    Self::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            folio_api::Error::InvalidUrl(e) => Self::ConnectionFailed {
                reason: format!("invalid URL: {e}"),
            },
            folio_api::Error::Tls(reason) => Self::ConnectionFailed { reason },
            ref e @ folio_api::Error::Request { status, .. } => Self::Api {
                message: e
                    .server_message()
                    .unwrap_or_else(|| format!("request failed (HTTP {status})")),
                status: Some(status),
            },
            folio_api::Error::Deserialization { message, .. } => Self::Api {
                message: format!("unexpected response: {message}"),
                status: None,
            },
        }
    }
}
