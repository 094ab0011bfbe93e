use thiserror::Error;

/// Top-level error type for the `folio-api` crate.
///
/// Covers every failure mode of the gateway: authentication, transport,
/// non-2xx responses, and payload decoding. `folio-core` maps these into
/// user-facing notifications.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login, refresh, or revoke failed at the auth root.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// A resource request came back HTTP 401. The token store has already
    /// been cleared by the time callers see this.
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── API ─────────────────────────────────────────────────────────
    /// Any non-2xx response that isn't a 401, with the raw body retained
    /// so callers can surface the upstream message.
    #[error("Request failed (HTTP {status})")]
    Request { status: u16, body: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON decoding failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error means the session is gone and
    /// re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Request { status: 404, .. } => true,
            _ => false,
        }
    }

    /// Best-effort extraction of a human-readable message from an error
    /// response body. Looks for the conventional `message` / `error` keys;
    /// falls back to `None` when the body isn't shaped that way.
    pub fn server_message(&self) -> Option<String> {
        let Self::Request { body, .. } = self else {
            return None;
        };
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        for key in ["message", "error", "error_description"] {
            if let Some(msg) = value.get(key).and_then(serde_json::Value::as_str) {
                return Some(msg.to_owned());
            }
        }
        None
    }
}
