// Session token store.
//
// Tokens are an explicitly injected session context rather than ambient
// global state: issued at login, cleared at logout or on any 401. The
// store is process-wide and shared by every in-flight request; readers
// tolerate concurrent clearing (a request already carrying a stale token
// simply receives a 401 and lands in the same idempotent expire path).

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;
use tracing::{debug, warn};

/// An access/refresh token pair as issued by the auth root.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
}

/// Shared session token storage.
///
/// Cheaply cloneable; all clones observe the same session. The
/// session-expired signal fires on every 401-triggered expiry and is the
/// console's only redirect-to-login trigger — a later successful login
/// resets it, so re-authenticated sessions never re-trigger the redirect.
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    tokens: RwLock<Option<TokenPair>>,
    expired: watch::Sender<bool>,
    cache_path: Option<PathBuf>,
}

impl TokenStore {
    /// An in-memory store with no on-disk cache.
    pub fn new() -> Self {
        let (expired, _) = watch::channel(false);
        Self {
            inner: Arc::new(StoreInner {
                tokens: RwLock::new(None),
                expired,
                cache_path: None,
            }),
        }
    }

    /// A store backed by an on-disk cache file, preloaded if the file
    /// exists. Cache I/O failures are logged and never fail the caller.
    pub fn with_cache(path: PathBuf) -> Self {
        let tokens = read_cache(&path);
        let (expired, _) = watch::channel(false);
        Self {
            inner: Arc::new(StoreInner {
                tokens: RwLock::new(tokens),
                expired,
                cache_path: Some(path),
            }),
        }
    }

    /// Store a freshly issued pair and reset the expired signal.
    pub fn issue(&self, pair: TokenPair) {
        debug!("storing session tokens");
        *self.inner.tokens.write().expect("token lock poisoned") = Some(pair.clone());
        if let Some(ref path) = self.inner.cache_path {
            write_cache(path, &pair);
        }
        self.inner.expired.send_replace(false);
    }

    /// Drop the stored pair (logout). Does not signal expiry.
    pub fn clear(&self) {
        debug!("clearing session tokens");
        *self.inner.tokens.write().expect("token lock poisoned") = None;
        if let Some(ref path) = self.inner.cache_path {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(error = %e, "failed to remove token cache");
                }
            }
        }
    }

    /// 401 path: clear the pair and raise the expired signal. Idempotent —
    /// concurrent 401s all land here and observers see one transition.
    pub fn expire(&self) {
        self.clear();
        self.inner.expired.send_replace(true);
    }

    pub fn access_token(&self) -> Option<SecretString> {
        self.inner
            .tokens
            .read()
            .expect("token lock poisoned")
            .as_ref()
            .map(|p| p.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<SecretString> {
        self.inner
            .tokens
            .read()
            .expect("token lock poisoned")
            .as_ref()
            .map(|p| p.refresh_token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner
            .tokens
            .read()
            .expect("token lock poisoned")
            .is_some()
    }

    /// Subscribe to the session-expired signal.
    pub fn session_expired(&self) -> watch::Receiver<bool> {
        self.inner.expired.subscribe()
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

// ── Cache file I/O ──────────────────────────────────────────────────
//
// The cache is a plain JSON object; tokens are bearer credentials, so
// the file is written with owner-only permissions on unix.

fn read_cache(path: &PathBuf) -> Option<TokenPair> {
    let body = std::fs::read_to_string(path).ok()?;
    let value: serde_json::Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "token cache unreadable — ignoring");
            return None;
        }
    };
    let access = value.get("access_token")?.as_str()?.to_owned();
    let refresh = value.get("refresh_token")?.as_str()?.to_owned();
    debug!("loaded session tokens from cache");
    Some(TokenPair {
        access_token: access.into(),
        refresh_token: refresh.into(),
    })
}

fn write_cache(path: &PathBuf, pair: &TokenPair) {
    let body = serde_json::json!({
        "access_token": pair.access_token.expose_secret(),
        "refresh_token": pair.refresh_token.expose_secret(),
    });
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = std::fs::write(path, body.to_string()) {
        warn!(error = %e, "failed to write token cache");
        return;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pair(access: &str, refresh: &str) -> TokenPair {
        TokenPair {
            access_token: access.to_owned().into(),
            refresh_token: refresh.to_owned().into(),
        }
    }

    #[test]
    fn issue_resets_expired_signal() {
        let store = TokenStore::new();
        let rx = store.session_expired();

        store.expire();
        assert!(*rx.borrow());

        store.issue(pair("a", "r"));
        assert!(!*rx.borrow());
        assert!(store.is_authenticated());
    }

    #[test]
    fn expire_is_idempotent() {
        let store = TokenStore::new();
        store.issue(pair("a", "r"));
        store.expire();
        store.expire();
        assert!(store.access_token().is_none());
        assert!(*store.session_expired().borrow());
    }

    #[test]
    fn cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");

        let store = TokenStore::with_cache(path.clone());
        store.issue(pair("acc-1", "ref-1"));

        let reloaded = TokenStore::with_cache(path.clone());
        assert_eq!(
            reloaded.access_token().unwrap().expose_secret(),
            "acc-1"
        );

        reloaded.clear();
        assert!(!path.exists());
    }
}
