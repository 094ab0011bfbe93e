// OAuth token lifecycle
//
// The auth endpoints live on the bare backend root, not the `/api/v1`
// resource root, and bypass the 401 chokepoint: a rejected login is an
// `Authentication` error, never a session teardown.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::record::Record;
use crate::token::TokenPair;

/// Username/password credentials for the password grant.
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
}

impl From<TokenResponse> for TokenPair {
    fn from(resp: TokenResponse) -> Self {
        Self {
            access_token: resp.access_token.into(),
            refresh_token: resp.refresh_token.into(),
        }
    }
}

impl ApiClient {
    /// Exchange credentials for a token pair (`POST /oauth/token/issue`,
    /// grant type `password`) and store it in the injected token store.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<TokenPair, Error> {
        let url = self.auth_url("/oauth/token/issue");
        debug!("POST {} (password grant)", url);

        let body = json!({
            "grant_type": "password",
            "client_id": self.config().client_id,
            "client_secret": self.config().client_secret.expose_secret(),
            "username": credentials.username,
            "password": credentials.password.expose_secret(),
        });

        let pair = self.token_request(url, &body).await?;
        self.tokens().issue(pair.clone());
        Ok(pair)
    }

    /// Exchange a refresh token for a fresh pair
    /// (`POST /oauth/token/refresh`) and store it.
    pub async fn refresh(&self, refresh_token: &SecretString) -> Result<TokenPair, Error> {
        let url = self.auth_url("/oauth/token/refresh");
        debug!("POST {} (refresh grant)", url);

        let body = json!({
            "grant_type": "refresh_token",
            "refresh_token": refresh_token.expose_secret(),
            "client_id": self.config().client_id,
            "client_secret": self.config().client_secret.expose_secret(),
        });

        let pair = self.token_request(url, &body).await?;
        self.tokens().issue(pair.clone());
        Ok(pair)
    }

    /// Revoke a token (`POST /oauth/revoke`).
    pub async fn revoke(&self, token: &SecretString) -> Result<(), Error> {
        let url = self.auth_url("/oauth/revoke");
        debug!("POST {}", url);

        let body = json!({
            "token": token.expose_secret(),
            "client_id": self.config().client_id,
            "client_secret": self.config().client_secret.expose_secret(),
        });

        let resp = self
            .http()
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!("revoke failed (HTTP {status}): {body}"),
            });
        }
        Ok(())
    }

    /// Revoke the current access token (best effort) and clear the store.
    pub async fn logout(&self) -> Result<(), Error> {
        if let Some(token) = self.tokens().access_token() {
            self.revoke(&token).await?;
        }
        self.tokens().clear();
        debug!("logout complete");
        Ok(())
    }

    /// Register a new console user (`POST /auth/register`, `{user: …}`
    /// envelope). Goes through the resource root like any other call.
    pub async fn register(&self, user: &Record) -> Result<Record, Error> {
        self.create_one("/auth/register", Some("user"), user).await
    }

    async fn token_request(
        &self,
        url: url::Url,
        body: &serde_json::Value,
    ) -> Result<TokenPair, Error> {
        let resp = self
            .http()
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!("token request failed (HTTP {status}): {body}"),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body,
            })?;
        Ok(parsed.into())
    }
}
