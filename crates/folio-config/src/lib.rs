//! Shared configuration for the folio console.
//!
//! TOML profiles, credential resolution (env var > keyring > plaintext),
//! and translation to `folio_api::ApiConfig`. The token cache lives next
//! to the config file so sessions survive restarts.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use folio_api::{ApiConfig, TlsMode, TransportConfig};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no client credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("unknown profile '{profile}'")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

// The backend aborts anything slower client-side; matches the fixed
// request timeout the console has always shipped with.
fn default_timeout() -> u64 {
    10
}

/// A named backend profile.
#[derive(Debug, Deserialize, Serialize)]
pub struct Profile {
    /// Backend root URL (e.g., "http://localhost:3001").
    pub api_url: String,

    /// OAuth application id.
    pub client_id: String,

    /// OAuth application secret (plaintext — prefer keyring or env var).
    pub client_secret: Option<String>,

    /// Environment variable name containing the client secret.
    pub client_secret_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,
}

// ── Config file paths ───────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("io", "folio", "folio")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Where the session token cache lives.
pub fn token_cache_path() -> PathBuf {
    project_dirs().map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("tokens.json");
            p
        },
        |dirs| dirs.config_dir().join("tokens.json"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("folio");
    p
}

// ── Config loading / saving ─────────────────────────────────────────

/// Load the full Config from file + environment (`FOLIO_*`).
pub fn load_config() -> Result<Config, ConfigError> {
    let path = config_path();

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("FOLIO_").split("_"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(&path, toml_str)?;
    Ok(())
}

/// Look up a profile by name, falling back to the configured default.
pub fn select_profile<'a>(
    cfg: &'a Config,
    name: Option<&'a str>,
) -> Result<(&'a str, &'a Profile), ConfigError> {
    let name = name
        .or(cfg.default_profile.as_deref())
        .unwrap_or("default");
    cfg.profiles
        .get(name)
        .map(|p| (name, p))
        .ok_or_else(|| ConfigError::UnknownProfile {
            profile: name.into(),
        })
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the OAuth client secret from the credential chain.
pub fn resolve_client_secret(
    profile: &Profile,
    profile_name: &str,
) -> Result<SecretString, ConfigError> {
    // 1. Profile's client_secret_env → env var lookup
    if let Some(ref env_name) = profile.client_secret_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new("folio", &format!("{profile_name}/client-secret")) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref secret) = profile.client_secret {
        return Ok(SecretString::from(secret.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

// ── Conversion to gateway config ────────────────────────────────────

/// Build the gateway's `ApiConfig` + `TransportConfig` from a profile.
pub fn profile_to_api_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<(ApiConfig, TransportConfig), ConfigError> {
    let base_url: url::Url = profile
        .api_url
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "api_url".into(),
            reason: format!("invalid URL: {}", profile.api_url),
        })?;

    let client_secret = resolve_client_secret(profile, profile_name)?;

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else {
        TlsMode::System
    };

    let timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));

    Ok((
        ApiConfig {
            base_url,
            client_id: profile.client_id.clone(),
            client_secret,
        },
        TransportConfig { tls, timeout },
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn profile() -> Profile {
        Profile {
            api_url: "http://localhost:3001".into(),
            client_id: "console".into(),
            client_secret: Some("plaintext".into()),
            client_secret_env: None,
            ca_cert: None,
            insecure: None,
            timeout: None,
        }
    }

    #[test]
    fn profile_converts_with_fixed_default_timeout() {
        let (api, transport) =
            profile_to_api_config(&profile(), "default", &Defaults::default()).unwrap();
        assert_eq!(api.base_url.as_str(), "http://localhost:3001/");
        assert_eq!(transport.timeout, Duration::from_secs(10));
    }

    #[test]
    fn unset_env_indirection_falls_through_to_plaintext() {
        let mut p = profile();
        p.client_secret_env = Some("FOLIO_TEST_SECRET_THAT_IS_NEVER_SET".into());

        let secret = resolve_client_secret(&p, "default").unwrap();
        use secrecy::ExposeSecret;
        assert_eq!(secret.expose_secret(), "plaintext");
    }

    #[test]
    fn missing_credentials_are_reported_per_profile() {
        let mut p = profile();
        p.client_secret = None;
        let err = resolve_client_secret(&p, "staging").unwrap_err();
        assert!(matches!(err, ConfigError::NoCredentials { profile } if profile == "staging"));
    }

    #[test]
    fn invalid_url_is_a_validation_error() {
        let mut p = profile();
        p.api_url = "not a url".into();
        let err = profile_to_api_config(&p, "default", &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn select_profile_falls_back_to_default() {
        let mut cfg = Config::default();
        cfg.profiles.insert("default".into(), profile());
        let (name, _) = select_profile(&cfg, None).unwrap();
        assert_eq!(name, "default");

        let err = select_profile(&cfg, Some("staging")).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProfile { .. }));
    }
}
