//! `folio-tui` — terminal administrative console for a library/product
//! catalog REST backend.
//!
//! Screens are navigable via number keys (1-6): Dashboard, Books,
//! Borrowers, Loans, Products, and Categories; a login screen guards
//! them all. Every screen mounts a descriptor-driven controller from
//! `folio-core`, and a bridge task streams controller state changes into
//! the action loop.
//!
//! Logs are written to a file (default `/tmp/folio-tui.log`) to avoid
//! corrupting the terminal UI.

mod action;
mod app;
mod bridge;
mod component;
mod event;
mod screen;
mod screens;
mod theme;
mod tui;
mod widgets;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use folio_core::{ApiClient, ApiConfig, TokenStore, TransportConfig};

use crate::app::App;

/// Terminal console for managing the folio catalog.
#[derive(Parser, Debug)]
#[command(name = "folio-tui", version, about)]
struct Cli {
    /// Backend root URL (e.g., http://localhost:3001)
    #[arg(short = 'u', long, env = "FOLIO_API_URL")]
    api_url: Option<String>,

    /// OAuth application id
    #[arg(long, env = "FOLIO_CLIENT_ID")]
    client_id: Option<String>,

    /// OAuth application secret
    #[arg(long, env = "FOLIO_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    /// Config profile name (defaults to the configured default profile)
    #[arg(short, long)]
    profile: Option<String>,

    /// Log file path
    #[arg(long, default_value = "/tmp/folio-tui.log")]
    log_file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Set up file-based tracing. We MUST NOT log to stdout/stderr — that
/// would corrupt the TUI output. Returns a guard that must be held for
/// the lifetime of the application so logs flush on exit.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("folio={log_level},folio_tui={log_level}")));

    let log_dir = cli
        .log_file
        .parent()
        .unwrap_or(std::path::Path::new("/tmp"));
    let log_filename = cli
        .log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("folio-tui.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    guard
}

/// Build the gateway client: CLI flags take priority, then the config
/// file profile.
fn build_client(cli: &Cli) -> Result<ApiClient> {
    let tokens = TokenStore::with_cache(folio_config::token_cache_path());

    if let (Some(url), Some(client_id), Some(client_secret)) =
        (&cli.api_url, &cli.client_id, &cli.client_secret)
    {
        let base_url = url
            .parse()
            .map_err(|e| eyre!("invalid --api-url {url}: {e}"))?;
        let config = ApiConfig {
            base_url,
            client_id: client_id.clone(),
            client_secret: client_secret.clone().into(),
        };
        return Ok(ApiClient::new(config, tokens, &TransportConfig::default())?);
    }

    let cfg = folio_config::load_config_or_default();
    let (name, profile) = folio_config::select_profile(&cfg, cli.profile.as_deref())
        .map_err(|e| {
            eyre!(
                "{e}\n\nConfigure a profile in {} or pass --api-url, --client-id and --client-secret.",
                folio_config::config_path().display()
            )
        })?;
    let (api_config, transport) =
        folio_config::profile_to_api_config(profile, name, &cfg.defaults)?;
    Ok(ApiClient::new(api_config, tokens, &transport)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Install panic/error hooks BEFORE entering the terminal
    tui::install_hooks()?;

    // Tracing to file — hold the guard so logs flush on exit
    let _log_guard = setup_tracing(&cli);

    info!(
        api_url = cli.api_url.as_deref().unwrap_or("(from config)"),
        "starting folio-tui"
    );

    let client = build_client(&cli)?;
    let mut app = App::new(client);
    app.run().await?;

    Ok(())
}
