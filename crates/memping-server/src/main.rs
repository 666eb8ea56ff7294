//! memping server binary.
//!
//! Reads `memping.toml` (or the path given with `--config`) plus `MEMPING_*`
//! environment variables, opens the SQLite store, and either serves HTTP or
//! runs a single send from the command line.
//!
//! ```text
//! memping serve
//! memping send --dry-run
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use memping_server::{
  AppState, ServerConfig,
  mail::ResendMailer,
  trigger::SendMode,
};
use memping_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Daily memory prompts by email")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "memping.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the API, photos and send trigger over HTTP (the default).
  Serve,
  /// Pick and send one prompt now, then exit.
  Send {
    /// Select and preview without mailing or recording anything.
    #[arg(long)]
    dry_run: bool,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("MEMPING"))
    .build()
    .context("failed to read config file")?;

  let mut server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  server_cfg.store_path = expand_tilde(&server_cfg.store_path);
  server_cfg.photo_dir = expand_tilde(&server_cfg.photo_dir);

  let store = SqliteStore::open(&server_cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", server_cfg.store_path))?;

  let resend = server_cfg.resend_config();
  if let Some(field) = resend.missing_field() {
    tracing::warn!("mail is not configured ({field} missing); live sends will fail");
  }
  let mailer = ResendMailer::new(resend).context("failed to build mail client")?;

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let state = AppState::new(store, mailer, server_cfg);

  match cli.command.unwrap_or(Command::Serve) {
    Command::Send { dry_run } => {
      let mode = if dry_run { SendMode::DryRun } else { SendMode::Live };
      let report = state.send_now(mode).await.context("send failed")?;
      println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Command::Serve => {
      if state.config.cron_secret.as_deref().is_none_or(str::is_empty) {
        tracing::warn!("cron_secret is not set; every send trigger will be rejected");
      }

      let app = memping_server::router(state);
      tracing::info!("Listening on http://{address}");
      let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

      axum::serve(listener, app).await.context("server error")?;
    }
  }

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
