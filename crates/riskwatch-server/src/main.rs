//! riskwatch-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), layers
//! `RISKWATCH_*` environment variables on top, opens the SQLite store, and
//! serves the JSON API over HTTP.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use riskwatch_core::clock::SystemClock;
use riskwatch_server::{ConfiguredEstimator, ServerConfig};
use riskwatch_store_sqlite::SqliteStore;
use riskwatch_tracker::Tracker;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Riskwatch remediation tracker")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
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
    .add_source(config::Environment::with_prefix("RISKWATCH"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let tracker_cfg = server_cfg.tracker_config();
  let estimator = ConfiguredEstimator::from_url(
    server_cfg.estimator_url.as_deref(),
    tracker_cfg.estimator_timeout,
  )
  .context("failed to build estimator client")?;
  if !estimator.is_available() {
    tracing::warn!("no estimator_url configured; check-ins will run degraded");
  }

  let tracker = Tracker::new(
    Arc::new(store),
    Arc::new(estimator),
    Arc::new(SystemClock),
    tracker_cfg,
  );

  let app = riskwatch_server::app(Arc::new(tracker));
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

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
