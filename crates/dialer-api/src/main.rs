//! Dialer server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered with
//! `DIALER_*` environment variables, opens the SQLite store, runs the
//! scheduler loop, and serves the REST API.
//!
//! With `--once` it runs a single scheduler tick and exits, for deployments
//! where cron or another external timer drives dispatch.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use chrono::Utc;
use clap::Parser;
use dialer_api::{Engine, ServerConfig};
use dialer_engine::{Orchestrator, ProviderSet, Providers};
use dialer_providers::{ClassifierClient, MessagingClient, VoiceClient};
use dialer_store_sqlite::SqliteStore;
use tokio::{net::TcpListener, task::JoinHandle, time::MissedTickBehavior};
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Outbound calling campaign orchestrator")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Run one scheduler tick and exit.
  #[arg(long)]
  once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration. Nested keys use `__`, e.g. DIALER_VOICE__API_KEY.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("DIALER")
        .prefix_separator("_")
        .separator("__"),
    )
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let providers = ProviderSet {
    voice:      VoiceClient::new(server_cfg.voice.clone())
      .context("failed to build voice client")?,
    messaging:  MessagingClient::new(server_cfg.messaging.clone())
      .context("failed to build messaging client")?,
    classifier: ClassifierClient::new(server_cfg.classifier.clone())
      .context("failed to build classifier client")?,
  };

  let engine = Arc::new(Orchestrator::new(
    Arc::new(store),
    providers,
    server_cfg.engine_config(),
  ));

  if cli.once {
    let report = engine.tick(Utc::now()).await;
    for failure in &report.failures {
      tracing::warn!(
        campaign_id = ?failure.campaign_id,
        contact_id = ?failure.contact_id,
        error = %failure.error,
        "tick failure"
      );
    }
    return Ok(());
  }

  let scheduler = tokio::spawn(run_scheduler(
    engine.clone(),
    server_cfg.scheduler.tick_interval(),
  ));

  let app = dialer_api::api_router(engine).layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
  supervise(async { server.await.context("server error") }, scheduler).await
}

/// Run the server until it stops, failing if the scheduler loop dies first.
/// The loop never returns on its own, so any exit there is an error.
async fn supervise<F>(server: F, mut scheduler: JoinHandle<()>) -> anyhow::Result<()>
where
  F: Future<Output = anyhow::Result<()>>,
{
  tokio::select! {
    served = server => {
      scheduler.abort();
      served
    }
    joined = &mut scheduler => {
      let reason = match joined {
        Ok(()) => "exited".to_owned(),
        Err(e) if e.is_panic() => "panicked".to_owned(),
        Err(e) => e.to_string(),
      };
      tracing::error!(%reason, "scheduler loop stopped");
      Err(anyhow::anyhow!("scheduler loop stopped: {reason}"))
    }
  }
}

/// Tick on a fixed interval. A tick that overruns delays the next one rather
/// than overlapping it.
async fn run_scheduler<S, P>(engine: Engine<S, P>, period: Duration)
where
  S: dialer_core::store::CampaignStore + 'static,
  P: Providers + 'static,
{
  let mut ticker = tokio::time::interval(period);
  ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
  loop {
    ticker.tick().await;
    let report = engine.tick(Utc::now()).await;
    if !report.is_clean() {
      tracing::warn!(failures = report.failures.len(), "tick finished with failures");
    }
  }
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutting down");
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
