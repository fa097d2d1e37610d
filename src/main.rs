mod cache;
mod commands;
mod config;
mod model;
mod remote;
mod sync;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cache::SqliteStorage;
use config::Config;
use remote::{HttpConnector, Unconfigured};
use sync::{SyncEngine, SyncOptions};

#[derive(Parser, Debug)]
#[command(name = "sitecms")]
#[command(about = "Local-first content admin for the company website")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/sitecms/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Skip the remote store and work on the local cache only
  #[arg(long, global = true)]
  offline: bool,

  #[command(subcommand)]
  command: commands::Command,
}

/// Log to a file under the data directory so stdout only carries command output.
///
/// Filter comes from SITECMS_LOG (default "info").
fn init_logging(data_dir: &Path) -> Result<WorkerGuard> {
  std::fs::create_dir_all(data_dir)
    .map_err(|e| eyre!("Failed to create data directory {}: {}", data_dir.display(), e))?;

  let file = tracing_appender::rolling::never(data_dir, "sitecms.log");
  let (writer, guard) = tracing_appender::non_blocking(file);

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_env("SITECMS_LOG").unwrap_or_else(|_| EnvFilter::new("info")))
    .with(
      tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false),
    )
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let config = Config::load(args.config.as_deref())?;
  let data_dir = Config::data_dir()?;
  let _log_guard = init_logging(&data_dir)?;

  let cache_path = config
    .cache
    .path
    .clone()
    .unwrap_or_else(|| data_dir.join("cache.db"));
  let storage = SqliteStorage::open_at(&cache_path)?;
  let options = SyncOptions::from_config(&config);

  let engine = if args.offline {
    SyncEngine::new(storage, Unconfigured, options)
  } else {
    SyncEngine::new(storage, HttpConnector::new(&config.remote), options)
  };
  engine.initialize().await?;

  args.command.run(&engine).await
}
