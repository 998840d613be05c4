//! File logging via tracing.

use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogConfig;

/// Environment variable overriding the configured filter.
pub const LOG_ENV: &str = "SHIFTSYNC_LOG";

/// Install a daily-rolling file subscriber.
///
/// Keep the returned guard alive until exit or buffered lines are lost.
pub fn init(config: &LogConfig) -> Result<WorkerGuard> {
  let directory = match &config.directory {
    Some(dir) => dir.clone(),
    None => default_directory()?,
  };
  std::fs::create_dir_all(&directory)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", directory.display(), e))?;

  let appender = tracing_appender::rolling::daily(&directory, "shiftsync.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = filter_from(std::env::var(LOG_ENV).ok(), &config.filter)?;
  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}

fn default_directory() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;

  Ok(data_dir.join("shiftsync").join("logs"))
}

fn filter_from(env: Option<String>, default: &str) -> Result<EnvFilter> {
  let directives = env.filter(|v| !v.trim().is_empty());
  let directives = directives.as_deref().unwrap_or(default);
  EnvFilter::try_new(directives).map_err(|e| eyre!("Invalid log filter '{}': {}", directives, e))
}
