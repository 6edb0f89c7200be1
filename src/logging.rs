//! File logging. The terminal belongs to the TUI, so nothing is written to
//! stdout or stderr once the app is running.

use crate::config::LoggingConfig;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "tabfilter.log";

/// Install the global subscriber writing to a daily rolling file.
///
/// RUST_LOG takes precedence over the configured filter. The returned guard
/// flushes pending lines when dropped and must be held until exit.
pub fn init(config: &LoggingConfig) -> Result<(WorkerGuard, PathBuf)> {
  let log_dir = config.log_dir();
  std::fs::create_dir_all(&log_dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", log_dir.display(), e))?;

  let env_filter = match EnvFilter::try_from_default_env() {
    Ok(filter) => filter,
    Err(_) => EnvFilter::try_new(&config.filter)
      .map_err(|e| eyre!("Invalid log filter {:?}: {}", config.filter, e))?,
  };

  let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
  let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

  tracing_subscriber::registry()
    .with(env_filter)
    .with(
      fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true),
    )
    .try_init()
    .map_err(|e| eyre!("Failed to install log subscriber: {}", e))?;

  Ok((guard, log_dir))
}
