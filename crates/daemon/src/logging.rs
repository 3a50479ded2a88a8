// SPDX-License-Identifier: MIT

//! Structured logging setup: a non-blocking file appender at the
//! configured path/level, plus an `EnvFilter` override via
//! `RUST_LOG`/`--debug` for ad-hoc diagnosis.

use holdfast_core::Config;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("log file {0} has no parent directory")]
    NoParent(std::path::PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Initializes the global tracing subscriber. Must be called at most
/// once per process; the returned guard must be kept alive for the
/// duration of the program or buffered log lines are dropped on exit.
pub fn init(config: &Config, debug: bool) -> Result<tracing_appender::non_blocking::WorkerGuard, LoggingError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_path = config.log_file();
    let parent = log_path.parent().ok_or_else(|| LoggingError::NoParent(log_path.clone()))?;
    std::fs::create_dir_all(parent)?;

    let file_name = file_name_or_default(&log_path);
    let file_appender = tracing_appender::rolling::never(parent, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if debug { "debug" } else { config.logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry().with(filter).with(fmt::layer().with_writer(non_blocking)).init();

    Ok(guard)
}

fn file_name_or_default(path: &Path) -> &std::ffi::OsStr {
    path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("holdfast.log"))
}
