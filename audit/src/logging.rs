//! Log file setup.

use std::fs::{File, OpenOptions};
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::{AuditError, Result};

/// Default log file, relative to the working directory.
pub const DEFAULT_LOG_FILE: &str = "tracelog.log";

/// Open `path` for appending, creating it if needed.
pub fn open_log_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| AuditError::LogFile {
            path: path.to_path_buf(),
            source,
        })
}

/// Route all `tracing` output to the append-only log file at `path`.
///
/// The level defaults to `info` and can be overridden with `RUST_LOG`.
/// Keep the returned guard alive for as long as logging is needed; dropping
/// it flushes buffered lines.
pub fn init_file_logging(path: &Path) -> Result<WorkerGuard> {
    let file = open_log_file(path)?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .map_err(|e| AuditError::Logging(e.to_string()))?;

    Ok(guard)
}
