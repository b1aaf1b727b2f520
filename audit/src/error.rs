//! Error types for the audit agent.
//!
//! Only fatal conditions are represented here. Everything that goes wrong
//! inside the walk or the event loop is logged and processing continues.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for agent operations.
pub type Result<T> = std::result::Result<T, AuditError>;

/// Fatal errors that end the process.
#[derive(Error, Debug)]
pub enum AuditError {
    /// The log file could not be opened.
    #[error("cannot open log file {}: {source}", .path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Logging was already initialized.
    #[error("logging initialization failed: {0}")]
    Logging(String),

    /// The store configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[source] filetrail_record_sink::SinkError),

    /// The notification facility could not be created.
    #[error("watcher error: {0}")]
    Watcher(#[from] filetrail_directory_watcher::WatcherError),

    /// Connecting to the record store failed.
    #[error("connect error: {0}")]
    Connect(#[source] filetrail_record_sink::SinkError),

    /// Releasing the record store connection failed.
    #[error("disconnect error: {0}")]
    Shutdown(#[source] filetrail_record_sink::SinkError),
}

impl AuditError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::LogFile { .. } | Self::Logging(_) | Self::Config(_) | Self::Watcher(_) => 1,
            Self::Connect(_) | Self::Shutdown(_) => 2,
        }
    }
}
