//! Error types for record sinks.

use thiserror::Error;

/// Result type alias for sink operations.
pub type Result<T> = std::result::Result<T, SinkError>;

/// Errors that can occur while loading store configuration or writing
/// records.
#[derive(Error, Debug)]
pub enum SinkError {
    /// Could not establish a connection to the store.
    #[error("failed to connect to {uri}: {source}")]
    Connect {
        /// Connection URI with credentials redacted.
        uri: String,
        #[source]
        source: mongodb::error::Error,
    },

    /// The store rejected or failed an insertion.
    #[error("insert failed: {0}")]
    Insert(#[source] mongodb::error::Error),

    /// The sink was already shut down.
    #[error("sink is closed")]
    Closed,

    /// Configuration document could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// File modification time is unavailable.
    #[error("metadata error: {0}")]
    Metadata(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
