//! The record sink abstraction.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::StoreConfig;
use crate::error::Result;
use crate::memory::MemorySink;
use crate::mongo::MongoSink;
use crate::record::FileCreationRecord;

/// A store that durably keeps file creation records.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Short name of the backend, for logging.
    fn name(&self) -> &str;

    /// Insert one record. The store's acknowledgment is discarded.
    async fn insert(&self, record: &FileCreationRecord) -> Result<()>;

    /// Release the connection. Inserts after shutdown fail.
    async fn shutdown(&self) -> Result<()>;
}

/// Open the sink described by `config`.
///
/// `DbType = "memory"` selects [`MemorySink`]; any other kind is handed to
/// the MongoDB driver as the URI scheme.
pub async fn connect(config: &StoreConfig) -> Result<Arc<dyn RecordSink>> {
    let sink: Arc<dyn RecordSink> = if config.is_memory() {
        Arc::new(MemorySink::new())
    } else {
        Arc::new(MongoSink::connect(config).await?)
    };

    info!("Connected to {} record store", sink.name());
    Ok(sink)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_memory_kind() {
        let config = StoreConfig {
            kind: "memory".to_string(),
            ..Default::default()
        };

        let sink = connect(&config).await.unwrap();
        assert_eq!(sink.name(), "memory");

        sink.insert(&FileCreationRecord::new("a", "b")).await.unwrap();
        sink.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_malformed_uri_fails() {
        let config = StoreConfig {
            kind: "mongodb".to_string(),
            ..Default::default()
        };

        assert!(connect(&config).await.is_err());
    }
}
