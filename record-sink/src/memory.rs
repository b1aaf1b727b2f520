//! In-process record sink.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Result, SinkError};
use crate::record::FileCreationRecord;
use crate::sink::RecordSink;

/// Sink that keeps records in memory. Clones share the same storage.
#[derive(Clone, Default)]
pub struct MemorySink {
    records: Arc<RwLock<Vec<FileCreationRecord>>>,
    closed: Arc<AtomicBool>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records inserted so far, in insertion order.
    pub async fn records(&self) -> Vec<FileCreationRecord> {
        self.records.read().await.clone()
    }

    /// Number of records inserted so far.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether no record has been inserted.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Whether [`shutdown`](RecordSink::shutdown) was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn insert(&self, record: &FileCreationRecord) -> Result<()> {
        if self.is_closed() {
            return Err(SinkError::Closed);
        }
        self.records.write().await.push(record.clone());
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_memory_sink_keeps_duplicates_in_order() {
        let sink = MemorySink::new();
        let record = FileCreationRecord::new("root/c.txt", "now");

        sink.insert(&record).await.unwrap();
        sink.insert(&record).await.unwrap();

        assert_eq!(sink.records().await, vec![record.clone(), record]);
    }

    #[tokio::test]
    async fn test_memory_sink_rejects_after_shutdown() {
        let sink = MemorySink::new();
        let observer = sink.clone();

        sink.shutdown().await.unwrap();

        assert!(observer.is_closed());
        let err = sink
            .insert(&FileCreationRecord::new("a", "b"))
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::Closed));
        assert!(observer.is_empty().await);
    }
}
