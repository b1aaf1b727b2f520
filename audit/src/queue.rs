//! Bounded record queue drained by a writer task.
//!
//! Used when reception of filesystem events should not wait on the record
//! store. The queue-full policy decides what happens when the writer falls
//! behind.

use std::sync::Arc;

use async_channel::{Receiver, Sender, TrySendError};
use clap::ValueEnum;
use filetrail_record_sink::{FileCreationRecord, RecordSink};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// What to do with a record when the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum QueueFullPolicy {
    /// Wait for the writer to make room.
    #[default]
    Block,

    /// Discard the incoming record.
    DropNewest,

    /// Evict the oldest queued record to make room.
    DropOldest,
}

/// Outcome of [`RecordQueue::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The record was queued.
    Enqueued,

    /// The record was queued after evicting the oldest one.
    EvictedOldest,

    /// The record was discarded.
    DroppedNewest,

    /// The writer is gone.
    Closed,
}

/// Counters kept by the writer task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub written: usize,
    pub failed: usize,
}

/// Producer side of the record queue.
pub struct RecordQueue {
    tx: Sender<FileCreationRecord>,
    // Only kept for `DropOldest`, to evict from the head. Any other policy
    // must not hold a receiver, or the queue stays open after the writer dies.
    evict: Option<Receiver<FileCreationRecord>>,
    policy: QueueFullPolicy,
}

impl RecordQueue {
    /// Queue a record according to the queue-full policy.
    pub async fn push(&self, record: FileCreationRecord) -> PushOutcome {
        match self.policy {
            QueueFullPolicy::Block => match self.tx.send(record).await {
                Ok(()) => PushOutcome::Enqueued,
                Err(_) => PushOutcome::Closed,
            },
            QueueFullPolicy::DropNewest => match self.tx.try_send(record) {
                Ok(()) => PushOutcome::Enqueued,
                Err(TrySendError::Full(record)) => {
                    warn!("Record queue full, dropping record for {}", record.name);
                    PushOutcome::DroppedNewest
                }
                Err(TrySendError::Closed(_)) => PushOutcome::Closed,
            },
            QueueFullPolicy::DropOldest => {
                if !self.has_writer() {
                    return PushOutcome::Closed;
                }
                let mut record = record;
                let mut evicted = false;
                loop {
                    match self.tx.try_send(record) {
                        Ok(()) if evicted => return PushOutcome::EvictedOldest,
                        Ok(()) => return PushOutcome::Enqueued,
                        Err(TrySendError::Full(rejected)) => {
                            record = rejected;
                            if let Some(Ok(oldest)) = self.evict.as_ref().map(Receiver::try_recv) {
                                warn!("Record queue full, evicting record for {}", oldest.name);
                                evicted = true;
                            }
                        }
                        Err(TrySendError::Closed(_)) => return PushOutcome::Closed,
                    }
                }
            }
        }
    }

    /// Number of records waiting for the writer.
    pub(crate) fn len(&self) -> usize {
        self.tx.len()
    }

    fn has_writer(&self) -> bool {
        let own = usize::from(self.evict.is_some());
        self.tx.receiver_count() > own
    }

    /// Close the queue. The writer drains what is left and exits.
    pub fn close(&self) {
        self.tx.close();
    }
}

/// Start a writer task that inserts queued records into `sink`.
pub fn spawn_writer(
    sink: Arc<dyn RecordSink>,
    capacity: usize,
    policy: QueueFullPolicy,
) -> (RecordQueue, JoinHandle<WriterStats>) {
    let (tx, writer_rx) = async_channel::bounded(capacity.max(1));
    let evict = (policy == QueueFullPolicy::DropOldest).then(|| writer_rx.clone());

    let handle = tokio::spawn(async move {
        let mut stats = WriterStats::default();
        while let Ok(record) = writer_rx.recv().await {
            match sink.insert(&record).await {
                Ok(()) => stats.written += 1,
                Err(e) => {
                    error!("Error inserting document for {}: {e}", record.name);
                    stats.failed += 1;
                }
            }
        }
        debug!("Record writer finished: {stats:?}");
        stats
    });

    (RecordQueue { tx, evict, policy }, handle)
}
