//! The event loop.
//!
//! Consumes the watcher's event and error streams, turns creation events on
//! non-directory paths into [`FileCreationRecord`]s and hands them to the
//! record sink. Every failure in here is logged and the loop moves on; the
//! record in question is lost.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use filetrail_directory_watcher::{FileEventKind, WatchRegistrar, WatchStreams};
use filetrail_record_sink::{FileCreationRecord, RecordSink};
use notify::Event;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::expansion::Registration;
use crate::queue::{PushOutcome, QueueFullPolicy, RecordQueue, WriterStats, spawn_writer};

/// How records reach the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Insert from the event loop, one event at a time.
    #[default]
    Inline,

    /// Queue records for a separate writer task.
    Queued {
        capacity: usize,
        policy: QueueFullPolicy,
    },
}

/// Counters kept by the event loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Filesystem events received.
    pub events: usize,

    /// Paths carried by creation events.
    pub creations: usize,

    /// Records inserted (inline) or queued (queued mode, before writer
    /// failures are subtracted).
    pub records_submitted: usize,

    /// Records whose serialization or insertion failed.
    pub records_failed: usize,

    /// Records discarded because the queue was full.
    pub records_dropped: usize,

    /// Creation events whose path turned out to be a directory.
    pub directories_skipped: usize,

    /// Watches added for directories created after startup. Filled in when
    /// the loop finishes.
    pub directories_watched: usize,

    /// Creation events whose path could not be stat'ed.
    pub stat_failures: usize,

    /// Errors reported by the notification facility.
    pub facility_errors: usize,
}

enum Submitter {
    Inline(Arc<dyn RecordSink>),
    Queued {
        queue: RecordQueue,
        writer: JoinHandle<WriterStats>,
    },
}

/// Event loop feeding a record sink.
///
/// Owns the watch registrar so new directories can be watched when
/// `watch_new_directories` is enabled.
pub struct Dispatcher<R> {
    registration: Registration<R>,
    submitter: Submitter,
    stats: DispatchStats,
}

impl<R: WatchRegistrar + Send + 'static> Dispatcher<R> {
    /// Create a dispatcher. In queued mode this spawns the writer task, so
    /// it must be called inside a Tokio runtime.
    pub fn new(registrar: R, sink: Arc<dyn RecordSink>, mode: DispatchMode) -> Self {
        let submitter = match mode {
            DispatchMode::Inline => Submitter::Inline(sink),
            DispatchMode::Queued { capacity, policy } => {
                let (queue, writer) = spawn_writer(sink, capacity, policy);
                Submitter::Queued { queue, writer }
            }
        };

        Self {
            registration: Registration::Held(registrar),
            submitter,
            stats: DispatchStats::default(),
        }
    }

    /// Watch directories created after startup. The registrar moves to a
    /// blocking worker, so this must be called inside a Tokio runtime.
    /// Enabling cannot be undone.
    pub fn with_new_directory_watching(mut self, enabled: bool) -> Self {
        if enabled {
            self.registration = self.registration.into_worker();
        }
        self
    }

    /// Run until both streams close.
    pub async fn run(self, streams: WatchStreams) -> DispatchStats {
        self.run_until(streams, std::future::pending()).await
    }

    /// Run until both streams close or `shutdown` completes, then flush the
    /// writer task if there is one.
    pub async fn run_until<F>(mut self, mut streams: WatchStreams, shutdown: F) -> DispatchStats
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut events_open = true;
        let mut errors_open = true;

        while events_open || errors_open {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Event loop stopping");
                    break;
                }
                event = streams.events.recv(), if events_open => match event {
                    Some(event) => self.handle_event(event).await,
                    None => events_open = false,
                },
                err = streams.errors.recv(), if errors_open => match err {
                    Some(err) => self.handle_error(&err),
                    None => errors_open = false,
                },
            }
        }

        drop(streams);
        self.finish().await
    }

    /// Process one filesystem event.
    pub async fn handle_event(&mut self, event: Event) {
        self.stats.events += 1;

        let kind = FileEventKind::from(event.kind);
        if !kind.is_creation() {
            trace!("Ignoring {kind} event for {:?}", event.paths);
            return;
        }

        for path in event.paths {
            self.handle_created(path).await;
        }
    }

    /// Log an error from the notification facility.
    pub fn handle_error(&mut self, err: &notify::Error) {
        self.stats.facility_errors += 1;
        error!("Watch error: {err}");
    }

    /// Counters so far.
    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    async fn handle_created(&mut self, path: PathBuf) {
        self.stats.creations += 1;

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Error getting file info for {}: {e}", path.display());
                self.stats.stat_failures += 1;
                return;
            }
        };

        if metadata.is_dir() {
            self.stats.directories_skipped += 1;
            if !self.registration.request(path.clone()) {
                debug!("Not watching new directory {}", path.display());
            }
            return;
        }

        let record = match FileCreationRecord::from_metadata(&path, &metadata) {
            Ok(record) => record,
            Err(e) => {
                warn!("Error reading modification time of {}: {e}", path.display());
                self.stats.records_failed += 1;
                return;
            }
        };

        match record.to_log_line() {
            Ok(line) => info!("{line}"),
            Err(e) => {
                error!("Error marshaling record for {}: {e}", path.display());
                self.stats.records_failed += 1;
                return;
            }
        }

        self.submit(record).await;
    }

    async fn submit(&mut self, record: FileCreationRecord) {
        match &self.submitter {
            Submitter::Inline(sink) => match sink.insert(&record).await {
                Ok(()) => self.stats.records_submitted += 1,
                Err(e) => {
                    error!("Error inserting document for {}: {e}", record.name);
                    self.stats.records_failed += 1;
                }
            },
            Submitter::Queued { queue, .. } => match queue.push(record).await {
                PushOutcome::Enqueued => self.stats.records_submitted += 1,
                PushOutcome::EvictedOldest => {
                    self.stats.records_submitted += 1;
                    self.stats.records_dropped += 1;
                }
                PushOutcome::DroppedNewest => self.stats.records_dropped += 1,
                PushOutcome::Closed => {
                    error!("Record writer is gone, record lost");
                    self.stats.records_failed += 1;
                }
            },
        }
    }

    async fn finish(self) -> DispatchStats {
        let mut stats = self.stats;

        if let Submitter::Queued { queue, writer } = self.submitter {
            debug!("Flushing {} queued records", queue.len());
            queue.close();
            match writer.await {
                Ok(written) => {
                    stats.records_submitted = stats.records_submitted.saturating_sub(written.failed);
                    stats.records_failed += written.failed;
                }
                Err(e) => error!("Record writer task failed: {e}"),
            }
        }

        stats.directories_watched = self.registration.finish().await;
        info!("Event loop finished: {stats:?}");
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use filetrail_directory_watcher::Result as WatchResult;
    use filetrail_record_sink::{MemorySink, SinkError};
    use notify::EventKind;
    use notify::event::{CreateKind, ModifyKind, RenameMode};
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    /// Clones share one list, so a test can keep a handle after the
    /// registrar moves into the dispatcher.
    #[derive(Clone, Default)]
    struct RecordingRegistrar {
        paths: Arc<Mutex<Vec<PathBuf>>>,
    }

    impl RecordingRegistrar {
        fn paths(&self) -> Vec<PathBuf> {
            self.paths.lock().unwrap().clone()
        }
    }

    impl WatchRegistrar for RecordingRegistrar {
        fn register(&mut self, path: &Path) -> WatchResult<()> {
            self.paths.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }

    /// Fails the first `failures` inserts, then behaves like a memory sink.
    struct FlakySink {
        failures: AtomicUsize,
        inner: MemorySink,
    }

    #[async_trait]
    impl RecordSink for FlakySink {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn insert(&self, record: &FileCreationRecord) -> filetrail_record_sink::Result<()> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(SinkError::Closed);
            }
            self.inner.insert(record).await
        }

        async fn shutdown(&self) -> filetrail_record_sink::Result<()> {
            Ok(())
        }
    }

    fn created(path: &Path) -> Event {
        Event::new(EventKind::Create(CreateKind::Any)).add_path(path.to_path_buf())
    }

    fn moved_in(path: &Path) -> Event {
        Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::To)))
            .add_path(path.to_path_buf())
    }

    fn memory_dispatcher(sink: &MemorySink) -> Dispatcher<RecordingRegistrar> {
        Dispatcher::new(
            RecordingRegistrar::default(),
            Arc::new(sink.clone()),
            DispatchMode::Inline,
        )
    }

    /// Feed `events` through a full loop run and return its counters.
    async fn run_events(
        dispatcher: Dispatcher<RecordingRegistrar>,
        events: Vec<Event>,
    ) -> DispatchStats {
        let (event_tx, event_rx) = mpsc::channel(events.len().max(1));
        let (error_tx, errors) = mpsc::channel(1);
        for event in events {
            event_tx.send(event).await.unwrap();
        }
        drop(event_tx);
        drop(error_tx);
        dispatcher
            .run(WatchStreams {
                events: event_rx,
                errors,
            })
            .await
    }

    #[tokio::test]
    async fn test_file_creation_submits_one_record() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("c.txt");
        std::fs::write(&path, "c").unwrap();
        let sink = MemorySink::new();
        let mut dispatcher = memory_dispatcher(&sink);

        dispatcher.handle_event(created(&path)).await;

        let records = sink.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, path.to_string_lossy());
        assert_eq!(dispatcher.stats().records_submitted, 1);
    }

    #[tokio::test]
    async fn test_directory_creation_submits_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("sub2");
        std::fs::create_dir(&dir).unwrap();
        let sink = MemorySink::new();
        let registrar = RecordingRegistrar::default();
        let dispatcher =
            Dispatcher::new(registrar.clone(), Arc::new(sink.clone()), DispatchMode::Inline);

        let stats = run_events(dispatcher, vec![created(&dir)]).await;

        assert!(sink.is_empty().await);
        assert_eq!(stats.directories_skipped, 1);
        assert_eq!(stats.directories_watched, 0);
        assert!(registrar.paths().is_empty());
    }

    #[tokio::test]
    async fn test_new_directory_is_watched_when_enabled() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("sub2");
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        let sink = MemorySink::new();
        let registrar = RecordingRegistrar::default();
        let dispatcher =
            Dispatcher::new(registrar.clone(), Arc::new(sink.clone()), DispatchMode::Inline)
                .with_new_directory_watching(true);

        let stats = run_events(dispatcher, vec![created(&dir)]).await;

        assert!(sink.is_empty().await);
        assert_eq!(registrar.paths(), vec![dir.clone(), dir.join("nested")]);
        assert_eq!(stats.directories_watched, 2);
    }

    #[tokio::test]
    async fn test_file_moved_in_is_recorded() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("arrived.txt");
        std::fs::write(&path, "a").unwrap();
        let sink = MemorySink::new();
        let mut dispatcher = memory_dispatcher(&sink);

        dispatcher.handle_event(moved_in(&path)).await;

        let records = sink.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, path.to_string_lossy());
        assert_eq!(dispatcher.stats().creations, 1);
    }

    #[tokio::test]
    async fn test_rename_within_tree_is_not_recorded_twice() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("before.txt");
        let to = temp_dir.path().join("after.txt");
        std::fs::write(&to, "a").unwrap();
        let sink = MemorySink::new();
        let mut dispatcher = memory_dispatcher(&sink);

        // inotify reports a rename inside one watched tree as From, To and Both.
        let renamed_from = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::From)))
            .add_path(from.clone());
        let renamed_both = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(from)
            .add_path(to.clone());
        dispatcher.handle_event(renamed_from).await;
        dispatcher.handle_event(moved_in(&to)).await;
        dispatcher.handle_event(renamed_both).await;

        let records = sink.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, to.to_string_lossy());
    }

    #[tokio::test]
    async fn test_non_creation_events_are_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("c.txt");
        std::fs::write(&path, "c").unwrap();
        let sink = MemorySink::new();
        let mut dispatcher = memory_dispatcher(&sink);

        let modified = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(path);
        dispatcher.handle_event(modified).await;

        assert!(sink.is_empty().await);
        assert_eq!(dispatcher.stats().events, 1);
        assert_eq!(dispatcher.stats().creations, 0);
    }

    #[tokio::test]
    async fn test_vanished_path_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let sink = MemorySink::new();
        let mut dispatcher = memory_dispatcher(&sink);

        dispatcher
            .handle_event(created(&temp_dir.path().join("gone.txt")))
            .await;

        assert!(sink.is_empty().await);
        assert_eq!(dispatcher.stats().stat_failures, 1);
    }

    #[tokio::test]
    async fn test_duplicate_events_are_recorded_twice() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("c.txt");
        std::fs::write(&path, "c").unwrap();
        let sink = MemorySink::new();
        let mut dispatcher = memory_dispatcher(&sink);

        dispatcher.handle_event(created(&path)).await;
        dispatcher.handle_event(created(&path)).await;

        assert_eq!(sink.len().await, 2);
    }

    #[tokio::test]
    async fn test_loop_survives_insert_failure_and_facility_error() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("first.txt");
        let second = temp_dir.path().join("second.txt");
        std::fs::write(&first, "1").unwrap();
        std::fs::write(&second, "2").unwrap();

        let memory = MemorySink::new();
        let sink = Arc::new(FlakySink {
            failures: AtomicUsize::new(1),
            inner: memory.clone(),
        });
        let dispatcher = Dispatcher::new(RecordingRegistrar::default(), sink, DispatchMode::Inline);

        let (event_tx, events) = mpsc::channel(8);
        let (error_tx, errors) = mpsc::channel(8);
        let loop_handle = tokio::spawn(dispatcher.run(WatchStreams { events, errors }));

        event_tx.send(created(&first)).await.unwrap();
        error_tx.send(notify::Error::generic("queue overflow")).await.unwrap();
        event_tx.send(created(&second)).await.unwrap();
        drop(event_tx);
        drop(error_tx);

        let stats = loop_handle.await.unwrap();

        assert_eq!(stats.records_failed, 1);
        assert_eq!(stats.facility_errors, 1);
        assert_eq!(stats.records_submitted, 1);
        let records = memory.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, second.to_string_lossy());
    }

    #[tokio::test]
    async fn test_queued_mode_flushes_on_shutdown() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("queued.txt");
        std::fs::write(&path, "q").unwrap();
        let sink = MemorySink::new();
        let dispatcher = Dispatcher::new(
            RecordingRegistrar::default(),
            Arc::new(sink.clone()),
            DispatchMode::Queued {
                capacity: 4,
                policy: QueueFullPolicy::Block,
            },
        );

        let (event_tx, events) = mpsc::channel(8);
        let (_error_tx, errors) = mpsc::channel(8);
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let loop_handle = tokio::spawn(dispatcher.run_until(WatchStreams { events, errors }, async {
            let _ = stop_rx.await;
        }));

        event_tx.send(created(&path)).await.unwrap();
        // Let the loop pick the event up before asking it to stop.
        while event_tx.capacity() < event_tx.max_capacity() {
            tokio::task::yield_now().await;
        }
        stop_tx.send(()).unwrap();

        let stats = loop_handle.await.unwrap();
        assert_eq!(stats.records_submitted, 1);
        assert_eq!(sink.len().await, 1);
    }
}
