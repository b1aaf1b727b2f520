//! Startup sequence and lifetime of the audit agent.

use std::future::Future;
use std::sync::Arc;

use filetrail_directory_watcher::{FsWatcher, WalkStats, WatchConfig, WatchStreams, watch_tree};
use filetrail_record_sink::RecordSink;
use tracing::info;

use crate::dispatch::{DispatchMode, DispatchStats, Dispatcher};
use crate::error::{AuditError, Result};

/// Runtime options of the agent.
#[derive(Debug, Clone)]
pub struct AgentOptions {
    /// Tree to watch.
    pub watch: WatchConfig,

    /// How records reach the sink.
    pub dispatch: DispatchMode,
}

impl AgentOptions {
    /// Inline dispatch over `watch`.
    pub fn new(watch: WatchConfig) -> Self {
        Self {
            watch,
            dispatch: DispatchMode::Inline,
        }
    }

    /// Set the dispatch mode.
    pub fn with_dispatch(mut self, dispatch: DispatchMode) -> Self {
        self.dispatch = dispatch;
        self
    }
}

/// What happened during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditReport {
    pub walk: WalkStats,
    pub dispatch: DispatchStats,
}

/// The audit agent: a watcher with its watches installed, waiting for a
/// sink to feed.
pub struct AuditAgent {
    options: AgentOptions,
    watcher: FsWatcher,
    streams: WatchStreams,
    walk: WalkStats,
}

impl AuditAgent {
    /// Create the watcher and install a watch on every directory of the
    /// tree. Events start queueing immediately.
    pub fn start(options: AgentOptions) -> Result<Self> {
        let (mut watcher, streams) = FsWatcher::new(options.watch.channel_capacity)?;

        info!("Watching tree at {}", options.watch.root.display());
        let walk = watch_tree(&mut watcher, &options.watch.root);

        Ok(Self {
            options,
            watcher,
            streams,
            walk,
        })
    }

    /// Result of the initial walk.
    pub fn walk_stats(&self) -> WalkStats {
        self.walk
    }

    /// Feed `sink` until the process is terminated.
    pub async fn run(self, sink: Arc<dyn RecordSink>) -> Result<AuditReport> {
        self.run_until(sink, std::future::pending()).await
    }

    /// Feed `sink` until `shutdown` completes, then release the sink.
    pub async fn run_until<F>(self, sink: Arc<dyn RecordSink>, shutdown: F) -> Result<AuditReport>
    where
        F: Future<Output = ()>,
    {
        let dispatcher = Dispatcher::new(self.watcher, Arc::clone(&sink), self.options.dispatch)
            .with_new_directory_watching(self.options.watch.watch_new_directories);

        let dispatch = dispatcher.run_until(self.streams, shutdown).await;

        sink.shutdown().await.map_err(AuditError::Shutdown)?;
        info!("Released {} record store", sink.name());

        Ok(AuditReport {
            walk: self.walk,
            dispatch,
        })
    }
}
