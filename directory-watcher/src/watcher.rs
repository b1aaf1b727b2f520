//! Notify-backed watcher with separate event and error streams.

use std::path::Path;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{Result, WatcherError};
use crate::registrar::WatchRegistrar;

/// Receiving ends of the notification facility.
///
/// Both streams close once the owning [`FsWatcher`] is dropped.
pub struct WatchStreams {
    /// Filesystem change events.
    pub events: mpsc::Receiver<Event>,

    /// Facility-level errors.
    pub errors: mpsc::Receiver<notify::Error>,
}

/// Handle to the OS notification facility.
///
/// Registrations are always non-recursive; use
/// [`watch_tree`](crate::registrar::watch_tree) to cover a whole tree.
pub struct FsWatcher {
    inner: RecommendedWatcher,
}

impl FsWatcher {
    /// Create a watcher whose events and errors are forwarded into two
    /// bounded streams of `capacity` entries each.
    pub fn new(capacity: usize) -> Result<(Self, WatchStreams)> {
        let (event_tx, events) = mpsc::channel(capacity.max(1));
        let (error_tx, errors) = mpsc::channel(capacity.max(1));

        let inner = notify::recommended_watcher(
            move |res: std::result::Result<Event, notify::Error>| match res {
                Ok(event) => {
                    if let Err(e) = event_tx.blocking_send(event) {
                        debug!("Dropping file event, stream closed: {:?}", e.0.paths);
                    }
                }
                Err(err) => {
                    if let Err(e) = error_tx.blocking_send(err) {
                        debug!("Dropping watch error, stream closed: {}", e.0);
                    }
                }
            },
        )?;

        Ok((Self { inner }, WatchStreams { events, errors }))
    }
}

impl WatchRegistrar for FsWatcher {
    fn register(&mut self, path: &Path) -> Result<()> {
        self.inner
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|source| WatcherError::Register {
                path: path.display().to_string(),
                source,
            })
    }
}
