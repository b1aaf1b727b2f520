//! Watch registration for directories created after startup.
//!
//! Registering a watch waits on the notification facility's own thread, and
//! that thread may itself be blocked handing an event to the loop. The walk
//! therefore never runs on the event loop: the registrar moves to a blocking
//! worker and the loop only queues directory paths for it.

use std::path::PathBuf;

use filetrail_directory_watcher::{WatchRegistrar, watch_tree};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

pub(crate) enum Registration<R> {
    /// New directories are not watched; the registrar is only kept alive so
    /// the existing watches stay installed.
    Held(R),

    /// The registrar lives on a blocking worker fed by `requests`.
    Worker {
        requests: mpsc::UnboundedSender<PathBuf>,
        worker: JoinHandle<usize>,
    },
}

impl<R: WatchRegistrar + Send + 'static> Registration<R> {
    /// Move the registrar to a worker. Must be called inside a Tokio runtime.
    pub(crate) fn into_worker(self) -> Self {
        let mut registrar = match self {
            Self::Held(registrar) => registrar,
            worker @ Self::Worker { .. } => return worker,
        };

        let (requests, mut rx) = mpsc::unbounded_channel::<PathBuf>();
        let worker = tokio::task::spawn_blocking(move || {
            let mut watched = 0;
            while let Some(path) = rx.blocking_recv() {
                let walk = watch_tree(&mut registrar, &path);
                debug!("Watched new directory {}: {walk:?}", path.display());
                watched += walk.registered;
            }
            watched
        });

        Self::Worker { requests, worker }
    }

    /// Queue `path` for a tree walk. Returns `false` when nothing will watch
    /// it.
    pub(crate) fn request(&self, path: PathBuf) -> bool {
        match self {
            Self::Held(_) => false,
            Self::Worker { requests, .. } => requests.send(path).is_ok(),
        }
    }

    /// Wait for pending walks and return the number of watches they added.
    ///
    /// The event stream must already be closed: a walk can be waiting on the
    /// facility thread, which only moves once its pending event is consumed
    /// or dropped.
    pub(crate) async fn finish(self) -> usize {
        match self {
            Self::Held(_) => 0,
            Self::Worker { requests, worker } => {
                drop(requests);
                match worker.await {
                    Ok(watched) => watched,
                    Err(e) => {
                        error!("Directory registration worker failed: {e}");
                        0
                    }
                }
            }
        }
    }
}
