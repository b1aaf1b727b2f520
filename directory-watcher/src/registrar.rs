//! Watch registration over a directory tree.
//!
//! Each directory needs its own registration because a watch only covers
//! the immediate contents of the directory it was installed on.

use std::path::Path;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::Result;

/// Something that can install a non-recursive watch on a single path.
pub trait WatchRegistrar {
    /// Register a watch covering the immediate contents of `path`.
    fn register(&mut self, path: &Path) -> Result<()>;
}

/// Summary of a tree walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Directories visited, including the root.
    pub directories: usize,

    /// Registrations that succeeded.
    pub registered: usize,

    /// Registrations that failed.
    pub failed: usize,

    /// Paths that could not be stat'ed or listed.
    pub unreadable: usize,
}

impl WalkStats {
    /// Total registration attempts.
    pub fn attempts(&self) -> usize {
        self.registered + self.failed
    }
}

/// Walk `root` depth-first and register a watch on every directory.
///
/// Symbolic links are not followed. Registration, stat and listing failures
/// are logged and only affect the branch they occur in; the walk always
/// completes.
pub fn watch_tree<R>(registrar: &mut R, root: &Path) -> WalkStats
where
    R: WatchRegistrar + ?Sized,
{
    let mut stats = WalkStats::default();

    register(registrar, root, &mut stats);

    let metadata = match std::fs::metadata(root) {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!("Error getting file info for {}: {e}", root.display());
            stats.unreadable += 1;
            return stats;
        }
    };
    if !metadata.is_dir() {
        return stats;
    }
    stats.directories += 1;

    let subdirectories = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.file_type().is_dir());

    for entry in subdirectories {
        match entry {
            Ok(entry) => {
                stats.directories += 1;
                register(registrar, entry.path(), &mut stats);
            }
            Err(e) => {
                warn!("Error reading directory: {e}");
                stats.unreadable += 1;
            }
        }
    }

    info!(
        "Watching {} of {} directories under {} ({} failed)",
        stats.registered,
        stats.directories,
        root.display(),
        stats.failed
    );
    stats
}

fn register<R>(registrar: &mut R, path: &Path, stats: &mut WalkStats)
where
    R: WatchRegistrar + ?Sized,
{
    match registrar.register(path) {
        Ok(()) => {
            debug!("Started watching: {}", path.display());
            stats.registered += 1;
        }
        Err(e) => {
            warn!("Error adding watcher to {}: {e}", path.display());
            stats.failed += 1;
        }
    }
}
