//! Configuration types for directory watching.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default capacity of the event and error streams.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Configuration for a watched directory tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Root of the tree to watch.
    pub root: PathBuf,

    /// Whether directories created after the initial walk get watched too.
    pub watch_new_directories: bool,

    /// Capacity of each stream between the notify thread and the event loop.
    pub channel_capacity: usize,
}

impl WatchConfig {
    /// Create a new watch config.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            watch_new_directories: false,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Enable or disable watching directories created after startup.
    pub fn with_new_directory_watching(mut self, enabled: bool) -> Self {
        self.watch_new_directories = enabled;
        self
    }

    /// Set the stream capacity. Zero is bumped to one.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    #[test]
    fn test_watch_config_defaults() {
        let config = WatchConfig::new("/srv/data");

        assert_eq!(config.root, Path::new("/srv/data"));
        assert!(!config.watch_new_directories);
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
    }

    #[test]
    fn test_watch_config_builder() {
        let config = WatchConfig::new("/srv/data")
            .with_new_directory_watching(true)
            .with_channel_capacity(0);

        assert!(config.watch_new_directories);
        assert_eq!(config.channel_capacity, 1);
    }
}
