//! The file creation record.

use std::fs::Metadata;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One observed file creation, stored as `{ name, date }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCreationRecord {
    /// Path of the created file as reported by the watcher.
    pub name: String,

    /// Modification time in the local timezone's default rendering.
    pub date: String,
}

impl FileCreationRecord {
    /// Create a record from already rendered parts.
    pub fn new(name: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            date: date.into(),
        }
    }

    /// Build a record from a path and the metadata stat'ed for it.
    pub fn from_metadata(path: &Path, metadata: &Metadata) -> Result<Self> {
        let modified = metadata.modified()?;
        Ok(Self::new(path.to_string_lossy(), render_time(modified)))
    }

    /// Serialize to the single JSON line written to the log.
    pub fn to_log_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a line produced by [`to_log_line`](Self::to_log_line).
    pub fn from_log_line(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line.trim())?)
    }
}

/// Render a timestamp the way `chrono` displays local times, e.g.
/// `2024-05-01 09:30:12.123456789 +02:00`.
pub fn render_time(time: SystemTime) -> String {
    DateTime::<Local>::from(time).to_string()
}
