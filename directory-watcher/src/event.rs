//! File event kinds reported by the notification facility.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of file event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileEventKind {
    /// A new entry appeared.
    Created,

    /// File contents changed.
    Modified,

    /// Entry was removed.
    Removed,

    /// An entry was moved into a watched directory. Reported once per move;
    /// the paired `From`/`Both` notifications stay [`Self::Renamed`].
    MovedIn,

    /// Entry was renamed.
    Renamed,

    /// Entry metadata changed.
    MetadataChanged,

    /// Entry was accessed.
    Accessed,

    /// Anything else.
    Other,
}

impl FileEventKind {
    /// Whether this kind reports a new entry under a watched directory.
    pub fn is_creation(self) -> bool {
        matches!(self, Self::Created | Self::MovedIn)
    }
}

impl From<notify::EventKind> for FileEventKind {
    fn from(kind: notify::EventKind) -> Self {
        match kind {
            notify::EventKind::Create(_) => Self::Created,
            notify::EventKind::Modify(modify_kind) => match modify_kind {
                notify::event::ModifyKind::Name(notify::event::RenameMode::To) => Self::MovedIn,
                notify::event::ModifyKind::Name(_) => Self::Renamed,
                notify::event::ModifyKind::Metadata(_) => Self::MetadataChanged,
                _ => Self::Modified,
            },
            notify::EventKind::Remove(_) => Self::Removed,
            notify::EventKind::Access(_) => Self::Accessed,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for FileEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "create",
            Self::Modified => "modify",
            Self::Removed => "remove",
            Self::MovedIn => "moved-in",
            Self::Renamed => "rename",
            Self::MetadataChanged => "metadata",
            Self::Accessed => "access",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}
