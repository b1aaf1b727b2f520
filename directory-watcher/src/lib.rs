//! # Directory Watcher
//!
//! This crate installs file system watches for the filetrail audit agent.
//! The underlying notification facility only reports changes to the
//! immediate contents of a watched directory, so every directory in the
//! tree gets its own non-recursive registration.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Directory Watcher                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  watch_tree ──► WatchRegistrar ──► FsWatcher                    │
//! │                                        │                        │
//! │                                        ▼                        │
//! │                          WatchStreams { events, errors }        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod registrar;
pub mod watcher;

pub use config::WatchConfig;
pub use error::{Result, WatcherError};
pub use event::FileEventKind;
pub use registrar::{WalkStats, WatchRegistrar, watch_tree};
pub use watcher::{FsWatcher, WatchStreams};
