//! # Audit Agent
//!
//! Watches a directory tree and records every newly created file in a
//! document store.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Audit Agent                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  StoreConfig ──► log file ──► watch_tree ──► connect            │
//! │                                                  │              │
//! │                                                  ▼              │
//! │  WatchStreams ──► Dispatcher ──► [RecordQueue] ──► RecordSink   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod agent;
pub mod dispatch;
pub mod error;
mod expansion;
pub mod logging;
pub mod queue;

pub use agent::{AgentOptions, AuditAgent, AuditReport};
pub use dispatch::{DispatchMode, DispatchStats, Dispatcher};
pub use error::{AuditError, Result};
pub use queue::{PushOutcome, QueueFullPolicy, RecordQueue, WriterStats, spawn_writer};
