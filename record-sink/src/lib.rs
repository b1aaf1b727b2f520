//! # Record Sink
//!
//! File creation records and the stores they are written to.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Record Sink                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  StoreConfig ──► connect ──► RecordSink                         │
//! │                                  │                              │
//! │                        ┌─────────┴─────────┐                    │
//! │                        ▼                   ▼                    │
//! │                    MongoSink          MemorySink                │
//! │                                                                 │
//! │  FileCreationRecord { name, date } ──► insert                   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod memory;
pub mod mongo;
pub mod record;
pub mod sink;

pub use config::StoreConfig;
pub use error::{Result, SinkError};
pub use memory::MemorySink;
pub use mongo::MongoSink;
pub use record::FileCreationRecord;
pub use sink::{RecordSink, connect};
