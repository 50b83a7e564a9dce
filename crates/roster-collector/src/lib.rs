//! `roster_collector` - Offline teacher roster collection
//!
//! This library provides the core functionality for collecting teacher records
//! school by school without connectivity: a bundled school catalog, a staging
//! buffer for the school being worked on, a durable record store that survives
//! restarts, and CSV export of everything saved.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod catalog;
pub mod cli;
pub mod config;
pub mod durable;
pub mod error;
pub mod export;
pub mod logging;
pub mod record;
pub mod session;
pub mod staging;
pub mod storage;
pub mod summary;
pub mod validation;

pub use catalog::{Catalog, Cluster, School};
pub use config::Config;
pub use durable::DurableStore;
pub use error::{Error, Result};
pub use export::{export_all, ExportDocument};
pub use logging::init_logging;
pub use record::{TeacherField, TeacherRecord};
pub use session::Session;
pub use staging::StagingBuffer;
pub use storage::{KeyValueStore, MemoryStore, SqliteStore};
pub use summary::{summarize, Summary};
