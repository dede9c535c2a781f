#![forbid(unsafe_code)]

//! Core domain model and business logic for the liftlog strength tracker.
//!
//! This crate provides:
//! - Domain types (exercises, logged sets, sessions, plans)
//! - Metrics engine (one-rep-max, progressive overload, intensity, volume)
//! - Relational store with cascading deletes and change notification
//! - Persistence (per-collection snapshot slots, backup bundles, CSV export)
//! - Integrity reporting for weak references

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod persistence;
pub mod integrity;
pub mod store;
pub mod export;
pub mod csv_export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use metrics::{classify_overload, ExerciseSummary, OverloadTrend};
pub use persistence::{
    BlobStore, FileBlobStore, LoadReport, MemoryBlobStore, Persistence, SlotStatus,
    SnapshotAdapter,
};
pub use integrity::DanglingReference;
pub use store::{Change, Store, StoreEvent};
pub use export::{export_bundle, import_bundle, ExportBundle};
pub use csv_export::export_logs_csv;

/// Store persisting to slot files in a directory
pub type FileStore = Store<SnapshotAdapter<FileBlobStore>>;

/// Open the file-backed store rooted at `dir`
pub fn open_file_store(dir: impl Into<std::path::PathBuf>) -> FileStore {
    Store::open(SnapshotAdapter::in_dir(dir))
}
