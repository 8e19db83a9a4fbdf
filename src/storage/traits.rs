//! Storage traits and error types

use crate::model::PartialRecord;
use crate::storage::RunRecord;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to open state database {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Unknown run status: {0}")]
    InvalidStatus(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence for scrape runs and the partial records they produced
///
/// Only results are stored, never the frontier: a run that did not complete
/// leaves nothing `write` will read.
pub trait Storage {
    // ===== Run Management =====

    /// Starts a run in the `running` state and returns its id
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Most recent run whose records are safe to rebuild from
    fn get_latest_completed_run(&self) -> StorageResult<Option<RunRecord>>;

    fn complete_run(&mut self, run_id: i64) -> StorageResult<()>;

    fn mark_interrupted(&mut self, run_id: i64) -> StorageResult<()>;

    fn mark_failed(&mut self, run_id: i64) -> StorageResult<()>;

    // ===== Partial Records =====

    /// Writes every record in one transaction; returns the number written
    fn save_partial_records(&mut self, run_id: i64, records: &[PartialRecord])
        -> StorageResult<usize>;

    fn load_partial_records(&self, run_id: i64) -> StorageResult<Vec<PartialRecord>>;

    fn count_partial_records(&self, run_id: i64) -> StorageResult<u64>;
}
