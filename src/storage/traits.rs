//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use thiserror::Error;

use crate::model::ProductRecord;
use crate::storage::{NewRun, RunRecord};

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines the database operations needed by the database sink
/// and by anything that reads scraped data back.
///
/// The sink itself only writes. `get_run`, `get_latest_run`, `load_products`
/// and `count_products` are the read side for library callers that inspect
/// stored runs after a scrape.
pub trait Storage {
    // ===== Run Management =====

    /// Records a finished scrape session
    ///
    /// # Arguments
    ///
    /// * `run` - Session summary; the record count starts at zero and grows
    ///   with every `insert_products` call
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, run: &NewRun) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    // ===== Product Management =====

    /// Inserts a batch of products for a run in one transaction
    ///
    /// Either every record of the batch is stored or none is.
    ///
    /// # Returns
    ///
    /// The number of rows inserted
    fn insert_products(&mut self, run_id: i64, records: &[ProductRecord]) -> StorageResult<usize>;

    /// Loads a run's products in extraction order
    fn load_products(&self, run_id: i64) -> StorageResult<Vec<ProductRecord>>;

    /// Counts products stored for a run
    fn count_products(&self, run_id: i64) -> StorageResult<u64>;
}
