//! Record sink traits and types
//!
//! This module defines the trait interface for record sinks and the
//! per-sink report produced by an export.

use crate::model::ProductRecord;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors that can occur while writing records to a sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// A destination for a finished batch of product records
///
/// Sinks receive records in session order. `write` may be called more than
/// once; nothing is guaranteed to be durable until `flush` returns.
pub trait RecordSink {
    /// Short sink name used in logs and reports ("csv", "json", "database")
    fn name(&self) -> &'static str;

    /// Appends a batch of records
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of records accepted
    /// * `Err(SinkError)` - The batch could not be written
    fn write(&mut self, records: &[ProductRecord]) -> SinkResult<usize>;

    /// Makes every accepted record durable
    fn flush(&mut self) -> SinkResult<()>;

    /// Where the records end up (a file or database path)
    fn location(&self) -> String;
}

/// Outcome of handing the batch to one sink
#[derive(Debug, Clone)]
pub struct SinkReport {
    pub sink: &'static str,
    pub location: String,

    /// Records written, or the error message when the sink failed
    pub result: Result<usize, String>,
}

impl SinkReport {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn written(&self) -> usize {
        self.result.as_ref().copied().unwrap_or(0)
    }
}
