//! SQLite-based record sink
//!
//! This module provides a sink that records the session as a row in `runs`
//! and its products in `products`, through the storage backend.

use crate::model::ProductRecord;
use crate::output::traits::{RecordSink, SinkResult};
use crate::storage::{NewRun, Storage};

/// SQLite-based record sink
///
/// The run row is created when the sink is opened; every `write` stores its
/// batch in one transaction against that run.
pub struct SqliteSink {
    storage: Box<dyn Storage>,
    run_id: i64,
    location: String,
}

impl SqliteSink {
    /// Opens the sink, creating the run row
    ///
    /// # Arguments
    ///
    /// * `storage` - The storage backend to use
    /// * `location` - Database path, for reporting
    /// * `run` - Session summary for the `runs` table
    pub fn open(
        mut storage: Box<dyn Storage>,
        location: impl Into<String>,
        run: &NewRun,
    ) -> SinkResult<Self> {
        let run_id = storage.create_run(run)?;
        tracing::debug!("Created run {} for {}", run_id, run.start_url);

        Ok(Self {
            storage,
            run_id,
            location: location.into(),
        })
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }
}

impl RecordSink for SqliteSink {
    fn name(&self) -> &'static str {
        "database"
    }

    fn write(&mut self, records: &[ProductRecord]) -> SinkResult<usize> {
        Ok(self.storage.insert_products(self.run_id, records)?)
    }

    fn flush(&mut self) -> SinkResult<()> {
        // Every batch commits its own transaction
        Ok(())
    }

    fn location(&self) -> String {
        self.location.clone()
    }
}
