//! Storage module for persisting scraped products
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Run tracking (one row per scrape session)
//! - Transactional product batch inserts

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use chrono::{DateTime, Utc};

use crate::state::{ScrapeOutcome, SessionStatus};

/// A run about to be recorded
#[derive(Debug, Clone)]
pub struct NewRun {
    pub source: String,
    pub start_url: String,
    pub status: SessionStatus,
    pub pages_fetched: u32,
    pub skipped: usize,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
    pub config_hash: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl NewRun {
    /// Summarizes a session outcome for the `runs` table
    pub fn from_outcome(outcome: &ScrapeOutcome, config_hash: &str) -> Self {
        Self {
            source: outcome.source_id.clone(),
            start_url: outcome.start_url.clone(),
            status: outcome.status,
            pages_fetched: outcome.pages_fetched,
            skipped: outcome.skipped,
            error_kind: outcome.failure.as_ref().map(|f| f.kind.to_string()),
            error_message: outcome.failure.as_ref().map(|f| f.message.clone()),
            config_hash: config_hash.to_string(),
            started_at: outcome.started_at,
            finished_at: outcome.finished_at,
        }
    }
}

/// Represents a recorded run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub source: String,
    pub start_url: String,
    pub status: SessionStatus,
    pub pages_fetched: u32,
    pub records: u64,
    pub skipped: u64,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
    pub config_hash: String,
    pub started_at: String,
    pub finished_at: Option<String>,
}
