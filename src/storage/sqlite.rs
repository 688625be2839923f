//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::model::ProductRecord;
use crate::state::SessionStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{NewRun, RunRecord};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

const RUN_COLUMNS: &str = "id, source, start_url, status, pages_fetched, records, skipped, \
     error_kind, error_message, config_hash, started_at, finished_at";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// Missing parent directories are created.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        source: row.get(1)?,
        start_url: row.get(2)?,
        status: SessionStatus::from_db_string(&row.get::<_, String>(3)?)
            .unwrap_or(SessionStatus::Failed),
        pages_fetched: row.get(4)?,
        records: row.get::<_, i64>(5)? as u64,
        skipped: row.get::<_, i64>(6)? as u64,
        error_kind: row.get(7)?,
        error_message: row.get(8)?,
        config_hash: row.get(9)?,
        started_at: row.get(10)?,
        finished_at: row.get(11)?,
    })
}

/// A products row with text columns not yet decoded
struct ProductRow {
    name: String,
    price: Option<String>,
    currency: Option<String>,
    rating: Option<String>,
    review_count: Option<u32>,
    availability: Option<String>,
    url: String,
    image_url: Option<String>,
    category: Option<String>,
    brand: Option<String>,
    sku: Option<String>,
    description: Option<String>,
    source_name: String,
    scraped_at: String,
}

impl ProductRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get(0)?,
            price: row.get(1)?,
            currency: row.get(2)?,
            rating: row.get(3)?,
            review_count: row.get(4)?,
            availability: row.get(5)?,
            url: row.get(6)?,
            image_url: row.get(7)?,
            category: row.get(8)?,
            brand: row.get(9)?,
            sku: row.get(10)?,
            description: row.get(11)?,
            source_name: row.get(12)?,
            scraped_at: row.get(13)?,
        })
    }

    fn into_record(self) -> StorageResult<ProductRecord> {
        let scraped_at = DateTime::parse_from_rfc3339(&self.scraped_at)
            .map_err(|e| StorageError::Serialization(format!("scraped_at: {}", e)))?
            .with_timezone(&Utc);

        Ok(ProductRecord {
            name: self.name,
            price: decode_decimal(self.price.as_deref(), "price")?,
            currency: self.currency,
            rating: decode_decimal(self.rating.as_deref(), "rating")?,
            review_count: self.review_count,
            availability: self.availability,
            url: self.url,
            image_url: self.image_url,
            category: self.category,
            brand: self.brand,
            sku: self.sku,
            description: self.description,
            source_name: self.source_name,
            scraped_at,
        })
    }
}

fn decode_decimal(value: Option<&str>, column: &str) -> StorageResult<Option<Decimal>> {
    value
        .map(|v| {
            Decimal::from_str(v)
                .map_err(|e| StorageError::Serialization(format!("{} '{}': {}", column, v, e)))
        })
        .transpose()
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, run: &NewRun) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO runs (source, start_url, status, pages_fetched, skipped, error_kind, \
             error_message, config_hash, started_at, finished_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                run.source,
                run.start_url,
                run.status.to_db_string(),
                run.pages_fetched,
                run.skipped as i64,
                run.error_kind,
                run.error_message,
                run.config_hash,
                run.started_at.to_rfc3339(),
                run.finished_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS))?;

        stmt.query_row(params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM runs ORDER BY id DESC LIMIT 1",
            RUN_COLUMNS
        ))?;

        let run = stmt.query_row([], run_from_row).optional()?;

        Ok(run)
    }

    // ===== Product Management =====

    fn insert_products(&mut self, run_id: i64, records: &[ProductRecord]) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;

        let start: i64 = tx
            .query_row(
                "SELECT records FROM runs WHERE id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO products (run_id, position, name, price, currency, rating, \
                 review_count, availability, url, image_url, category, brand, sku, description, \
                 source_name, scraped_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            )?;

            for (offset, record) in records.iter().enumerate() {
                stmt.execute(params![
                    run_id,
                    start + offset as i64,
                    record.name,
                    record.price.map(|p| p.to_string()),
                    record.currency,
                    record.rating.map(|r| r.to_string()),
                    record.review_count,
                    record.availability,
                    record.url,
                    record.image_url,
                    record.category,
                    record.brand,
                    record.sku,
                    record.description,
                    record.source_name,
                    record.scraped_at.to_rfc3339(),
                ])?;
            }
        }

        tx.execute(
            "UPDATE runs SET records = records + ?1 WHERE id = ?2",
            params![records.len() as i64, run_id],
        )?;
        tx.commit()?;

        Ok(records.len())
    }

    fn load_products(&self, run_id: i64) -> StorageResult<Vec<ProductRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, price, currency, rating, review_count, availability, url, image_url, \
             category, brand, sku, description, source_name, scraped_at
             FROM products WHERE run_id = ?1 ORDER BY position",
        )?;

        let rows = stmt
            .query_map(params![run_id], ProductRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(ProductRow::into_record).collect()
    }

    fn count_products(&self, run_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM products WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
