//! JSON export

use crate::model::ProductRecord;
use crate::output::traits::{RecordSink, SinkResult};
use crate::state::ScrapeOutcome;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Session metadata written above the product list
#[derive(Debug, Clone)]
struct ExportHeader {
    source: String,
    start_url: String,
    status: String,
    pages_fetched: u32,
    scraped_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct JsonExport<'a> {
    source: &'a str,
    start_url: &'a str,
    status: &'a str,
    pages_fetched: u32,
    scraped_at: DateTime<Utc>,
    total: usize,
    products: &'a [ProductRecord],
}

/// Buffers records and writes a single pretty-printed document on flush
pub struct JsonSink {
    path: PathBuf,
    header: ExportHeader,
    products: Vec<ProductRecord>,
}

impl JsonSink {
    pub fn new(path: &Path, outcome: &ScrapeOutcome) -> Self {
        Self {
            path: path.to_path_buf(),
            header: ExportHeader {
                source: outcome.source_id.clone(),
                start_url: outcome.start_url.clone(),
                status: outcome.status.to_db_string().to_string(),
                pages_fetched: outcome.pages_fetched,
                scraped_at: outcome.finished_at,
            },
            products: Vec::new(),
        }
    }
}

impl RecordSink for JsonSink {
    fn name(&self) -> &'static str {
        "json"
    }

    fn write(&mut self, records: &[ProductRecord]) -> SinkResult<usize> {
        self.products.extend_from_slice(records);
        Ok(records.len())
    }

    fn flush(&mut self) -> SinkResult<()> {
        let export = JsonExport {
            source: &self.header.source,
            start_url: &self.header.start_url,
            status: &self.header.status,
            pages_fetched: self.header.pages_fetched,
            scraped_at: self.header.scraped_at,
            total: self.products.len(),
            products: &self.products,
        };

        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, &export)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
