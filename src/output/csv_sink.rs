//! CSV export

use crate::model::ProductRecord;
use crate::output::traits::{RecordSink, SinkResult};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Column order of the CSV export; matches `ProductRecord` field order
pub const CSV_COLUMNS: &[&str] = &[
    "name",
    "price",
    "currency",
    "rating",
    "review_count",
    "availability",
    "url",
    "image_url",
    "category",
    "brand",
    "sku",
    "description",
    "source_name",
    "scraped_at",
];

/// Writes one header row, then one row per record
///
/// The header is written on creation so that an empty session still yields
/// a well-formed file.
pub struct CsvSink {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl CsvSink {
    /// Creates (or truncates) the CSV file and writes the header row
    pub fn create(path: &Path) -> SinkResult<Self> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)?;
        writer.write_record(CSV_COLUMNS)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer,
        })
    }
}

impl RecordSink for CsvSink {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn write(&mut self, records: &[ProductRecord]) -> SinkResult<usize> {
        for record in records {
            self.writer.serialize(record)?;
        }
        Ok(records.len())
    }

    fn flush(&mut self) -> SinkResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
