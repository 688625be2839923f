//! Output module for exporting scraped products
//!
//! This module handles:
//! - Writing a session's records to CSV, JSON and the SQLite database
//! - Isolating sink failures so one broken sink never blocks the others
//! - Rendering the end-of-session summary

mod csv_sink;
mod json_sink;
mod sqlite_output;
mod summary;
mod traits;

pub use csv_sink::{CsvSink, CSV_COLUMNS};
pub use json_sink::JsonSink;
pub use sqlite_output::SqliteSink;
pub use summary::{print_summary, render_summary};
pub use traits::{RecordSink, SinkError, SinkReport, SinkResult};

use crate::state::ScrapeOutcome;
use crate::storage::{NewRun, SqliteStorage};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::str::FromStr;

/// File export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}

/// Database sink target
#[derive(Debug, Clone)]
pub struct DatabaseTarget {
    pub path: PathBuf,

    /// Hash of the configuration the session ran under
    pub config_hash: String,
}

/// Which sinks receive a session's records, and where
#[derive(Debug, Clone)]
pub struct ExportPlan {
    /// Directory for file exports; created if missing
    pub directory: PathBuf,

    /// File name without extension
    pub base_name: String,

    pub formats: Vec<OutputFormat>,
    pub database: Option<DatabaseTarget>,
}

impl ExportPlan {
    pub fn file_path(&self, format: OutputFormat) -> PathBuf {
        self.directory
            .join(format!("{}.{}", self.base_name, format.extension()))
    }
}

/// Default export base name: `<source>_<YYYYmmdd_HHMMSS>` in UTC
pub fn default_base_name(source: &str, at: DateTime<Utc>) -> String {
    format!("{}_{}", source, at.format("%Y%m%d_%H%M%S"))
}

/// Hands a finished session's records to every sink in the plan
///
/// Partial and failed sessions are exported like complete ones. A sink
/// that cannot be opened, written or flushed is reported and logged; the
/// remaining sinks still receive the batch.
///
/// # Returns
///
/// One report per planned sink, in plan order (files first, then database)
pub fn export_outcome(plan: &ExportPlan, outcome: &ScrapeOutcome) -> Vec<SinkReport> {
    let mut reports = Vec::new();

    if !plan.formats.is_empty() {
        if let Err(e) = std::fs::create_dir_all(&plan.directory) {
            tracing::warn!(
                "Failed to create output directory {}: {}",
                plan.directory.display(),
                e
            );
        }
    }

    for format in &plan.formats {
        let path = plan.file_path(*format);
        let opened: SinkResult<Box<dyn RecordSink>> = match format {
            OutputFormat::Csv => {
                CsvSink::create(&path).map(|sink| Box::new(sink) as Box<dyn RecordSink>)
            }
            OutputFormat::Json => Ok(Box::new(JsonSink::new(&path, outcome))),
        };
        reports.push(deliver(
            format.extension(),
            path.display().to_string(),
            opened,
            outcome,
        ));
    }

    if let Some(target) = &plan.database {
        let location = target.path.display().to_string();
        let run = NewRun::from_outcome(outcome, &target.config_hash);
        let opened = SqliteStorage::new(&target.path)
            .map_err(SinkError::from)
            .and_then(|storage| SqliteSink::open(Box::new(storage), location.clone(), &run))
            .map(|sink| Box::new(sink) as Box<dyn RecordSink>);
        reports.push(deliver("database", location, opened, outcome));
    }

    reports
}

/// Writes and flushes the batch on an opened sink and reports the result
///
/// `name` and `location` only label a sink that failed to open; an opened
/// sink reports its own.
fn deliver(
    name: &'static str,
    location: String,
    opened: SinkResult<Box<dyn RecordSink>>,
    outcome: &ScrapeOutcome,
) -> SinkReport {
    let (name, location, result) = match opened {
        Ok(mut sink) => {
            let result = sink
                .write(&outcome.records)
                .and_then(|written| sink.flush().map(|()| written));
            (sink.name(), sink.location(), result)
        }
        Err(e) => (name, location, Err(e)),
    };

    match &result {
        Ok(written) => tracing::info!("Wrote {} records to {} ({})", written, location, name),
        Err(e) => tracing::error!("{} sink failed for {}: {}", name, location, e),
    }

    SinkReport {
        sink: name,
        location,
        result: result.map_err(|e| e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProductRecord;
    use crate::state::SessionStatus;
    use crate::storage::Storage;
    use chrono::TimeZone;

    fn outcome(records: usize) -> ScrapeOutcome {
        let now = Utc::now();
        ScrapeOutcome {
            source_id: "daraz".to_string(),
            source_display_name: "Daraz".to_string(),
            start_url: "https://www.daraz.pk/catalog/?q=fan".to_string(),
            records: (0..records)
                .map(|i| ProductRecord {
                    name: format!("Fan {}", i),
                    price: None,
                    currency: None,
                    rating: None,
                    review_count: None,
                    availability: None,
                    url: format!("https://www.daraz.pk/products/fan-{}.html", i),
                    image_url: None,
                    category: None,
                    brand: None,
                    sku: None,
                    description: None,
                    source_name: "daraz".to_string(),
                    scraped_at: now,
                })
                .collect(),
            status: SessionStatus::Failed,
            pages_fetched: 1,
            skipped: 0,
            failure: None,
            started_at: now,
            finished_at: now,
        }
    }

    #[test]
    fn test_default_base_name() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(default_base_name("amazon", at), "amazon_20240309_070501");
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("CSV".parse::<OutputFormat>(), Ok(OutputFormat::Csv));
        assert_eq!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_export_writes_every_sink() {
        let dir = tempfile::tempdir().unwrap();
        let plan = ExportPlan {
            directory: dir.path().join("exports"),
            base_name: "fans".to_string(),
            formats: vec![OutputFormat::Csv, OutputFormat::Json],
            database: Some(DatabaseTarget {
                path: dir.path().join("db").join("products.db"),
                config_hash: "none".to_string(),
            }),
        };

        let reports = export_outcome(&plan, &outcome(3));

        assert_eq!(reports.len(), 3);
        assert!(reports.iter().all(|r| r.is_ok() && r.written() == 3));
        assert!(dir.path().join("exports/fans.csv").exists());
        assert!(dir.path().join("exports/fans.json").exists());

        let storage = SqliteStorage::new(&dir.path().join("db/products.db")).unwrap();
        let run = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(run.status, SessionStatus::Failed);
        assert_eq!(run.records, 3);
    }

    /// A sink that lives somewhere other than where the plan pointed
    struct RedirectedSink {
        accepted: usize,
    }

    impl RecordSink for RedirectedSink {
        fn name(&self) -> &'static str {
            "memory"
        }

        fn write(&mut self, records: &[ProductRecord]) -> SinkResult<usize> {
            self.accepted += records.len();
            Ok(records.len())
        }

        fn flush(&mut self) -> SinkResult<()> {
            Ok(())
        }

        fn location(&self) -> String {
            format!("memory://{}", self.accepted)
        }
    }

    #[test]
    fn test_report_uses_opened_sink_identity() {
        let opened: SinkResult<Box<dyn RecordSink>> =
            Ok(Box::new(RedirectedSink { accepted: 0 }));
        let report = deliver("csv", "planned.csv".to_string(), opened, &outcome(2));

        assert_eq!(report.sink, "memory");
        assert_eq!(report.location, "memory://2");
        assert_eq!(report.result, Ok(2));
    }

    #[test]
    fn test_report_for_unopened_sink_uses_plan_identity() {
        let opened: SinkResult<Box<dyn RecordSink>> = Err(SinkError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        )));
        let report = deliver("csv", "planned.csv".to_string(), opened, &outcome(2));

        assert_eq!(report.sink, "csv");
        assert_eq!(report.location, "planned.csv");
        assert!(!report.is_ok());
    }

    #[test]
    fn test_failing_sink_does_not_block_others() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the CSV path's directory should be
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let plan = ExportPlan {
            directory: blocker.clone(),
            base_name: "fans".to_string(),
            formats: vec![OutputFormat::Csv],
            database: Some(DatabaseTarget {
                path: dir.path().join("products.db"),
                config_hash: "none".to_string(),
            }),
        };

        let reports = export_outcome(&plan, &outcome(2));

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].sink, "csv");
        assert!(!reports[0].is_ok());
        assert_eq!(reports[1].sink, "database");
        assert_eq!(reports[1].result, Ok(2));
    }
}
