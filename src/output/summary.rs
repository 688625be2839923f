//! Human-readable session summary

use crate::output::traits::SinkReport;
use crate::state::ScrapeOutcome;
use std::fmt::Write;

/// Error lines shown at most in a summary
const MAX_ERROR_LINES: usize = 5;

/// Renders the summary block printed after a session
///
/// # Arguments
///
/// * `outcome` - The finished session
/// * `reports` - One report per enabled sink
pub fn render_summary(outcome: &ScrapeOutcome, reports: &[SinkReport]) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(out, "=== Scrape Summary ===\n");
    let _ = writeln!(
        out,
        "Source: {} ({})",
        outcome.source_display_name, outcome.source_id
    );
    let _ = writeln!(out, "Start URL: {}", outcome.start_url);
    let _ = writeln!(out, "Status: {}", outcome.status);
    let _ = writeln!(out, "Pages fetched: {}", outcome.pages_fetched);
    let _ = writeln!(
        out,
        "Products: {} extracted / {} found ({} skipped)",
        outcome.records.len(),
        outcome.total_found(),
        outcome.skipped
    );
    let _ = writeln!(out, "Success rate: {:.1}%", outcome.success_rate());
    let _ = writeln!(
        out,
        "Duration: {:.1}s",
        outcome.duration().num_milliseconds() as f64 / 1000.0
    );

    if !reports.is_empty() {
        let _ = writeln!(out, "\nOutputs:");
        for report in reports {
            match &report.result {
                Ok(written) => {
                    let _ = writeln!(
                        out,
                        "  {}: {} records -> {}",
                        report.sink, written, report.location
                    );
                }
                Err(_) => {
                    let _ = writeln!(out, "  {}: FAILED ({})", report.sink, report.location);
                }
            }
        }
    }

    let errors: Vec<String> = outcome
        .failure
        .iter()
        .map(ToString::to_string)
        .chain(reports.iter().filter_map(|report| {
            report
                .result
                .as_ref()
                .err()
                .map(|e| format!("[sink] {}: {}", report.sink, e))
        }))
        .collect();

    if !errors.is_empty() {
        let _ = writeln!(out, "\nErrors ({}):", errors.len());
        for line in errors.iter().take(MAX_ERROR_LINES) {
            let _ = writeln!(out, "  - {}", line);
        }
        if errors.len() > MAX_ERROR_LINES {
            let _ = writeln!(out, "  ... and {} more", errors.len() - MAX_ERROR_LINES);
        }
    }

    out
}

/// Prints the summary block to stdout
pub fn print_summary(outcome: &ScrapeOutcome, reports: &[SinkReport]) {
    print!("{}", render_summary(outcome, reports));
}
