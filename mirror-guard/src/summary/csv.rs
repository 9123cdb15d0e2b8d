//! CSV summary sink: one appended row per run.

use super::SummarySink;
use crate::error::Result;
use crate::outcome::{ValidationOutcome, SUMMARY_COLUMNS};
use async_trait::async_trait;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{debug, instrument};

/// Appends run records to a CSV file, writing the header when the file is
/// new. Concurrent runs may interleave rows but each row is written whole.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvSummarySink;

impl CsvSummarySink {
    /// Creates a CSV sink.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SummarySink for CsvSummarySink {
    #[instrument(skip(self, outcome), fields(summary.path = %path, run.name = %outcome.name))]
    async fn record(&self, path: &str, outcome: &ValidationOutcome) -> Result<()> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let needs_header = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        if needs_header {
            writeln!(file, "{}", SUMMARY_COLUMNS.join(","))?;
        }

        let row: Vec<String> = outcome
            .summary_fields()
            .iter()
            .map(|field| escape_field(field))
            .collect();
        writeln!(file, "{}", row.join(","))?;

        debug!(summary.rows = 1, "Appended summary record");
        Ok(())
    }
}

/// Quotes a field when it contains a delimiter, quote, or line break,
/// doubling embedded quotes.
fn escape_field(field: &str) -> String {
    if field.contains(['"', ',', '\n', '\r']) {
        let escaped = field.replace('"', "\"\"");
        format!("\"{escaped}\"")
    } else {
        field.to_string()
    }
}
