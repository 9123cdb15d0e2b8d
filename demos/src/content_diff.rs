//! Content validation example: find rows that drifted between two mirrors.
//!
//! Matching row counts can hide corruption. With `validate_content` enabled
//! the run also compares row content as a multiset and reports the first few
//! mismatching rows per side.
//!
//! Run with:
//! ```bash
//! cargo run --example content_diff
//! ```

use std::fs;

use chrono::NaiveDate;
use mirror_guard::config::ValidationConfig;
use mirror_guard::logging::{init_logging, LoggingConfig};
use mirror_guard::runner::{ExecutionMode, ValidationRun};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LoggingConfig::default())?;

    // Same row count on both sides, but order 1003 was replaced by 1004.
    let dir = tempfile::tempdir()?;
    fs::write(
        dir.path().join("orders.csv"),
        "order_id,amount\n1001,10\n1002,20\n1003,30\n",
    )?;
    fs::write(
        dir.path().join("orders_mirror.csv"),
        "order_id,amount\n1001,10\n1002,20\n1004,30\n",
    )?;

    let yaml = format!(
        r#"
setting:
  name: orders_content
  threshold: 0
  validation_type: csv_to_csv
  validate_content: true
  content_keys: [order_id]
  granularity: daily
  source_name: orders_export
  destination_name: orders_mirror
  summary_log: {dir}/summary.csv
source:
  type: file
  format: csv
  location: {dir}/orders.csv
target:
  type: file
  format: csv
  location: {dir}/orders_mirror.csv
"#,
        dir = dir.path().display(),
    );

    let config = ValidationConfig::from_yaml_str(&yaml)?;
    let run = ValidationRun::new(config)?;

    let reference = NaiveDate::from_ymd_opt(2024, 1, 15)
        .unwrap()
        .and_hms_opt(10, 45, 0)
        .unwrap();

    let outcome = run.execute(Some(reference), ExecutionMode::Local).await?;

    println!(
        "Counts: source={} target={} (within threshold: {})",
        outcome.source_count, outcome.target_count, outcome.within_threshold
    );

    let diff = outcome.content_diff.expect("content validation ran");
    if diff.mismatched_count == 0 {
        println!("✅ content matches");
    } else {
        println!("❌ {} mismatched occurrences:", diff.mismatched_count);
        for sample in &diff.samples {
            println!(
                "  key {:?}: {} on source side, {} on target side",
                sample.row, sample.source_occurrences, sample.target_occurrences
            );
        }
    }

    Ok(())
}
