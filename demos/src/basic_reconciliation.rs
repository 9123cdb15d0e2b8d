//! Basic reconciliation example: count a source CSV against its mirror.
//!
//! This example shows how to:
//! - Describe both sides of a comparison in YAML
//! - Execute a run at an explicit reference datetime
//! - Append the outcome to a summary CSV
//!
//! Run with:
//! ```bash
//! cargo run --example basic_reconciliation
//! ```

use std::fmt::Write as _;
use std::fs;

use chrono::NaiveDate;
use mirror_guard::config::ValidationConfig;
use mirror_guard::logging::{init_logging, LoggingConfig};
use mirror_guard::runner::{ExecutionMode, ValidationRun};
use mirror_guard::summary::CsvSummarySink;

fn csv_rows(rows: usize) -> String {
    let mut data = String::from("order_id,amount\n");
    for i in 0..rows {
        writeln!(data, "{},{}", i, i * 3).unwrap();
    }
    data
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LoggingConfig::default())?;

    // The nightly export holds 1000 orders; the mirror is 3 rows behind.
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("orders.csv"), csv_rows(1000))?;
    fs::write(dir.path().join("orders_mirror.csv"), csv_rows(997))?;

    let yaml = format!(
        r#"
setting:
  name: orders_nightly
  threshold: 5
  validation_type: csv_to_csv
  granularity: daily
  source_name: orders_export
  destination_name: orders_mirror
  summary_log: {dir}/date_record=%Y%m%d/summary.csv
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

    // A fixed reference keeps the resolved partition reproducible.
    let reference = NaiveDate::from_ymd_opt(2024, 1, 15)
        .unwrap()
        .and_hms_opt(10, 45, 0)
        .unwrap();

    let outcome = run
        .execute_and_record(
            Some(reference),
            ExecutionMode::Local,
            &CsvSummarySink::new(),
        )
        .await?;

    println!("Reconciliation: {}", outcome.name);
    println!("  partition: {}", outcome.resolved_partition);
    println!("  source:    {} rows", outcome.source_count);
    println!("  target:    {} rows", outcome.target_count);
    println!("  delta:     {}", outcome.delta);
    if outcome.within_threshold {
        println!(
            "✅ within threshold ({} {})",
            outcome.threshold, outcome.threshold_mode
        );
    } else {
        println!(
            "❌ threshold breached ({} {})",
            outcome.threshold, outcome.threshold_mode
        );
    }

    let summary_path = dir.path().join("date_record=20240115/summary.csv");
    println!("\nSummary record:");
    print!("{}", fs::read_to_string(summary_path)?);

    Ok(())
}
