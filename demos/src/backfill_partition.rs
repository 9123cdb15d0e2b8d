//! Backfill example: re-validate a historical partition.
//!
//! Date placeholders in locations resolve against the partition derived from
//! the supplied reference datetime, so pointing a run at the past only takes
//! a different reference. The configured delay still applies.
//!
//! Run with:
//! ```bash
//! cargo run --example backfill_partition
//! ```

use std::fs;

use chrono::NaiveDate;
use mirror_guard::config::ValidationConfig;
use mirror_guard::logging::{init_logging, LoggingConfig};
use mirror_guard::runner::{ExecutionMode, ValidationRun};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LoggingConfig::default())?;

    // Hour-partitioned exports for 09:00 and 10:00 on 2024-01-15.
    let dir = tempfile::tempdir()?;
    for hour in ["09", "10"] {
        let partition = dir.path().join(format!("events/dt=20240115/hour={hour}"));
        fs::create_dir_all(&partition)?;
        fs::write(
            partition.join("events.csv"),
            "event_id,kind\n1,click\n2,view\n",
        )?;
        let mirror = dir.path().join(format!("mirror/dt=20240115/hour={hour}"));
        fs::create_dir_all(&mirror)?;
        fs::write(
            mirror.join("events.csv"),
            "event_id,kind\n1,click\n2,view\n",
        )?;
    }

    let yaml = format!(
        r#"
setting:
  name: events_hourly
  threshold: 0
  validation_type: csv_to_csv
  granularity: hourly
  default_time_delay: 3600
  source_name: events
  destination_name: events_mirror
  summary_log: {dir}/summary_%Y%m%d.csv
source:
  type: file
  format: csv
  location: {dir}/events/dt=%Y%m%d/hour=%H/events.csv
target:
  type: file
  format: csv
  location: {dir}/mirror/dt=%Y%m%d/hour=%H/events.csv
"#,
        dir = dir.path().display(),
    );

    let config = ValidationConfig::from_yaml_str(&yaml)?;
    let run = ValidationRun::new(config)?;

    // Backfill both hours. The one-hour delay shifts each reference back
    // before flooring: 11:05 validates the 10:00 partition.
    for (label, reference) in [
        ("10:05", NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(10, 5, 0).unwrap()),
        ("11:05", NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(11, 5, 0).unwrap()),
    ] {
        let outcome = run.execute(Some(reference), ExecutionMode::Local).await?;
        println!(
            "reference {label} -> partition {} : {} vs {} rows, within threshold: {}",
            outcome.resolved_partition,
            outcome.source_count,
            outcome.target_count,
            outcome.within_threshold
        );
    }

    Ok(())
}
