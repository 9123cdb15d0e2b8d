//! Run outcome types.
//!
//! A [`ValidationOutcome`] is constructed once per completed run and never
//! mutated afterwards; failed runs produce an error instead, never a partial
//! outcome.

use crate::compare::ContentDiffSummary;
use crate::config::ThresholdMode;
use crate::partition::Granularity;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Column order of the summary record, shared by the header and row writers.
pub const SUMMARY_COLUMNS: [&str; 15] = [
    "run_timestamp",
    "resolved_partition",
    "granularity",
    "validation_type",
    "name",
    "source_name",
    "destination_name",
    "source_count",
    "target_count",
    "delta",
    "threshold",
    "threshold_mode",
    "within_threshold",
    "content_mismatches",
    "duration_ms",
];

/// The structured, timestamped result of one reconciliation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// Wall-clock time the run executed
    pub run_timestamp: DateTime<Utc>,
    /// The concrete partition that was validated
    pub resolved_partition: NaiveDateTime,
    /// Granularity the partition was resolved at
    pub granularity: Granularity,
    /// Informational pairing tag from the setting
    pub validation_type: String,
    /// Validation name from the setting
    pub name: String,
    /// Label of the source dataset
    pub source_name: String,
    /// Label of the target dataset
    pub destination_name: String,
    /// Rows observed on the source side
    pub source_count: i64,
    /// Rows observed on the target side
    pub target_count: i64,
    /// `source_count - target_count`
    pub delta: i64,
    /// Tolerance the verdict was computed against
    pub threshold: f64,
    /// Interpretation of the tolerance
    pub threshold_mode: ThresholdMode,
    /// The verdict
    pub within_threshold: bool,
    /// Present only when content validation ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_diff: Option<ContentDiffSummary>,
    /// Wall time of the engine stages in milliseconds
    pub duration_ms: u64,
}

impl ValidationOutcome {
    /// Renders the outcome as summary-record fields in [`SUMMARY_COLUMNS`]
    /// order. The content column is empty when content validation did not run.
    pub fn summary_fields(&self) -> Vec<String> {
        vec![
            self.run_timestamp.to_rfc3339(),
            self.resolved_partition
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            self.granularity.to_string(),
            self.validation_type.clone(),
            self.name.clone(),
            self.source_name.clone(),
            self.destination_name.clone(),
            self.source_count.to_string(),
            self.target_count.to_string(),
            self.delta.to_string(),
            self.threshold.to_string(),
            self.threshold_mode.to_string(),
            self.within_threshold.to_string(),
            self.content_diff
                .as_ref()
                .map(|diff| diff.mismatched_count.to_string())
                .unwrap_or_default(),
            self.duration_ms.to_string(),
        ]
    }
}
