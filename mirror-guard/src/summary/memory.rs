//! In-memory summary sink for tests and development.

use super::SummarySink;
use crate::error::Result;
use crate::outcome::ValidationOutcome;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::instrument;

/// Collects records in memory instead of writing files.
///
/// Clones share the same storage, so a test can hand one clone to the
/// orchestrator and inspect the other afterwards.
#[derive(Debug, Clone, Default)]
pub struct InMemorySink {
    records: Arc<RwLock<Vec<(String, ValidationOutcome)>>>,
}

impl InMemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded (path, outcome) pairs in arrival order.
    pub async fn records(&self) -> Vec<(String, ValidationOutcome)> {
        self.records.read().await.clone()
    }

    /// Returns the number of recorded outcomes.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether nothing has been recorded yet.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl SummarySink for InMemorySink {
    #[instrument(skip(self, outcome), fields(summary.path = %path, run.name = %outcome.name))]
    async fn record(&self, path: &str, outcome: &ValidationOutcome) -> Result<()> {
        let mut records = self.records.write().await;
        records.push((path.to_string(), outcome.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThresholdMode;
    use crate::partition::Granularity;
    use chrono::{NaiveDate, Utc};

    fn sample_outcome() -> ValidationOutcome {
        ValidationOutcome {
            run_timestamp: Utc::now(),
            resolved_partition: NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            granularity: Granularity::Hourly,
            validation_type: "csv_to_csv".to_string(),
            name: "clicks_hourly".to_string(),
            source_name: "clicks_raw".to_string(),
            destination_name: "clicks_mirror".to_string(),
            source_count: 10,
            target_count: 10,
            delta: 0,
            threshold: 0.0,
            threshold_mode: ThresholdMode::Absolute,
            within_threshold: true,
            content_diff: None,
            duration_ms: 3,
        }
    }

    #[tokio::test]
    async fn test_clones_share_storage() {
        let sink = InMemorySink::new();
        let handle = sink.clone();
        assert!(sink.is_empty().await);

        handle
            .record("/tmp/summary.csv", &sample_outcome())
            .await
            .unwrap();

        let records = sink.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, "/tmp/summary.csv");
        assert_eq!(records[0].1.name, "clicks_hourly");
    }
}
