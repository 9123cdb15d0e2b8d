//! Run orchestration: resolve the partition, read both sides, evaluate the
//! threshold, optionally diff content, and record the outcome.
//!
//! Stages are strictly sequential; a failure at any stage aborts the run with
//! no partial outcome and no summary record. A threshold breach is not a
//! failure: the run completes with `within_threshold = false` and the record
//! is still written.

use crate::compare::{evaluate, ContentDiffer};
use crate::config::ValidationConfig;
use crate::error::{MirrorError, Result};
use crate::outcome::ValidationOutcome;
use crate::partition::{self, render_template, Granularity};
use crate::sources::{connect, PartitionSource, Side};
use crate::summary::SummarySink;
use arrow::array::Int64Array;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use datafusion::prelude::{SessionConfig, SessionContext};
use std::time::Instant;
use tracing::{info, instrument};

/// How much scan parallelism the engine requests from DataFusion.
///
/// A placement hint only: it sets the session's target partition count and
/// nothing else about execution changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Single-partition scans
    #[default]
    Local,
    /// One scan partition per core
    Parallel,
}

impl ExecutionMode {
    /// The DataFusion target partition count for this mode.
    pub fn target_partitions(&self) -> usize {
        match self {
            ExecutionMode::Local => 1,
            ExecutionMode::Parallel => num_cpus::get(),
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Local => f.write_str("local"),
            ExecutionMode::Parallel => f.write_str("parallel"),
        }
    }
}

/// The product of one side's logical read.
#[derive(Debug, Clone)]
pub struct ReadOutcome {
    /// Number of rows at the resolved partition
    pub row_count: i64,
    /// Collected rows, present only when they were requested
    pub rows: Option<Vec<RecordBatch>>,
}

/// Reads one side of the comparison.
///
/// The orchestrator performs exactly one `read` per side per run. When
/// `want_rows` is true the count must come from the same scan as the rows,
/// never from a second read.
#[async_trait]
pub trait PartitionReader: Send + Sync {
    /// Reads the given side, optionally retrieving its rows.
    async fn read(&self, side: Side, want_rows: bool) -> Result<ReadOutcome>;
}

/// The production reader: registers each side's dataset with a DataFusion
/// session and queries it through SQL.
pub struct DataFusionReader {
    ctx: SessionContext,
    source: Box<dyn PartitionSource>,
    target: Box<dyn PartitionSource>,
}

impl DataFusionReader {
    /// Builds connectors for both sides at the resolved partition.
    ///
    /// Construction renders templates and validates formats only; datasets
    /// are first touched by [`PartitionReader::read`], source before target.
    pub fn new(
        config: &ValidationConfig,
        partition: NaiveDateTime,
        mode: ExecutionMode,
    ) -> Result<Self> {
        let session_config = SessionConfig::new().with_target_partitions(mode.target_partitions());
        Ok(Self {
            ctx: SessionContext::new_with_config(session_config),
            source: connect(Side::Source, &config.source, partition)?,
            target: connect(Side::Target, &config.target, partition)?,
        })
    }

    fn dataset(&self, side: Side) -> &dyn PartitionSource {
        match side {
            Side::Source => self.source.as_ref(),
            Side::Target => self.target.as_ref(),
        }
    }

    fn alias(side: Side) -> &'static str {
        match side {
            Side::Source => "src",
            Side::Target => "tgt",
        }
    }
}

#[async_trait]
impl PartitionReader for DataFusionReader {
    #[instrument(skip(self), fields(side = %side))]
    async fn read(&self, side: Side, want_rows: bool) -> Result<ReadOutcome> {
        let dataset = self.dataset(side);
        let alias = Self::alias(side);
        dataset.register(&self.ctx, alias).await?;

        let predicate = match dataset.filter() {
            Some(filter) => format!(" WHERE {filter}"),
            None => String::new(),
        };

        if want_rows {
            let query = format!("SELECT * FROM {alias}{predicate}");
            let batches = self.ctx.sql(&query).await?.collect().await?;
            let row_count: i64 = batches.iter().map(|batch| batch.num_rows() as i64).sum();
            info!(side = %side, rows = row_count, "Read dataset rows");
            Ok(ReadOutcome {
                row_count,
                rows: Some(batches),
            })
        } else {
            let query = format!("SELECT COUNT(*) FROM {alias}{predicate}");
            let batches = self.ctx.sql(&query).await?.collect().await?;
            let row_count = extract_count(&batches)?;
            info!(side = %side, rows = row_count, "Counted dataset rows");
            Ok(ReadOutcome {
                row_count,
                rows: None,
            })
        }
    }
}

/// Pulls the single value out of a `COUNT(*)` result set.
fn extract_count(batches: &[RecordBatch]) -> Result<i64> {
    let batch = batches
        .first()
        .filter(|batch| batch.num_rows() > 0)
        .ok_or_else(|| MirrorError::internal("count query returned no rows"))?;
    let column = batch
        .column(0)
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| MirrorError::internal("count query did not return an Int64 column"))?;
    Ok(column.value(0))
}

/// One reconciliation run over a validated configuration.
///
/// # Examples
///
/// ```rust,ignore
/// use mirror_guard::prelude::*;
/// use mirror_guard::summary::CsvSummarySink;
///
/// # async fn example() -> Result<()> {
/// let config = ValidationConfig::from_yaml_path("validation.yml")?;
/// let run = ValidationRun::new(config)?;
/// let outcome = run
///     .execute_and_record(None, ExecutionMode::Local, &CsvSummarySink::new())
///     .await?;
/// println!("within threshold: {}", outcome.within_threshold);
/// # Ok(())
/// # }
/// ```
pub struct ValidationRun {
    config: ValidationConfig,
}

impl ValidationRun {
    /// Validates and wraps a configuration.
    pub fn new(config: ValidationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration driving this run.
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Parses the granularity tag and resolves the partition.
    ///
    /// This happens before any reader work so an unrecognized tag fails as
    /// `InvalidGranularity` without touching either dataset.
    fn plan(&self, reference: NaiveDateTime) -> Result<(Granularity, NaiveDateTime)> {
        let granularity: Granularity = self.config.setting.granularity.parse()?;
        let partition = partition::resolve(
            granularity,
            self.config.setting.default_time_delay,
            reference,
        );
        Ok((granularity, partition))
    }

    /// Executes the run against the real DataFusion reader.
    ///
    /// `reference` defaults to the current UTC wall clock; an explicitly
    /// supplied reference still has the configured delay subtracted.
    pub async fn execute(
        &self,
        reference: Option<NaiveDateTime>,
        mode: ExecutionMode,
    ) -> Result<ValidationOutcome> {
        let reference = reference.unwrap_or_else(|| Utc::now().naive_utc());
        let (granularity, partition) = self.plan(reference)?;
        let reader = DataFusionReader::new(&self.config, partition, mode)?;
        self.stages(granularity, partition, &reader).await
    }

    /// Executes the run against a caller-supplied reader.
    pub async fn execute_with(
        &self,
        reference: NaiveDateTime,
        reader: &dyn PartitionReader,
    ) -> Result<ValidationOutcome> {
        let (granularity, partition) = self.plan(reference)?;
        self.stages(granularity, partition, reader).await
    }

    #[instrument(skip(self, reader, granularity), fields(run.name = %self.config.setting.name, partition = %partition))]
    async fn stages(
        &self,
        granularity: Granularity,
        partition: NaiveDateTime,
        reader: &dyn PartitionReader,
    ) -> Result<ValidationOutcome> {
        let setting = &self.config.setting;
        let start_time = Instant::now();
        let run_timestamp = Utc::now();
        info!(
            run.name = %setting.name,
            run.partition = %partition,
            run.granularity = %granularity,
            run.validate_content = setting.validate_content,
            "Starting reconciliation run"
        );

        let want_rows = setting.validate_content;
        let source_read = reader.read(Side::Source, want_rows).await?;
        let target_read = reader.read(Side::Target, want_rows).await?;

        let comparison = evaluate(
            source_read.row_count,
            target_read.row_count,
            setting.threshold,
            setting.threshold_mode,
        )?;

        let content_diff = if want_rows {
            let differ = ContentDiffer::new(setting.content_keys.clone(), setting.diff_sample_limit);
            let source_rows = source_read.rows.unwrap_or_default();
            let target_rows = target_read.rows.unwrap_or_default();
            Some(differ.diff(&source_rows, &target_rows)?)
        } else {
            None
        };

        let outcome = ValidationOutcome {
            run_timestamp,
            resolved_partition: partition,
            granularity,
            validation_type: setting.validation_type.clone(),
            name: setting.name.clone(),
            source_name: setting.source_name.clone(),
            destination_name: setting.destination_name.clone(),
            source_count: source_read.row_count,
            target_count: target_read.row_count,
            delta: comparison.delta,
            threshold: setting.threshold,
            threshold_mode: setting.threshold_mode,
            within_threshold: comparison.within_threshold,
            content_diff,
            duration_ms: start_time.elapsed().as_millis() as u64,
        };

        info!(
            run.name = %setting.name,
            counts.source = outcome.source_count,
            counts.target = outcome.target_count,
            counts.delta = outcome.delta,
            run.within_threshold = outcome.within_threshold,
            run.duration_ms = outcome.duration_ms,
            "Reconciliation run completed"
        );

        Ok(outcome)
    }

    /// Renders the summary path for an outcome and records it through the sink.
    ///
    /// The path template is substituted with the outcome's resolved
    /// partition, not the wall clock, so reruns of a partition land in the
    /// same file.
    #[instrument(skip(self, outcome, sink), fields(run.name = %outcome.name))]
    pub async fn record(&self, outcome: &ValidationOutcome, sink: &dyn SummarySink) -> Result<()> {
        let path = render_template(&self.config.setting.summary_log, outcome.resolved_partition)?;
        sink.record(&path, outcome).await
    }

    /// Executes the run and records the outcome, whatever the verdict.
    pub async fn execute_and_record(
        &self,
        reference: Option<NaiveDateTime>,
        mode: ExecutionMode,
        sink: &dyn SummarySink,
    ) -> Result<ValidationOutcome> {
        let outcome = self.execute(reference, mode).await?;
        self.record(&outcome, sink).await?;
        Ok(outcome)
    }
}
