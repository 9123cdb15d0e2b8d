//! Prelude for commonly used types and traits in mirror-guard.

pub use crate::compare::{ContentDiffSummary, ContentDiffer, DiffSample};
pub use crate::config::{DatasetDescriptor, ThresholdMode, ValidationConfig, ValidationSetting};
pub use crate::error::{MirrorError, Result};
pub use crate::logging::LoggingConfig;
pub use crate::outcome::ValidationOutcome;
pub use crate::partition::Granularity;
pub use crate::runner::{ExecutionMode, PartitionReader, ReadOutcome, ValidationRun};
pub use crate::sources::Side;
pub use crate::summary::SummarySink;
