//! Error types for the mirror-guard reconciliation library.
//!
//! This module provides a comprehensive error handling strategy using `thiserror`
//! for automatic error trait implementations. All errors in the library are
//! represented by the `MirrorError` enum.
//!
//! A threshold breach is deliberately NOT an error: a run that completes with
//! `within_threshold == false` still produced a valid
//! [`ValidationOutcome`](crate::outcome::ValidationOutcome). Only the CLI
//! layer translates that verdict into a failing exit code.

use thiserror::Error;

/// The main error type for the mirror-guard library.
///
/// This enum represents all possible errors that can occur while resolving,
/// reading, comparing, and recording a reconciliation run.
#[derive(Error, Debug)]
pub enum MirrorError {
    /// Error for an unrecognized granularity tag in the validation setting.
    #[error("Invalid granularity '{granularity}': expected one of hourly, daily, monthly")]
    InvalidGranularity {
        /// The unrecognized tag as configured
        granularity: String,
    },

    /// Error when a side's dataset cannot be reached or does not exist for
    /// the resolved partition.
    #[error("{side} dataset unavailable at '{location}': {message}")]
    DatasetUnavailable {
        /// Which side failed ("source" or "target")
        side: String,
        /// The resolved location or table that was probed
        location: String,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error for an impossible row count coming out of a reader.
    #[error("Invalid row count {count} from {side} dataset: counts must be non-negative")]
    InvalidCount {
        /// Which side produced the count
        side: String,
        /// The offending value
        count: i64,
    },

    /// Error when the content comparison stage could not complete.
    #[error("Content diff failed: {message}")]
    ContentDiff {
        /// Detailed error message
        message: String,
    },

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error related to configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error when an operation is not supported.
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// Security-related error.
    #[error("Security error: {0}")]
    Security(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, MirrorError>`.
///
/// This is the standard `Result` type used throughout the library.
pub type Result<T> = std::result::Result<T, MirrorError>;

impl MirrorError {
    /// Creates a new dataset-unavailable error.
    pub fn dataset_unavailable(
        side: impl Into<String>,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::DatasetUnavailable {
            side: side.into(),
            location: location.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new dataset-unavailable error with an underlying cause.
    pub fn dataset_unavailable_with_source(
        side: impl Into<String>,
        location: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::DatasetUnavailable {
            side: side.into(),
            location: location.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a new invalid-granularity error.
    pub fn invalid_granularity(granularity: impl Into<String>) -> Self {
        Self::InvalidGranularity {
            granularity: granularity.into(),
        }
    }

    /// Creates a new content-diff error.
    pub fn content_diff(message: impl Into<String>) -> Self {
        Self::ContentDiff {
            message: message.into(),
        }
    }

    /// Creates a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a new internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Short stable tag identifying the failure kind, used by the CLI for
    /// per-kind operator messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidGranularity { .. } => "invalid_granularity",
            Self::DatasetUnavailable { .. } => "dataset_unavailable",
            Self::InvalidCount { .. } => "invalid_count",
            Self::ContentDiff { .. } => "content_diff",
            Self::DataFusion(_) => "datafusion",
            Self::Arrow(_) => "arrow",
            Self::Io(_) => "io",
            Self::Configuration(_) => "configuration",
            Self::NotSupported(_) => "not_supported",
            Self::Security(_) => "security",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_invalid_granularity_message() {
        let err = MirrorError::invalid_granularity("weekly-ish");
        assert_eq!(
            err.to_string(),
            "Invalid granularity 'weekly-ish': expected one of hourly, daily, monthly"
        );
        assert_eq!(err.kind(), "invalid_granularity");
    }

    #[test]
    fn test_dataset_unavailable_names_side_and_location() {
        let err = MirrorError::dataset_unavailable("target", "/data/dt=20240115", "no files found");
        let msg = err.to_string();
        assert!(msg.contains("target"));
        assert!(msg.contains("/data/dt=20240115"));
        assert!(msg.contains("no files found"));
    }

    #[test]
    fn test_dataset_unavailable_preserves_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = MirrorError::dataset_unavailable_with_source(
            "source",
            "orders",
            "table not found",
            Box::new(io),
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn test_invalid_count_message() {
        let err = MirrorError::InvalidCount {
            side: "source".to_string(),
            count: -3,
        };
        assert_eq!(
            err.to_string(),
            "Invalid row count -3 from source dataset: counts must be non-negative"
        );
    }

    #[test]
    fn test_kind_tags_are_distinct_per_taxonomy_variant() {
        let errs = [
            MirrorError::invalid_granularity("x"),
            MirrorError::dataset_unavailable("source", "l", "m"),
            MirrorError::InvalidCount {
                side: "target".into(),
                count: -1,
            },
            MirrorError::content_diff("schema mismatch"),
            MirrorError::configuration("bad"),
        ];
        let mut kinds: Vec<&str> = errs.iter().map(|e| e.kind()).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), errs.len());
    }
}
