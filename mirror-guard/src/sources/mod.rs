//! Dataset connectors for the mirror-guard reconciliation engine.
//!
//! This module turns a [`DatasetDescriptor`](crate::config::DatasetDescriptor)
//! into a registered DataFusion table for one side of a run. File formats
//! (CSV, Parquet) support glob patterns; database flavors are feature-gated
//! behind `database`.

use crate::config::DatasetDescriptor;
use crate::error::{MirrorError, Result};
use crate::partition::render_template;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use datafusion::prelude::SessionContext;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

#[cfg(any(feature = "postgres", feature = "mysql", feature = "sqlite"))]
mod database;
mod file;

#[cfg(any(feature = "postgres", feature = "mysql", feature = "sqlite"))]
pub use database::{DatabaseConfig, DatabaseSource};
pub use file::{CsvOptions, CsvSource, ParquetSource};

/// Which half of the comparison a dataset plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The authoritative dataset
    Source,
    /// The copy being verified
    Target,
}

impl Side {
    /// The lowercase label used in error messages and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Source => "source",
            Side::Target => "target",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One side's dataset at a resolved partition, ready to be registered with a
/// DataFusion context.
///
/// Implementations carry their side so that availability failures name it.
///
/// # Examples
///
/// ```rust,ignore
/// use mirror_guard::sources::{connect, Side};
///
/// # async fn example(descriptor: &mirror_guard::config::DatasetDescriptor,
/// #                  partition: chrono::NaiveDateTime) -> mirror_guard::Result<()> {
/// let source = connect(Side::Source, descriptor, partition)?;
/// let ctx = datafusion::prelude::SessionContext::new();
/// source.register(&ctx, "src").await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait PartitionSource: Debug + Send + Sync {
    /// Registers this dataset with the given session context under `alias`.
    ///
    /// Fails with [`MirrorError::DatasetUnavailable`] when the resolved
    /// location does not exist or cannot be served.
    async fn register(&self, ctx: &SessionContext, alias: &str) -> Result<()>;

    /// Returns a human-readable description of this dataset.
    fn description(&self) -> String;

    /// The rendered SQL predicate restricting every read, if configured.
    fn filter(&self) -> Option<&str> {
        None
    }
}

/// Builds the connector for one side, substituting the resolved partition
/// into the descriptor's location and filter templates.
///
/// Returns [`MirrorError::NotSupported`] for formats this build cannot serve.
pub fn connect(
    side: Side,
    descriptor: &DatasetDescriptor,
    partition: NaiveDateTime,
) -> Result<Box<dyn PartitionSource>> {
    let location = render_template(descriptor.location(), partition)?;
    let filter = descriptor
        .filter()
        .map(|template| render_template(template, partition))
        .transpose()?;

    match descriptor {
        DatasetDescriptor::File {
            format, options, ..
        } => match format.to_ascii_lowercase().as_str() {
            "csv" => Ok(Box::new(CsvSource::new(
                side,
                location,
                filter,
                CsvOptions::from_map(options)?,
            ))),
            "parquet" => Ok(Box::new(ParquetSource::new(side, location, filter))),
            other => Err(MirrorError::NotSupported(format!(
                "file format '{other}': expected csv or parquet"
            ))),
        },
        DatasetDescriptor::Database {
            format,
            table,
            options,
            ..
        } => {
            #[cfg(any(feature = "postgres", feature = "mysql", feature = "sqlite"))]
            {
                let config = DatabaseConfig::from_descriptor(format, &location, options)?;
                Ok(Box::new(DatabaseSource::new(
                    side,
                    config,
                    table.clone(),
                    location,
                    filter,
                )))
            }
            #[cfg(not(any(feature = "postgres", feature = "mysql", feature = "sqlite")))]
            {
                let _ = (table, options);
                Err(MirrorError::NotSupported(format!(
                    "database format '{format}': this build has no database support \
                     (enable the postgres, mysql, or sqlite feature)"
                )))
            }
        }
    }
}

/// Expands a glob pattern into concrete file paths.
///
/// Zero matches is a dataset-availability failure for the given side, not an
/// empty read.
pub(crate) fn expand_glob(side: Side, pattern: &str) -> Result<Vec<String>> {
    let matches = glob::glob(pattern).map_err(|e| {
        MirrorError::Configuration(format!("Invalid glob pattern '{pattern}': {e}"))
    })?;

    let mut paths = Vec::new();
    for entry in matches {
        let path = entry
            .map_err(|e| MirrorError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        if path.is_file() {
            if let Some(path_str) = path.to_str() {
                paths.push(path_str.to_string());
            }
        }
    }

    if paths.is_empty() {
        return Err(MirrorError::dataset_unavailable(
            side.as_str(),
            pattern,
            "no files found matching glob pattern",
        ));
    }

    Ok(paths)
}

/// Whether a location string is a glob pattern rather than a plain path.
pub(crate) fn is_glob(location: &str) -> bool {
    location.contains(['*', '?', '['])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn dt(y: i32, mo: u32, d: u32, h: u32) -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_side_labels() {
        assert_eq!(Side::Source.to_string(), "source");
        assert_eq!(Side::Target.to_string(), "target");
    }

    #[test]
    fn test_is_glob() {
        assert!(is_glob("/data/dt=20240115/*.parquet"));
        assert!(is_glob("/data/part-?.csv"));
        assert!(!is_glob("/data/orders.csv"));
    }

    #[test]
    fn test_connect_substitutes_partition_into_location() {
        let descriptor = DatasetDescriptor::File {
            format: "parquet".to_string(),
            location: "/data/orders/dt=%Y%m%d/*.parquet".to_string(),
            filter: None,
            options: BTreeMap::new(),
        };
        let source = connect(Side::Target, &descriptor, dt(2024, 1, 15, 0)).unwrap();
        assert!(source.description().contains("dt=20240115"));
    }

    #[test]
    fn test_connect_substitutes_partition_into_filter() {
        let descriptor = DatasetDescriptor::File {
            format: "csv".to_string(),
            location: "/data/orders.csv".to_string(),
            filter: Some("created_at < '%Y-%m-%d %H:%M:%S'".to_string()),
            options: BTreeMap::new(),
        };
        let source = connect(Side::Source, &descriptor, dt(2024, 1, 15, 9)).unwrap();
        assert_eq!(source.filter(), Some("created_at < '2024-01-15 09:00:00'"));
    }

    #[test]
    fn test_connect_rejects_unknown_file_format() {
        let descriptor = DatasetDescriptor::File {
            format: "avro".to_string(),
            location: "/data/orders.avro".to_string(),
            filter: None,
            options: BTreeMap::new(),
        };
        let err = connect(Side::Source, &descriptor, dt(2024, 1, 15, 0)).unwrap_err();
        assert!(matches!(err, MirrorError::NotSupported(_)));
        assert!(err.to_string().contains("avro"));
    }

    #[test]
    fn test_expand_glob_fails_on_zero_matches() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*.parquet", dir.path().display());
        let err = expand_glob(Side::Target, &pattern).unwrap_err();
        assert!(matches!(err, MirrorError::DatasetUnavailable { .. }));
        assert!(err.to_string().contains("target"));
    }

    #[test]
    fn test_expand_glob_finds_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.csv"), "id\n1\n").unwrap();
        std::fs::write(dir.path().join("b.csv"), "id\n2\n").unwrap();
        let pattern = format!("{}/*.csv", dir.path().display());
        let paths = expand_glob(Side::Source, &pattern).unwrap();
        assert_eq!(paths.len(), 2);
    }
}
