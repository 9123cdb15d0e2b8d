//! File-backed dataset sources (CSV and Parquet).

use super::{expand_glob, is_glob, PartitionSource, Side};
use crate::error::{MirrorError, Result};
use async_trait::async_trait;
use datafusion::prelude::{CsvReadOptions, ParquetReadOptions, SessionContext};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::instrument;

/// Options for reading CSV datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    /// Whether the first row is a header
    pub header: bool,
    /// Field delimiter byte
    pub delimiter: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            header: true,
            delimiter: b',',
        }
    }
}

impl CsvOptions {
    /// Parses CSV options from a descriptor's string map.
    ///
    /// Recognized keys: `header` (`true`/`false`) and `delimiter` (a single
    /// byte). Unknown keys are ignored so providers can share option maps.
    pub fn from_map(options: &BTreeMap<String, String>) -> Result<Self> {
        let mut parsed = Self::default();

        if let Some(header) = options.get("header") {
            parsed.header = header.parse().map_err(|_| {
                MirrorError::configuration(format!(
                    "csv option 'header' must be true or false, got '{header}'"
                ))
            })?;
        }

        if let Some(delimiter) = options.get("delimiter") {
            let bytes = delimiter.as_bytes();
            if bytes.len() != 1 {
                return Err(MirrorError::configuration(format!(
                    "csv option 'delimiter' must be a single byte, got '{delimiter}'"
                )));
            }
            parsed.delimiter = bytes[0];
        }

        Ok(parsed)
    }
}

/// A CSV dataset at a resolved location, possibly a glob over many files.
#[derive(Debug, Clone)]
pub struct CsvSource {
    side: Side,
    location: String,
    filter: Option<String>,
    options: CsvOptions,
}

impl CsvSource {
    /// Creates a CSV source for one side at an already-rendered location.
    pub fn new(side: Side, location: String, filter: Option<String>, options: CsvOptions) -> Self {
        Self {
            side,
            location,
            filter,
            options,
        }
    }
}

#[async_trait]
impl PartitionSource for CsvSource {
    #[instrument(skip(self, ctx), fields(side = %self.side, format = "csv", location = %self.location))]
    async fn register(&self, ctx: &SessionContext, alias: &str) -> Result<()> {
        let paths = resolve_paths(self.side, &self.location)?;
        let options = CsvReadOptions::new()
            .has_header(self.options.header)
            .delimiter(self.options.delimiter);

        if let [path] = paths.as_slice() {
            ctx.register_csv(alias, path, options).await.map_err(|e| {
                MirrorError::dataset_unavailable_with_source(
                    self.side.as_str(),
                    self.location.as_str(),
                    format!("failed to open CSV: {e}"),
                    Box::new(e),
                )
            })?;
        } else {
            let frame = ctx.read_csv(paths, options).await.map_err(|e| {
                MirrorError::dataset_unavailable_with_source(
                    self.side.as_str(),
                    self.location.as_str(),
                    format!("failed to open CSV files: {e}"),
                    Box::new(e),
                )
            })?;
            ctx.register_table(alias, frame.into_view())?;
        }

        Ok(())
    }

    fn description(&self) -> String {
        let location = &self.location;
        format!("CSV dataset: {location}")
    }

    fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }
}

/// A Parquet dataset at a resolved location, possibly a glob over many files.
#[derive(Debug, Clone)]
pub struct ParquetSource {
    side: Side,
    location: String,
    filter: Option<String>,
}

impl ParquetSource {
    /// Creates a Parquet source for one side at an already-rendered location.
    pub fn new(side: Side, location: String, filter: Option<String>) -> Self {
        Self {
            side,
            location,
            filter,
        }
    }
}

#[async_trait]
impl PartitionSource for ParquetSource {
    #[instrument(skip(self, ctx), fields(side = %self.side, format = "parquet", location = %self.location))]
    async fn register(&self, ctx: &SessionContext, alias: &str) -> Result<()> {
        let paths = resolve_paths(self.side, &self.location)?;
        let options = ParquetReadOptions::default();

        if let [path] = paths.as_slice() {
            ctx.register_parquet(alias, path, options)
                .await
                .map_err(|e| {
                    MirrorError::dataset_unavailable_with_source(
                        self.side.as_str(),
                        self.location.as_str(),
                        format!("failed to open Parquet: {e}"),
                        Box::new(e),
                    )
                })?;
        } else {
            let frame = ctx.read_parquet(paths, options).await.map_err(|e| {
                MirrorError::dataset_unavailable_with_source(
                    self.side.as_str(),
                    self.location.as_str(),
                    format!("failed to open Parquet files: {e}"),
                    Box::new(e),
                )
            })?;
            ctx.register_table(alias, frame.into_view())?;
        }

        Ok(())
    }

    fn description(&self) -> String {
        let location = &self.location;
        format!("Parquet dataset: {location}")
    }

    fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }
}

/// Resolves a location into concrete file paths, expanding globs.
fn resolve_paths(side: Side, location: &str) -> Result<Vec<String>> {
    if is_glob(location) {
        expand_glob(side, location)
    } else if Path::new(location).is_file() {
        Ok(vec![location.to_string()])
    } else {
        Err(MirrorError::dataset_unavailable(
            side.as_str(),
            location,
            "file does not exist",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int32Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema as ArrowSchema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::arrow_writer::ArrowWriter;
    use std::fs::File;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    fn create_test_parquet() -> NamedTempFile {
        let file = NamedTempFile::with_suffix(".parquet").unwrap();

        let schema = Arc::new(ArrowSchema::new(vec![
            Field::new("id", DataType::Int32, false),
            Field::new("name", DataType::Utf8, false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int32Array::from(vec![1, 2, 3])),
                Arc::new(StringArray::from(vec!["Alice", "Bob", "Charlie"])),
            ],
        )
        .unwrap();

        let props = Default::default();
        let file_handle = File::create(file.path()).unwrap();
        let mut writer = ArrowWriter::try_new(file_handle, schema, props).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        file
    }

    #[test]
    fn test_csv_options_defaults() {
        let options = CsvOptions::from_map(&BTreeMap::new()).unwrap();
        assert!(options.header);
        assert_eq!(options.delimiter, b',');
    }

    #[test]
    fn test_csv_options_from_map() {
        let mut map = BTreeMap::new();
        map.insert("header".to_string(), "false".to_string());
        map.insert("delimiter".to_string(), ";".to_string());
        let options = CsvOptions::from_map(&map).unwrap();
        assert!(!options.header);
        assert_eq!(options.delimiter, b';');
    }

    #[test]
    fn test_csv_options_reject_wide_delimiter() {
        let mut map = BTreeMap::new();
        map.insert("delimiter".to_string(), "||".to_string());
        let err = CsvOptions::from_map(&map).unwrap_err();
        assert!(err.to_string().contains("delimiter"));
    }

    #[tokio::test]
    async fn test_csv_registration_and_query() {
        let file = NamedTempFile::with_suffix(".csv").unwrap();
        std::fs::write(file.path(), "id,name\n1,Alice\n2,Bob\n").unwrap();

        let source = CsvSource::new(
            Side::Source,
            file.path().to_str().unwrap().to_string(),
            None,
            CsvOptions::default(),
        );
        let ctx = SessionContext::new();
        source.register(&ctx, "src").await.unwrap();

        let batches = ctx
            .sql("SELECT COUNT(*) FROM src")
            .await
            .unwrap()
            .collect()
            .await
            .unwrap();
        assert!(!batches.is_empty());
    }

    #[tokio::test]
    async fn test_missing_csv_is_dataset_unavailable() {
        let source = CsvSource::new(
            Side::Target,
            "/nonexistent/orders.csv".to_string(),
            None,
            CsvOptions::default(),
        );
        let ctx = SessionContext::new();
        let err = source.register(&ctx, "tgt").await.unwrap_err();
        assert!(matches!(err, MirrorError::DatasetUnavailable { .. }));
        assert!(err.to_string().contains("target"));
    }

    #[tokio::test]
    async fn test_parquet_registration_and_query() {
        let file = create_test_parquet();
        let source = ParquetSource::new(
            Side::Target,
            file.path().to_str().unwrap().to_string(),
            None,
        );
        let ctx = SessionContext::new();
        source.register(&ctx, "tgt").await.unwrap();

        let batches = ctx
            .sql("SELECT COUNT(*) FROM tgt")
            .await
            .unwrap()
            .collect()
            .await
            .unwrap();
        assert!(!batches.is_empty());
    }

    #[tokio::test]
    async fn test_glob_registers_all_matches() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("part-0.csv"), "id\n1\n2\n").unwrap();
        std::fs::write(dir.path().join("part-1.csv"), "id\n3\n").unwrap();

        let source = CsvSource::new(
            Side::Source,
            format!("{}/part-*.csv", dir.path().display()),
            None,
            CsvOptions::default(),
        );
        let ctx = SessionContext::new();
        source.register(&ctx, "src").await.unwrap();

        let batches = ctx
            .sql("SELECT COUNT(*) AS n FROM src")
            .await
            .unwrap()
            .collect()
            .await
            .unwrap();
        let counts = batches[0]
            .column(0)
            .as_any()
            .downcast_ref::<arrow::array::Int64Array>()
            .unwrap();
        assert_eq!(counts.value(0), 3);
    }

    #[tokio::test]
    async fn test_glob_with_no_matches_is_dataset_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let source = ParquetSource::new(
            Side::Target,
            format!("{}/dt=20240115/*.parquet", dir.path().display()),
            None,
        );
        let ctx = SessionContext::new();
        let err = source.register(&ctx, "tgt").await.unwrap_err();
        assert!(matches!(err, MirrorError::DatasetUnavailable { .. }));
    }
}
