//! Run configuration: the validation setting and the two dataset descriptors.
//!
//! Configuration is a YAML document with three top-level groups: `setting`,
//! `source`, and `target`. Descriptors are internally tagged by `type`, so a
//! document carries exactly one active variant per side; disabled alternates
//! live as YAML comments and never reach the parser.
//!
//! ```yaml
//! setting:
//!   name: orders_nightly
//!   threshold: 5
//!   validation_type: postgres_to_parquet
//!   granularity: daily
//!   default_time_delay: 3600
//!   source_name: orders_db
//!   destination_name: orders_lake
//!   summary_log: /var/log/mirror/summary_%Y%m%d.csv
//! source:
//!   type: database
//!   format: postgres
//!   location: postgres://db.internal:5432/shop
//!   table: public.orders
//!   filter: "created_at < '%Y-%m-%d %H:%M:%S'"
//! target:
//!   type: file
//!   format: parquet
//!   location: /data/orders/dt=%Y%m%d/*.parquet
//! ```

use crate::error::{MirrorError, Result};
use crate::security::validate_table_name;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// How the configured threshold is interpreted by the evaluator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdMode {
    /// Threshold is a maximum absolute row-count difference.
    #[default]
    Absolute,
    /// Threshold is a maximum difference as a percentage of the source count.
    Percent,
}

impl fmt::Display for ThresholdMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdMode::Absolute => write!(f, "absolute"),
            ThresholdMode::Percent => write!(f, "percent"),
        }
    }
}

fn default_diff_sample_limit() -> usize {
    10
}

/// Immutable per-run validation settings, loaded once from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSetting {
    /// Identifier for logging and reporting
    pub name: String,
    /// Non-negative tolerance for the row-count difference
    pub threshold: f64,
    /// Interpretation of `threshold`; absolute rows unless opted into percent
    #[serde(default)]
    pub threshold_mode: ThresholdMode,
    /// Informational tag for the source/target technology pairing
    pub validation_type: String,
    /// Enables the content-diff stage
    #[serde(default)]
    pub validate_content: bool,
    /// Time bucket being validated: hourly, daily, or monthly. Kept as the
    /// raw tag; parsed at the start of a run so typos surface as
    /// `InvalidGranularity` before any read.
    pub granularity: String,
    /// Seconds subtracted from the reference datetime to absorb pipeline lag
    #[serde(default)]
    pub default_time_delay: i64,
    /// Label for the source dataset in output
    pub source_name: String,
    /// Label for the target dataset in output
    pub destination_name: String,
    /// Path template for the summary record, with strftime placeholders
    pub summary_log: String,
    /// Columns forming the content-comparison key; empty means full row
    #[serde(default)]
    pub content_keys: Vec<String>,
    /// Maximum sample mismatches kept in a content-diff summary
    #[serde(default = "default_diff_sample_limit")]
    pub diff_sample_limit: usize,
}

/// Resolved description of one side of the comparison.
///
/// A closed variant type: one implementation per dataset kind sits behind a
/// uniform registration contract in [`crate::sources`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DatasetDescriptor {
    /// A relational table reached through a connection URL.
    Database {
        /// Database flavor: `postgres`, `mysql`, or `sqlite`
        format: String,
        /// Connection URL or database file path; may contain date placeholders
        location: String,
        /// Table to count/scan; validated as a safe identifier
        table: String,
        /// Optional SQL predicate template applied to every read
        #[serde(default)]
        filter: Option<String>,
        /// Connection options passed through to the provider
        #[serde(default)]
        options: BTreeMap<String, String>,
    },
    /// Files on a filesystem, optionally partition-suffixed.
    File {
        /// File format: `csv` or `parquet`
        format: String,
        /// Path or glob pattern; may contain date placeholders
        location: String,
        /// Optional SQL predicate template applied to every read
        #[serde(default)]
        filter: Option<String>,
        /// Format options (CSV: `header`, `delimiter`)
        #[serde(default)]
        options: BTreeMap<String, String>,
    },
}

impl DatasetDescriptor {
    /// The descriptor kind tag as it appears in configuration.
    pub fn kind(&self) -> &'static str {
        match self {
            DatasetDescriptor::Database { .. } => "database",
            DatasetDescriptor::File { .. } => "file",
        }
    }

    /// The configured format string.
    pub fn format(&self) -> &str {
        match self {
            DatasetDescriptor::Database { format, .. } => format,
            DatasetDescriptor::File { format, .. } => format,
        }
    }

    /// The unrendered location template.
    pub fn location(&self) -> &str {
        match self {
            DatasetDescriptor::Database { location, .. } => location,
            DatasetDescriptor::File { location, .. } => location,
        }
    }

    /// The unrendered filter template, if one is configured.
    pub fn filter(&self) -> Option<&str> {
        match self {
            DatasetDescriptor::Database { filter, .. } => filter.as_deref(),
            DatasetDescriptor::File { filter, .. } => filter.as_deref(),
        }
    }
}

/// The full configuration for one reconciliation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Validation settings
    pub setting: ValidationSetting,
    /// Descriptor for the authoritative side
    pub source: DatasetDescriptor,
    /// Descriptor for the copy being verified
    pub target: DatasetDescriptor,
}

impl ValidationConfig {
    /// Parses a configuration from a YAML document and validates its values.
    pub fn from_yaml_str(document: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(document)
            .map_err(|e| MirrorError::configuration(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a configuration file.
    pub fn from_yaml_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path).map_err(|e| {
            MirrorError::configuration(format!(
                "failed to read config file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_yaml_str(&document)
    }

    /// Validates field values beyond what deserialization enforces.
    ///
    /// The granularity tag is deliberately not parsed here; the orchestrator
    /// parses it at the start of a run so the failure carries the
    /// `InvalidGranularity` kind.
    pub fn validate(&self) -> Result<()> {
        let setting = &self.setting;

        if setting.name.trim().is_empty() {
            return Err(MirrorError::configuration("setting.name must not be empty"));
        }
        if !setting.threshold.is_finite() || setting.threshold < 0.0 {
            return Err(MirrorError::configuration(format!(
                "setting.threshold must be a non-negative finite number, got {}",
                setting.threshold
            )));
        }
        if setting.default_time_delay < 0 {
            return Err(MirrorError::configuration(format!(
                "setting.default_time_delay must be non-negative, got {}",
                setting.default_time_delay
            )));
        }
        if setting.granularity.trim().is_empty() {
            return Err(MirrorError::configuration(
                "setting.granularity must not be empty",
            ));
        }
        if setting.summary_log.trim().is_empty() {
            return Err(MirrorError::configuration(
                "setting.summary_log must not be empty",
            ));
        }

        for (label, descriptor) in [("source", &self.source), ("target", &self.target)] {
            if descriptor.location().trim().is_empty() {
                return Err(MirrorError::configuration(format!(
                    "{label}.location must not be empty"
                )));
            }
            if descriptor.format().trim().is_empty() {
                return Err(MirrorError::configuration(format!(
                    "{label}.format must not be empty"
                )));
            }
            if let DatasetDescriptor::Database { table, .. } = descriptor {
                validate_table_name(table).map_err(|e| {
                    MirrorError::configuration(format!("{label}.table is not usable: {e}"))
                })?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_CONFIG: &str = r#"
setting:
  name: orders_nightly
  threshold: 5
  validation_type: postgres_to_parquet
  granularity: daily
  default_time_delay: 3600
  source_name: orders_db
  destination_name: orders_lake
  summary_log: /var/log/mirror/summary_%Y%m%d.csv
source:
  type: database
  format: postgres
  location: postgres://db.internal:5432/shop
  table: public.orders
  filter: "created_at < '%Y-%m-%d %H:%M:%S'"
  options:
    sslmode: disable
target:
  type: file
  format: parquet
  location: /data/orders/dt=%Y%m%d/*.parquet
# Disabled alternate target, kept for reference:
# target:
#   type: file
#   format: csv
#   location: /data/orders/dt=%Y%m%d.csv
#   options:
#     header: "true"
"#;

    #[test]
    fn test_parses_full_config_with_commented_alternates() {
        let config = ValidationConfig::from_yaml_str(FULL_CONFIG).unwrap();

        assert_eq!(config.setting.name, "orders_nightly");
        assert_eq!(config.setting.threshold, 5.0);
        assert_eq!(config.setting.threshold_mode, ThresholdMode::Absolute);
        assert!(!config.setting.validate_content);
        assert_eq!(config.setting.default_time_delay, 3600);
        assert_eq!(config.setting.diff_sample_limit, 10);
        assert!(config.setting.content_keys.is_empty());

        match &config.source {
            DatasetDescriptor::Database {
                format,
                table,
                filter,
                options,
                ..
            } => {
                assert_eq!(format, "postgres");
                assert_eq!(table, "public.orders");
                assert!(filter.as_deref().unwrap().contains("%Y-%m-%d"));
                assert_eq!(options.get("sslmode").map(String::as_str), Some("disable"));
            }
            other => panic!("expected database source, got {other:?}"),
        }
        assert_eq!(config.target.kind(), "file");
        assert_eq!(config.target.format(), "parquet");
    }

    #[test]
    fn test_percent_mode_is_explicit_opt_in() {
        let document = FULL_CONFIG.replace("threshold: 5", "threshold: 5\n  threshold_mode: percent");
        let config = ValidationConfig::from_yaml_str(&document).unwrap();
        assert_eq!(config.setting.threshold_mode, ThresholdMode::Percent);
    }

    #[test]
    fn test_unknown_descriptor_type_is_rejected() {
        let document = FULL_CONFIG.replace("type: file", "type: ftp");
        let err = ValidationConfig::from_yaml_str(&document).unwrap_err();
        assert!(matches!(err, MirrorError::Configuration(_)));
    }

    #[test]
    fn test_negative_threshold_is_rejected() {
        let document = FULL_CONFIG.replace("threshold: 5", "threshold: -1");
        assert!(ValidationConfig::from_yaml_str(&document).is_err());
    }

    #[test]
    fn test_negative_delay_is_rejected() {
        let document = FULL_CONFIG.replace("default_time_delay: 3600", "default_time_delay: -60");
        assert!(ValidationConfig::from_yaml_str(&document).is_err());
    }

    #[test]
    fn test_hostile_table_name_is_rejected() {
        let document = FULL_CONFIG.replace("table: public.orders", "table: orders; DROP TABLE x");
        let err = ValidationConfig::from_yaml_str(&document).unwrap_err();
        assert!(err.to_string().contains("source.table"));
    }

    #[test]
    fn test_unparsed_granularity_tag_survives_load() {
        // Typos are not a config-load error; the run surfaces them as
        // InvalidGranularity before any read.
        let document = FULL_CONFIG.replace("granularity: daily", "granularity: weekly-ish");
        let config = ValidationConfig::from_yaml_str(&document).unwrap();
        assert_eq!(config.setting.granularity, "weekly-ish");
    }

    #[test]
    fn test_missing_summary_log_is_rejected() {
        let document = FULL_CONFIG.replace("  summary_log: /var/log/mirror/summary_%Y%m%d.csv\n", "");
        assert!(ValidationConfig::from_yaml_str(&document).is_err());
    }

    #[test]
    fn test_config_round_trips_through_serde() {
        let config = ValidationConfig::from_yaml_str(FULL_CONFIG).unwrap();
        let rendered = serde_yaml::to_string(&config).unwrap();
        let reparsed = ValidationConfig::from_yaml_str(&rendered).unwrap();
        assert_eq!(config, reparsed);
    }
}
