//! # Mirror Guard - Dataset Reconciliation for Rust
//!
//! Mirror Guard verifies that a periodically copied dataset still matches its
//! origin. One run resolves a time partition, counts both sides through
//! DataFusion, applies a row-count threshold, optionally diffs row content,
//! and appends a summary record. It is built for mirror pipelines: database
//! tables exported to Parquet or CSV, file drops copied between stores, or
//! tables replicated across databases.
//!
//! ## Overview
//!
//! A run is described by a YAML configuration with three parts: a `setting`
//! (name, threshold, granularity, delay, summary path) and two dataset
//! descriptors, `source` and `target`. The engine subtracts the configured
//! delay from the reference datetime, floors it to the granularity boundary,
//! substitutes the resulting partition into every location and filter
//! template, and compares what it finds on the two sides.
//!
//! A threshold breach is a verdict, not an error: the run completes, the
//! summary record is written, and only the exit code distinguishes a breach
//! from a clean pass.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mirror_guard::prelude::*;
//! use mirror_guard::summary::CsvSummarySink;
//!
//! # async fn example() -> Result<()> {
//! let config = ValidationConfig::from_yaml_path("validation.yml")?;
//! let run = ValidationRun::new(config)?;
//!
//! let outcome = run
//!     .execute_and_record(None, ExecutionMode::Local, &CsvSummarySink::new())
//!     .await?;
//!
//! if outcome.within_threshold {
//!     println!("{}: counts match within tolerance", outcome.name);
//! } else {
//!     println!("{}: source/target delta {}", outcome.name, outcome.delta);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Dataset Kinds
//!
//! Both sides are described uniformly and may mix kinds freely:
//!
//! - CSV files (plain paths or glob patterns, header/delimiter options)
//! - Parquet files (plain paths or glob patterns)
//! - PostgreSQL, MySQL, and SQLite tables (feature-gated, see below)
//!
//! Database connectivity comes from `datafusion-table-providers` and is
//! enabled per flavor with the `postgres`, `mysql`, and `sqlite` features, or
//! all at once with `all-databases`.
//!
//! ## Architecture
//!
//! - **`config`**: YAML-backed run configuration and validation
//! - **`partition`**: granularity parsing, time resolution, date templates
//! - **`sources`**: dataset connectors registered with DataFusion
//! - **`runner`**: the staged orchestrator and reader abstraction
//! - **`compare`**: threshold evaluation and multiset content diffing
//! - **`outcome`**: the per-run result record
//! - **`summary`**: sinks persisting one record per run
//! - **`error`**: the error taxonomy shared by every stage
//! - **`logging`**: tracing-subscriber setup presets
//! - **`security`**: identifier validation and secret handling

pub mod compare;
pub mod config;
pub mod error;
pub mod logging;
pub mod outcome;
pub mod partition;
pub mod prelude;
pub mod runner;
pub mod security;
pub mod sources;
pub mod summary;
