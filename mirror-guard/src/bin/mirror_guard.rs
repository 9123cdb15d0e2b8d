//! Scheduled reconciliation entry point.
//!
//! Loads a validation config, runs one reconciliation, appends the summary
//! record, and maps the verdict to the process exit code so schedulers can
//! alert on drift without parsing logs.

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDateTime;
use clap::Parser;
use tracing::error;

use mirror_guard::config::ValidationConfig;
use mirror_guard::error::{MirrorError, Result};
use mirror_guard::logging::{init_logging, LoggingConfig};
use mirror_guard::outcome::ValidationOutcome;
use mirror_guard::runner::{ExecutionMode, ValidationRun};
use mirror_guard::summary::CsvSummarySink;

/// Completed run, counts within the threshold.
const EXIT_WITHIN: u8 = 0;
/// Completed run, threshold breached.
const EXIT_BREACH: u8 = 1;
/// The run failed before producing a verdict.
const EXIT_FAILURE: u8 = 2;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Parser)]
#[command(name = "mirror-guard")]
#[command(about = "Reconciles a source dataset against its mirrored copy", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the validation config (YAML)
    #[arg(long)]
    config: PathBuf,

    /// Reference datetime "YYYY-MM-DD HH:MM:SS"; defaults to the current UTC time
    #[arg(long)]
    datetime: Option<String>,

    /// Log at debug level and echo the resolved config and outcome as JSON
    #[arg(long, short)]
    verbose: bool,

    /// Scan parallelism
    #[arg(long, value_enum, default_value = "local")]
    mode: Mode,
}

/// CLI face of [`ExecutionMode`]; keeps clap out of the library.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Mode {
    /// Single-partition scans
    #[default]
    Local,
    /// One scan partition per core
    Parallel,
}

impl From<Mode> for ExecutionMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Local => ExecutionMode::Local,
            Mode::Parallel => ExecutionMode::Parallel,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let logging = if cli.verbose {
        LoggingConfig::development()
    } else {
        LoggingConfig::default()
    };
    if let Err(e) = init_logging(logging) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::from(EXIT_FAILURE);
    }

    let result = run(&cli).await;
    match &result {
        Ok(outcome) if outcome.within_threshold => {}
        Ok(outcome) => {
            eprintln!(
                "Threshold breached for '{}': source={} target={} delta={} (threshold {} {})",
                outcome.name,
                outcome.source_count,
                outcome.target_count,
                outcome.delta,
                outcome.threshold,
                outcome.threshold_mode,
            );
        }
        Err(e) => {
            error!(error.kind = e.kind(), error.message = %e, "Reconciliation run failed");
            eprintln!("Error: {e}");
            if let Some(hint) = remediation(e) {
                eprintln!("Hint: {hint}");
            }
        }
    }
    ExitCode::from(exit_code(&result))
}

/// Maps a finished run to the process exit code: a breach is a completed
/// verdict, distinct from an engine failure.
fn exit_code(result: &Result<ValidationOutcome>) -> u8 {
    match result {
        Ok(outcome) if outcome.within_threshold => EXIT_WITHIN,
        Ok(_) => EXIT_BREACH,
        Err(_) => EXIT_FAILURE,
    }
}

async fn run(cli: &Cli) -> Result<ValidationOutcome> {
    let config = ValidationConfig::from_yaml_path(&cli.config)?;
    let reference = cli.datetime.as_deref().map(parse_datetime).transpose()?;

    if cli.verbose {
        println!("{}", to_pretty_json(&redacted_config(&config)?)?);
    }

    let run = ValidationRun::new(config)?;
    let outcome = run
        .execute_and_record(reference, cli.mode.into(), &CsvSummarySink::new())
        .await?;

    if cli.verbose {
        println!("{}", to_pretty_json(&outcome)?);
    }

    Ok(outcome)
}

fn parse_datetime(raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT).map_err(|e| {
        MirrorError::configuration(format!(
            "invalid --datetime '{raw}': {e} (expected \"YYYY-MM-DD HH:MM:SS\")"
        ))
    })
}

/// Replaces credential-bearing option values before the config is echoed.
fn redacted_config(config: &ValidationConfig) -> Result<serde_json::Value> {
    let mut value = to_json_value(config)?;
    for section in ["source", "target"] {
        let options = value
            .get_mut(section)
            .and_then(|descriptor| descriptor.get_mut("options"))
            .and_then(|options| options.as_object_mut());
        if let Some(options) = options {
            for (key, entry) in options.iter_mut() {
                if is_sensitive(key) {
                    *entry = serde_json::Value::String("***".to_string());
                }
            }
        }
    }
    Ok(value)
}

fn is_sensitive(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.contains("password") || key.contains("secret") || key.contains("token")
}

fn to_json_value<T: serde::Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|e| MirrorError::internal(format!("failed to render JSON: {e}")))
}

fn to_pretty_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| MirrorError::internal(format!("failed to render JSON: {e}")))
}

/// A one-line triage hint for the most common operator-facing failures.
fn remediation(error: &MirrorError) -> Option<&'static str> {
    match error {
        MirrorError::InvalidGranularity { .. } => {
            Some("supported granularities are hourly, daily, and monthly")
        }
        MirrorError::DatasetUnavailable { .. } => {
            Some("verify the dataset exists for the resolved partition")
        }
        MirrorError::Configuration(_) => Some("check the validation config file"),
        MirrorError::NotSupported(_) => {
            Some("check the dataset format and the features this binary was built with")
        }
        _ => None,
    }
}
