//! Persistence of run outcomes.
//!
//! Every completed run hands exactly one [`ValidationOutcome`] to a sink,
//! whatever the verdict; failed runs never reach this layer. The sink trait
//! keeps the orchestrator independent of where records land: CSV append in
//! production, memory in tests.

use crate::error::Result;
use crate::outcome::ValidationOutcome;
use async_trait::async_trait;
use std::fmt::Debug;

mod csv;
mod memory;

pub use csv::CsvSummarySink;
pub use memory::InMemorySink;

/// A destination for run summary records.
#[async_trait]
pub trait SummarySink: Debug + Send + Sync {
    /// Appends one outcome record at the rendered summary path.
    async fn record(&self, path: &str, outcome: &ValidationOutcome) -> Result<()>;
}
