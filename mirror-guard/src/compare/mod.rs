//! Comparison stages: the threshold evaluator and the content differ.

mod content;
mod counts;

pub use content::{ContentDiffSummary, ContentDiffer, DiffSample};
pub use counts::{evaluate, CountComparison};
