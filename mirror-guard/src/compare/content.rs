//! Row-level content comparison.
//!
//! The differ is multiset-based: per distinct rendered row it tallies how
//! many times the row occurs on each side, and the mismatch count is the sum
//! of absolute occurrence differences. Duplicates therefore count per
//! occurrence, not per distinct value. The comparison unit is either the
//! configured key columns, rendered in configuration order on both sides, or
//! by default the full row tuple rendered field-by-field in each side's own
//! schema order. Matching is exact: the same columns in a different schema
//! order mismatch on every row, and a value that renders differently on one
//! side (an integer mirrored into a float column, say) is a mismatch too.

use crate::error::{MirrorError, Result};
use crate::logging::truncate_field;
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Separator between rendered fields of one row. A control character keeps
/// multi-column rows unambiguous when field values contain delimiters.
const FIELD_SEPARATOR: char = '\u{1f}';

/// One sampled mismatch: a rendered row and its per-side occurrence counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSample {
    /// The rendered comparison key (or full row)
    pub row: String,
    /// Occurrences on the source side
    pub source_occurrences: i64,
    /// Occurrences on the target side
    pub target_occurrences: i64,
}

/// Summary of a content comparison, bounded in size regardless of input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDiffSummary {
    /// Total rows lacking a matching occurrence on the other side
    pub mismatched_count: u64,
    /// At most the configured sample limit of mismatches, in deterministic
    /// (lexicographic) order
    pub samples: Vec<DiffSample>,
}

/// Compares row-level content between the two sides of a run.
#[derive(Debug, Clone)]
pub struct ContentDiffer {
    key_columns: Vec<String>,
    sample_limit: usize,
}

impl ContentDiffer {
    /// Creates a differ comparing on `key_columns`, or on the full row when
    /// the list is empty, keeping at most `sample_limit` sample mismatches.
    pub fn new(key_columns: Vec<String>, sample_limit: usize) -> Self {
        Self {
            key_columns,
            sample_limit,
        }
    }

    /// Diffs the collected rows of both sides.
    ///
    /// Both sides must expose the same column-name set and contain every
    /// configured key column; otherwise the comparison fails with a content
    /// diff error rather than producing a misleading count.
    pub fn diff(
        &self,
        source: &[RecordBatch],
        target: &[RecordBatch],
    ) -> Result<ContentDiffSummary> {
        self.check_schemas(source, target)?;

        let mut tallies: BTreeMap<String, (i64, i64)> = BTreeMap::new();
        for batch in source {
            self.tally(batch, &mut tallies, |entry| entry.0 += 1)?;
        }
        for batch in target {
            self.tally(batch, &mut tallies, |entry| entry.1 += 1)?;
        }

        let mismatched_count: u64 = tallies
            .values()
            .map(|(s, t)| (s - t).unsigned_abs())
            .sum();

        let samples: Vec<DiffSample> = tallies
            .iter()
            .filter(|(_, (s, t))| s != t)
            .take(self.sample_limit)
            .map(|(row, (s, t))| DiffSample {
                row: row.clone(),
                source_occurrences: *s,
                target_occurrences: *t,
            })
            .collect();

        if let Some(first) = samples.first() {
            debug!(
                diff.mismatched = mismatched_count,
                diff.sample = %truncate_field(&first.row, 256),
                "Content comparison found mismatches"
            );
        }

        Ok(ContentDiffSummary {
            mismatched_count,
            samples,
        })
    }

    /// Column names the comparison runs over, in tally order.
    fn comparison_columns(&self, batch: &RecordBatch) -> Vec<String> {
        if self.key_columns.is_empty() {
            batch
                .schema()
                .fields()
                .iter()
                .map(|field| field.name().clone())
                .collect()
        } else {
            self.key_columns.clone()
        }
    }

    fn check_schemas(&self, source: &[RecordBatch], target: &[RecordBatch]) -> Result<()> {
        let source_names = column_names(source);
        let target_names = column_names(target);

        if let (Some(source_names), Some(target_names)) = (&source_names, &target_names) {
            if source_names != target_names {
                let only_source: Vec<&str> = source_names
                    .difference(target_names)
                    .map(String::as_str)
                    .collect();
                let only_target: Vec<&str> = target_names
                    .difference(source_names)
                    .map(String::as_str)
                    .collect();
                return Err(MirrorError::content_diff(format!(
                    "incompatible schemas: columns only in source {only_source:?}, \
                     columns only in target {only_target:?}"
                )));
            }
        }

        for key in &self.key_columns {
            for (side, names) in [("source", &source_names), ("target", &target_names)] {
                if let Some(names) = names {
                    if !names.contains(key) {
                        return Err(MirrorError::content_diff(format!(
                            "key column '{key}' missing from {side} dataset"
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    fn tally(
        &self,
        batch: &RecordBatch,
        tallies: &mut BTreeMap<String, (i64, i64)>,
        mut bump: impl FnMut(&mut (i64, i64)),
    ) -> Result<()> {
        let columns = self.comparison_columns(batch);
        let mut indices = Vec::with_capacity(columns.len());
        for name in &columns {
            let index = batch.schema().index_of(name)?;
            indices.push(index);
        }

        for row in 0..batch.num_rows() {
            let mut rendered = String::new();
            for (position, index) in indices.iter().enumerate() {
                if position > 0 {
                    rendered.push(FIELD_SEPARATOR);
                }
                rendered.push_str(&array_value_to_string(batch.column(*index), row)?);
            }
            bump(tallies.entry(rendered).or_insert((0, 0)));
        }

        Ok(())
    }
}

/// Column-name set of a side, or `None` when the side produced no batches.
fn column_names(batches: &[RecordBatch]) -> Option<BTreeSet<String>> {
    batches.first().map(|batch| {
        batch
            .schema()
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect()
    })
}
