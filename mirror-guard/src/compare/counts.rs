//! Row-count threshold evaluation.

use crate::config::ThresholdMode;
use crate::error::{MirrorError, Result};

/// The verdict of comparing two row counts against a tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountComparison {
    /// `source_count - target_count`
    pub delta: i64,
    /// Whether the difference is within the configured tolerance
    pub within_threshold: bool,
}

/// Compares source and target row counts against a tolerance.
///
/// A pure function of its inputs. In absolute mode the difference must not
/// exceed `threshold` rows; in percent mode it must not exceed `threshold`
/// percent of the source count, where an empty source tolerates only an
/// empty target.
///
/// Readers never produce negative counts; if one is observed anyway the
/// evaluation fails with `InvalidCount` naming the offending side.
pub fn evaluate(
    source_count: i64,
    target_count: i64,
    threshold: f64,
    mode: ThresholdMode,
) -> Result<CountComparison> {
    if source_count < 0 {
        return Err(MirrorError::InvalidCount {
            side: "source".to_string(),
            count: source_count,
        });
    }
    if target_count < 0 {
        return Err(MirrorError::InvalidCount {
            side: "target".to_string(),
            count: target_count,
        });
    }

    let delta = source_count - target_count;
    let magnitude = delta.unsigned_abs() as f64;

    let within_threshold = match mode {
        ThresholdMode::Absolute => magnitude <= threshold,
        ThresholdMode::Percent => {
            if source_count == 0 {
                target_count == 0
            } else {
                magnitude / source_count as f64 * 100.0 <= threshold
            }
        }
    };

    Ok(CountComparison {
        delta,
        within_threshold,
    })
}
