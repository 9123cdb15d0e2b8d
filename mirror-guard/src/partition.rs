//! Time partition resolution.
//!
//! A run validates exactly one time partition. The partition is derived from
//! a reference datetime (wall clock, or an explicit backfill datetime) by
//! subtracting the configured pipeline lag and flooring to the granularity
//! boundary. The same strftime renderer substitutes the resolved partition
//! into dataset locations, filters, and the summary-log path so date
//! formatting behaves identically everywhere.

use crate::error::{MirrorError, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{Datelike, Days, Duration, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The time-bucket size at which partitions are validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// Floor to the top of the hour
    Hourly,
    /// Floor to midnight
    Daily,
    /// Floor to the first of the month at midnight
    Monthly,
}

impl Granularity {
    /// Floors a datetime to this granularity's boundary.
    pub fn floor(&self, at: NaiveDateTime) -> NaiveDateTime {
        let midnight = at.date().and_time(NaiveTime::MIN);
        match self {
            Granularity::Hourly => midnight + Duration::hours(i64::from(at.hour())),
            Granularity::Daily => midnight,
            Granularity::Monthly => {
                // day() is 1-based, so this subtraction never underflows
                (at.date() - Days::new(u64::from(at.day() - 1))).and_time(NaiveTime::MIN)
            }
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Granularity::Hourly => "hourly",
            Granularity::Daily => "daily",
            Granularity::Monthly => "monthly",
        };
        write!(f, "{tag}")
    }
}

impl FromStr for Granularity {
    type Err = MirrorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hourly" => Ok(Granularity::Hourly),
            "daily" => Ok(Granularity::Daily),
            "monthly" => Ok(Granularity::Monthly),
            _ => Err(MirrorError::invalid_granularity(s)),
        }
    }
}

/// Resolves the concrete partition timestamp for a run.
///
/// Subtracts `delay_seconds` from `reference`, then floors to the
/// granularity boundary. Deterministic: identical inputs always resolve to
/// the identical partition. The delay is applied even when the reference was
/// supplied explicitly; a backfill that wants no lag configures a delay of
/// zero.
pub fn resolve(
    granularity: Granularity,
    delay_seconds: i64,
    reference: NaiveDateTime,
) -> NaiveDateTime {
    let lagged = reference - Duration::seconds(delay_seconds);
    granularity.floor(lagged)
}

/// Substitutes strftime-style date placeholders in a template.
///
/// Templates without placeholders pass through unchanged. Unrecognized
/// format tokens, and tokens that need timezone information a naive
/// datetime cannot supply, are configuration errors.
pub fn render_template(template: &str, at: NaiveDateTime) -> Result<String> {
    use std::fmt::Write as _;

    let items: Vec<Item<'_>> = StrftimeItems::new(template).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(MirrorError::configuration(format!(
            "invalid date format token in template '{template}'"
        )));
    }

    let mut rendered = String::with_capacity(template.len());
    write!(rendered, "{}", at.format_with_items(items.into_iter())).map_err(|_| {
        MirrorError::configuration(format!(
            "template '{template}' contains tokens that cannot be rendered from a naive datetime"
        ))
    })?;
    Ok(rendered)
}
