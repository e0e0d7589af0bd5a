//! Read-only analytics over patient snapshots: revenue classification and
//! monthly funnel statistics.

mod breakdown;
mod monthly;
mod narrative;
mod revenue;

pub use breakdown::*;
pub use monthly::*;
pub use narrative::*;
pub use revenue::*;

use chrono::NaiveDate;
use thiserror::Error;

/// Analytics errors.
#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DbError),
}

pub type StatsResult<T> = Result<T, StatsError>;

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `part / whole * 100`, rounded to one decimal; 0 when `whole` is 0.
pub fn percentage(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        round1(part / whole * 100.0)
    }
}

/// Validate an inclusive `[from, to]` date range.
pub fn date_range(from: &str, to: &str) -> StatsResult<(NaiveDate, NaiveDate)> {
    let start = crate::dates::parse_date(from)
        .ok_or_else(|| StatsError::InvalidRange(format!("not a date: {}", from)))?;
    let end = crate::dates::parse_date(to)
        .ok_or_else(|| StatsError::InvalidRange(format!("not a date: {}", to)))?;
    if start > end {
        return Err(StatsError::InvalidRange(format!("{} is after {}", from, to)));
    }
    Ok((start, end))
}
