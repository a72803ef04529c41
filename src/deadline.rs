//! End-time parsing for new give-aways.
//!
//! Accepts a relative duration (`1h30m`, `90s`, `1.5h`) measured from now,
//! or an absolute UTC date: `YYYY-MM-DD HH:MM`, or `YYYY-MM-DD` which means
//! 23:59 of that day.

use crate::error::GiveawayError;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

/// Whole-string shape of a duration expression.
static DURATION_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:(?:\d+\.?\d*|\.\d+)(?:ns|us|µs|μs|ms|h|m|s))+$")
        .expect("duration shape regex is valid")
});

/// One `<number><unit>` group.
static DURATION_PART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+\.?\d*|\.\d+)(ns|us|µs|μs|ms|h|m|s)").expect("duration part regex is valid")
});

const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse an end-time string into an absolute deadline, relative to now.
pub fn parse_deadline(input: &str) -> Result<DateTime<Utc>, GiveawayError> {
    parse_deadline_at(input, Utc::now())
}

/// Parse an end-time string into an absolute deadline, relative to `now`.
pub fn parse_deadline_at(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, GiveawayError> {
    let input = input.trim();

    if let Some(offset) = parse_duration(input) {
        return now
            .checked_add_signed(offset)
            .ok_or_else(|| GiveawayError::InvalidFormat(format!("'{input}' is out of range")));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(input, DATE_TIME_FORMAT) {
        return Ok(naive.and_utc());
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, DATE_FORMAT) {
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 0).unwrap_or_default();
        return Ok(date.and_time(end_of_day).and_utc());
    }

    Err(GiveawayError::InvalidFormat(format!(
        "'{input}' is neither a duration (e.g. 1h30m) nor a date (YYYY-MM-DD [HH:MM])"
    )))
}

/// Parse a signed duration expression such as `1h30m` or `-2.5s`.
///
/// A bare `0` is accepted. Returns `None` when the input is not a duration.
pub fn parse_duration(input: &str) -> Option<Duration> {
    if matches!(input, "0" | "+0" | "-0") {
        return Some(Duration::zero());
    }
    if !DURATION_SHAPE.is_match(input) {
        return None;
    }

    let negative = input.starts_with('-');
    let mut total_nanos = 0f64;
    for part in DURATION_PART.captures_iter(input) {
        let value: f64 = part[1].parse().ok()?;
        total_nanos += value * unit_nanos(&part[2])?;
    }

    if !total_nanos.is_finite() || total_nanos > i64::MAX as f64 {
        return None;
    }
    let nanos = total_nanos.round() as i64;
    Some(Duration::nanoseconds(if negative { -nanos } else { nanos }))
}

fn unit_nanos(unit: &str) -> Option<f64> {
    let nanos = match unit {
        "ns" => 1.0,
        "us" | "µs" | "μs" => 1_000.0,
        "ms" => 1_000_000.0,
        "s" => 1_000_000_000.0,
        "m" => 60.0 * 1_000_000_000.0,
        "h" => 3_600.0 * 1_000_000_000.0,
        _ => return None,
    };
    Some(nanos)
}
