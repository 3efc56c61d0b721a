// src/data/datetime.rs

//! Datetime helpers: conversion to journal microseconds, the relative time
//! windows used by the reader shortcuts, and parsing of user-passed
//! datetime strings.

use ::chrono::{
    DateTime,
    Duration,
    Local,
    LocalResult,
    NaiveDate,
    NaiveDateTime,
    TimeZone,
};
#[doc(hidden)]
pub use ::chrono::FixedOffset;
use ::si_trace_print::{
    defn,
    defx,
};

/// DateTime typing used by this crate, always with an explicit offset.
pub type DateTimeL = DateTime<FixedOffset>;

/// Microseconds since the Unix epoch, as accepted in `_REALTIME_TIMESTAMP`
/// match expressions. Signed so datetimes before 1970 still convert.
pub type EpochMicrosecondsI = i64;

/// Result of comparing a value against an optional `after` and `before`
/// filter pair.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Result_Filter_DateTime2 {
    /// at or after the `after` filter and at or before the `before` filter
    InRange,
    /// before the `after` filter
    BeforeRange,
    /// after the `before` filter
    AfterRange,
}

/// Convert any `DateTime` to microseconds since the Unix epoch.
pub fn datetime_to_epoch_micros<Tz: TimeZone>(dt: &DateTime<Tz>) -> EpochMicrosecondsI {
    dt.timestamp_micros()
}

/// Resolve a local `NaiveDateTime` to a `DateTime<Local>`.
///
/// An ambiguous time (DST fold) resolves to the earlier instant.
/// A non-existent time (DST gap) resolves to the first valid minute after
/// it. Returns `None` only if nothing valid is found within a day.
pub fn local_from_naive(naive: &NaiveDateTime) -> Option<DateTime<Local>> {
    let mut candidate: NaiveDateTime = *naive;
    for _ in 0..(24 * 60) {
        match Local.from_local_datetime(&candidate) {
            LocalResult::Single(dt) => return Some(dt),
            LocalResult::Ambiguous(earliest, _latest) => return Some(earliest),
            LocalResult::None => {
                candidate = candidate.checked_add_signed(Duration::minutes(1))?;
            }
        }
    }

    None
}

/// Midnight at the start of the local day of `now`.
///
/// Falls back to `now` in the improbable case midnight cannot be resolved.
pub fn local_midnight(now: &DateTime<Local>) -> DateTime<Local> {
    defn!("({:?})", now);
    let midnight: DateTime<Local> = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| local_from_naive(&naive))
        .unwrap_or(*now);
    defx!("return {:?}", midnight);

    midnight
}

/// Error for [`parse_datetime_arg`].
pub type DateTimeParseError = String;

/// Parse a user-passed datetime string relative to `now`.
///
/// Accepted forms:
///
/// - `@1680331472` Unix epoch seconds
/// - `-90s`, `-15m`, `-2h`, `-1d`, `-1w` relative offset before `now`
/// - `2023-04-01T06:44:32+00:00` RFC 3339
/// - `2023-04-01 06:44:32` or `2023-04-01T06:44:32` local time
/// - `2023-04-01` local midnight
pub fn parse_datetime_arg(
    input: &str,
    now: &DateTime<Local>,
) -> Result<DateTimeL, DateTimeParseError> {
    defn!("({:?})", input);
    let s = input.trim();
    if s.is_empty() {
        defx!("empty");
        return Err(String::from("empty datetime string"));
    }
    if let Some(secs) = s.strip_prefix('@') {
        let secs: i64 = secs
            .parse::<i64>()
            .map_err(|err| format!("bad epoch seconds {:?}; {}", secs, err))?;
        return match DateTime::from_timestamp(secs, 0) {
            Some(dt) => {
                defx!("epoch {:?}", dt);
                Ok(dt.fixed_offset())
            }
            None => Err(format!("epoch seconds out of range {:?}", secs)),
        };
    }
    if let Some(rel) = s.strip_prefix('-') {
        let delta = parse_relative_offset(rel)?;
        let dt = now
            .checked_sub_signed(delta)
            .ok_or_else(|| format!("relative offset out of range {:?}", input))?;
        defx!("relative {:?}", dt);
        return Ok(dt.fixed_offset());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        defx!("rfc3339 {:?}", dt);
        return Ok(dt);
    }
    for pattern in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, pattern) {
            let dt = local_from_naive(&naive)
                .ok_or_else(|| format!("local datetime does not exist {:?}", input))?;
            defx!("local {:?}", dt);
            return Ok(dt.fixed_offset());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let dt = date
            .and_hms_opt(0, 0, 0)
            .and_then(|naive| local_from_naive(&naive))
            .ok_or_else(|| format!("local date does not exist {:?}", input))?;
        defx!("local date {:?}", dt);
        return Ok(dt.fixed_offset());
    }
    defx!("unparseable");

    Err(format!("unable to parse datetime {:?}", input))
}

/// Parse `<n><unit>` where unit is one of `s`, `m`, `h`, `d`, `w`.
fn parse_relative_offset(rel: &str) -> Result<Duration, DateTimeParseError> {
    let split = rel
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| format!("relative offset missing unit {:?}", rel))?;
    let (digits, unit) = rel.split_at(split);
    let amount: i64 = digits
        .parse::<i64>()
        .map_err(|err| format!("bad relative offset {:?}; {}", rel, err))?;
    let multiplier: i64 = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        "w" => 7 * 24 * 60 * 60,
        _ => return Err(format!("unknown relative offset unit {:?}", unit)),
    };
    amount
        .checked_mul(multiplier)
        .and_then(Duration::try_seconds)
        .ok_or_else(|| format!("relative offset out of range {:?}", rel))
}
