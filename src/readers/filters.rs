// src/readers/filters.rs

//! The declarative query language of the [`JournalReader`].
//!
//! A [`JournalFilter`] is one filter intent. [`JournalFilter::match_expr`]
//! turns it into the match expression handed to the [`JournalStore`].
//! [`TimeWindow`] is the sugar behind `last_hour`, `last_day`, `last_week`,
//! and `today`.
//!
//! [`parse_match_expr`] goes the other way, from a match expression string
//! to a [`MatchExpr`], for stores that must interpret comparison matches.
//!
//! [`JournalReader`]: crate::readers::journalreader::JournalReader
//! [`JournalStore`]: crate::readers::journalstore::JournalStore

use std::fmt;

use ::chrono::{
    DateTime,
    Duration,
    Local,
    TimeZone,
};
use ::clap::ValueEnum;

use crate::data::datetime::{
    datetime_to_epoch_micros,
    local_midnight,
    EpochMicrosecondsI,
};
use crate::data::journal::{
    FIELD_EXE,
    FIELD_HOSTNAME,
    FIELD_MESSAGE,
    FIELD_PRIORITY,
    FIELD_REALTIME_TIMESTAMP,
    FIELD_SYSTEMD_SERVICE,
    FIELD_SYSTEMD_UNIT,
};
use crate::data::priority::{
    PRIORITY_MAX,
    PRIORITY_MIN,
};
use crate::error::{
    ReaderError,
    ReaderResult,
};

/// One filter intent of a [`JournalReader`].
///
/// [`JournalReader`]: crate::readers::journalreader::JournalReader
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum JournalFilter {
    /// `__SYSTEMD_SERVICE=<name>`
    Service(String),
    /// `_SYSTEMD_UNIT=<name>`
    Unit(String),
    /// `_HOSTNAME=<name>`
    Hostname(String),
    /// `_EXE=<path>`
    Executable(String),
    /// `MESSAGE=<text>`
    Message(String),
    /// `_REALTIME_TIMESTAMP>=<microseconds>`
    Since(EpochMicrosecondsI),
    /// `_REALTIME_TIMESTAMP<=<microseconds>`
    Until(EpochMicrosecondsI),
    /// `PRIORITY<=<n>`, `n` must be `0..=7`
    Priority(i64),
    /// passed through verbatim
    Raw(String),
}

impl JournalFilter {
    pub fn since<Tz: TimeZone>(since: &DateTime<Tz>) -> JournalFilter {
        JournalFilter::Since(datetime_to_epoch_micros(since))
    }

    pub fn until<Tz: TimeZone>(until: &DateTime<Tz>) -> JournalFilter {
        JournalFilter::Until(datetime_to_epoch_micros(until))
    }

    /// Build the match expression.
    ///
    /// The only validation is the priority range; everything else is
    /// left for the store to accept or reject.
    pub fn match_expr(&self) -> ReaderResult<String> {
        let expr: String = match self {
            JournalFilter::Service(name) => format!("{}={}", FIELD_SYSTEMD_SERVICE, name),
            JournalFilter::Unit(name) => format!("{}={}", FIELD_SYSTEMD_UNIT, name),
            JournalFilter::Hostname(name) => format!("{}={}", FIELD_HOSTNAME, name),
            JournalFilter::Executable(path) => format!("{}={}", FIELD_EXE, path),
            JournalFilter::Message(text) => format!("{}={}", FIELD_MESSAGE, text),
            JournalFilter::Since(em) => format!("{}>={}", FIELD_REALTIME_TIMESTAMP, em),
            JournalFilter::Until(em) => format!("{}<={}", FIELD_REALTIME_TIMESTAMP, em),
            JournalFilter::Priority(priority) => {
                if !(PRIORITY_MIN..=PRIORITY_MAX).contains(priority) {
                    return Err(ReaderError::InvalidPriority(*priority));
                }
                format!("{}<={}", FIELD_PRIORITY, priority)
            }
            JournalFilter::Raw(expr) => expr.clone(),
        };

        Ok(expr)
    }

    /// Name of the operation, used to wrap a store rejection.
    pub const fn op(&self) -> &'static str {
        match self {
            JournalFilter::Service(_) => "add service match",
            JournalFilter::Unit(_) => "add unit match",
            JournalFilter::Hostname(_) => "add hostname match",
            JournalFilter::Executable(_) => "add executable match",
            JournalFilter::Message(_) => "add message filter",
            JournalFilter::Since(_) | JournalFilter::Until(_) => "add time match",
            JournalFilter::Priority(_) => "add priority match",
            JournalFilter::Raw(_) => "add filter match",
        }
    }
}

/// Time windows relative to "now".
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum TimeWindow {
    /// the last 60 minutes
    #[value(name = "hour")]
    LastHour,
    /// the last 24 hours
    #[value(name = "day")]
    LastDay,
    /// the last 7 days
    #[value(name = "week")]
    LastWeek,
    /// since local midnight
    #[value(name = "today")]
    Today,
}

impl TimeWindow {
    /// The start of the window ending at `now`.
    pub fn since(&self, now: &DateTime<Local>) -> DateTime<Local> {
        match self {
            TimeWindow::LastHour => *now - Duration::hours(1),
            TimeWindow::LastDay => *now - Duration::hours(24),
            TimeWindow::LastWeek => *now - Duration::days(7),
            TimeWindow::Today => local_midnight(now),
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeWindow::LastHour => write!(f, "hour"),
            TimeWindow::LastDay => write!(f, "day"),
            TimeWindow::LastWeek => write!(f, "week"),
            TimeWindow::Today => write!(f, "today"),
        }
    }
}

/// Comparison operator of a [`MatchExpr::Compare`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompareOp {
    /// `>=`
    GreaterEq,
    /// `<=`
    LessEq,
}

impl CompareOp {
    /// Does `value` satisfy `value <op> bound`?
    pub fn holds<T: PartialOrd>(&self, value: &T, bound: &T) -> bool {
        match self {
            CompareOp::GreaterEq => value >= bound,
            CompareOp::LessEq => value <= bound,
        }
    }
}

/// A parsed match expression.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MatchExpr<'a> {
    /// `FIELD=value`
    Equals {
        field: &'a str,
        value: &'a str,
    },
    /// `FIELD>=value` or `FIELD<=value`
    Compare {
        field: &'a str,
        op: CompareOp,
        value: &'a str,
    },
}

impl<'a> MatchExpr<'a> {
    pub const fn field(&self) -> &'a str {
        match self {
            MatchExpr::Equals { field, .. } | MatchExpr::Compare { field, .. } => *field,
        }
    }
}

/// Parse a match expression. The field name is everything before the first
/// `=`; a `>` or `<` directly before that `=` makes it a comparison.
///
/// Returns `None` if there is no `=` or the field name is empty.
pub fn parse_match_expr(expr: &str) -> Option<MatchExpr<'_>> {
    let at: usize = expr.find('=')?;
    let (head, value) = (&expr[..at], &expr[at + 1..]);
    let (field, op) = match head.as_bytes().last() {
        Some(b'>') => (&head[..head.len() - 1], Some(CompareOp::GreaterEq)),
        Some(b'<') => (&head[..head.len() - 1], Some(CompareOp::LessEq)),
        _ => (head, None),
    };
    if field.is_empty() {
        return None;
    }

    Some(match op {
        Some(op) => MatchExpr::Compare { field, op, value },
        None => MatchExpr::Equals { field, value },
    })
}
