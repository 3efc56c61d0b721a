// src/data/priority.rs

//! The syslog priority scale shared by the [`JournalReader`] filters and
//! the [`JourLog`] emitter.
//!
//! [`JournalReader`]: crate::readers::journalreader::JournalReader
//! [`JourLog`]: crate::writers::jourlog::JourLog

use std::fmt;
use std::str::FromStr;

/// Lowest (most severe) priority value.
pub const PRIORITY_MIN: i64 = 0;
/// Highest (least severe) priority value.
pub const PRIORITY_MAX: i64 = 7;

/// Journal entry priority, `0` (most severe) to `7` (least severe).
///
/// Ordering follows the numeric value so `Priority::Emergency <
/// Priority::Debug`. A threshold of `Priority::Info` admits every priority
/// `<= Priority::Info`.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u8)]
pub enum Priority {
    Emergency = 0,
    Alert = 1,
    Critical = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    #[default]
    Info = 6,
    Debug = 7,
}

impl Priority {
    /// All priorities in fixed order, most severe first.
    pub const ALL: [Priority; 8] = [
        Priority::Emergency,
        Priority::Alert,
        Priority::Critical,
        Priority::Error,
        Priority::Warning,
        Priority::Notice,
        Priority::Info,
        Priority::Debug,
    ];

    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Name as used by `journalctl --priority`.
    pub const fn name(self) -> &'static str {
        match self {
            Priority::Emergency => "emerg",
            Priority::Alert => "alert",
            Priority::Critical => "crit",
            Priority::Error => "err",
            Priority::Warning => "warning",
            Priority::Notice => "notice",
            Priority::Info => "info",
            Priority::Debug => "debug",
        }
    }

    pub const fn from_u8(value: u8) -> Option<Priority> {
        match value {
            0 => Some(Priority::Emergency),
            1 => Some(Priority::Alert),
            2 => Some(Priority::Critical),
            3 => Some(Priority::Error),
            4 => Some(Priority::Warning),
            5 => Some(Priority::Notice),
            6 => Some(Priority::Info),
            7 => Some(Priority::Debug),
            _ => None,
        }
    }
}

impl TryFrom<i64> for Priority {
    /// The rejected value.
    type Error = i64;

    fn try_from(value: i64) -> Result<Priority, i64> {
        if !(PRIORITY_MIN..=PRIORITY_MAX).contains(&value) {
            return Err(value);
        }
        Priority::from_u8(value as u8).ok_or(value)
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> u8 {
        priority.as_u8()
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Priority {
    type Err = String;

    /// Accepts `journalctl` names, a few common aliases, and digits `0`-`7`.
    fn from_str(input: &str) -> Result<Priority, Self::Err> {
        let lower = input.trim().to_ascii_lowercase();
        match lower.as_str() {
            "emerg" | "emergency" | "panic" => Ok(Priority::Emergency),
            "alert" => Ok(Priority::Alert),
            "crit" | "critical" => Ok(Priority::Critical),
            "err" | "error" => Ok(Priority::Error),
            "warning" | "warn" => Ok(Priority::Warning),
            "notice" => Ok(Priority::Notice),
            "info" => Ok(Priority::Info),
            "debug" => Ok(Priority::Debug),
            digits => match digits.parse::<i64>() {
                Ok(value) => Priority::try_from(value)
                    .map_err(|v| format!("invalid priority level: {} (must be 0-7)", v)),
                Err(_) => Err(format!("unknown priority {:?}", input)),
            },
        }
    }
}
