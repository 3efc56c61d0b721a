// src/writers/jourlog.rs

//! Implements [`JourLog`], a leveled logger writing to the journal.
//!
//! Every record carries the provenance of its call site as the journal
//! fields `CODE_FILE`, `CODE_LINE`, and `CODE_FUNC`. The provenance is
//! captured at compile time by the [`provenance!`] macro, so callers use the
//! logging macros:
//!
//! ```rust,no_run
//! use jourlog::{jinfo, jerr};
//! use jourlog::writers::jourlog::JourLog;
//!
//! let logger = JourLog::new().unwrap();
//! jinfo!(logger, "service started on port {}", 8080).unwrap();
//! jerr!(logger, fields = &[("REQUEST_ID", "42")], "request failed").unwrap();
//! ```
//!
//! A `JourLog` is an ordinary value; construct one and pass it to whatever
//! needs to log.

use std::fmt;
use std::io::Result;

use ::si_trace_print::{
    defn,
    defx,
    defñ,
};

use crate::data::journal::{
    FIELD_CODE_FILE,
    FIELD_CODE_FUNC,
    FIELD_CODE_LINE,
};
use crate::data::priority::Priority;
use crate::de_err;
use crate::writers::journalsink::{
    JournalSink,
    SdJournalSink,
};

/// Source location of a log call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Provenance {
    pub file: &'static str,
    pub line: u32,
    /// The module path of the call site.
    pub func: &'static str,
}

impl Provenance {
    pub const fn new(file: &'static str, line: u32, func: &'static str) -> Provenance {
        Provenance { file, line, func }
    }
}

impl fmt::Display for Provenance {
    fn fmt(
        &self,
        f: &mut fmt::Formatter,
    ) -> fmt::Result {
        write!(f, "{}:{} ({})", self.file, self.line, self.func)
    }
}

/// The [`Provenance`] of the macro call site.
#[macro_export]
macro_rules! provenance {
    () => {
        $crate::writers::jourlog::Provenance::new(file!(), line!(), module_path!())
    };
}
pub use provenance;

/// Log at `priority` with the call site's provenance.
///
/// `jlog!(logger, priority, "format", args..)` or
/// `jlog!(logger, priority, fields = &[("KEY", "value")], "format", args..)`
#[macro_export]
macro_rules! jlog {
    ($logger:expr, $priority:expr, fields = $fields:expr, $($arg:tt)+) => {
        $logger.log($priority, &$crate::provenance!(), $fields, format_args!($($arg)+))
    };
    ($logger:expr, $priority:expr, $($arg:tt)+) => {
        $logger.log($priority, &$crate::provenance!(), &[], format_args!($($arg)+))
    };
}
pub use jlog;

#[macro_export]
macro_rules! jemerg {
    ($logger:expr, $($arg:tt)+) => {
        $crate::jlog!($logger, $crate::data::priority::Priority::Emergency, $($arg)+)
    };
}
pub use jemerg;

#[macro_export]
macro_rules! jalert {
    ($logger:expr, $($arg:tt)+) => {
        $crate::jlog!($logger, $crate::data::priority::Priority::Alert, $($arg)+)
    };
}
pub use jalert;

#[macro_export]
macro_rules! jcrit {
    ($logger:expr, $($arg:tt)+) => {
        $crate::jlog!($logger, $crate::data::priority::Priority::Critical, $($arg)+)
    };
}
pub use jcrit;

#[macro_export]
macro_rules! jerr {
    ($logger:expr, $($arg:tt)+) => {
        $crate::jlog!($logger, $crate::data::priority::Priority::Error, $($arg)+)
    };
}
pub use jerr;

#[macro_export]
macro_rules! jwarn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::jlog!($logger, $crate::data::priority::Priority::Warning, $($arg)+)
    };
}
pub use jwarn;

#[macro_export]
macro_rules! jnotice {
    ($logger:expr, $($arg:tt)+) => {
        $crate::jlog!($logger, $crate::data::priority::Priority::Notice, $($arg)+)
    };
}
pub use jnotice;

#[macro_export]
macro_rules! jinfo {
    ($logger:expr, $($arg:tt)+) => {
        $crate::jlog!($logger, $crate::data::priority::Priority::Info, $($arg)+)
    };
}
pub use jinfo;

#[macro_export]
macro_rules! jdebug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::jlog!($logger, $crate::data::priority::Priority::Debug, $($arg)+)
    };
}
pub use jdebug;

/// Leveled logger over a [`JournalSink`].
///
/// A record is sent if its priority is at or more severe than the
/// threshold; the default threshold is [`Priority::Info`].
pub struct JourLog<K: JournalSink = SdJournalSink> {
    level: Priority,
    sink: K,
}

impl<K: JournalSink> fmt::Debug for JourLog<K> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter,
    ) -> fmt::Result {
        f.debug_struct("JourLog")
            .field("level", &self.level)
            .finish()
    }
}

impl JourLog<SdJournalSink> {
    /// A `JourLog` writing to the local journal through `libsystemd`.
    pub fn new() -> Result<JourLog<SdJournalSink>> {
        Ok(JourLog::with_sink(SdJournalSink::new()?))
    }
}

impl<K: JournalSink> JourLog<K> {
    pub fn with_sink(sink: K) -> JourLog<K> {
        JourLog {
            level: Priority::default(),
            sink,
        }
    }

    pub fn set_log_level(&mut self, level: Priority) {
        defñ!("({})", level);
        self.level = level;
    }

    pub const fn log_level(&self) -> Priority {
        self.level
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Would a record at `priority` be sent?
    pub fn enabled(&self, priority: Priority) -> bool {
        priority <= self.level
    }

    /// Send one record.
    ///
    /// Returns `Ok(false)` if `priority` is below the threshold and nothing
    /// was sent. The fields sent are `MESSAGE`, `PRIORITY`, `CODE_FILE`,
    /// `CODE_LINE`, `CODE_FUNC`, then `fields` in order.
    pub fn log(
        &self,
        priority: Priority,
        provenance: &Provenance,
        fields: &[(&str, &str)],
        args: fmt::Arguments<'_>,
    ) -> Result<bool> {
        if !self.enabled(priority) {
            defñ!("{} below {}", priority, self.level);
            return Ok(false);
        }
        defn!("({}, {})", priority, provenance);
        let message: String = fmt::format(args);
        let line: String = provenance.line.to_string();
        let mut vars: Vec<(&str, &str)> = Vec::with_capacity(fields.len() + 3);
        vars.push((FIELD_CODE_FILE, provenance.file));
        vars.push((FIELD_CODE_LINE, line.as_str()));
        vars.push((FIELD_CODE_FUNC, provenance.func));
        vars.extend_from_slice(fields);
        if let Err(err) = self.sink.send(&message, priority, &vars) {
            de_err!("failed to log to journal: {}", err);
            defx!("{}", err);
            return Err(err);
        }
        defx!();

        Ok(true)
    }

    pub fn emerg(&self, provenance: &Provenance, fields: &[(&str, &str)], args: fmt::Arguments<'_>) -> Result<bool> {
        self.log(Priority::Emergency, provenance, fields, args)
    }

    pub fn alert(&self, provenance: &Provenance, fields: &[(&str, &str)], args: fmt::Arguments<'_>) -> Result<bool> {
        self.log(Priority::Alert, provenance, fields, args)
    }

    pub fn crit(&self, provenance: &Provenance, fields: &[(&str, &str)], args: fmt::Arguments<'_>) -> Result<bool> {
        self.log(Priority::Critical, provenance, fields, args)
    }

    pub fn error(&self, provenance: &Provenance, fields: &[(&str, &str)], args: fmt::Arguments<'_>) -> Result<bool> {
        self.log(Priority::Error, provenance, fields, args)
    }

    pub fn warning(&self, provenance: &Provenance, fields: &[(&str, &str)], args: fmt::Arguments<'_>) -> Result<bool> {
        self.log(Priority::Warning, provenance, fields, args)
    }

    pub fn notice(&self, provenance: &Provenance, fields: &[(&str, &str)], args: fmt::Arguments<'_>) -> Result<bool> {
        self.log(Priority::Notice, provenance, fields, args)
    }

    pub fn info(&self, provenance: &Provenance, fields: &[(&str, &str)], args: fmt::Arguments<'_>) -> Result<bool> {
        self.log(Priority::Info, provenance, fields, args)
    }

    pub fn debug(&self, provenance: &Provenance, fields: &[(&str, &str)], args: fmt::Arguments<'_>) -> Result<bool> {
        self.log(Priority::Debug, provenance, fields, args)
    }
}
