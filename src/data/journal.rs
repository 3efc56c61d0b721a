// src/data/journal.rs

//! Data representation of systemd journal entries and their fields.
//!
//! For reference, one entry as printed by
//! `journalctl --output=export` (abbreviated):
//!
//! ```text
//! __CURSOR=s=e992f143877046059b264a0f907056b6;i=6ff;b=26d74a46deff4872be6d4ca6e885a198;m=46c65ea;t=5f840a88a4b39;x=e7933c3b47482d45
//! __REALTIME_TIMESTAMP=1680331472784185
//! _SYSTEMD_UNIT=user@1000.service
//! _HOSTNAME=ubuntu22Acorn
//! PRIORITY=4
//! _PID=1306
//! _EXE=/usr/bin/gnome-shell
//! SYSLOG_IDENTIFIER=ubuntu-appindicators@ubuntu.com
//! CODE_FILE=/usr/share/gnome-shell/extensions/ubuntu-appindicators@ubuntu.com/appIndicator.js
//! CODE_LINE=738
//! CODE_FUNC=_setGicon
//! MESSAGE=unable to update icon for livepatch
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use ::bstr::ByteSlice; // attaches `find_byte` to `&[u8]`
use ::chrono::{
    DateTime,
    Local,
};

use crate::data::datetime::{
    EpochMicrosecondsI,
    Result_Filter_DateTime2,
};
use crate::data::priority::Priority;

/// Microseconds since the Unix epoch as stored by the journal.
pub type EpochMicroseconds = u64;
pub type EpochMicrosecondsOpt = Option<EpochMicroseconds>;

/// All fields of one journal entry, keyed by field name.
pub type JournalFields = BTreeMap<String, String>;

pub const FIELD_MESSAGE: &str = "MESSAGE";
pub const FIELD_PRIORITY: &str = "PRIORITY";
pub const FIELD_CODE_FILE: &str = "CODE_FILE";
pub const FIELD_CODE_LINE: &str = "CODE_LINE";
pub const FIELD_CODE_FUNC: &str = "CODE_FUNC";
pub const FIELD_SYSTEMD_SERVICE: &str = "__SYSTEMD_SERVICE";
pub const FIELD_SYSTEMD_UNIT: &str = "_SYSTEMD_UNIT";
pub const FIELD_HOSTNAME: &str = "_HOSTNAME";
pub const FIELD_EXE: &str = "_EXE";
pub const FIELD_PID: &str = "_PID";
pub const FIELD_SYSLOG_IDENTIFIER: &str = "SYSLOG_IDENTIFIER";
/// Field name used in realtime window match expressions.
pub const FIELD_REALTIME_TIMESTAMP: &str = "_REALTIME_TIMESTAMP";
/// Address field holding the entry's realtime, as written by
/// `journalctl --output=export`.
pub const FIELD_REALTIME_TIMESTAMP_ADDR: &str = "__REALTIME_TIMESTAMP";
pub const FIELD_SOURCE_REALTIME_TIMESTAMP: &str = "_SOURCE_REALTIME_TIMESTAMP";
pub const FIELD_CURSOR: &str = "__CURSOR";

/// Separator between field name and value in raw field data.
pub const FIELD_MID_U8: u8 = b'=';

/// Split raw field data `NAME=value` into `(NAME, value)`.
///
/// Returns `None` if there is no `=` or the name is empty.
pub fn split_field_data(data: &[u8]) -> Option<(&[u8], &[u8])> {
    let at: usize = data.find_byte(FIELD_MID_U8)?;
    if at == 0 {
        return None;
    }

    Some((&data[..at], &data[at + 1..]))
}

/// Insert raw field data `NAME=value` into `fields`. Non-UTF-8 bytes are
/// replaced lossily. Returns `false` if the data was not a field.
pub fn insert_field_data(fields: &mut JournalFields, data: &[u8]) -> bool {
    match split_field_data(data) {
        Some((name, value)) => {
            fields.insert(
                String::from_utf8_lossy(name).into_owned(),
                String::from_utf8_lossy(value).into_owned(),
            );
            true
        }
        None => false,
    }
}

/// How does the passed `em` pass the optional filters `em_filter_after`
/// and `em_filter_before`? Is `em` before ([`BeforeRange`]),
/// after ([`AfterRange`]), or in between ([`InRange`])?
///
/// Both filters are inclusive.
///
/// [`AfterRange`]: crate::data::datetime::Result_Filter_DateTime2::AfterRange
/// [`BeforeRange`]: crate::data::datetime::Result_Filter_DateTime2::BeforeRange
/// [`InRange`]: crate::data::datetime::Result_Filter_DateTime2::InRange
pub fn em_pass_filters(
    em: EpochMicrosecondsI,
    em_filter_after: Option<EpochMicrosecondsI>,
    em_filter_before: Option<EpochMicrosecondsI>,
) -> Result_Filter_DateTime2 {
    if let Some(em_a) = em_filter_after {
        if em < em_a {
            return Result_Filter_DateTime2::BeforeRange;
        }
    }
    if let Some(em_b) = em_filter_before {
        if em_b < em {
            return Result_Filter_DateTime2::AfterRange;
        }
    }

    Result_Filter_DateTime2::InRange
}

/// One journal entry: its fields and the cursor token of its position.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct JournalEntry {
    fields: JournalFields,
    cursor: String,
}

impl JournalEntry {
    pub fn new(fields: JournalFields, cursor: String) -> JournalEntry {
        JournalEntry { fields, cursor }
    }

    pub fn fields(&self) -> &JournalFields {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn cursor(&self) -> &str {
        self.cursor.as_str()
    }

    /// The `MESSAGE` payload.
    pub fn message(&self) -> Option<&str> {
        self.field(FIELD_MESSAGE)
    }

    /// Consume `self`, returning the `MESSAGE` payload.
    pub fn into_message(mut self) -> Option<String> {
        self.fields.remove(FIELD_MESSAGE)
    }

    /// The `PRIORITY` field, if present and valid.
    pub fn priority(&self) -> Option<Priority> {
        let value: i64 = self.field(FIELD_PRIORITY)?.parse::<i64>().ok()?;

        Priority::try_from(value).ok()
    }

    /// Prefer `__REALTIME_TIMESTAMP` (when the journal received the entry),
    /// falling back to `_SOURCE_REALTIME_TIMESTAMP`.
    pub fn realtime_timestamp(&self) -> EpochMicrosecondsOpt {
        [FIELD_REALTIME_TIMESTAMP_ADDR, FIELD_SOURCE_REALTIME_TIMESTAMP]
            .iter()
            .filter_map(|name| self.field(name))
            .find_map(|value| EpochMicroseconds::from_str(value).ok())
    }

    /// The realtime timestamp as a local `DateTime`.
    pub fn datetime(&self) -> Option<DateTime<Local>> {
        let em = i64::try_from(self.realtime_timestamp()?).ok()?;

        DateTime::from_timestamp_micros(em).map(|dt| dt.with_timezone(&Local))
    }

    /// Write the entry like `journalctl --output=export`: `__CURSOR` first,
    /// then every field as `NAME=value` on its own line.
    pub fn to_export_string(&self) -> String {
        let mut s = String::with_capacity(self.cursor.len() + self.fields.len() * 32);
        if !self.cursor.is_empty() {
            s.push_str(FIELD_CURSOR);
            s.push('=');
            s.push_str(&self.cursor);
            s.push('\n');
        }
        for (name, value) in self.fields.iter() {
            s.push_str(name);
            s.push('=');
            s.push_str(value);
            s.push('\n');
        }

        s
    }

    /// Write the entry like `journalctl --output=short`:
    /// `Apr 01 06:44:32 host ident[pid]: message`
    pub fn to_short_string(&self) -> String {
        let dt: String = match self.datetime() {
            Some(dt) => dt.format("%b %d %H:%M:%S").to_string(),
            None => String::from("-"),
        };
        let host: &str = self.field(FIELD_HOSTNAME).unwrap_or("-");
        let ident: &str = self
            .field(FIELD_SYSLOG_IDENTIFIER)
            .or_else(|| self.field("_COMM"))
            .unwrap_or("-");
        let message: &str = self.message().unwrap_or("");
        match self.field(FIELD_PID) {
            Some(pid) => format!("{} {} {}[{}]: {}", dt, host, ident, pid, message),
            None => format!("{} {} {}: {}", dt, host, ident, message),
        }
    }
}

impl fmt::Debug for JournalEntry {
    fn fmt(
        &self,
        f: &mut fmt::Formatter,
    ) -> fmt::Result {
        f.debug_struct("JournalEntry")
            .field("cursor", &self.cursor)
            .field("fields", &self.fields.len())
            .field("MESSAGE", &self.message())
            .finish()
    }
}

/// `journalctl` output formats supported when printing a [`JournalEntry`].
///
/// Snippet from `journalctl --help` output from `systemd 249`:
/// ```text
///   -o --output=STRING   Change journal output mode (short, short-precise,
///                        short-iso, short-iso-precise, short-full,
///                        short-monotonic, short-unix, verbose, export,
///                        json, json-pretty, json-sse, json-seq, cat,
///                        with-unit)
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ::clap::ValueEnum)]
pub enum JournalOutput {
    #[default]
    Short,
    Export,
    Cat,
}

/// Should match options shown in `journalctl --help`
impl fmt::Display for JournalOutput {
    fn fmt(
        &self,
        f: &mut fmt::Formatter,
    ) -> fmt::Result {
        match self {
            JournalOutput::Short => write!(f, "short"),
            JournalOutput::Export => write!(f, "export"),
            JournalOutput::Cat => write!(f, "cat"),
        }
    }
}

impl JournalEntry {
    /// Write the entry in the `output` format. `Export` ends with an empty
    /// line separating entries; the others end without a newline.
    pub fn to_output_string(&self, output: JournalOutput) -> String {
        match output {
            JournalOutput::Short => self.to_short_string(),
            JournalOutput::Export => self.to_export_string(),
            JournalOutput::Cat => self.message().unwrap_or("").to_string(),
        }
    }
}
