// src/tests/common.rs

//! Common helpers and test data for tests.
//!
//! [`MemoryJournal`] is an in-memory [`JournalStore`] with the match
//! semantics of `libsystemd`: `FIELD=value` matches of the same field are
//! OR'ed, matches of different fields are AND'ed. The `>=` and `<=`
//! comparisons built by [`JournalFilter`] are each AND'ed with everything
//! else, as [`SdJournal`] does.
//!
//! [`JournalFilter`]: crate::readers::filters::JournalFilter
//! [`SdJournal`]: crate::readers::sdjournal::SdJournal

use std::cell::Cell;
use std::collections::BTreeMap;
use std::io::{
    Error,
    ErrorKind,
    Result,
};
use std::rc::Rc;

use ::chrono::{
    DateTime,
    Local,
    TimeZone,
};
use ::lazy_static::lazy_static;

use crate::common::Count;
use crate::data::datetime::{
    datetime_to_epoch_micros,
    EpochMicrosecondsI,
};
use crate::data::journal::{
    JournalFields,
    FIELD_EXE,
    FIELD_HOSTNAME,
    FIELD_MESSAGE,
    FIELD_PRIORITY,
    FIELD_REALTIME_TIMESTAMP,
    FIELD_REALTIME_TIMESTAMP_ADDR,
    FIELD_SYSTEMD_SERVICE,
    FIELD_SYSTEMD_UNIT,
};
use crate::data::priority::Priority;
use crate::libload::systemd_dlopen2::load_library_systemd;
use crate::readers::filters::{
    parse_match_expr,
    MatchExpr,
};
use crate::readers::journalstore::JournalStore;
use crate::writers::journalsink::JournalSink;

/// Is `libsystemd` not loadable on this system? Tests needing the real
/// library return early.
pub fn systemd_not_available() -> bool {
    !load_library_systemd().is_ok()
}

lazy_static! {
    /// Fixed "now" for time window tests, 2023-04-01 12:00:00 local.
    pub static ref NOW: DateTime<Local> = match Local.with_ymd_and_hms(2023, 4, 1, 12, 0, 0) {
        chrono::LocalResult::Single(dt) => dt,
        chrono::LocalResult::Ambiguous(dt, _) => dt,
        chrono::LocalResult::None => panic!("bad NOW"),
    };
    pub static ref NOW_EM: EpochMicrosecondsI = datetime_to_epoch_micros(&*NOW);
}

/// One minute in microseconds.
pub const MINUTE_EM: EpochMicrosecondsI = 60 * 1_000_000;
/// One hour in microseconds.
pub const HOUR_EM: EpochMicrosecondsI = 60 * MINUTE_EM;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// entry builders
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Builder of the fields of one [`MemoryJournal`] entry.
#[derive(Clone, Debug, Default)]
pub struct EntryBuilder {
    fields: JournalFields,
}

impl EntryBuilder {
    pub fn new(message: &str) -> EntryBuilder {
        EntryBuilder::default().field(FIELD_MESSAGE, message)
    }

    /// An entry with no `MESSAGE` field.
    pub fn malformed() -> EntryBuilder {
        EntryBuilder::default()
    }

    pub fn field(mut self, name: &str, value: &str) -> EntryBuilder {
        self.fields.insert(name.to_string(), value.to_string());
        self
    }

    pub fn unit(self, unit: &str) -> EntryBuilder {
        self.field(FIELD_SYSTEMD_UNIT, unit)
    }

    pub fn service(self, service: &str) -> EntryBuilder {
        self.field(FIELD_SYSTEMD_SERVICE, service)
    }

    pub fn hostname(self, hostname: &str) -> EntryBuilder {
        self.field(FIELD_HOSTNAME, hostname)
    }

    pub fn exe(self, exe: &str) -> EntryBuilder {
        self.field(FIELD_EXE, exe)
    }

    pub fn priority(self, priority: Priority) -> EntryBuilder {
        self.field(FIELD_PRIORITY, &priority.as_u8().to_string())
    }

    pub fn realtime(self, em: EpochMicrosecondsI) -> EntryBuilder {
        self.field(FIELD_REALTIME_TIMESTAMP_ADDR, &em.to_string())
    }

    pub fn build(self) -> JournalFields {
        self.fields
    }
}

/// `count` entries with messages `"message 0"`, `"message 1"`, …
pub fn numbered_entries(count: usize) -> Vec<JournalFields> {
    (0..count)
        .map(|i| EntryBuilder::new(&format!("message {}", i)).build())
        .collect()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// MemoryJournal
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Call counters and fault injection shared between a test and the
/// [`MemoryJournal`] it handed to a reader.
#[derive(Debug, Default)]
pub struct MemoryJournalCalls {
    pub add_match: Cell<Count>,
    pub flush_matches: Cell<Count>,
    pub next: Cell<Count>,
    pub get_entry: Cell<Count>,
    pub get_cursor: Cell<Count>,
    pub seek: Cell<Count>,
    pub close: Cell<Count>,
    /// The next call to `next` fails with this kind.
    pub fail_next: Cell<Option<ErrorKind>>,
}

impl MemoryJournalCalls {
    /// Total calls of any store function.
    pub fn total(&self) -> Count {
        self.add_match.get()
            + self.flush_matches.get()
            + self.next.get()
            + self.get_entry.get()
            + self.get_cursor.get()
            + self.seek.get()
            + self.close.get()
    }
}

fn bump(counter: &Cell<Count>) {
    counter.set(counter.get() + 1);
}

/// Cursor token of the entry with sequence number `seqnum`.
pub fn memory_cursor(seqnum: Count) -> String {
    format!("s=mem;i={}", seqnum)
}

fn parse_memory_cursor(cursor: &str) -> Option<Count> {
    cursor.strip_prefix("s=mem;i=")?.parse::<Count>().ok()
}

/// An in-memory journal.
pub struct MemoryJournal {
    /// `(sequence number, fields)` in journal order.
    entries: Vec<(Count, JournalFields)>,
    /// `FIELD=value` match expressions by field name.
    matches: BTreeMap<String, Vec<String>>,
    /// Comparison match expressions.
    compares: Vec<String>,
    /// Index of the first entry `next` examines.
    next_idx: usize,
    /// Index of the entry at the current position.
    current: Option<usize>,
    closed: bool,
    calls: Rc<MemoryJournalCalls>,
}

impl MemoryJournal {
    pub fn new(entries: Vec<JournalFields>) -> MemoryJournal {
        MemoryJournal {
            entries: entries
                .into_iter()
                .enumerate()
                .map(|(i, fields)| (i as Count, fields))
                .collect(),
            matches: BTreeMap::new(),
            compares: Vec::new(),
            next_idx: 0,
            current: None,
            closed: false,
            calls: Rc::new(MemoryJournalCalls::default()),
        }
    }

    pub fn calls(&self) -> Rc<MemoryJournalCalls> {
        self.calls.clone()
    }

    /// Drop the `count` oldest entries, like journal retention.
    pub fn rotate(&mut self, count: usize) {
        let count = count.min(self.entries.len());
        self.entries.drain(..count);
        self.next_idx = self.next_idx.saturating_sub(count);
        self.current = match self.current {
            Some(idx) if idx >= count => Some(idx - count),
            _ => None,
        };
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn match_count(&self) -> usize {
        self.matches.values().map(Vec::len).sum::<usize>() + self.compares.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::new(ErrorKind::NotConnected, "MemoryJournal is closed"));
        }

        Ok(())
    }

    fn entry_value<'a>(fields: &'a JournalFields, name: &str) -> Option<&'a str> {
        let value = fields.get(name).map(String::as_str);
        if value.is_none() && name == FIELD_REALTIME_TIMESTAMP {
            return fields.get(FIELD_REALTIME_TIMESTAMP_ADDR).map(String::as_str);
        }

        value
    }

    fn match_holds(fields: &JournalFields, expr: &str) -> bool {
        match parse_match_expr(expr) {
            Some(MatchExpr::Equals { field, value }) => {
                MemoryJournal::entry_value(fields, field) == Some(value)
            }
            Some(MatchExpr::Compare { field, op, value }) => {
                let bound = match value.parse::<i64>() {
                    Ok(bound) => bound,
                    Err(_) => return false,
                };
                match MemoryJournal::entry_value(fields, field).map(str::parse::<i64>) {
                    Some(Ok(v)) => op.holds(&v, &bound),
                    _ => false,
                }
            }
            None => false,
        }
    }

    fn entry_matches(&self, fields: &JournalFields) -> bool {
        self.matches
            .values()
            .all(|exprs| exprs.iter().any(|expr| MemoryJournal::match_holds(fields, expr)))
            && self
                .compares
                .iter()
                .all(|expr| MemoryJournal::match_holds(fields, expr))
    }
}

impl JournalStore for MemoryJournal {
    fn add_match(&mut self, expr: &str) -> Result<()> {
        bump(&self.calls.add_match);
        self.check_open()?;
        match parse_match_expr(expr) {
            Some(MatchExpr::Equals { field, .. }) => {
                self.matches
                    .entry(field.to_string())
                    .or_default()
                    .push(expr.to_string());
            }
            Some(MatchExpr::Compare { .. }) => self.compares.push(expr.to_string()),
            None => {
                return Err(Error::new(ErrorKind::InvalidInput, format!("bad match {:?}", expr)));
            }
        }

        Ok(())
    }

    fn flush_matches(&mut self) {
        bump(&self.calls.flush_matches);
        self.matches.clear();
        self.compares.clear();
    }

    fn next(&mut self) -> Result<usize> {
        bump(&self.calls.next);
        self.check_open()?;
        if let Some(kind) = self.calls.fail_next.take() {
            return Err(Error::new(kind, "injected next failure"));
        }
        while self.next_idx < self.entries.len() {
            let idx = self.next_idx;
            self.next_idx += 1;
            if self.entry_matches(&self.entries[idx].1) {
                self.current = Some(idx);
                return Ok(1);
            }
        }

        Ok(0)
    }

    fn get_entry(&mut self) -> Result<JournalFields> {
        bump(&self.calls.get_entry);
        self.check_open()?;
        match self.current {
            Some(idx) => Ok(self.entries[idx].1.clone()),
            None => Err(Error::new(ErrorKind::AddrNotAvailable, "not positioned on an entry")),
        }
    }

    fn get_cursor(&mut self) -> Result<String> {
        bump(&self.calls.get_cursor);
        self.check_open()?;
        match self.current {
            Some(idx) => Ok(memory_cursor(self.entries[idx].0)),
            None => Err(Error::new(ErrorKind::AddrNotAvailable, "not positioned on an entry")),
        }
    }

    fn seek_head(&mut self) -> Result<()> {
        bump(&self.calls.seek);
        self.check_open()?;
        self.next_idx = 0;
        self.current = None;

        Ok(())
    }

    fn seek_tail(&mut self) -> Result<()> {
        bump(&self.calls.seek);
        self.check_open()?;
        self.next_idx = self.entries.len();
        self.current = None;

        Ok(())
    }

    fn seek_cursor(&mut self, cursor: &str) -> Result<()> {
        bump(&self.calls.seek);
        self.check_open()?;
        let seqnum: Count = parse_memory_cursor(cursor).ok_or_else(|| {
            Error::new(ErrorKind::InvalidInput, format!("bad cursor {:?}", cursor))
        })?;
        let idx: usize = self
            .entries
            .iter()
            .position(|(s, _)| *s == seqnum)
            .ok_or_else(|| Error::new(ErrorKind::AddrNotAvailable, format!("cursor {:?} rotated", cursor)))?;
        // the following `next` lands on the entry of the cursor
        self.next_idx = idx;
        self.current = None;

        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            bump(&self.calls.close);
        }
        self.closed = true;

        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RecordingSink
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One entry sent to a [`RecordingSink`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SentEntry {
    pub message: String,
    pub priority: Priority,
    pub fields: Vec<(String, String)>,
}

impl SentEntry {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A [`JournalSink`] that records what it is sent.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub sent: std::cell::RefCell<Vec<SentEntry>>,
    /// Fail every `send` with this kind.
    pub fail: Option<ErrorKind>,
}

impl RecordingSink {
    pub fn failing(kind: ErrorKind) -> RecordingSink {
        RecordingSink {
            sent: Default::default(),
            fail: Some(kind),
        }
    }

    pub fn sent(&self) -> Vec<SentEntry> {
        self.sent.borrow().clone()
    }
}

impl JournalSink for RecordingSink {
    fn send(
        &self,
        message: &str,
        priority: Priority,
        fields: &[(&str, &str)],
    ) -> Result<()> {
        if let Some(kind) = self.fail {
            return Err(Error::new(kind, "injected send failure"));
        }
        self.sent.borrow_mut().push(SentEntry {
            message: message.to_string(),
            priority,
            fields: fields
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
        });

        Ok(())
    }
}
