// src/readers/journalreader.rs

//! Implements a [`JournalReader`],
//! the driver of deriving journal entry messages from a [`JournalStore`].
//!
//! A `JournalReader` accumulates filters, tracks the cursor token of the
//! last retrieved entry, and enforces an optional retrieval limit.
//! Entries are pulled one at a time with [`retrieve`] (or
//! [`retrieve_entry`], or the [`messages`] iterator).
//!
//! ```text
//!                 seek_* / retrieve
//!  Unpositioned ─────────────────────► Positioned ◄──────────┐
//!                                       │       │            │ seek_*
//!                  retrieved >= limit   │       │ next() == 0│
//!                                       ▼       ▼            │
//!                              LimitReached   Exhausted ─────┘
//!                                  │
//!                                  └── reset_counter, seek_* ──► Positioned
//! ```
//!
//! [`retrieve`]: JournalReader::retrieve
//! [`retrieve_entry`]: JournalReader::retrieve_entry
//! [`messages`]: JournalReader::messages

use std::fmt;

use ::chrono::{
    DateTime,
    Local,
    TimeZone,
};
use ::more_asserts::debug_assert_le;
use ::si_trace_print::{
    defn,
    defo,
    defx,
    defñ,
};

use crate::common::{
    Count,
    FPath,
};
use crate::data::journal::{
    JournalEntry,
    JournalFields,
    FIELD_MESSAGE,
};
use crate::de_err;
use crate::error::{
    ReaderError,
    ReaderResult,
};
use crate::readers::filters::{
    JournalFilter,
    TimeWindow,
};
use crate::readers::journalstore::JournalStore;
use crate::readers::sdjournal::SdJournal;

/// Position of a [`JournalReader`] traversal.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ReaderState {
    /// Opened; no seek nor retrieve yet.
    #[default]
    Unpositioned,
    /// After a successful seek or retrieve.
    Positioned,
    /// The store reported no further entries.
    Exhausted,
    /// `retrieved` reached `limit`.
    LimitReached,
}

impl fmt::Display for ReaderState {
    fn fmt(
        &self,
        f: &mut fmt::Formatter,
    ) -> fmt::Result {
        match self {
            ReaderState::Unpositioned => write!(f, "unpositioned"),
            ReaderState::Positioned => write!(f, "positioned"),
            ReaderState::Exhausted => write!(f, "exhausted"),
            ReaderState::LimitReached => write!(f, "limit reached"),
        }
    }
}

/// A `JournalReader` drives a [`JournalStore`], by default a
/// `libsystemd` [`SdJournal`].
///
/// The reader owns its store exclusively. The store is released by
/// [`close`], or when the reader is dropped.
///
/// Not reentrant; callers sharing a `JournalReader` across threads must
/// synchronize access themselves. The default `SdJournal` store is neither
/// `Send` nor `Sync`.
///
/// [`close`]: JournalReader::close
pub struct JournalReader<S: JournalStore = SdJournal> {
    /// The store. `None` after `close`.
    store: Option<S>,
    /// Cursor token of the last successfully retrieved entry.
    cursor: String,
    /// Retrieval limit. `0` is unbounded.
    limit: Count,
    /// Entries successfully retrieved since the last seek or
    /// `reset_counter`.
    retrieved: Count,
    state: ReaderState,
}

impl<S: JournalStore> fmt::Debug for JournalReader<S> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter,
    ) -> fmt::Result {
        f.debug_struct("JournalReader")
            .field("closed", &self.store.is_none())
            .field("state", &self.state)
            .field("cursor", &self.cursor)
            .field("limit", &self.limit)
            .field("retrieved", &self.retrieved)
            .finish()
    }
}

impl JournalReader<SdJournal> {
    /// Open a `JournalReader` on the local journal.
    pub fn open() -> ReaderResult<JournalReader<SdJournal>> {
        defn!();
        let store: SdJournal = SdJournal::open().map_err(ReaderError::Open)?;
        defx!("{:?}", store);

        Ok(JournalReader::from_store(store))
    }

    /// Open a `JournalReader` on the given `.journal` files.
    pub fn open_files(paths: &[FPath]) -> ReaderResult<JournalReader<SdJournal>> {
        defn!("({:?})", paths);
        let store: SdJournal = SdJournal::open_files(paths).map_err(ReaderError::Open)?;
        defx!("{:?}", store);

        Ok(JournalReader::from_store(store))
    }
}

impl<S: JournalStore> JournalReader<S> {
    /// Create a `JournalReader` over an already opened store.
    pub fn from_store(store: S) -> JournalReader<S> {
        JournalReader {
            store: Some(store),
            cursor: String::new(),
            limit: 0,
            retrieved: 0,
            state: ReaderState::Unpositioned,
        }
    }

    fn store_mut(&mut self) -> ReaderResult<&mut S> {
        self.store.as_mut().ok_or(ReaderError::Closed)
    }

    /// The store, `None` after [`close`](JournalReader::close).
    pub fn store(&self) -> Option<&S> {
        self.store.as_ref()
    }

    // filters

    /// Validate `filter`, then submit its match expression to the store.
    ///
    /// A rejected match is not retried. An accepted match stays in effect
    /// until [`clear_filters`](JournalReader::clear_filters).
    pub fn apply_filter(&mut self, filter: &JournalFilter) -> ReaderResult<()> {
        defn!("({:?})", filter);
        let expr: String = match filter.match_expr() {
            Ok(expr) => expr,
            Err(err) => {
                defx!("{}", err);
                return Err(err);
            }
        };
        let store = self.store_mut()?;
        if let Err(source) = store.add_match(&expr) {
            defx!("add_match({:?}) failed {}", expr, source);
            return Err(ReaderError::Store { op: filter.op(), source });
        }
        defx!("added {:?}", expr);

        Ok(())
    }

    pub fn set_service(&mut self, name: &str) -> ReaderResult<()> {
        self.apply_filter(&JournalFilter::Service(name.to_string()))
    }

    pub fn set_unit(&mut self, name: &str) -> ReaderResult<()> {
        self.apply_filter(&JournalFilter::Unit(name.to_string()))
    }

    pub fn set_hostname(&mut self, name: &str) -> ReaderResult<()> {
        self.apply_filter(&JournalFilter::Hostname(name.to_string()))
    }

    pub fn set_executable(&mut self, path: &str) -> ReaderResult<()> {
        self.apply_filter(&JournalFilter::Executable(path.to_string()))
    }

    /// Match entries whose `MESSAGE` is exactly `text`.
    pub fn set_message_filter(&mut self, text: &str) -> ReaderResult<()> {
        self.apply_filter(&JournalFilter::Message(text.to_string()))
    }

    /// Only entries at or after `since`.
    pub fn set_since<Tz: TimeZone>(&mut self, since: &DateTime<Tz>) -> ReaderResult<()> {
        self.apply_filter(&JournalFilter::since(since))
    }

    /// Only entries at or before `until`.
    pub fn set_until<Tz: TimeZone>(&mut self, until: &DateTime<Tz>) -> ReaderResult<()> {
        self.apply_filter(&JournalFilter::until(until))
    }

    /// Only entries of `priority` or more severe (numerically lower).
    ///
    /// `priority` outside `0..=7` is rejected with
    /// [`ReaderError::InvalidPriority`] and the store is not called.
    pub fn set_priority(&mut self, priority: i64) -> ReaderResult<()> {
        self.apply_filter(&JournalFilter::Priority(priority))
    }

    /// Pass a raw match expression to the store.
    pub fn add_filter(&mut self, expr: &str) -> ReaderResult<()> {
        self.apply_filter(&JournalFilter::Raw(expr.to_string()))
    }

    /// Remove all filters. The cursor, limit, and retrieved count are kept.
    pub fn clear_filters(&mut self) {
        defñ!();
        if let Some(store) = self.store.as_mut() {
            store.flush_matches();
        }
    }

    // time windows

    /// `set_since` the start of `window` ending at `now`.
    pub fn apply_window_at(&mut self, window: TimeWindow, now: &DateTime<Local>) -> ReaderResult<()> {
        defñ!("({}, {})", window, now);
        self.set_since(&window.since(now))
    }

    /// `set_since` the start of `window` ending now.
    pub fn apply_window(&mut self, window: TimeWindow) -> ReaderResult<()> {
        self.apply_window_at(window, &Local::now())
    }

    pub fn last_hour(&mut self) -> ReaderResult<()> {
        self.apply_window(TimeWindow::LastHour)
    }

    pub fn last_hour_from(&mut self, now: &DateTime<Local>) -> ReaderResult<()> {
        self.apply_window_at(TimeWindow::LastHour, now)
    }

    pub fn last_day(&mut self) -> ReaderResult<()> {
        self.apply_window(TimeWindow::LastDay)
    }

    pub fn last_day_from(&mut self, now: &DateTime<Local>) -> ReaderResult<()> {
        self.apply_window_at(TimeWindow::LastDay, now)
    }

    pub fn last_week(&mut self) -> ReaderResult<()> {
        self.apply_window(TimeWindow::LastWeek)
    }

    pub fn last_week_from(&mut self, now: &DateTime<Local>) -> ReaderResult<()> {
        self.apply_window_at(TimeWindow::LastWeek, now)
    }

    /// Since local midnight.
    pub fn today(&mut self) -> ReaderResult<()> {
        self.apply_window(TimeWindow::Today)
    }

    pub fn today_from(&mut self, now: &DateTime<Local>) -> ReaderResult<()> {
        self.apply_window_at(TimeWindow::Today, now)
    }

    // seeking

    /// Common handling of a seek result. Only a successful seek resets
    /// `retrieved`.
    fn seeked(&mut self, result: std::io::Result<()>, op: &'static str) -> ReaderResult<()> {
        match result {
            Ok(()) => {
                self.retrieved = 0;
                self.state = ReaderState::Positioned;
                defo!("{}; state {}", op, self.state);

                Ok(())
            }
            Err(source) => {
                defo!("{} failed {}", op, source);

                Err(ReaderError::Store { op, source })
            }
        }
    }

    /// Position before the first entry of the journal.
    pub fn seek_head(&mut self) -> ReaderResult<()> {
        defn!();
        let result = self.store_mut()?.seek_head();
        let result = self.seeked(result, "seek head");
        defx!("{:?}", result);

        result
    }

    /// Position after the last entry of the journal.
    pub fn seek_tail(&mut self) -> ReaderResult<()> {
        defn!();
        let result = self.store_mut()?.seek_tail();
        let result = self.seeked(result, "seek tail");
        defx!("{:?}", result);

        result
    }

    /// Position at a cursor token from an earlier [`cursor`] or
    /// [`get_cursor`].
    ///
    /// A token that journal retention has rotated past is rejected by the
    /// store; `retrieved` is left unchanged.
    ///
    /// [`cursor`]: JournalReader::cursor
    /// [`get_cursor`]: JournalReader::get_cursor
    pub fn seek_cursor(&mut self, cursor: &str) -> ReaderResult<()> {
        defn!("({:?})", cursor);
        let result = self.store_mut()?.seek_cursor(cursor);
        let result = self.seeked(result, "seek cursor");
        defx!("{:?}", result);

        result
    }

    // cursor

    /// The store's current cursor token, whether or not an entry was
    /// retrieved through this reader.
    pub fn get_cursor(&mut self) -> ReaderResult<String> {
        self.store_mut()?
            .get_cursor()
            .map_err(|source| ReaderError::Store { op: "get cursor", source })
    }

    /// Cursor token of the last successfully retrieved entry, `""` if none.
    pub fn cursor(&self) -> &str {
        self.cursor.as_str()
    }

    // retrieval

    /// Advance to the next entry and return it.
    ///
    /// 1. `limit > 0 && retrieved >= limit` fails with
    ///    [`ReaderError::LimitReached`]; the store is not called.
    /// 2. The store advances. No entry fails with [`ReaderError::Exhausted`].
    /// 3. The entry is read. No `MESSAGE` field fails with
    ///    [`ReaderError::MalformedEntry`]. The store position stays on that
    ///    entry; the next call moves past it.
    /// 4. The cursor token is captured and `retrieved` is incremented.
    ///
    /// Never waits for new entries.
    pub fn retrieve_entry(&mut self) -> ReaderResult<JournalEntry> {
        defn!();
        if self.limit > 0 && self.retrieved >= self.limit {
            self.state = ReaderState::LimitReached;
            defx!("limit {} reached", self.limit);
            return Err(ReaderError::LimitReached(self.limit));
        }
        let store = self.store_mut()?;
        let advanced: usize = store
            .next()
            .map_err(|source| ReaderError::Store { op: "advance to next entry", source })?;
        if advanced == 0 {
            self.state = ReaderState::Exhausted;
            defx!("exhausted");
            return Err(ReaderError::Exhausted);
        }
        let fields: JournalFields = store
            .get_entry()
            .map_err(|source| ReaderError::Store { op: "read entry", source })?;
        if !fields.contains_key(FIELD_MESSAGE) {
            self.state = ReaderState::Positioned;
            defx!("no {} field among {} fields", FIELD_MESSAGE, fields.len());
            return Err(ReaderError::MalformedEntry);
        }
        let cursor: String = store
            .get_cursor()
            .map_err(|source| ReaderError::Store { op: "get cursor", source })?;
        self.cursor = cursor.clone();
        self.retrieved += 1;
        self.state = ReaderState::Positioned;
        if self.limit > 0 {
            debug_assert_le!(self.retrieved, self.limit, "retrieved more than limit");
        }
        defx!("retrieved {}, cursor {:?}", self.retrieved, self.cursor);

        Ok(JournalEntry::new(fields, cursor))
    }

    /// Advance to the next entry and return its `MESSAGE`.
    ///
    /// See [`retrieve_entry`](JournalReader::retrieve_entry).
    pub fn retrieve(&mut self) -> ReaderResult<String> {
        let entry: JournalEntry = self.retrieve_entry()?;
        match entry.into_message() {
            Some(message) => Ok(message),
            None => {
                de_err!("retrieved entry lost its {} field", FIELD_MESSAGE);
                Err(ReaderError::MalformedEntry)
            }
        }
    }

    /// Iterate [`retrieve`] results.
    ///
    /// Ends at `Exhausted` or `LimitReached`, neither of which is yielded.
    /// A `MalformedEntry` is yielded and iteration continues with the next
    /// entry. Any other error is yielded once and ends iteration.
    ///
    /// [`retrieve`]: JournalReader::retrieve
    pub fn messages(&mut self) -> Messages<'_, S> {
        Messages {
            reader: self,
            done: false,
        }
    }

    // counters

    /// Set `retrieved` to 0. The store position and cursor are kept, so
    /// a raised limit continues where the traversal stopped.
    pub fn reset_counter(&mut self) {
        defñ!("retrieved {} → 0", self.retrieved);
        self.retrieved = 0;
        if self.state == ReaderState::LimitReached {
            self.state = ReaderState::Positioned;
        }
    }

    /// Set the retrieval limit; `0` is unbounded. Checked at the next
    /// retrieval.
    ///
    /// Negative values are clamped to `0`. Note this differs from
    /// [`set_priority`](JournalReader::set_priority) which rejects values
    /// out of range.
    pub fn set_limit(&mut self, limit: i64) {
        self.limit = Count::try_from(limit).unwrap_or(0);
        defñ!("({}) limit {}", limit, self.limit);
    }

    pub const fn limit(&self) -> Count {
        self.limit
    }

    pub const fn retrieved(&self) -> Count {
        self.retrieved
    }

    pub const fn state(&self) -> ReaderState {
        self.state
    }

    // closing

    /// Release the store. Later calls are no-ops.
    pub fn close(&mut self) {
        defn!();
        if let Some(mut store) = self.store.take() {
            if let Err(_err) = store.close() {
                de_err!("close failed {}", _err);
            }
        }
        defx!();
    }

    pub const fn is_closed(&self) -> bool {
        self.store.is_none()
    }
}

impl<S: JournalStore> Drop for JournalReader<S> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Iterator returned by [`JournalReader::messages`].
pub struct Messages<'r, S: JournalStore> {
    reader: &'r mut JournalReader<S>,
    done: bool,
}

impl<'r, S: JournalStore> Iterator for Messages<'r, S> {
    type Item = ReaderResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.retrieve() {
            Ok(message) => Some(Ok(message)),
            Err(err) if err.is_end_of_traversal() => {
                defo!("{}", err);
                self.done = true;
                None
            }
            Err(ReaderError::MalformedEntry) => Some(Err(ReaderError::MalformedEntry)),
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

