// src/readers/sdjournal.rs

//! Implements [`SdJournal`], the [`JournalStore`] backed by a dynamically
//! loaded [`libsystemd`].
//!
//! ### Comparison matches
//!
//! `sd_journal_add_match` only understands `FIELD=value`. Two comparison
//! forms produced by [`JournalFilter`] are mapped onto what `libsystemd`
//! can do:
//!
//! - `PRIORITY>=n` and `PRIORITY<=n` become a priority range checked with
//!   `sd_journal_get_data` while advancing. `libsystemd` OR's matches on
//!   the same field, so `PRIORITY=0` … `PRIORITY=n` would widen rather
//!   than narrow a second priority filter. An entry without a valid
//!   `PRIORITY` is outside any range.
//! - `_REALTIME_TIMESTAMP>=µs` and `_REALTIME_TIMESTAMP<=µs` become a
//!   realtime window checked with `sd_journal_get_realtime_usec` while
//!   advancing.
//!
//! Repeated bounds AND together; the tightest wins. Entries outside the
//! range or window are stepped over inside [`next`], so callers only ever
//! see matching entries.
//!
//! Any other comparison is handed to `sd_journal_add_match` verbatim, which
//! rejects it.
//!
//! [`libsystemd`]: https://github.com/systemd/systemd/blob/v249/src/libsystemd/libsystemd.sym
//! [`JournalStore`]: crate::readers::journalstore::JournalStore
//! [`JournalFilter`]: crate::readers::filters::JournalFilter
//! [`next`]: crate::readers::journalstore::JournalStore::next

use std::ffi::{
    CStr,
    CString,
};
use std::fmt;
use std::io::{
    Error,
    ErrorKind,
    Result,
};
use std::mem;

use ::si_trace_print::{
    def1n,
    def1o,
    def1x,
    defn,
    defo,
    defx,
    defñ,
};

use crate::bindings::sd_journal_h::{
    sd_journal,
    size_t,
    SD_JOURNAL_LOCAL_ONLY,
};
use crate::common::{
    Bytes,
    Count,
    FPath,
    ResultFind,
};
use crate::data::datetime::{
    EpochMicrosecondsI,
    Result_Filter_DateTime2,
};
use crate::data::journal::{
    em_pass_filters,
    insert_field_data,
    EpochMicroseconds,
    JournalFields,
    FIELD_PRIORITY,
    FIELD_REALTIME_TIMESTAMP,
    FIELD_REALTIME_TIMESTAMP_ADDR,
};
use crate::data::priority::{
    PRIORITY_MAX,
    PRIORITY_MIN,
};
use crate::de_err;
use crate::debug::printers::buffer_to_String_noraw;
use crate::libload::systemd_dlopen2::{
    journal_api,
    load_library_systemd,
    JournalApiPtr,
    LoadLibraryError,
    LIB_NAME_SYSTEMD,
};
use crate::readers::filters::{
    parse_match_expr,
    CompareOp,
    MatchExpr,
};
use crate::readers::journalstore::{
    Errno,
    Error_from_Errno,
    JournalStore,
};

/// Description of the journal opened by [`SdJournal::open`], used in
/// error messages.
pub const SOURCE_LOCAL_JOURNAL: &str = "local journal";

/// [`FIELD_PRIORITY`] as a C string.
const FIELD_PRIORITY_NUL: &[u8] = b"PRIORITY\0";

/// A `libsystemd` `sd_journal` handle.
///
/// Not `Send` nor `Sync`; `sd_journal` handles may not be shared across
/// threads.
pub struct SdJournal {
    /// The [`sd_journal`] handle allocated by `libsystemd`.
    /// Null after [`close`](JournalStore::close).
    journal_handle_ptr: *mut sd_journal,
    /// The [`JournalApiPtr`] dynamic library interface.
    journal_api_ptr: JournalApiPtr,
    /// Lower bound of the realtime window, inclusive.
    realtime_after: Option<EpochMicrosecondsI>,
    /// Upper bound of the realtime window, inclusive.
    realtime_before: Option<EpochMicrosecondsI>,
    /// Lowest allowed `PRIORITY` value, inclusive.
    priority_low: Option<i64>,
    /// Highest allowed `PRIORITY` value, inclusive.
    priority_high: Option<i64>,
    /// What was opened, for error messages.
    source: FPath,
    /// Number of systemd API calls (calls using `journal_api_ptr`).
    api_calls: Count,
    /// Number of systemd API calls that returned an error.
    api_call_errors: Count,
}

impl fmt::Debug for SdJournal {
    fn fmt(
        &self,
        f: &mut fmt::Formatter,
    ) -> fmt::Result {
        f.debug_struct("SdJournal")
            .field("source", &self.source)
            .field("handle", &self.journal_handle_ptr)
            .field("realtime_after", &self.realtime_after)
            .field("realtime_before", &self.realtime_before)
            .field("priority_low", &self.priority_low)
            .field("priority_high", &self.priority_high)
            .field("api_calls", &self.api_calls)
            .field("api_call_errors", &self.api_call_errors)
            .finish()
    }
}

/// Load `libsystemd` if not yet loaded and return the interface.
fn loaded_journal_api() -> Result<JournalApiPtr> {
    match load_library_systemd() {
        LoadLibraryError::Ok => {}
        LoadLibraryError::Err(err) => {
            return Err(Error::new(
                ErrorKind::NotFound,
                format!("failed to load {}; {}", LIB_NAME_SYSTEMD, err),
            ));
        }
        LoadLibraryError::PrevErr => {
            return Err(Error::new(
                ErrorKind::NotFound,
                format!("failed to load {} (previous attempt failed)", LIB_NAME_SYSTEMD),
            ));
        }
    }
    journal_api().ok_or_else(|| {
        Error::new(ErrorKind::NotFound, format!("{} interface not available", LIB_NAME_SYSTEMD))
    })
}

impl SdJournal {
    /// Open the local journal (`SD_JOURNAL_LOCAL_ONLY`), all journal files
    /// of this machine that the user may read.
    pub fn open() -> Result<SdJournal> {
        defn!();
        let journal_api_ptr = loaded_journal_api()?;
        let mut journal_handle_ptr: *mut sd_journal = std::ptr::null_mut();
        unsafe {
            //
            // call sd_journal_open
            //
            defo!("sd_journal_open(@{:?}, SD_JOURNAL_LOCAL_ONLY)", journal_handle_ptr);
            let r: i32 = (*journal_api_ptr).sd_journal_open(&mut journal_handle_ptr, SD_JOURNAL_LOCAL_ONLY);
            defo!("sd_journal_open returned {}", r);
            if r < 0 {
                let err = Error_from_Errno(r, "sd_journal_open", SOURCE_LOCAL_JOURNAL);
                defx!("return {:?}", err);
                return Err(err);
            }
        }
        defx!("return Ok(SdJournal)");

        Ok(SdJournal::new(journal_handle_ptr, journal_api_ptr, FPath::from(SOURCE_LOCAL_JOURNAL)))
    }

    /// Open the given `.journal` files.
    pub fn open_files(paths: &[FPath]) -> Result<SdJournal> {
        defn!("({:?})", paths);
        if paths.is_empty() {
            defx!("no paths");
            return Err(Error::new(ErrorKind::InvalidInput, "no journal file paths"));
        }
        let mut paths_cs: Vec<CString> = Vec::with_capacity(paths.len());
        for path in paths.iter() {
            match CString::new(path.as_str()) {
                Ok(cs) => paths_cs.push(cs),
                Err(err) => {
                    defx!("CString::new({:?}) failed {}", path, err);
                    return Err(Error::new(ErrorKind::InvalidInput, format!("bad path {:?}; {}", path, err)));
                }
            }
        }
        let source: FPath = paths.join(" ");
        let journal_api_ptr = loaded_journal_api()?;
        let mut journal_handle_ptr: *mut sd_journal = std::ptr::null_mut();
        // null-terminated array of C strings
        let mut ppaths: Vec<*const ::std::os::raw::c_char> = paths_cs
            .iter()
            .map(|cs| cs.as_ptr())
            .collect();
        ppaths.push(std::ptr::null());
        unsafe {
            //
            // call sd_journal_open_files
            //
            defo!("sd_journal_open_files(@{:?}, {:?}, 0)", journal_handle_ptr, paths_cs);
            let r: i32 = (*journal_api_ptr).sd_journal_open_files(
                &mut journal_handle_ptr,
                ppaths.as_mut_ptr(),
                0,
            );
            defo!("sd_journal_open_files returned {}", r);
            if r < 0 {
                let err = Error_from_Errno(r, "sd_journal_open_files", &source);
                defx!("return {:?}", err);
                return Err(err);
            }
        }
        defx!("return Ok(SdJournal)");

        Ok(SdJournal::new(journal_handle_ptr, journal_api_ptr, source))
    }

    fn new(
        journal_handle_ptr: *mut sd_journal,
        journal_api_ptr: JournalApiPtr,
        source: FPath,
    ) -> SdJournal {
        SdJournal {
            journal_handle_ptr,
            journal_api_ptr,
            realtime_after: None,
            realtime_before: None,
            priority_low: None,
            priority_high: None,
            source,
            api_calls: 1,
            api_call_errors: 0,
        }
    }

    /// Number of `libsystemd` API calls made through this handle.
    pub const fn api_calls(&self) -> Count {
        self.api_calls
    }

    /// Number of `libsystemd` API calls that returned an error.
    pub const fn api_call_errors(&self) -> Count {
        self.api_call_errors
    }

    pub fn source(&self) -> &FPath {
        &self.source
    }

    /// Lower and upper bounds of the realtime window.
    pub const fn realtime_window(&self) -> (Option<EpochMicrosecondsI>, Option<EpochMicrosecondsI>) {
        (self.realtime_after, self.realtime_before)
    }

    /// Lower and upper bounds of the allowed `PRIORITY` values.
    pub const fn priority_range(&self) -> (Option<i64>, Option<i64>) {
        (self.priority_low, self.priority_high)
    }

    /// Every call requires an open handle.
    fn check_open(&self, funcname: &str) -> Result<()> {
        if self.journal_handle_ptr.is_null() {
            return Err(Error::new(
                ErrorKind::NotConnected,
                format!("{} on closed journal ({})", funcname, self.source),
            ));
        }

        Ok(())
    }

    /// Turn a negative return value into an `Error`, counting it.
    fn check_return(&mut self, r: i32, funcname: &str) -> Result<i32> {
        self.api_calls += 1;
        if r < 0 {
            self.api_call_errors += 1;
            let err = Error_from_Errno(r, funcname, &self.source);
            def1o!("{}", err);
            return Err(err);
        }

        Ok(r)
    }

    /// Wrapper to call `sd_journal_add_match` with one `FIELD=value`.
    fn call_sd_journal_add_match(&mut self, expr: &str) -> Result<()> {
        self.check_open("sd_journal_add_match")?;
        def1n!("sd_journal_add_match(@{:?}, {:?})", self.journal_handle_ptr, expr);
        let r: i32 = unsafe {
            (*self.journal_api_ptr).sd_journal_add_match(
                self.journal_handle_ptr,
                expr.as_ptr() as *const ::std::os::raw::c_void,
                expr.len() as size_t,
            )
        };
        def1x!("sd_journal_add_match returned {}", r);
        self.check_return(r, "sd_journal_add_match")?;

        Ok(())
    }

    /// Wrapper to call `sd_journal_next`.
    fn call_sd_journal_next(&mut self) -> Result<usize> {
        self.check_open("sd_journal_next")?;
        let r: i32 = unsafe {
            (*self.journal_api_ptr).sd_journal_next(self.journal_handle_ptr)
        };
        def1o!("sd_journal_next returned {}", r);
        let r = self.check_return(r, "sd_journal_next")?;

        Ok(r as usize)
    }

    /// Wrapper to call `sd_journal_get_realtime_usec`.
    ///
    /// This API call is the reliably available timestamp, usually stored in
    /// field `__REALTIME_TIMESTAMP`.
    fn call_sd_journal_get_realtime_usec(&mut self) -> Result<EpochMicroseconds> {
        self.check_open("sd_journal_get_realtime_usec")?;
        let mut rt: u64 = 0;
        let r: i32 = unsafe {
            (*self.journal_api_ptr).sd_journal_get_realtime_usec(self.journal_handle_ptr, &mut rt)
        };
        def1o!("sd_journal_get_realtime_usec returned {}, realtime {}", r, rt);
        self.check_return(r, "sd_journal_get_realtime_usec")?;

        Ok(rt as EpochMicroseconds)
    }

    /// Wrapper to call `sd_journal_get_data` for field `PRIORITY` and parse
    /// the value. Returns `None` if the entry has no `PRIORITY` or it is not
    /// a number.
    fn call_sd_journal_get_data_priority(&mut self) -> Result<Option<i64>> {
        self.check_open("sd_journal_get_data")?;
        let data: Bytes;
        unsafe {
            //
            // call sd_journal_get_data
            //
            let mut pdata: *const std::os::raw::c_void = mem::zeroed();
            let mut length: size_t = 0;
            let r: i32 = (*self.journal_api_ptr).sd_journal_get_data(
                self.journal_handle_ptr,
                FIELD_PRIORITY_NUL.as_ptr() as *const std::os::raw::c_char,
                &mut pdata,
                &mut length,
            );
            def1o!("sd_journal_get_data(PRIORITY) returned {}", r);
            if r == -(Errno::ENOENT as i32) {
                self.api_calls += 1;
                return Ok(None);
            }
            self.check_return(r, "sd_journal_get_data")?;
            if pdata.is_null() {
                return Ok(None);
            }
            data = std::slice::from_raw_parts(pdata as *const u8, length as usize).to_vec();
        } // end unsafe
        let value: Option<i64> = std::str::from_utf8(&data)
            .ok()
            .and_then(|s| s.split_once('='))
            .and_then(|(_, v)| v.trim().parse::<i64>().ok());

        Ok(value)
    }

    /// Wrapper to call `sd_journal_enumerate_available_data`.
    /// Returns `Done` if there is no more data.
    fn call_sd_journal_enumerate_available_data(&mut self) -> ResultFind<Bytes, Error> {
        if let Err(err) = self.check_open("sd_journal_enumerate_available_data") {
            return ResultFind::Err(err);
        }
        let data: Bytes;
        unsafe {
            //
            // call sd_journal_enumerate_available_data
            //
            let mut pdata: *const std::os::raw::c_void = mem::zeroed();
            let mut length: size_t = 0;
            let r: i32 = (*self.journal_api_ptr).sd_journal_enumerate_available_data(
                self.journal_handle_ptr,
                &mut pdata,
                &mut length,
            );
            if r == 0 {
                self.api_calls += 1;
                def1o!("sd_journal_enumerate_available_data returned Done");
                return ResultFind::Done;
            }
            if let Err(err) = self.check_return(r, "sd_journal_enumerate_available_data") {
                de_err!("{}", err);
                return ResultFind::Err(err);
            }
            if pdata.is_null() {
                return ResultFind::Done;
            }
            // the data is only valid until the next call, so copy it
            data = std::slice::from_raw_parts(pdata as *const u8, length as usize).to_vec();
        } // end unsafe
        def1o!("sd_journal_enumerate_available_data data {:?}", buffer_to_String_noraw(&data));

        ResultFind::Found(data)
    }

    /// Is the entry at the current position within the realtime window?
    fn in_realtime_window(&mut self) -> Result<bool> {
        if self.realtime_after.is_none() && self.realtime_before.is_none() {
            return Ok(true);
        }
        let em: EpochMicroseconds = self.call_sd_journal_get_realtime_usec()?;
        let em: EpochMicrosecondsI = EpochMicrosecondsI::try_from(em).unwrap_or(EpochMicrosecondsI::MAX);

        Ok(em_pass_filters(em, self.realtime_after, self.realtime_before) == Result_Filter_DateTime2::InRange)
    }

    /// Is the entry at the current position within the priority range?
    fn in_priority_range(&mut self) -> Result<bool> {
        if self.priority_low.is_none() && self.priority_high.is_none() {
            return Ok(true);
        }
        let priority: i64 = match self.call_sd_journal_get_data_priority()? {
            Some(p) => p,
            None => return Ok(false),
        };

        Ok(self.priority_low.map_or(true, |low| CompareOp::GreaterEq.holds(&priority, &low))
            && self.priority_high.map_or(true, |high| CompareOp::LessEq.holds(&priority, &high)))
    }

    /// Narrow the realtime window. Multiple bounds AND together so the
    /// tightest wins.
    fn add_realtime_bound(&mut self, op: CompareOp, value: &str, expr: &str) -> Result<()> {
        let em: EpochMicrosecondsI = value.parse::<EpochMicrosecondsI>().map_err(|err| {
            Error::new(ErrorKind::InvalidInput, format!("bad timestamp in match {:?}; {}", expr, err))
        })?;
        match op {
            CompareOp::GreaterEq => {
                self.realtime_after = Some(self.realtime_after.map_or(em, |a| a.max(em)));
            }
            CompareOp::LessEq => {
                self.realtime_before = Some(self.realtime_before.map_or(em, |b| b.min(em)));
            }
        }
        defñ!("realtime window {:?}..={:?}", self.realtime_after, self.realtime_before);

        Ok(())
    }

    /// Narrow the priority range. Multiple bounds AND together so the
    /// tightest wins.
    fn add_priority_bound(&mut self, op: CompareOp, value: &str, expr: &str) -> Result<()> {
        let priority: i64 = match value.parse::<i64>() {
            Ok(p) if (PRIORITY_MIN..=PRIORITY_MAX).contains(&p) => p,
            _ => {
                return Err(Error::new(ErrorKind::InvalidInput, format!("bad priority in match {:?}", expr)));
            }
        };
        match op {
            CompareOp::GreaterEq => {
                self.priority_low = Some(self.priority_low.map_or(priority, |l| l.max(priority)));
            }
            CompareOp::LessEq => {
                self.priority_high = Some(self.priority_high.map_or(priority, |h| h.min(priority)));
            }
        }
        defñ!("priority range {:?}..={:?}", self.priority_low, self.priority_high);

        Ok(())
    }
}

impl JournalStore for SdJournal {
    fn add_match(&mut self, expr: &str) -> Result<()> {
        defn!("({:?})", expr);
        self.check_open("sd_journal_add_match")?;
        let result = match parse_match_expr(expr) {
            Some(MatchExpr::Compare { field, op, value })
                if field == FIELD_REALTIME_TIMESTAMP || field == FIELD_REALTIME_TIMESTAMP_ADDR =>
            {
                self.add_realtime_bound(op, value, expr)
            }
            Some(MatchExpr::Compare { field, op, value }) if field == FIELD_PRIORITY => {
                self.add_priority_bound(op, value, expr)
            }
            _ => self.call_sd_journal_add_match(expr),
        };
        defx!("{:?}", result);

        result
    }

    fn flush_matches(&mut self) {
        defn!();
        self.realtime_after = None;
        self.realtime_before = None;
        self.priority_low = None;
        self.priority_high = None;
        if self.journal_handle_ptr.is_null() {
            defx!("closed");
            return;
        }
        unsafe {
            (*self.journal_api_ptr).sd_journal_flush_matches(self.journal_handle_ptr);
        }
        self.api_calls += 1;
        defx!();
    }

    fn next(&mut self) -> Result<usize> {
        defn!();
        loop {
            let n: usize = self.call_sd_journal_next()?;
            if n == 0 {
                defx!("return 0");
                return Ok(0);
            }
            if !self.in_realtime_window()? {
                defo!("outside realtime window, skip");
                continue;
            }
            if !self.in_priority_range()? {
                defo!("outside priority range, skip");
                continue;
            }
            defx!("return {}", n);
            return Ok(n);
        }
    }

    fn get_entry(&mut self) -> Result<JournalFields> {
        defn!();
        self.check_open("sd_journal_restart_data")?;
        unsafe {
            (*self.journal_api_ptr).sd_journal_restart_data(self.journal_handle_ptr);
        }
        self.api_calls += 1;
        let mut fields = JournalFields::new();
        loop {
            match self.call_sd_journal_enumerate_available_data() {
                ResultFind::Found(data) => {
                    if !insert_field_data(&mut fields, &data) {
                        defo!("skip data without '=' {:?}", buffer_to_String_noraw(&data));
                    }
                }
                ResultFind::Done => break,
                ResultFind::Err(err) => {
                    defx!("return {:?}", err);
                    return Err(err);
                }
            }
        }
        // `__REALTIME_TIMESTAMP` is not a data field; add it like
        // `journalctl --output=export` does
        let rt: EpochMicroseconds = self.call_sd_journal_get_realtime_usec()?;
        fields.insert(FIELD_REALTIME_TIMESTAMP_ADDR.to_string(), rt.to_string());
        defx!("return {} fields", fields.len());

        Ok(fields)
    }

    fn get_cursor(&mut self) -> Result<String> {
        defn!();
        self.check_open("sd_journal_get_cursor")?;
        let cursor: String;
        unsafe {
            let mut pcursor: *mut std::os::raw::c_char = std::ptr::null_mut();
            let r: i32 = (*self.journal_api_ptr).sd_journal_get_cursor(self.journal_handle_ptr, &mut pcursor);
            defo!("sd_journal_get_cursor returned {}", r);
            self.check_return(r, "sd_journal_get_cursor")?;
            if pcursor.is_null() {
                defx!("null cursor");
                return Err(Error::new(ErrorKind::InvalidData, "sd_journal_get_cursor returned null"));
            }
            cursor = CStr::from_ptr(pcursor).to_string_lossy().into_owned();
            // allocated by libsystemd
            ::nix::libc::free(pcursor as *mut ::nix::libc::c_void);
        }
        defx!("return {:?}", cursor);

        Ok(cursor)
    }

    fn seek_head(&mut self) -> Result<()> {
        defn!();
        self.check_open("sd_journal_seek_head")?;
        let r: i32 = unsafe { (*self.journal_api_ptr).sd_journal_seek_head(self.journal_handle_ptr) };
        defx!("sd_journal_seek_head returned {}", r);
        self.check_return(r, "sd_journal_seek_head")?;

        Ok(())
    }

    fn seek_tail(&mut self) -> Result<()> {
        defn!();
        self.check_open("sd_journal_seek_tail")?;
        let r: i32 = unsafe { (*self.journal_api_ptr).sd_journal_seek_tail(self.journal_handle_ptr) };
        defx!("sd_journal_seek_tail returned {}", r);
        self.check_return(r, "sd_journal_seek_tail")?;

        Ok(())
    }

    fn seek_cursor(&mut self, cursor: &str) -> Result<()> {
        defn!("({:?})", cursor);
        self.check_open("sd_journal_seek_cursor")?;
        let cursor_cs: CString = CString::new(cursor).map_err(|err| {
            Error::new(ErrorKind::InvalidInput, format!("bad cursor {:?}; {}", cursor, err))
        })?;
        let r: i32 = unsafe {
            (*self.journal_api_ptr).sd_journal_seek_cursor(self.journal_handle_ptr, cursor_cs.as_ptr())
        };
        defx!("sd_journal_seek_cursor returned {}", r);
        self.check_return(r, "sd_journal_seek_cursor")?;

        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        defn!();
        if self.journal_handle_ptr.is_null() {
            defx!("already closed");
            return Ok(());
        }
        unsafe {
            (*self.journal_api_ptr).sd_journal_close(self.journal_handle_ptr);
        }
        self.api_calls += 1;
        self.journal_handle_ptr = std::ptr::null_mut();
        defx!("closed; {} API calls, {} errors", self.api_calls, self.api_call_errors);

        Ok(())
    }
}

impl Drop for SdJournal {
    fn drop(&mut self) {
        defñ!("{:?}", self.source);
        if let Err(_err) = self.close() {
            de_err!("close failed {}", _err);
        }
    }
}
