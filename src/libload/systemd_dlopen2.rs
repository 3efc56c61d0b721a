// src/libload/systemd_dlopen2.rs

//! Runtime loading of `libsystemd` with [`dlopen2`].
//!
//! Loading at runtime lets `jourlog` start on systems without systemd; the
//! journal operations then fail with [`std::io::ErrorKind::NotFound`].
//!
//! Both halves of the crate use the one loaded library: the
//! [`JournalReader`] through the `sd_journal_*` read functions and the
//! [`JourLog`] through `sd_journal_sendv`.
//!
//! [`dlopen2`]: https://docs.rs/dlopen2/0.7.0/dlopen2/index.html
//! [`JournalReader`]: crate::readers::journalreader::JournalReader
//! [`JourLog`]: crate::writers::jourlog::JourLog

use std::fmt;
use std::os::raw::{
    c_char,
    c_int,
    c_void,
};
use std::sync::{
    Arc,
    RwLock,
};

use ::const_format::concatcp;
use ::dlopen2::wrapper::{
    Container,
    WrapperApi,
};
use ::lazy_static::lazy_static;
use ::si_trace_print::{
    defn,
    defo,
    defx,
    defñ,
};

use crate::bindings::sd_journal_h::{
    iovec,
    size_t,
    sd_journal,
};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Name of the `libsystemd` library in error messages.
pub const LIB_NAME_SYSTEMD: &str = "libsystemd.so";

/// File names tried by [`load_library_systemd`], first match wins.
///
/// Most distributions ship only the versioned `libsystemd.so.0` unless the
/// development package is installed. Old RHEL-family systems split the
/// journal API into `libsystemd-journal`.
pub const LIB_NAME_SYSTEMD_NAMES: &[&str] = &[
    LIB_NAME_SYSTEMD,
    concatcp!(LIB_NAME_SYSTEMD, ".0"),
    "libsystemd-journal.so.0",
    "/usr/lib64/libsystemd-journal.so.0",
];

/// [`dlopen2`] API wrapper for `libsystemd.so`, the subset of
/// [`systemd/sd-journal.h`] that `jourlog` calls. See
/// [`sd-journal(3)`] for each function.
///
/// [`dlopen2`]: https://docs.rs/dlopen2/0.7.0/dlopen2/index.html
/// [`systemd/sd-journal.h`]: https://github.com/systemd/systemd/blob/v249/src/systemd/sd-journal.h
/// [`sd-journal(3)`]: https://www.man7.org/linux/man-pages/man3/sd-journal.3.html
#[derive(WrapperApi)]
pub struct SdJournalHApi {
    // handle lifecycle
    sd_journal_open: unsafe extern fn(ret: *mut *mut sd_journal, flags: c_int) -> c_int,
    sd_journal_open_files: unsafe extern fn(
        ret: *mut *mut sd_journal,
        paths: *mut *const c_char,
        flags: c_int,
    ) -> c_int,
    sd_journal_close: unsafe extern fn(j: *mut sd_journal),

    // matches; `data` is `FIELD=value` and need not be NUL-terminated
    sd_journal_add_match: unsafe extern fn(j: *mut sd_journal, data: *const c_void, size: size_t) -> c_int,
    sd_journal_flush_matches: unsafe extern fn(j: *mut sd_journal),

    // traversal
    sd_journal_next: unsafe extern fn(j: *mut sd_journal) -> c_int,
    sd_journal_seek_head: unsafe extern fn(j: *mut sd_journal) -> c_int,
    sd_journal_seek_tail: unsafe extern fn(j: *mut sd_journal) -> c_int,
    sd_journal_seek_cursor: unsafe extern fn(j: *mut sd_journal, cursor: *const c_char) -> c_int,

    // entry at the current position; the cursor string must be `free(3)`d
    sd_journal_get_cursor: unsafe extern fn(j: *mut sd_journal, cursor: *mut *mut c_char) -> c_int,
    sd_journal_get_realtime_usec: unsafe extern fn(j: *mut sd_journal, usec: *mut u64) -> c_int,
    sd_journal_get_data: unsafe extern fn(
        j: *mut sd_journal,
        field: *const c_char,
        data: *mut *const c_void,
        l: *mut size_t,
    ) -> c_int,
    sd_journal_restart_data: unsafe extern fn(j: *mut sd_journal),
    sd_journal_enumerate_available_data: unsafe extern fn(
        j: *mut sd_journal,
        data: *mut *const c_void,
        l: *mut size_t,
    ) -> c_int,

    // write
    sd_journal_sendv: unsafe extern fn(iov: *const iovec, n: c_int) -> c_int,
}

pub type JournalApiContainer = Container<SdJournalHApi>;

/// Shared by every [`SdJournal`] and [`SdJournalSink`].
///
/// [`SdJournal`]: crate::readers::sdjournal::SdJournal
/// [`SdJournalSink`]: crate::writers::journalsink::SdJournalSink
pub type JournalApiPtr = Arc<JournalApiContainer>;

lazy_static! {
    /// The loaded `libsystemd`, `None` until [`load_library_systemd`]
    /// succeeds.
    pub static ref SYSTEMD_JOURNAL_API: RwLock<Option<JournalApiPtr>> = RwLock::new(None);

    /// Outcome of the one load attempt; `None` before it was made.
    pub static ref LOAD_LIBRARY_SYSTEMD_OK: RwLock<Option<bool>> = RwLock::new(None);
}

/// The loaded `libsystemd` API, or `None` if [`load_library_systemd`] has
/// not succeeded.
pub fn journal_api() -> Option<JournalApiPtr> {
    match SYSTEMD_JOURNAL_API.read() {
        Ok(guard) => guard.as_ref().cloned(),
        Err(_err) => {
            defñ!("SYSTEMD_JOURNAL_API poisoned {}", _err);
            None
        }
    }
}

/// Outcome of [`load_library_systemd`].
pub enum LoadLibraryError {
    Ok,
    /// This call tried to load the library and failed.
    Err(::dlopen2::Error),
    /// An earlier call failed; loading is not retried.
    PrevErr,
}

impl LoadLibraryError {
    pub const fn is_ok(&self) -> bool {
        matches!(self, LoadLibraryError::Ok)
    }
}

/// `Err` and `PrevErr` compare equal; both mean "not loaded".
impl PartialEq for LoadLibraryError {
    fn eq(&self, other: &LoadLibraryError) -> bool {
        self.is_ok() == other.is_ok()
    }
}

impl Eq for LoadLibraryError {}

impl fmt::Debug for LoadLibraryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadLibraryError::Ok => write!(f, "LoadLibraryError::Ok"),
            LoadLibraryError::Err(err) => write!(f, "LoadLibraryError::Err({})", err),
            LoadLibraryError::PrevErr => write!(f, "LoadLibraryError::PrevErr"),
        }
    }
}

/// Record the outcome of a load attempt.
fn set_load_library_systemd_ok(ok: bool) {
    if let Ok(mut guard) = LOAD_LIBRARY_SYSTEMD_OK.write() {
        *guard = Some(ok);
    }
}

fn set_systemd_journal_api(container: JournalApiContainer) {
    defñ!();
    if let Ok(mut guard) = SYSTEMD_JOURNAL_API.write() {
        *guard = Some(Arc::new(container));
    }
    set_load_library_systemd_ok(true);
}

/// Load the shared library `libsystemd` into [`SYSTEMD_JOURNAL_API`],
/// trying each of [`LIB_NAME_SYSTEMD_NAMES`] in order.
///
/// Only the first call attempts the load. A failed first attempt returns
/// `LoadLibraryError::Err` and every later call returns
/// `LoadLibraryError::PrevErr`; a success makes every call return
/// `LoadLibraryError::Ok`.
///
/// [`SYSTEMD_JOURNAL_API`]: static@SYSTEMD_JOURNAL_API
pub fn load_library_systemd() -> LoadLibraryError {
    match LOAD_LIBRARY_SYSTEMD_OK.read().map(|guard| *guard) {
        Ok(Some(true)) => return LoadLibraryError::Ok,
        Ok(Some(false)) | Err(_) => return LoadLibraryError::PrevErr,
        Ok(None) => {}
    }
    defn!();

    let mut last_err: Option<::dlopen2::Error> = None;
    for libname in LIB_NAME_SYSTEMD_NAMES.iter() {
        defo!("Container::load({:?})", libname);
        match unsafe { JournalApiContainer::load(libname) } {
            Ok(container) => {
                set_systemd_journal_api(container);
                defx!("loaded {:?}", libname);
                return LoadLibraryError::Ok;
            }
            Err(err) => {
                defo!("{:?} failed: {}", libname, err);
                last_err = Some(err);
            }
        }
    }
    set_load_library_systemd_ok(false);
    defx!("none of {} names loaded", LIB_NAME_SYSTEMD_NAMES.len());

    match last_err {
        Some(err) => LoadLibraryError::Err(err),
        None => LoadLibraryError::PrevErr,
    }
}
