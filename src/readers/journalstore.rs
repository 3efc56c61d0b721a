// src/readers/journalstore.rs

//! The journal read API driven by a [`JournalReader`].
//!
//! [`JournalStore`] mirrors the `sd_journal` read functions one to one.
//! The `JournalReader` is a thin, stateful orchestration layer over exactly
//! this surface. [`SdJournal`] is the `libsystemd` implementation.
//!
//! [`JournalReader`]: crate::readers::journalreader::JournalReader
//! [`SdJournal`]: crate::readers::sdjournal::SdJournal

use std::io::{
    Error,
    ErrorKind,
    Result,
};

pub use ::nix::errno::Errno;

use crate::data::journal::JournalFields;

/// The journal read API.
///
/// All fallible functions return an [`std::io::Error`]; implementations
/// backed by `libsystemd` derive the `ErrorKind` from the returned `errno`
/// with [`errno_to_errorkind`].
pub trait JournalStore {
    /// Add a match expression. Matches accumulate until
    /// [`flush_matches`](JournalStore::flush_matches).
    fn add_match(&mut self, expr: &str) -> Result<()>;

    /// Remove all match expressions.
    fn flush_matches(&mut self);

    /// Advance to the next matching entry. Returns the number of entries
    /// advanced, `0` at the end of the journal. Never waits for new entries.
    fn next(&mut self) -> Result<usize>;

    /// All fields of the entry at the current position.
    fn get_entry(&mut self) -> Result<JournalFields>;

    /// The cursor token of the current position.
    fn get_cursor(&mut self) -> Result<String>;

    fn seek_head(&mut self) -> Result<()>;

    fn seek_tail(&mut self) -> Result<()>;

    /// Reposition to a previously obtained cursor token.
    fn seek_cursor(&mut self, cursor: &str) -> Result<()>;

    /// Release the underlying handle. Calling more than once is a no-op.
    fn close(&mut self) -> Result<()>;
}

/// Map a few of the most common `Errno` errors to a formal `ErrorKind`.
/// Give a little bit more information beyond catch-all `ErrorKind::Other`.
pub fn errno_to_errorkind(err: &Errno) -> ErrorKind {
    match *err {
        Errno::EACCES => ErrorKind::PermissionDenied,
        Errno::EPERM => ErrorKind::PermissionDenied,
        Errno::ENOENT => ErrorKind::NotFound,
        Errno::EADDRINUSE => ErrorKind::AddrInUse,
        // `sd_journal_get_cursor` when not positioned on an entry,
        // `sd_journal_seek_cursor` for a cursor no longer in the journal
        Errno::EADDRNOTAVAIL => ErrorKind::AddrNotAvailable,
        Errno::EAFNOSUPPORT => ErrorKind::AddrNotAvailable,
        Errno::EALREADY => ErrorKind::AlreadyExists,
        Errno::EBADF => ErrorKind::InvalidInput,
        // malformed match expression or cursor token
        Errno::EINVAL => ErrorKind::InvalidInput,
        Errno::EBADMSG => ErrorKind::InvalidData,
        Errno::ENOMEM => ErrorKind::OutOfMemory,
        Errno::EBUSY => ErrorKind::Other,
        Errno::ECANCELED => ErrorKind::Interrupted,
        _ => ErrorKind::Other,
    }
}

/// Helper to create an `Error` from a negative `libsystemd` return value.
#[allow(non_snake_case)]
pub fn Error_from_Errno(
    r: i32,
    funcname: &str,
    source: &str,
) -> Error {
    let e = Errno::from_raw(r.abs());
    Error::new(errno_to_errorkind(&e), format!("{} returned {}; {:?} ({})", funcname, r, e, source))
}
