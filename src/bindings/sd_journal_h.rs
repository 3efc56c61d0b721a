// src/bindings/sd_journal_h.rs

//! Types and constants from [`systemd/sd-journal.h`].
//!
//! Only the handful of items needed by [`SdJournalHApi`] are declared.
//!
//! [`systemd/sd-journal.h`]: https://github.com/systemd/systemd/blob/v249/src/systemd/sd-journal.h
//! [`SdJournalHApi`]: crate::libload::systemd_dlopen2::SdJournalHApi

#![allow(non_camel_case_types)]

pub use ::nix::libc::iovec;

#[allow(non_camel_case_types)]
pub type size_t = ::std::os::raw::c_ulong;

/// Opaque journal handle, only ever used behind a pointer.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct sd_journal {
    pub _unused: [u8; 0],
}

/// `sd_journal_open` flag: only journal files generated on the local machine.
pub const SD_JOURNAL_LOCAL_ONLY: ::std::os::raw::c_int = 1 << 0;
