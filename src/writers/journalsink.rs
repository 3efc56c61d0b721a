// src/writers/journalsink.rs

//! The journal write API used by a [`JourLog`].
//!
//! [`JourLog`]: crate::writers::jourlog::JourLog

use std::io::{
    Error,
    ErrorKind,
    Result,
};

use ::si_trace_print::{
    defn,
    defo,
    defx,
};

use crate::bindings::sd_journal_h::iovec;
use crate::data::journal::{
    FIELD_MESSAGE,
    FIELD_PRIORITY,
};
use crate::data::priority::Priority;
use crate::libload::systemd_dlopen2::{
    journal_api,
    load_library_systemd,
    JournalApiPtr,
    LoadLibraryError,
    LIB_NAME_SYSTEMD,
};
use crate::readers::journalstore::Error_from_Errno;

/// The journal write API.
pub trait JournalSink {
    /// Write one entry with `MESSAGE=message`, `PRIORITY=priority`, then
    /// each of `fields` as `NAME=value`, in order.
    fn send(
        &self,
        message: &str,
        priority: Priority,
        fields: &[(&str, &str)],
    ) -> Result<()>;
}

/// Build the `NAME=value` items of one journal entry.
pub fn entry_items(
    message: &str,
    priority: Priority,
    fields: &[(&str, &str)],
) -> Vec<String> {
    let mut items: Vec<String> = Vec::with_capacity(fields.len() + 2);
    items.push(format!("{}={}", FIELD_MESSAGE, message));
    items.push(format!("{}={}", FIELD_PRIORITY, priority.as_u8()));
    for (name, value) in fields.iter() {
        items.push(format!("{}={}", name, value));
    }

    items
}

/// A [`JournalSink`] over `sd_journal_sendv` of a dynamically loaded
/// `libsystemd`.
#[derive(Clone)]
pub struct SdJournalSink {
    journal_api_ptr: JournalApiPtr,
}

impl std::fmt::Debug for SdJournalSink {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter,
    ) -> std::fmt::Result {
        f.debug_struct("SdJournalSink").finish()
    }
}

impl SdJournalSink {
    /// Load `libsystemd` if not yet loaded.
    pub fn new() -> Result<SdJournalSink> {
        defn!();
        let loaded: LoadLibraryError = load_library_systemd();
        if !loaded.is_ok() {
            defx!("{:?}", loaded);
            return Err(Error::new(
                ErrorKind::NotFound,
                format!("failed to load {}; {:?}", LIB_NAME_SYSTEMD, loaded),
            ));
        }
        let journal_api_ptr: JournalApiPtr = journal_api().ok_or_else(|| {
            Error::new(ErrorKind::NotFound, format!("{} interface not available", LIB_NAME_SYSTEMD))
        })?;
        defx!();

        Ok(SdJournalSink { journal_api_ptr })
    }
}

impl JournalSink for SdJournalSink {
    fn send(
        &self,
        message: &str,
        priority: Priority,
        fields: &[(&str, &str)],
    ) -> Result<()> {
        defn!("({:?}, {}, {:?})", message, priority, fields);
        let items: Vec<String> = entry_items(message, priority, fields);
        // the iovecs borrow `items`; `sd_journal_sendv` copies the data
        let iov: Vec<iovec> = items
            .iter()
            .map(|item| iovec {
                iov_base: item.as_ptr() as *mut ::nix::libc::c_void,
                iov_len: item.len(),
            })
            .collect();
        let n: i32 = match i32::try_from(iov.len()) {
            Ok(n) => n,
            Err(_) => {
                defx!("too many fields {}", iov.len());
                return Err(Error::new(ErrorKind::InvalidInput, "too many fields"));
            }
        };
        let r: i32 = unsafe { (*self.journal_api_ptr).sd_journal_sendv(iov.as_ptr(), n) };
        defo!("sd_journal_sendv returned {}", r);
        if r < 0 {
            let err = Error_from_Errno(r, "sd_journal_sendv", "journal");
            defx!("{}", err);
            return Err(err);
        }
        defx!();

        Ok(())
    }
}
