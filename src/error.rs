// src/error.rs

//! Error type for [`JournalReader`] operations.
//!
//! [`JournalReader`]: crate::readers::journalreader::JournalReader

use std::io;

use ::thiserror::Error;

use crate::common::Count;

/// Everything a [`JournalReader`] operation can return as an error.
///
/// [`Exhausted`] and [`LimitReached`] are normal traversal outcomes and not
/// faults; they are distinct so a caller can tell "ran out of data" apart
/// from "hit my own cap".
///
/// [`JournalReader`]: crate::readers::journalreader::JournalReader
/// [`Exhausted`]: ReaderError::Exhausted
/// [`LimitReached`]: ReaderError::LimitReached
#[derive(Debug, Error)]
pub enum ReaderError {
    /// The journal could not be opened (no permission, no `libsystemd`, ...).
    #[error("failed to open journal: {0}")]
    Open(#[source] io::Error),

    /// Priority outside `0..=7`. Raised before the store is touched.
    #[error("invalid priority level: {0} (must be 0-7)")]
    InvalidPriority(i64),

    /// The store refused a match expression, seek token, or other call.
    #[error("failed to {op}: {source}")]
    Store {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// The store reports no further entries.
    #[error("no more entries")]
    Exhausted,

    /// The retrieval limit was hit; the store position was not advanced.
    #[error("reached limit of {0} entries")]
    LimitReached(Count),

    /// The store advanced onto an entry without a `MESSAGE` field.
    /// That entry is skipped for this traversal.
    #[error("entry has no MESSAGE field")]
    MalformedEntry,

    /// The reader was closed.
    #[error("journal reader is closed")]
    Closed,
}

impl ReaderError {
    pub const fn is_exhausted(&self) -> bool {
        matches!(self, ReaderError::Exhausted)
    }

    pub const fn is_limit_reached(&self) -> bool {
        matches!(self, ReaderError::LimitReached(_))
    }

    /// `true` for caller-supplied parameters out of domain.
    pub const fn is_validation(&self) -> bool {
        matches!(self, ReaderError::InvalidPriority(_))
    }

    /// `true` for the two normal end-of-traversal outcomes.
    pub const fn is_end_of_traversal(&self) -> bool {
        self.is_exhausted() || self.is_limit_reached()
    }

    /// The underlying store `io::Error`, if any.
    pub fn store_error(&self) -> Option<&io::Error> {
        match self {
            ReaderError::Open(err) => Some(err),
            ReaderError::Store { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type ReaderResult<T> = std::result::Result<T, ReaderError>;
