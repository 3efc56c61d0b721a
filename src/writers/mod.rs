// src/writers/mod.rs

//! "Writers" for _jourlog_.
//!
//! * A [`JourLog`] is a leveled logger. Records at or above its threshold
//!   are sent to a [`JournalSink`] with the caller's provenance attached.
//! * A `JournalSink` is the journal write API. [`SdJournalSink`] implements
//!   it with `sd_journal_sendv`.
//!
//! [`JourLog`]: crate::writers::jourlog::JourLog
//! [`JournalSink`]: crate::writers::journalsink::JournalSink
//! [`SdJournalSink`]: crate::writers::journalsink::SdJournalSink

pub mod jourlog;
pub mod journalsink;
