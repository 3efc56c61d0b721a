// src/lib.rs

//! _jourlog_ is a small convenience layer over the systemd journal.
//!
//! It does two things:
//!
//! - writes leveled log records to the journal with the caller's
//!   `CODE_FILE`, `CODE_LINE`, and `CODE_FUNC` attached, see
//!   [`JourLog`].
//! - opens a read cursor on the journal, applies declarative filters, and
//!   pulls matching entries one at a time, see [`JournalReader`].
//!
//! `libsystemd` is loaded at runtime with [`dlopen2`], so the program runs
//! (and fails gracefully) on systems without systemd.
//!
//! ```rust,no_run
//! use jourlog::readers::journalreader::JournalReader;
//!
//! let mut reader = JournalReader::open().unwrap();
//! reader.last_hour().unwrap();
//! reader.set_limit(10);
//! for message in reader.messages() {
//!     println!("{}", message.unwrap());
//! }
//! ```
//!
//! [`JourLog`]: crate::writers::jourlog::JourLog
//! [`JournalReader`]: crate::readers::journalreader::JournalReader
//! [`dlopen2`]: https://docs.rs/dlopen2/0.7.0/dlopen2/index.html

pub mod bindings;
pub mod common;
pub mod data;
pub mod debug;
pub mod error;
pub mod libload;
pub mod readers;
pub mod writers;
#[cfg(test)]
pub mod tests;
