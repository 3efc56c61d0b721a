// src/readers/mod.rs

//! "Readers" for _jourlog_.
//!
//! ## Overview of readers
//!
//! * A [`JournalReader`] drives a [`JournalStore`] to derive journal entry
//!   messages, one per call to [`retrieve`].
//! * A `JournalStore` is the journal read API. [`SdJournal`] implements it
//!   over a dynamically loaded `libsystemd`.
//! * [`JournalFilter`]s are turned into match expressions and handed to the
//!   `JournalStore` by the `JournalReader`.
//!
//! <br/>
//!
//! _These are not rust "Readers"; these structs do not implement the trait
//! [`Read`]. These are "readers" in an informal sense._
//!
//! [`Read`]: std::io::Read
//! [`JournalReader`]: crate::readers::journalreader::JournalReader
//! [`retrieve`]: crate::readers::journalreader::JournalReader::retrieve
//! [`JournalStore`]: crate::readers::journalstore::JournalStore
//! [`SdJournal`]: crate::readers::sdjournal::SdJournal
//! [`JournalFilter`]: crate::readers::filters::JournalFilter

pub mod filters;
pub mod journalreader;
pub mod journalstore;
pub mod sdjournal;
