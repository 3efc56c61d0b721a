// src/tests/mod.rs

//! Tests for _jourlog_.
//!
//! Tests are placed at `src/tests/`, inside the library, so they have
//! crate-internal visibility. Most tests run against the in-memory journal
//! in [`common`]; tests of the `libsystemd` bindings return early when the
//! library cannot be loaded.

pub mod common;
pub mod journal_tests;
pub mod jourlog_tests;
pub mod priority_tests;
