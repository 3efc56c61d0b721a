// src/bindings/mod.rs

//! FFI declarations for the parts of `libsystemd` headers that are used.

pub mod sd_journal_h;
