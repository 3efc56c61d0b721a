// src/data/mod.rs

//! The `data` module is specialized data containers for journal entries,
//! priorities, and datetimes.

pub mod datetime;
pub mod journal;
pub mod priority;
