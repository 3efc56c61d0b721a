// src/common.rs
//
// type aliases and result types shared across modules

/// `F`ake `Path` or `F`ile `Path`; a journal file path, or a label such as
/// "local journal" for the source of a store.
pub type FPath = String;

/// Counts of API calls, retrieved entries, and limits.
pub type Count = u64;

/// Owned copy of one `FIELD=value` journal datum.
pub type Bytes = Vec<u8>;

/// Result of one step of a `libsystemd` enumeration, which signals "no more"
/// with a zero return value rather than an error.
#[derive(Debug, PartialEq)]
pub enum ResultFind<T, E> {
    Found(T),
    /// The enumeration is finished.
    Done,
    Err(E),
}
