// src/debug/printers.rs

//! Printer macros and helpers for errors, warnings, and debug tracing.
//!
//! `de_*` macros only print in debug and test builds. `e_err!` always
//! prints; only the `jourlog` binary should use it.

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// `d`ebug `e`println! an `err`or, e.g. a failed `libsystemd` call that
/// is also returned to the caller.
#[macro_export]
macro_rules! de_err {
    ($($args:tt)*) => {{
        #[cfg(any(debug_assertions, test))]
        eprintln!("ERROR: {}", format_args!($($args)*));
    }};
}
pub use de_err;

/// `d`ebug `e`println! a `w`a`rn`ing, e.g. a skipped journal entry.
#[macro_export]
macro_rules! de_wrn {
    ($($args:tt)*) => {{
        #[cfg(any(debug_assertions, test))]
        eprintln!("WARNING: {}", format_args!($($args)*));
    }};
}
pub use de_wrn;

/// `e`println! an `err`or for the user.
#[macro_export]
macro_rules! e_err {
    ($($args:tt)*) => {
        eprintln!("ERROR: {}", format_args!($($args)*))
    };
}
pub use e_err;


// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// helper functions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Turn passed `char` into a printable `char`. Control characters common in
/// journal field data are replaced with their pictoral representation,
/// e.g. `'\n'` becomes `'␊'`. Keeps the printing width of a control
/// character to 1 in trace output of multi-line `MESSAGE` fields.
pub const fn char_to_char_noraw(c: char) -> char {
    // https://en.wikipedia.org/wiki/C0_and_C1_control_codes#C0_controls
    match c as u32 {
        0 => '␀',
        7 => '␇',  // '\a'
        8 => '␈',  // '\b'
        9 => '␉',  // '\t'
        10 => '␊', // '\n'
        11 => '␋', // '\v'
        12 => '␌', // '\f'
        13 => '␍', // '\r'
        27 => '␛',
        127 => '␡',
        _ => c,
    }
}

/// Transform a `&[u8]` of journal field data into a one-line `String` using
/// [`char_to_char_noraw`]. Invalid UTF-8 is replaced lossily.
///
/// Only intended to aid visual debugging.
#[allow(non_snake_case)]
pub fn buffer_to_String_noraw(buffer: &[u8]) -> String {
    String::from_utf8_lossy(buffer)
        .chars()
        .map(char_to_char_noraw)
        .collect()
}
