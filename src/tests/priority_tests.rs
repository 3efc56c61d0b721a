// src/tests/priority_tests.rs

//! tests for `priority.rs`

use ::test_case::test_case;

use crate::data::priority::{
    Priority,
    PRIORITY_MAX,
    PRIORITY_MIN,
};

#[test]
fn test_priority_order() {
    for (i, p) in Priority::ALL.iter().enumerate() {
        assert_eq!(p.as_u8() as usize, i);
        assert_eq!(Priority::from_u8(i as u8), Some(*p));
    }
    assert!(Priority::Emergency < Priority::Debug);
    assert_eq!(Priority::default(), Priority::Info);
    assert_eq!(Priority::ALL.len() as i64, PRIORITY_MAX - PRIORITY_MIN + 1);
}

#[test_case(0, Ok(Priority::Emergency))]
#[test_case(3, Ok(Priority::Error))]
#[test_case(7, Ok(Priority::Debug))]
#[test_case(-1, Err(-1))]
#[test_case(8, Err(8))]
fn test_priority_try_from(value: i64, expect: Result<Priority, i64>) {
    assert_eq!(Priority::try_from(value), expect);
}

#[test_case("emerg", Priority::Emergency)]
#[test_case("panic", Priority::Emergency)]
#[test_case("alert", Priority::Alert)]
#[test_case("crit", Priority::Critical)]
#[test_case("err", Priority::Error)]
#[test_case("error", Priority::Error)]
#[test_case("warning", Priority::Warning)]
#[test_case("warn", Priority::Warning)]
#[test_case("NOTICE", Priority::Notice)]
#[test_case(" info ", Priority::Info)]
#[test_case("debug", Priority::Debug)]
#[test_case("4", Priority::Warning)]
fn test_priority_from_str(input: &str, expect: Priority) {
    assert_eq!(input.parse::<Priority>().unwrap(), expect);
}

#[test_case("8")]
#[test_case("-1")]
#[test_case("verbose")]
#[test_case("")]
fn test_priority_from_str_err(input: &str) {
    assert!(input.parse::<Priority>().is_err());
}

#[test]
fn test_priority_display_roundtrip() {
    for p in Priority::ALL.iter() {
        assert_eq!(p.to_string().parse::<Priority>().unwrap(), *p);
    }
    assert_eq!(Priority::Warning.to_string(), "warning");
    assert_eq!(u8::from(Priority::Notice), 5);
}
