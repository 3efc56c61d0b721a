// src/tests/journal_tests.rs

//! tests for `journal.rs`

use ::test_case::test_case;

use crate::data::datetime::Result_Filter_DateTime2;
use crate::data::journal::{
    em_pass_filters,
    insert_field_data,
    split_field_data,
    JournalEntry,
    JournalFields,
    JournalOutput,
};
use crate::data::priority::Priority;

const ENTRY_EXPORT: &str = "\
__CURSOR=s=e992f143877046059b264a0f907056b6;i=6ff
CODE_FILE=appIndicator.js
CODE_LINE=738
MESSAGE=unable to update icon for livepatch
PRIORITY=4
SYSLOG_IDENTIFIER=ubuntu-appindicators@ubuntu.com
_HOSTNAME=ubuntu22Acorn
_PID=1306
__REALTIME_TIMESTAMP=1680331472784185
";

fn entry() -> JournalEntry {
    let mut fields = JournalFields::new();
    for line in ENTRY_EXPORT.lines().skip(1) {
        assert!(insert_field_data(&mut fields, line.as_bytes()), "{:?}", line);
    }
    JournalEntry::new(fields, String::from("s=e992f143877046059b264a0f907056b6;i=6ff"))
}

#[test_case(b"MESSAGE=hello", Some((&b"MESSAGE"[..], &b"hello"[..])))]
#[test_case(b"MESSAGE=", Some((&b"MESSAGE"[..], &b""[..])))]
#[test_case(b"MESSAGE=a=b", Some((&b"MESSAGE"[..], &b"a=b"[..])))]
#[test_case(b"MESSAGE", None)]
#[test_case(b"=value", None)]
fn test_split_field_data(data: &[u8], expect: Option<(&[u8], &[u8])>) {
    assert_eq!(split_field_data(data), expect);
}

#[test]
fn test_insert_field_data_lossy() {
    let mut fields = JournalFields::new();
    assert!(insert_field_data(&mut fields, b"MESSAGE=bad \xFF byte"));
    assert_eq!(fields.get("MESSAGE").unwrap(), "bad \u{FFFD} byte");
    assert!(!insert_field_data(&mut fields, b"no separator"));
    assert_eq!(fields.len(), 1);
}

#[test_case(50, None, None, Result_Filter_DateTime2::InRange)]
#[test_case(50, Some(50), Some(50), Result_Filter_DateTime2::InRange)]
#[test_case(49, Some(50), None, Result_Filter_DateTime2::BeforeRange)]
#[test_case(51, None, Some(50), Result_Filter_DateTime2::AfterRange)]
#[test_case(60, Some(50), Some(70), Result_Filter_DateTime2::InRange)]
fn test_em_pass_filters(
    em: i64,
    after: Option<i64>,
    before: Option<i64>,
    expect: Result_Filter_DateTime2,
) {
    assert_eq!(em_pass_filters(em, after, before), expect);
}

#[test]
fn test_journalentry_accessors() {
    let e = entry();
    assert_eq!(e.message(), Some("unable to update icon for livepatch"));
    assert_eq!(e.priority(), Some(Priority::Warning));
    assert_eq!(e.realtime_timestamp(), Some(1680331472784185));
    assert_eq!(e.field("_PID"), Some("1306"));
    assert_eq!(e.field("NOPE"), None);
    assert_eq!(e.cursor(), "s=e992f143877046059b264a0f907056b6;i=6ff");
    assert!(e.datetime().is_some());
    assert_eq!(e.into_message().unwrap(), "unable to update icon for livepatch");
}

#[test]
fn test_journalentry_source_realtime_fallback() {
    let mut fields = JournalFields::new();
    fields.insert(String::from("_SOURCE_REALTIME_TIMESTAMP"), String::from("42"));
    let e = JournalEntry::new(fields, String::new());
    assert_eq!(e.realtime_timestamp(), Some(42));
    assert_eq!(e.message(), None);
    assert_eq!(e.priority(), None);
}

#[test]
fn test_journalentry_bad_priority() {
    let mut fields = JournalFields::new();
    fields.insert(String::from("PRIORITY"), String::from("9"));
    assert_eq!(JournalEntry::new(fields, String::new()).priority(), None);
}

#[test]
fn test_journalentry_to_export_string() {
    assert_eq!(entry().to_export_string(), ENTRY_EXPORT);
}

#[test]
fn test_journalentry_to_short_string() {
    let s = entry().to_short_string();
    assert!(s.ends_with(" ubuntu22Acorn ubuntu-appindicators@ubuntu.com[1306]: unable to update icon for livepatch"), "{}", s);
}

#[test_case(JournalOutput::Cat, "unable to update icon for livepatch")]
#[test_case(JournalOutput::Export, ENTRY_EXPORT)]
fn test_journalentry_to_output_string(output: JournalOutput, expect: &str) {
    assert_eq!(entry().to_output_string(output), expect);
}

#[test]
fn test_journaloutput_display() {
    assert_eq!(JournalOutput::Short.to_string(), "short");
    assert_eq!(JournalOutput::Export.to_string(), "export");
    assert_eq!(JournalOutput::Cat.to_string(), "cat");
    assert_eq!(JournalOutput::default(), JournalOutput::Short);
}
