// src/tests/jourlog_tests.rs

//! tests for `jourlog.rs` and `journalsink.rs`

#![allow(non_snake_case)]

use std::io::ErrorKind;

use ::test_case::test_case;

use crate::data::priority::Priority;
use crate::tests::common::{
    systemd_not_available,
    RecordingSink,
};
use crate::writers::jourlog::{
    JourLog,
    Provenance,
};
use crate::writers::journalsink::{
    entry_items,
    JournalSink,
    SdJournalSink,
};
use crate::{
    jalert,
    jcrit,
    jdebug,
    jemerg,
    jerr,
    jinfo,
    jlog,
    jnotice,
    jwarn,
    provenance,
};

fn logger() -> JourLog<RecordingSink> {
    JourLog::with_sink(RecordingSink::default())
}

const PROV: Provenance = Provenance::new("src/service.rs", 42, "service::handler");

#[test]
fn test_JourLog_default_level() {
    let log = logger();
    assert_eq!(log.log_level(), Priority::Info);
    assert!(log.enabled(Priority::Emergency));
    assert!(log.enabled(Priority::Info));
    assert!(!log.enabled(Priority::Debug));
}

#[test_case(Priority::Emergency, 1)]
#[test_case(Priority::Error, 4)]
#[test_case(Priority::Info, 7)]
#[test_case(Priority::Debug, 8)]
fn test_JourLog_threshold(level: Priority, expect_sent: usize) {
    let mut log = logger();
    log.set_log_level(level);
    for p in Priority::ALL.iter() {
        let sent = log.log(*p, &PROV, &[], format_args!("{}", p)).unwrap();
        assert_eq!(sent, *p <= level);
    }
    assert_eq!(log.sink().sent().len(), expect_sent);
}

#[test]
fn test_JourLog_fields_order() {
    let log = logger();
    let sent = log
        .log(
            Priority::Warning,
            &PROV,
            &[("REQUEST_ID", "r-1"), ("USER_ID", "u-2")],
            format_args!("disk {}% full", 91),
        )
        .unwrap();
    assert!(sent);
    let entries = log.sink().sent();
    assert_eq!(entries.len(), 1);
    let e = &entries[0];
    assert_eq!(e.message, "disk 91% full");
    assert_eq!(e.priority, Priority::Warning);
    let names: Vec<&str> = e.fields.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["CODE_FILE", "CODE_LINE", "CODE_FUNC", "REQUEST_ID", "USER_ID"]);
    assert_eq!(e.field("CODE_FILE"), Some("src/service.rs"));
    assert_eq!(e.field("CODE_LINE"), Some("42"));
    assert_eq!(e.field("CODE_FUNC"), Some("service::handler"));
    assert_eq!(e.field("REQUEST_ID"), Some("r-1"));
}

#[test]
fn test_JourLog_level_methods() {
    let mut log = logger();
    log.set_log_level(Priority::Debug);
    log.emerg(&PROV, &[], format_args!("0")).unwrap();
    log.alert(&PROV, &[], format_args!("1")).unwrap();
    log.crit(&PROV, &[], format_args!("2")).unwrap();
    log.error(&PROV, &[], format_args!("3")).unwrap();
    log.warning(&PROV, &[], format_args!("4")).unwrap();
    log.notice(&PROV, &[], format_args!("5")).unwrap();
    log.info(&PROV, &[], format_args!("6")).unwrap();
    log.debug(&PROV, &[], format_args!("7")).unwrap();
    let sent = log.sink().sent();
    assert_eq!(sent.len(), 8);
    for (i, e) in sent.iter().enumerate() {
        assert_eq!(e.priority.as_u8() as usize, i);
        assert_eq!(e.message, i.to_string());
    }
}

#[test]
fn test_JourLog_filtered_not_sent() {
    let log = logger();
    assert!(!log.debug(&PROV, &[], format_args!("hidden")).unwrap());
    assert!(log.sink().sent().is_empty());
}

#[test]
fn test_JourLog_send_failure() {
    let log = JourLog::with_sink(RecordingSink::failing(ErrorKind::BrokenPipe));
    let err = log.info(&PROV, &[], format_args!("lost")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BrokenPipe);
    // filtered records never reach the failing sink
    assert!(!log.debug(&PROV, &[], format_args!("lost")).unwrap());
}

#[test]
fn test_provenance_macro() {
    let line = line!() + 1;
    let p: Provenance = provenance!();
    assert_eq!(p.file, file!());
    assert_eq!(p.line, line);
    assert_eq!(p.func, module_path!());
    assert!(p.to_string().contains(file!()));
}

#[test]
fn test_level_macros() {
    let mut log = logger();
    log.set_log_level(Priority::Debug);
    jemerg!(log, "a").unwrap();
    jalert!(log, "b").unwrap();
    jcrit!(log, "c").unwrap();
    jerr!(log, "d {}", 1).unwrap();
    jwarn!(log, "e").unwrap();
    jnotice!(log, "f").unwrap();
    jinfo!(log, "g {} {}", 1, 2).unwrap();
    jdebug!(log, "h").unwrap();
    let sent = log.sink().sent();
    assert_eq!(sent.len(), 8);
    assert_eq!(sent[3].message, "d 1");
    assert_eq!(sent[6].message, "g 1 2");
    assert_eq!(sent[6].priority, Priority::Info);
    for e in sent.iter() {
        assert_eq!(e.field("CODE_FILE"), Some(file!()));
        assert_eq!(e.field("CODE_FUNC"), Some(module_path!()));
    }
}

#[test]
fn test_jlog_macro_fields() {
    let log = logger();
    let request_id = String::from("abc");
    jinfo!(log, fields = &[("REQUEST_ID", request_id.as_str())], "handled {}", "GET").unwrap();
    jlog!(log, Priority::Notice, fields = &[("USER_ID", "7")], "login").unwrap();
    let sent = log.sink().sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].message, "handled GET");
    assert_eq!(sent[0].field("REQUEST_ID"), Some("abc"));
    assert_eq!(sent[1].priority, Priority::Notice);
    assert_eq!(sent[1].field("USER_ID"), Some("7"));
    assert_eq!(sent[1].fields.last().unwrap().0, "USER_ID");
}

#[test]
fn test_entry_items() {
    let items = entry_items("hello", Priority::Error, &[("CODE_LINE", "9"), ("K", "v=w")]);
    assert_eq!(items, vec!["MESSAGE=hello", "PRIORITY=3", "CODE_LINE=9", "K=v=w"]);
}

#[test]
fn test_SdJournalSink_send() {
    if systemd_not_available() {
        return;
    }
    let sink = SdJournalSink::new().unwrap();
    // without a running journald the socket may be missing; either way
    // the result is an `io::Result` and not a panic
    let _result = sink.send("jourlog test message", Priority::Debug, &[("JOURLOG_TEST", "1")]);
}
