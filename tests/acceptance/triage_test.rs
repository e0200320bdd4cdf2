//! End-to-end triage of batch logs.

use super::common::write_log;
use optfuzz_common::error::TriageError;
use optfuzz_triage::{reduce, render, ColorMode, Dialect, Severity};

const BATCH_LOG: &str = "\
INFO: batch started
pass: test_loop_unroll
fail: crash in gvn (Construct: 17)
warn: slow compile for test_big_switch
pass: test_alias
fail: miscompile in licm (Construct: 4)
pass: test_loop_unroll
fail: crash in gvn (Construct: 17)
INFO: batch finished
";

fn plain(dialect: Dialect, content: &str) -> String {
    let (_dir, path) = write_log(content);
    let report = reduce(&path, dialect).expect("log reduces");
    let mut out = Vec::new();
    render(&report, &mut out, ColorMode::Plain).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn test_tagged_batch_report() {
    assert_eq!(
        plain(Dialect::Tagged, BATCH_LOG),
        "[pass] test_alias\n\
         [pass] test_loop_unroll\n\
         [warn] slow compile for test_big_switch\n\
         [fail] miscompile in licm (Construct: 4)\n\
         [fail] crash in gvn (Construct: 17)\n"
    );
}

#[test]
fn test_report_is_idempotent_over_duplicated_log() {
    let doubled = format!("{BATCH_LOG}{BATCH_LOG}");
    assert_eq!(
        plain(Dialect::Tagged, BATCH_LOG),
        plain(Dialect::Tagged, &doubled)
    );
}

#[test]
fn test_missing_log_is_empty_report() {
    let dir = tempfile::tempdir().unwrap();
    let report = reduce(&dir.path().join("absent.log"), Dialect::Tagged).unwrap();
    assert!(report.is_empty());
}

#[test]
fn test_malformed_fail_line_is_rejected() {
    let (_dir, path) = write_log("pass: ok\nfail: no construct id here\n");
    let err = reduce(&path, Dialect::Tagged).unwrap_err();
    match err {
        TriageError::MalformedFailLine { line } => {
            assert_eq!(line, "fail: no construct id here");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_checker_log_aggregates_by_id() {
    let log = "\
[Checker] Fail! 21 (use after free)
[Checker] Pass! 3 (ok)
[Checker] Fail! 21 (double free)
[Checker] Fail! 8 (leak)
[Checker] Fail! 21 (use after free)
[Checker] Pass! 3 (ok again)
";
    let (_dir, path) = write_log(log);
    let report = reduce(&path, Dialect::Checker).unwrap();
    assert_eq!(report.count(Severity::Fail), 2);
    assert_eq!(report.count(Severity::Pass), 1);

    assert_eq!(
        plain(Dialect::Checker, log),
        "[pass] 3: ok again\n[fail] 8: leak\n[fail] 21: double free, use after free\n"
    );
}
