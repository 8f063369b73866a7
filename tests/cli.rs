//! Black-box CLI tests against the built `cliffy` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

#[test]
fn runs_tasks_from_argv_and_reports_a_summary() {
    let mut cmd = Command::cargo_bin("cliffy").unwrap();
    cmd.arg("--no-progress")
        .arg("--max-concurrent")
        .arg("2")
        .arg("write a haiku")
        .arg("write a limerick");
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("volley complete: 2 total"));
}

#[test]
fn reads_tasks_from_prompts_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "first task").unwrap();
    writeln!(file, "second task").unwrap();

    let mut cmd = Command::cargo_bin("cliffy").unwrap();
    cmd.arg("--no-progress")
        .arg("--prompts-file")
        .arg(file.path());
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("2 total"));
}

#[test]
fn empty_input_is_a_usage_error() {
    let mut cmd = Command::cargo_bin("cliffy").unwrap();
    cmd.arg("--no-progress");
    cmd.assert().failure();
}
