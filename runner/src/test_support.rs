//! Test-only helpers for building `elm-test` report lines and events.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};

use crate::core::protocol::{Failure, TestCompleted, TestStatus};

fn labels_json(labels: &[&str]) -> Value {
    Value::from(labels.to_vec())
}

pub fn run_start(test_count: u64) -> String {
    json!({
        "event": "runStart",
        "testCount": test_count.to_string(),
        "fuzzRuns": "100",
        "paths": [],
        "initialSeed": "42"
    })
    .to_string()
}

pub fn run_complete(passed: u64, failed: u64) -> String {
    json!({
        "event": "runComplete",
        "passed": passed.to_string(),
        "failed": failed.to_string(),
        "duration": "50"
    })
    .to_string()
}

pub fn pass_line(labels: &[&str]) -> String {
    json!({
        "event": "testCompleted",
        "status": "pass",
        "labels": labels_json(labels),
        "failures": [],
        "duration": "3"
    })
    .to_string()
}

/// A failed test whose single failure is the raw JSON `failure`.
pub fn fail_line(labels: &[&str], failure: &str) -> String {
    let failure: Value = serde_json::from_str(failure).unwrap_or_else(|_| Value::from(failure));
    json!({
        "event": "testCompleted",
        "status": "fail",
        "labels": labels_json(labels),
        "failures": [failure],
        "duration": "1"
    })
    .to_string()
}

pub fn todo_line(labels: &[&str], comment: &str) -> String {
    json!({
        "event": "testCompleted",
        "status": "todo",
        "labels": labels_json(labels),
        "failures": [comment],
        "duration": "0"
    })
    .to_string()
}

/// A passing test event.
pub fn completed(labels: &[&str]) -> TestCompleted {
    TestCompleted {
        labels: labels.iter().map(|l| l.to_string()).collect(),
        duration: 0,
        status: TestStatus::Pass,
        messages: Vec::new(),
    }
}

/// A failed test event with one plain message failure.
pub fn failing(labels: &[&str], message: &str) -> TestCompleted {
    TestCompleted {
        status: TestStatus::Fail {
            failures: vec![Failure::Message {
                message: message.to_string(),
            }],
        },
        ..completed(labels)
    }
}

pub fn todo(labels: &[&str], comment: &str) -> TestCompleted {
    TestCompleted {
        status: TestStatus::Todo {
            comment: comment.to_string(),
        },
        ..completed(labels)
    }
}

/// Write `lines` to `name` inside `dir`, one per line.
pub fn write_report(dir: &Path, name: &str, lines: &[String]) -> std::io::Result<PathBuf> {
    let path = dir.join(name);
    let mut contents = lines.join("\n");
    contents.push('\n');
    fs::write(&path, contents)?;
    Ok(path)
}

/// A temporary project directory with one Elm test module on disk.
#[cfg(feature = "test-support")]
pub fn project_with_module(module: &str, source: &str) -> std::io::Result<tempfile::TempDir> {
    let dir = tempfile::Builder::new()
        .prefix("elm-test-runner-")
        .tempdir()?;
    let path = crate::core::locate::test_file_path(dir.path(), "tests", module);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, source)?;
    Ok(dir)
}
