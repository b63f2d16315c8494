//! Best-effort mapping from test labels back to positions in Elm sources.
//!
//! The report only carries label paths, so positions are recovered by text
//! search. Offsets are byte offsets into the source text.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::core::protocol::{Failure, TestCompleted, TestStatus};
use crate::core::report::one_line;

/// Find the offset of the innermost label of `labels` in `text`.
///
/// The first label must appear as the name of a `describe`, `test` or `fuzz`
/// declaration. When it occurs several times, the declaration with the
/// smallest `indent_of` wins (ties keep the earliest). The remaining labels
/// are then searched as quoted strings, each after the previous hit.
pub fn find_offset<F>(labels: &[String], text: &str, indent_of: F) -> Option<usize>
where
    F: Fn(usize) -> usize,
{
    let (first, rest) = labels.split_first()?;
    let pattern = format!(r#"(describe|test|fuzz\s+.*?)\s+"{}""#, regex::escape(first));
    let declaration = Regex::new(&pattern).ok()?;

    let start = declaration
        .find_iter(text)
        .map(|m| m.start())
        .min_by_key(|offset| indent_of(*offset))?;

    let mut offset = find_quoted(text, first, start)?;
    let mut after = offset + quoted(first).len();
    for label in rest {
        offset = find_quoted(text, label, after)?;
        after = offset + quoted(label).len();
    }
    Some(offset)
}

fn quoted(label: &str) -> String {
    format!("\"{label}\"")
}

fn find_quoted(text: &str, label: &str, from: usize) -> Option<usize> {
    let needle = quoted(label);
    text.get(from..)?.find(&needle).map(|pos| from + pos)
}

/// Whitespace characters at the start of the line containing `offset`.
pub fn leading_indent(text: &str, offset: usize) -> usize {
    let line_start = text[..offset].rfind('\n').map_or(0, |i| i + 1);
    text[line_start..]
        .chars()
        .take_while(|c| *c != '\n' && c.is_whitespace())
        .count()
}

/// Zero-based line and character column of `offset`.
pub fn line_and_column(text: &str, offset: usize) -> (usize, usize) {
    let before = &text[..offset];
    let line = before.matches('\n').count();
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    (line, before[line_start..].chars().count())
}

/// Where a test was found in its source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

/// Locate a completed test in the source of its module.
///
/// The module label is the file itself, so the search starts from the
/// outermost `describe`.
pub fn locate_test(event: &TestCompleted, text: &str) -> Option<Location> {
    let names = event.labels.get(1..).filter(|names| !names.is_empty())?;
    let offset = find_offset(names, text, |offset| leading_indent(text, offset))?;
    let (line, column) = line_and_column(text, offset);
    Some(Location {
        offset,
        line,
        column,
    })
}

/// An inline annotation for a failed test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decoration {
    /// Zero-based line.
    pub line: usize,
    pub message: String,
}

/// Inline decorations for each failure of a failed test.
///
/// Comparisons point at the first occurrence of the expected value after the
/// test; other failures point at the test itself.
pub fn decorations(event: &TestCompleted, text: &str) -> Vec<Decoration> {
    let TestStatus::Fail { failures } = &event.status else {
        return Vec::new();
    };
    let Some(location) = locate_test(event, text) else {
        debug!(labels = ?event.labels, "no source position for failed test");
        return Vec::new();
    };

    failures
        .iter()
        .filter_map(|failure| match failure {
            Failure::Comparison {
                comparison,
                expected,
                actual,
            } => {
                let index = text.get(location.offset..)?.find(expected.as_str())? + location.offset;
                Some(Decoration {
                    line: line_and_column(text, index).0,
                    message: format!("{comparison} {} {}", one_line(expected), one_line(actual)),
                })
            }
            Failure::Message { message } => Some(Decoration {
                line: location.line,
                message: message.clone(),
            }),
            Failure::Data { data } => Some(Decoration {
                line: location.line,
                message: data
                    .iter()
                    .map(|(key, value)| format!("{key}: {value}"))
                    .collect::<Vec<_>>()
                    .join("\n"),
            }),
        })
        .collect()
}

/// `Some.Module` becomes `Some/Module.elm`.
pub fn file_path_under_tests(module: &str) -> String {
    format!("{}.elm", module.split('.').collect::<Vec<_>>().join("/"))
}

/// Source file of a test module inside a project.
pub fn test_file_path(project_root: &Path, tests_dir: &str, module: &str) -> PathBuf {
    project_root
        .join(tests_dir)
        .join(file_path_under_tests(module))
}
