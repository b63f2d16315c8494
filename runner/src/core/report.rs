//! Human-readable text for test failures and compiler errors.

use crate::core::protocol::{
    CompileError, ErrorOutput, Failure, MessagePart, Position, Problem, Region, TestCompleted,
    TestStatus,
};

/// Text lines describing one failure.
///
/// Comparisons print `actual`, then the operator, then `expected`, the same
/// order `elm-test` uses on the console.
pub fn failure_lines(failure: &Failure) -> Vec<String> {
    match failure {
        Failure::Comparison {
            comparison,
            expected,
            actual,
        } => vec![actual.clone(), format!("| {comparison}"), expected.clone()],
        Failure::Data { data } => data
            .iter()
            .map(|(key, value)| format!("{key}: {value}"))
            .collect(),
        Failure::Message { message } => vec![message.clone()],
    }
}

/// Report text for a completed test: its messages, then its failures.
///
/// Returns `None` when there is nothing to report.
pub fn build_message(event: &TestCompleted) -> Option<String> {
    let mut lines = event.messages.clone();
    if let TestStatus::Fail { failures } = &event.status {
        lines.extend(failures.iter().flat_map(failure_lines));
    }
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

pub fn build_error_message(output: &ErrorOutput) -> String {
    match output {
        ErrorOutput::Message { line } => line.clone(),
        ErrorOutput::CompileErrors { errors } => errors
            .iter()
            .map(compile_error_message)
            .collect::<Vec<_>>()
            .join("\n\n"),
    }
}

fn compile_error_message(error: &CompileError) -> String {
    std::iter::once(error.path.clone())
        .chain(error.problems.iter().map(problem_message))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn problem_message(problem: &Problem) -> String {
    let mut out = format!("{} {}\n", region(&problem.region), problem.title);
    for part in &problem.message {
        out.push_str(part_text(part));
    }
    out
}

fn region(region: &Region) -> String {
    format!("{}-{}", position(&region.start), position(&region.end))
}

fn position(pos: &Position) -> String {
    format!("{}:{}", pos.line, pos.column)
}

fn part_text(part: &MessagePart) -> &str {
    match part {
        MessagePart::Plain(text) => text,
        MessagePart::Styled(styled) => &styled.string,
    }
}

/// Squash `text` onto one short line for inline decorations.
pub fn one_line(text: &str) -> String {
    let joined = text.split('\n').collect::<Vec<_>>().join(" ");
    if joined.chars().count() > 20 {
        let head: String = joined.chars().take(20).collect();
        format!("{head} ...")
    } else {
        joined
    }
}
