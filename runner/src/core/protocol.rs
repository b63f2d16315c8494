//! Typed view of the `elm-test --report json` line protocol.
//!
//! Every stdout line is either a JSON event or free text. The JSON events carry
//! no schema, so they are classified by hand into closed enums. Anything that
//! does not fit falls back to [`Output::Message`] with the original line.

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::core::unescape::unescape_literal;

/// One classified stdout line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Output {
    /// Free text, or JSON that is not a recognised event.
    Message { line: String },
    Result { event: Event },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum Event {
    #[serde(rename_all = "camelCase")]
    RunStart { test_count: u64 },
    RunComplete {
        passed: u64,
        failed: u64,
        duration: u64,
    },
    TestCompleted(TestCompleted),
}

/// Outcome of a single test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestCompleted {
    /// Module first, then nested `describe` labels, then the test name.
    pub labels: Vec<String>,
    pub duration: u64,
    pub status: TestStatus,
    /// Free-text lines printed before this result (e.g. `Debug.log` output).
    /// Empty when freshly parsed; filled in by the result tree.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "tag", rename_all = "lowercase")]
pub enum TestStatus {
    Pass,
    Todo { comment: String },
    Fail { failures: Vec<Failure> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "tag", rename_all = "lowercase")]
pub enum Failure {
    Message {
        message: String,
    },
    Comparison {
        comparison: String,
        expected: String,
        actual: String,
    },
    /// Arbitrary diagnostic payload, in wire order.
    Data { data: Vec<(String, String)> },
}

/// Classify one stdout line.
pub fn parse_line(line: &str) -> Output {
    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(_) => return message(line),
    };
    match parse_event(&value) {
        Ok(event) => Output::Result { event },
        Err(err) => {
            debug!(err = %format!("{err:#}"), "treating json line as message");
            message(line)
        }
    }
}

fn message(line: &str) -> Output {
    Output::Message {
        line: line.to_string(),
    }
}

/// Classify an already-parsed JSON value as an event.
pub fn parse_event(value: &Value) -> Result<Event> {
    let object = value.as_object().context("not a json object")?;
    let event = object
        .get("event")
        .and_then(Value::as_str)
        .context("missing event")?;
    match event {
        "runStart" => Ok(Event::RunStart {
            test_count: number_field(object, "testCount")?,
        }),
        "runComplete" => Ok(Event::RunComplete {
            passed: number_field(object, "passed")?,
            failed: number_field(object, "failed")?,
            duration: number_field(object, "duration")?,
        }),
        "testCompleted" => parse_test_completed(object).map(Event::TestCompleted),
        other => bail!("unknown event {other:?}"),
    }
}

fn parse_test_completed(object: &Map<String, Value>) -> Result<TestCompleted> {
    let labels = object
        .get("labels")
        .and_then(Value::as_array)
        .context("missing labels")?
        .iter()
        .map(stringify)
        .collect::<Vec<_>>();
    if labels.is_empty() {
        bail!("empty labels");
    }
    let duration = number_field(object, "duration")?;
    let failures = object
        .get("failures")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let status = match object.get("status").and_then(Value::as_str) {
        Some("pass") => TestStatus::Pass,
        Some("todo") => TestStatus::Todo {
            comment: failures.first().map(stringify).unwrap_or_default(),
        },
        Some("fail") => TestStatus::Fail {
            failures: failures
                .iter()
                .filter_map(|failure| {
                    let classified = classify_failure(failure);
                    if classified.is_none() {
                        warn!(labels = ?labels, failure = %failure, "dropping unrecognised failure");
                    }
                    classified
                })
                .collect(),
        },
        other => bail!("unknown status {other:?}"),
    };

    Ok(TestCompleted {
        labels,
        duration,
        status,
        messages: Vec::new(),
    })
}

/// Map a wire failure onto a [`Failure`]; `None` if no rule applies.
pub fn classify_failure(failure: &Value) -> Option<Failure> {
    let data = failure
        .get("reason")
        .and_then(|reason| reason.get("data"))
        .filter(|data| is_present(data));

    match data {
        Some(Value::Object(data)) if data.contains_key("comparison") => {
            let field = |key: &str| data.get(key).map(stringify).unwrap_or_default();
            Some(Failure::Comparison {
                comparison: field("comparison"),
                expected: unescape_literal(&field("expected")),
                actual: unescape_literal(&field("actual")),
            })
        }
        Some(Value::Object(data)) if !data.is_empty() => Some(Failure::Data {
            data: data
                .iter()
                .map(|(key, value)| (key.clone(), stringify(value)))
                .collect(),
        }),
        Some(Value::Object(_)) => top_level_message(failure),
        Some(data) => Some(Failure::Message {
            message: stringify(data),
        }),
        None => top_level_message(failure),
    }
}

fn top_level_message(failure: &Value) -> Option<Failure> {
    failure
        .get("message")
        .filter(|message| is_present(message))
        .map(|message| Failure::Message {
            message: stringify(message),
        })
}

/// Null and empty strings count as absent.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Strings verbatim, everything else as compact JSON.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `elm-test` sends counts as strings; plain numbers are accepted too.
fn number_field(object: &Map<String, Value>, key: &str) -> Result<u64> {
    let value = object
        .get(key)
        .with_context(|| format!("missing {key}"))?;
    match value {
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{key} is not a number: {s:?}")),
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| anyhow!("{key} is not a non-negative integer: {n}")),
        other => bail!("{key} has unexpected type: {other}"),
    }
}

/// One classified stderr line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ErrorOutput {
    Message { line: String },
    CompileErrors { errors: Vec<CompileError> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileError {
    pub path: String,
    pub name: String,
    pub problems: Vec<Problem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub title: String,
    pub region: Region,
    pub message: Vec<MessagePart>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub start: Position,
    pub end: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessagePart {
    Plain(String),
    Styled(StyledString),
}

/// Styling hints are kept for richer renderers; plain text ignores them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyledString {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub string: String,
}

#[derive(Deserialize)]
struct CompileErrorsPayload {
    #[serde(rename = "type")]
    kind: String,
    errors: Vec<CompileError>,
}

/// Classify one stderr line; only `compile-errors` payloads are structured.
pub fn parse_error_line(line: &str) -> ErrorOutput {
    match serde_json::from_str::<CompileErrorsPayload>(line) {
        Ok(payload) if payload.kind == "compile-errors" => ErrorOutput::CompileErrors {
            errors: payload.errors,
        },
        _ => ErrorOutput::Message {
            line: line.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn completed(line: &str) -> TestCompleted {
        match parse_line(line) {
            Output::Result {
                event: Event::TestCompleted(event),
            } => event,
            other => panic!("expected testCompleted, got {other:?}"),
        }
    }

    #[test]
    fn parses_passing_test() {
        let event = completed(
            r#"{"event":"testCompleted","status":"pass","labels":["suite","nested","test"],"failures":[],"duration":"13"}"#,
        );
        assert_eq!(event.labels, vec!["suite", "nested", "test"]);
        assert_eq!(event.status, TestStatus::Pass);
        assert_eq!(event.duration, 13);
        assert!(event.messages.is_empty());
    }

    #[test]
    fn parses_todo_comment_from_first_failure() {
        let event = completed(
            r#"{"event":"testCompleted","status":"todo","labels":["suite"],"failures":["todo comment"],"duration":"1"}"#,
        );
        assert_eq!(
            event.status,
            TestStatus::Todo {
                comment: "todo comment".to_string()
            }
        );
    }

    #[test]
    fn parses_run_start_and_complete() {
        assert_eq!(
            parse_line(r#"{"event":"runStart","testCount":"7","fuzzRuns":"100","initialSeed":"1"}"#),
            Output::Result {
                event: Event::RunStart { test_count: 7 }
            }
        );
        assert_eq!(
            parse_line(r#"{"event":"runComplete","passed":"5","failed":2,"duration":"50"}"#),
            Output::Result {
                event: Event::RunComplete {
                    passed: 5,
                    failed: 2,
                    duration: 50
                }
            }
        );
    }

    #[test]
    fn free_text_and_broken_json_are_messages() {
        for line in ["a message", "{ boken", "", "Compiling > Starting tests"] {
            assert_eq!(
                parse_line(line),
                Output::Message {
                    line: line.to_string()
                }
            );
        }
    }

    #[test]
    fn json_without_known_event_is_a_message() {
        for line in [
            "42",
            r#"{"hello":"world"}"#,
            r#"{"event":"somethingNew"}"#,
            r#"{"event":"runStart","testCount":"many"}"#,
            r#"{"event":"testCompleted","status":"pass","labels":[],"duration":"1"}"#,
            r#"{"event":"testCompleted","status":"weird","labels":["M"],"duration":"1"}"#,
        ] {
            assert!(
                matches!(parse_line(line), Output::Message { .. }),
                "expected message for {line}"
            );
        }
    }

    #[test]
    fn classifies_comparison_and_unescapes() {
        let failure = json!({
            "message": "boom",
            "reason": {"data": {
                "comparison": "Expect.equal",
                "actual": "\"multi\\nline\\nactual\"",
                "expected": "\"quoted \\\"expected\\\"\""
            }}
        });
        assert_eq!(
            classify_failure(&failure),
            Some(Failure::Comparison {
                comparison: "Expect.equal".to_string(),
                expected: "quoted \"expected\"".to_string(),
                actual: "multi\nline\nactual".to_string(),
            })
        );
    }

    #[test]
    fn classifies_other_data_in_wire_order() {
        let failure = json!({"message": "boom", "reason": {"data": {"zeta": "1", "alpha": 2}}});
        assert_eq!(
            classify_failure(&failure),
            Some(Failure::Data {
                data: vec![
                    ("zeta".to_string(), "1".to_string()),
                    ("alpha".to_string(), "2".to_string()),
                ]
            })
        );
    }

    #[test]
    fn string_reason_wins_over_message() {
        let failure = json!({"message": "boom", "reason": {"data": "broken"}});
        assert_eq!(
            classify_failure(&failure),
            Some(Failure::Message {
                message: "broken".to_string()
            })
        );
    }

    #[test]
    fn falls_back_to_top_level_message() {
        for failure in [
            json!({"message": "boom", "reason": {"data": null}}),
            json!({"message": "boom", "reason": {}}),
            json!({"message": "boom", "reason": {"data": {}}}),
            json!({"message": "boom"}),
        ] {
            assert_eq!(
                classify_failure(&failure),
                Some(Failure::Message {
                    message: "boom".to_string()
                })
            );
        }
    }

    #[test]
    fn unrecognised_failures_are_dropped() {
        let event = completed(
            r#"{"event":"testCompleted","status":"fail","labels":["M","t"],"failures":["odd",{"reason":{}},{"message":"kept"}],"duration":"0"}"#,
        );
        assert_eq!(
            event.status,
            TestStatus::Fail {
                failures: vec![Failure::Message {
                    message: "kept".to_string()
                }]
            }
        );
    }

    #[test]
    fn parses_compile_errors() {
        let line = r#"
            {
                "type": "compile-errors",
                "errors": [{
                    "path": "path/to/file.elm",
                    "name": "a name",
                    "problems": [{
                        "title": "THE ERROR",
                        "region": {
                            "start": {"line": 17, "column": 5},
                            "end": {"line": 17, "column": 10}
                        },
                        "message": ["some text", {"string": "more text", "bold": true}]
                    }]
                }]
            }
        "#;
        let expected = ErrorOutput::CompileErrors {
            errors: vec![CompileError {
                path: "path/to/file.elm".to_string(),
                name: "a name".to_string(),
                problems: vec![Problem {
                    title: "THE ERROR".to_string(),
                    region: Region {
                        start: Position {
                            line: 17,
                            column: 5,
                        },
                        end: Position {
                            line: 17,
                            column: 10,
                        },
                    },
                    message: vec![
                        MessagePart::Plain("some text".to_string()),
                        MessagePart::Styled(StyledString {
                            bold: Some(true),
                            underline: None,
                            color: None,
                            string: "more text".to_string(),
                        }),
                    ],
                }],
            }],
        };
        assert_eq!(parse_error_line(line), expected);
    }

    #[test]
    fn other_stderr_lines_are_messages() {
        for line in ["elm: not found", r#"{"type":"error","title":"x"}"#] {
            assert_eq!(
                parse_error_line(line),
                ErrorOutput::Message {
                    line: line.to_string()
                }
            );
        }
    }
}
