//! Plain-text rendering of a result tree for the terminal.

use crate::core::protocol::{TestCompleted, TestStatus};
use crate::core::report::failure_lines;
use crate::io::config::ReportConfig;
use crate::tree::{MESSAGES_LABEL, Node, NodeKind, Outcome};

const INDENT: &str = "  ";

/// Counts of completed tests by status.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub todo: usize,
}

impl Summary {
    pub fn of(root: &Node) -> Self {
        root.tests().fold(Self::default(), |mut acc, event| {
            match event.status {
                TestStatus::Pass => acc.passed += 1,
                TestStatus::Fail { .. } => acc.failed += 1,
                TestStatus::Todo { .. } => acc.todo += 1,
            }
            acc
        })
    }
}

fn marker(node: &Node) -> &'static str {
    match node.kind {
        NodeKind::Annotation => "-",
        NodeKind::Running => "~",
        NodeKind::Group | NodeKind::Test => match node.outcome() {
            Outcome::Passed => "✓",
            Outcome::Failed => "✗",
            Outcome::Skipped => "○",
            Outcome::Empty => " ",
        },
    }
}

/// Render `root` as an indented tree followed by a summary line.
///
/// An unnamed root is not printed; its children start at column zero.
pub fn render_tree(root: &Node, options: &ReportConfig) -> String {
    let skip = usize::from(root.name.is_empty());
    let mut lines = Vec::new();

    for entry in root.walk() {
        if entry.depth() < skip {
            continue;
        }
        let node = entry.node;
        let indent = INDENT.repeat(entry.depth() - skip);
        let mut line = format!("{indent}{} {}", marker(node), node.name);
        if let Some(event) = node.event.as_ref().filter(|_| options.show_durations) {
            line.push_str(&format!(" ({} ms)", event.duration));
        }
        lines.push(line);

        if options.show_messages && shows_messages(node) {
            let detail_indent = format!("{indent}{INDENT}{INDENT}");
            for message in node_messages(node) {
                for text in message.lines() {
                    lines.push(format!("{detail_indent}{text}"));
                }
            }
        }
    }

    let summary = Summary::of(root);
    lines.push(String::new());
    lines.push(format!(
        "passed: {}, failed: {}, todo: {}",
        summary.passed, summary.failed, summary.todo
    ));
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn shows_messages(node: &Node) -> bool {
    match node.kind {
        NodeKind::Test => node.outcome() == Outcome::Failed,
        NodeKind::Annotation => node.name == MESSAGES_LABEL,
        NodeKind::Group | NodeKind::Running => false,
    }
}

/// Messages for one node only; child annotations print on their own lines.
fn node_messages(node: &Node) -> Vec<String> {
    let mut out = node.messages.clone();
    if let Some(TestCompleted {
        status: TestStatus::Fail { failures },
        ..
    }) = &node.event
    {
        out.extend(failures.iter().flat_map(failure_lines));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{completed, failing, todo};

    fn quiet() -> ReportConfig {
        ReportConfig {
            show_messages: false,
            show_durations: false,
        }
    }

    #[test]
    fn renders_markers_and_indentation() {
        let mut root = Node::root();
        root.add_result(completed(&["M", "a"]));
        root.add_result(failing(&["M", "inner", "b"], "boom"));
        root.add_result(todo(&["M", "c"], "later"));

        let out = render_tree(&root, &quiet());
        assert_eq!(
            out,
            "✗ M\n  ✓ a\n  ✗ inner\n    ✗ b\n  ○ c\n    - later\n\npassed: 1, failed: 1, todo: 1\n"
        );
    }

    #[test]
    fn failure_text_is_shown_under_red_leaves() {
        let mut root = Node::root();
        root.add_result(completed(&["M", "a"]));
        root.add_result(failing(&["M", "b"], "first\nsecond"));

        let out = render_tree(&root, &ReportConfig::default());
        assert!(out.contains("  ✗ b\n      first\n      second\n"));
        assert!(!out.contains("✓ a\n      "));
    }

    #[test]
    fn durations_are_optional() {
        let mut root = Node::root();
        let mut event = completed(&["M", "a"]);
        event.duration = 12;
        root.add_result(event);

        let options = ReportConfig {
            show_messages: false,
            show_durations: true,
        };
        assert!(render_tree(&root, &options).contains("✓ a (12 ms)"));
        assert!(!render_tree(&root, &quiet()).contains("ms"));
    }

    #[test]
    fn named_root_is_printed() {
        let mut root = Node::group("project");
        root.add_result(completed(&["M", "a"]));
        let out = render_tree(&root, &quiet());
        assert!(out.starts_with("✓ project\n  ✓ M\n    ✓ a\n"));
    }

    #[test]
    fn summary_counts_statuses() {
        let mut root = Node::root();
        root.add_result(completed(&["M", "a"]));
        root.add_result(completed(&["M", "b"]));
        root.add_result(failing(&["N", "c"], "x"));
        assert_eq!(
            Summary::of(&root),
            Summary {
                passed: 2,
                failed: 1,
                todo: 0
            }
        );
    }
}
