//! Test result tree nodes.
//!
//! Ownership runs strictly from parent to children. Upward navigation goes
//! through [`Node::walk`], which yields every node with its label path.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::core::protocol::{Failure, TestCompleted, TestStatus};
use crate::core::report::failure_lines;

pub const RUNNING_LABEL: &str = "Running ...";
pub const MESSAGES_LABEL: &str = "Messages";

static FIRST_FILE_IN_ERROR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*?/tests/(.*?)\.elm").expect("valid test path regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Root, module or `describe` grouping.
    Group,
    /// A test that reported a result.
    Test,
    /// Free text hung into the tree (messages, todo comments).
    Annotation,
    /// Placeholder shown until the first result of a run arrives.
    Running,
}

/// Aggregate state of a subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed,
    Skipped,
    /// No test results below this node.
    Empty,
}

impl Outcome {
    fn combine(self, other: Outcome) -> Outcome {
        use Outcome::{Empty, Failed, Passed, Skipped};
        match (self, other) {
            (Failed, _) | (_, Failed) => Failed,
            (Passed, _) | (_, Passed) => Passed,
            (Skipped, _) | (_, Skipped) => Skipped,
            (Empty, Empty) => Empty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub children: Vec<Node>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<TestCompleted>,
    /// Messages attached directly to this node.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
}

impl Node {
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Group,
            children: Vec::new(),
            event: None,
            messages: Vec::new(),
        }
    }

    pub fn root() -> Self {
        Self::group("")
    }

    pub fn annotation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Annotation,
            messages: vec![message.into()],
            ..Self::group(name)
        }
    }

    pub fn running() -> Self {
        Self {
            kind: NodeKind::Running,
            ..Self::group(RUNNING_LABEL)
        }
    }

    pub fn is_running(&self) -> bool {
        self.kind == NodeKind::Running
    }

    pub fn is_annotation(&self) -> bool {
        self.kind == NodeKind::Annotation
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children
            .iter()
            .find(|child| child.is_structural() && child.name == name)
    }

    fn group_child(&self, name: &str) -> Option<&Node> {
        self.children
            .iter()
            .find(|child| child.kind == NodeKind::Group && child.name == name)
    }

    /// Descend along `labels` and return the node at the end of the path.
    ///
    /// Every label but the last names a group.
    pub fn find(&self, labels: &[&str]) -> Option<&Node> {
        let Some((last, parents)) = labels.split_last() else {
            return Some(self);
        };
        parents
            .iter()
            .try_fold(self, |node, label| node.group_child(label))?
            .child(last)
    }

    /// Group and test nodes take part in name lookup; annotations do not.
    fn is_structural(&self) -> bool {
        matches!(self.kind, NodeKind::Group | NodeKind::Test)
    }

    /// A result may replace an earlier one for the same test, or land on a
    /// group that nothing has been folded under yet.
    fn takes_result(&self) -> bool {
        match self.kind {
            NodeKind::Test => true,
            NodeKind::Group => !self.children.iter().any(Node::is_structural),
            NodeKind::Annotation | NodeKind::Running => false,
        }
    }

    /// Find or create the node a result for `labels` lands on.
    ///
    /// Intermediate labels reuse existing groups only, never test leaves. The
    /// last label reuses a node that can take a result. Anything else is
    /// appended, so siblings keep first-seen order.
    pub fn descend_or_create(&mut self, labels: &[String]) -> &mut Node {
        let mut node = self;
        for (depth, label) in labels.iter().enumerate() {
            let last = depth + 1 == labels.len();
            let found = node.children.iter().position(|child| {
                child.name == *label
                    && if last {
                        child.takes_result()
                    } else {
                        child.kind == NodeKind::Group
                    }
            });
            let index = match found {
                Some(index) => index,
                None => {
                    node.children.push(Node::group(label.clone()));
                    node.children.len() - 1
                }
            };
            node = &mut node.children[index];
        }
        node
    }

    /// Fold a completed test into the tree and return its leaf.
    pub fn add_result(&mut self, event: TestCompleted) -> &mut Node {
        let labels = event.labels.clone();
        let leaf = self.descend_or_create(&labels);
        leaf.kind = NodeKind::Test;
        leaf.messages.clear();
        leaf.children.retain(|child| !child.is_annotation());
        leaf.event = Some(event);
        leaf
    }

    pub fn outcome(&self) -> Outcome {
        let own = match (&self.kind, &self.event) {
            (NodeKind::Test, Some(event)) => match event.status {
                TestStatus::Pass => Outcome::Passed,
                TestStatus::Todo { .. } => Outcome::Skipped,
                TestStatus::Fail { .. } => Outcome::Failed,
            },
            _ => Outcome::Empty,
        };
        self.children
            .iter()
            .fold(own, |acc, child| acc.combine(child.outcome()))
    }

    /// True when at least one test below passed and none failed.
    ///
    /// Todo tests neither make a subtree green nor red.
    pub fn green(&self) -> bool {
        self.outcome() == Outcome::Passed
    }

    pub fn skipped(&self) -> bool {
        self.outcome() == Outcome::Skipped
    }

    /// Tree-view hint: collapse green subtrees, open everything that failed
    /// except failed leaves themselves. `None` means not expandable.
    pub fn expanded(&self) -> Option<bool> {
        if !self.is_structural() {
            return None;
        }
        let has_children = !self.children.is_empty();
        if self.green() {
            return if has_children { Some(false) } else { None };
        }
        Some(self.event.is_none())
    }

    /// `(expected, actual)` when the first failure is a comparison.
    pub fn diff(&self) -> Option<(String, String)> {
        match &self.event.as_ref()?.status {
            TestStatus::Fail { failures } => match failures.first()? {
                Failure::Comparison {
                    expected, actual, ..
                } => Some((expected.clone(), actual.clone())),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn can_diff(&self) -> bool {
        self.diff().is_some()
    }

    /// Module and test name of a test node.
    pub fn test_module_and_name(&self) -> Option<(&str, &str)> {
        let labels = &self.event.as_ref()?.labels;
        Some((labels.first()?.as_str(), labels.last()?.as_str()))
    }

    /// Module named by the first `tests/*.elm` path in an annotation's text.
    pub fn test_module(&self) -> Option<String> {
        if !self.is_annotation() {
            return None;
        }
        self.messages.iter().find_map(|message| {
            FIRST_FILE_IN_ERROR
                .captures(message)
                .map(|captures| captures[1].replace('/', "."))
        })
    }

    /// Attached messages, then this node's failure text, then every
    /// descendant's messages in tree order.
    pub fn all_messages(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_messages(&mut out);
        out
    }

    fn collect_messages(&self, out: &mut Vec<String>) {
        out.extend(self.messages.iter().cloned());
        if let Some(TestCompleted {
            status: TestStatus::Fail { failures },
            ..
        }) = &self.event
        {
            out.extend(failures.iter().flat_map(failure_lines));
        }
        for child in &self.children {
            child.collect_messages(out);
        }
    }

    /// Depth-first, pre-order traversal starting at this node.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: vec![(self, Vec::new())],
        }
    }

    /// Every test leaf below this node, in tree order.
    pub fn tests(&self) -> impl Iterator<Item = &TestCompleted> {
        self.walk().filter_map(|entry| entry.node.event.as_ref())
    }
}

/// A node visited by [`Walk`], with the names of its ancestors.
#[derive(Debug, Clone)]
pub struct WalkEntry<'a> {
    pub node: &'a Node,
    /// Names from the walk's start (exclusive) down to `node` (inclusive).
    pub path: Vec<&'a str>,
}

impl WalkEntry<'_> {
    pub fn depth(&self) -> usize {
        self.path.len()
    }
}

/// Lazy pre-order iterator over a subtree. Call [`Node::walk`] again to restart.
pub struct Walk<'a> {
    stack: Vec<(&'a Node, Vec<&'a str>)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = WalkEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (node, path) = self.stack.pop()?;
        for child in node.children.iter().rev() {
            let mut child_path = path.clone();
            child_path.push(child.name.as_str());
            self.stack.push((child, child_path));
        }
        Some(WalkEntry { node, path })
    }
}
