//! Incremental aggregation of `elm-test` output into a [`Node`] tree.
//!
//! Lines are fed in arrival order. After any prefix of lines the tree is a
//! complete, queryable snapshot of what has been seen so far.

use std::fmt;
use std::mem;

use tracing::debug;

use crate::core::protocol::{Event, Output, TestCompleted, TestStatus, parse_error_line, parse_line};
use crate::core::report::build_error_message;
use crate::tree::{MESSAGES_LABEL, Node, NodeKind};

/// Run progress reported to an optional listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Started { total: u64 },
    Completed { current: u64, total: u64 },
    Finished,
}

pub type ProgressListener = Box<dyn FnMut(Progress)>;

/// Result tree for one project folder.
pub struct ResultTree {
    root: Node,
    history: Vec<Event>,
    pending: Vec<String>,
    completed: u64,
    total: u64,
    progress: Option<ProgressListener>,
}

impl fmt::Debug for ResultTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultTree")
            .field("root", &self.root)
            .field("history", &self.history)
            .field("pending", &self.pending)
            .field("completed", &self.completed)
            .field("total", &self.total)
            .finish_non_exhaustive()
    }
}

impl Default for ResultTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultTree {
    pub fn new() -> Self {
        Self {
            root: Node::root(),
            history: Vec::new(),
            pending: Vec::new(),
            completed: 0,
            total: 0,
            progress: None,
        }
    }

    pub fn with_progress(listener: impl FnMut(Progress) + 'static) -> Self {
        Self {
            progress: Some(Box::new(listener)),
            ..Self::new()
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Name shown for the root (usually the project folder).
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.root.name = name.into();
    }

    /// Events received since the last run started.
    pub fn history(&self) -> &[Event] {
        &self.history
    }

    /// Messages waiting for the next completed test.
    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    /// True while the running placeholder is shown.
    pub fn is_running(&self) -> bool {
        self.root.children.first().is_some_and(Node::is_running)
    }

    /// Feed stdout lines in arrival order. Blank lines are ignored.
    pub fn parse<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            let line = line.as_ref();
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(line) {
                Output::Message { line } => self.message(line),
                Output::Result { event } => self.accept(event),
            }
        }
    }

    pub fn feed_lines<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.parse(lines);
    }

    /// Feed stderr lines; compiler errors are rendered as readable text.
    pub fn feed_error_lines<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rendered: Vec<String> = lines
            .into_iter()
            .filter(|line| !line.as_ref().trim().is_empty())
            .map(|line| build_error_message(&parse_error_line(line.as_ref())))
            .collect();
        self.set_errors(rendered);
    }

    /// Queue error text for the next completed test (or the trailing
    /// messages node).
    pub fn set_errors<I, S>(&mut self, errors: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for error in errors {
            let error = error.as_ref();
            if !error.is_empty() {
                self.pending.push(format!("error: {error}"));
            }
        }
    }

    /// Free text waits for the next completed test. Whatever is still
    /// waiting when the run ends goes under the trailing messages node.
    pub fn message(&mut self, line: impl Into<String>) {
        let line = line.into();
        if !line.is_empty() {
            self.pending.push(line);
        }
    }

    pub fn accept(&mut self, event: Event) {
        match event {
            Event::RunStart { test_count } => {
                self.start_run();
                self.total = test_count;
                self.history.push(event);
                self.notify(Progress::Started { total: test_count });
            }
            Event::TestCompleted(completed) => {
                self.add_completed(completed);
            }
            Event::RunComplete { .. } => {
                self.history.push(event);
                self.complete();
                self.notify(Progress::Finished);
            }
        }
    }

    fn add_completed(&mut self, mut event: TestCompleted) {
        self.clear_running();
        event.messages = mem::take(&mut self.pending);

        let breadcrumb = event.labels.join(" > ");
        let attached = event.messages.clone();
        let todo = match &event.status {
            TestStatus::Todo { comment } => Some(comment.clone()),
            _ => None,
        };
        debug!(labels = ?event.labels, messages = attached.len(), "test completed");
        self.history.push(Event::TestCompleted(event.clone()));

        let leaf = self.root.add_result(event);
        if !attached.is_empty() {
            leaf.messages.push(breadcrumb);
            leaf.messages.extend(attached);
        }
        if let Some(comment) = todo {
            let text = format!("todo: {comment}");
            leaf.children.push(Node::annotation(comment, text));
        }

        self.completed += 1;
        self.notify(Progress::Completed {
            current: self.completed,
            total: self.total,
        });
    }

    /// Reset for a new run and show the running placeholder.
    pub fn start_run(&mut self) {
        self.history.clear();
        self.pending.clear();
        self.root.children = vec![Node::running()];
        self.completed = 0;
        self.total = 0;
    }

    pub fn notify_run_starting(&mut self) {
        self.start_run();
    }

    /// End the run: drop the placeholder and keep leftover messages visible.
    pub fn complete(&mut self) {
        self.clear_running();
        if !self.pending.is_empty() {
            self.root.children.push(Node {
                kind: NodeKind::Annotation,
                messages: mem::take(&mut self.pending),
                ..Node::group(MESSAGES_LABEL)
            });
        }
    }

    pub fn notify_run_finished(&mut self) {
        self.complete();
    }

    /// Forget everything; the root keeps its name.
    pub fn reset(&mut self) {
        self.root.children.clear();
        self.root.messages.clear();
        self.history.clear();
        self.pending.clear();
        self.completed = 0;
        self.total = 0;
    }

    fn clear_running(&mut self) {
        self.root.children.retain(|child| !child.is_running());
    }

    fn notify(&mut self, progress: Progress) {
        if let Some(listener) = self.progress.as_mut() {
            listener(progress);
        }
    }
}
