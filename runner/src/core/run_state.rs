//! Coordination of test runs across several project folders.
//!
//! Only one run may be in flight at a time. A request for the folder that is
//! already running is remembered as a single catch-up run; requests for other
//! folders are turned away until the slot is free.

use std::fmt;

use tracing::{info, warn};

use crate::core::result_tree::ResultTree;
use crate::tree::Node;

/// Starts `elm-test` for a folder path. Supplied by the driver.
pub type Runner = Box<dyn FnMut(&str)>;

/// What happened to a run request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunRequest {
    Started,
    /// Same folder already running; one catch-up run is queued.
    Coalesced,
    /// Another folder is running.
    Rejected,
    Disabled,
}

#[derive(Debug)]
struct Folder {
    path: String,
    tree: ResultTree,
    rerun: bool,
}

pub struct RunState {
    enabled: bool,
    folders: Vec<Folder>,
    in_flight: Option<String>,
    runner: Runner,
}

impl fmt::Debug for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunState")
            .field("enabled", &self.enabled)
            .field("folders", &self.folders)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl RunState {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            folders: Vec::new(),
            in_flight: None,
            runner: Box::new(|_| {}),
        }
    }

    pub fn set_runner(&mut self, runner: impl FnMut(&str) + 'static) {
        self.runner = Box::new(runner);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Stop accepting runs and forget all folders.
    pub fn disable(&mut self) {
        self.enabled = false;
        self.folders.clear();
        self.in_flight = None;
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn run_folder(&mut self, name: &str, path: &str) -> RunRequest {
        if !self.enabled {
            return RunRequest::Disabled;
        }
        let running = self.in_flight.clone();
        match running.as_deref() {
            Some(running) if running == path => {
                self.folder_mut(name, path).rerun = true;
                RunRequest::Coalesced
            }
            Some(running) => {
                warn!(requested = path, running, "run already in progress, ignoring request");
                self.folder_mut(name, path);
                RunRequest::Rejected
            }
            None => {
                self.in_flight = Some(path.to_string());
                let folder = self.folder_mut(name, path);
                folder.tree.start_run();
                (self.runner)(path);
                RunRequest::Started
            }
        }
    }

    /// Mark the run for `path` as finished and start a queued catch-up run.
    pub fn run_completed(&mut self, path: &str) {
        if self.in_flight.as_deref() == Some(path) {
            self.in_flight = None;
        }
        let Some(folder) = self.folders.iter_mut().find(|f| f.path == path) else {
            return;
        };
        folder.tree.complete();
        if folder.rerun {
            folder.rerun = false;
            let name = folder.tree.root().name.clone();
            info!(folder = %name, "catching up runs");
            self.run_folder(&name, path);
        }
    }

    /// Feed stdout lines for the folder that is currently running.
    pub fn feed_lines(&mut self, path: &str, lines: &[String]) {
        match self.running_tree(path) {
            Some(tree) => tree.feed_lines(lines),
            None => warn!(path, "dropping output for folder that is not running"),
        }
    }

    pub fn feed_error_lines(&mut self, path: &str, lines: &[String]) {
        match self.running_tree(path) {
            Some(tree) => tree.feed_error_lines(lines),
            None => warn!(path, "dropping errors for folder that is not running"),
        }
    }

    fn running_tree(&mut self, path: &str) -> Option<&mut ResultTree> {
        if self.in_flight.as_deref() != Some(path) {
            return None;
        }
        self.folders
            .iter_mut()
            .find(|f| f.path == path)
            .map(|f| &mut f.tree)
    }

    fn folder_mut(&mut self, name: &str, path: &str) -> &mut Folder {
        let index = match self.folders.iter().position(|f| f.path == path) {
            Some(index) => index,
            None => {
                self.folders.push(Folder {
                    path: path.to_string(),
                    tree: ResultTree::new(),
                    rerun: false,
                });
                self.folders.len() - 1
            }
        };
        let folder = &mut self.folders[index];
        folder.tree.set_name(name);
        folder
    }

    pub fn result_tree(&self, path: &str) -> Option<&ResultTree> {
        self.folders
            .iter()
            .find(|f| f.path == path)
            .map(|f| &f.tree)
    }

    /// Results of every folder: the folder's own root when there is only
    /// one, otherwise an unnamed root with one child per folder.
    pub fn get_all_results(&self) -> Node {
        if let [only] = self.folders.as_slice() {
            return only.tree.root().clone();
        }
        let mut all = Node::root();
        all.children = self
            .folders
            .iter()
            .map(|f| f.tree.root().clone())
            .collect();
        all
    }

    pub fn remove_folder(&mut self, path: &str) {
        self.folders.retain(|f| f.path != path);
        if self.in_flight.as_deref() == Some(path) {
            self.in_flight = None;
        }
    }
}
