//! Reading report lines from a file or stdin.

use std::fs;
use std::io::{self, BufRead};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

/// Read all lines from `path`, or from stdin when `path` is `None`.
pub fn read_lines(path: Option<&Path>) -> Result<Vec<String>> {
    let lines = match path {
        Some(path) => {
            let contents =
                fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
            contents.lines().map(str::to_string).collect::<Vec<_>>()
        }
        None => io::stdin()
            .lock()
            .lines()
            .collect::<io::Result<Vec<_>>>()
            .context("read stdin")?,
    };
    debug!(count = lines.len(), "read input lines");
    Ok(lines)
}

/// Read a source file to search for test declarations.
pub fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read source {}", path.display()))
}
