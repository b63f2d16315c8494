//! Runner configuration stored in `elm-test-runner.toml`.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "elm-test-runner.toml";

/// Runner configuration (TOML).
///
/// Missing fields fall back to the defaults below, so an empty file is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunnerConfig {
    /// Directory holding test modules, relative to the project root.
    pub tests_dir: String,

    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReportConfig {
    /// Print attached messages and failure text under failed tests.
    pub show_messages: bool,
    /// Print each test's duration in milliseconds.
    pub show_durations: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            show_messages: true,
            show_durations: false,
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            tests_dir: "tests".to_string(),
            report: ReportConfig::default(),
        }
    }
}

impl RunnerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tests_dir.trim().is_empty() {
            return Err(anyhow!("tests_dir must be a non-empty path"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `RunnerConfig::default()`.
pub fn load_config(path: &Path) -> Result<RunnerConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        let cfg = RunnerConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RunnerConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk.
///
/// The TOML is written and synced to a hidden sibling file, then renamed
/// over `path`.
pub fn write_config(path: &Path, cfg: &RunnerConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("create directory {}", dir.display()))?;
    let file_name = path
        .file_name()
        .with_context(|| format!("config path has no file name {}", path.display()))?;
    let staging = dir.join(format!(".{}.partial", file_name.to_string_lossy()));

    let mut file = File::create(&staging)
        .with_context(|| format!("create staging file {}", staging.display()))?;
    file.write_all(buf.as_bytes())
        .and_then(|()| file.sync_all())
        .with_context(|| format!("write staging file {}", staging.display()))?;
    fs::rename(&staging, path).with_context(|| format!("replace config {}", path.display()))?;
    debug!(path = %path.display(), "wrote config");
    Ok(())
}
