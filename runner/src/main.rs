//! Command-line driver for `elm-test --report json` output.
//!
//! Reads a captured report (or stdin), folds it into a result tree and prints
//! it. The driver never spawns `elm-test` itself.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::debug;

use elm_test_runner::core::locate::{locate_test, test_file_path};
use elm_test_runner::core::protocol::{TestCompleted, TestStatus, parse_error_line};
use elm_test_runner::core::report::build_error_message;
use elm_test_runner::core::result_tree::ResultTree;
use elm_test_runner::exit_codes;
use elm_test_runner::io::config::{DEFAULT_CONFIG_FILE, RunnerConfig, load_config, write_config};
use elm_test_runner::io::input::{read_lines, read_source};
use elm_test_runner::logging;
use elm_test_runner::render::render_tree;

#[derive(Parser)]
#[command(
    name = "elm-test-runner",
    version,
    about = "Fold elm-test JSON reports into a test tree"
)]
struct Cli {
    /// Path to the runner config file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a config file with default settings.
    Init {
        /// Overwrite an existing config file.
        #[arg(short, long)]
        force: bool,
    },
    /// Print the test tree of a `--report json` capture (stdin when FILE is omitted).
    Report {
        file: Option<PathBuf>,
        /// Print the tree as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Print readable compiler errors from captured stderr lines.
    Errors { file: Option<PathBuf> },
    /// Print the 1-based `line:column` of a test in its source file.
    Locate {
        /// Source file; defaults to the module's file under `tests_dir`.
        #[arg(long)]
        file: Option<PathBuf>,
        /// Label path, module first.
        #[arg(required = true, num_args = 2..)]
        labels: Vec<String>,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force),
        Command::Report { file, json } => {
            cmd_report(&load_config(&cli.config)?, file.as_deref(), json)
        }
        Command::Errors { file } => cmd_errors(file.as_deref()),
        Command::Locate { file, labels } => {
            cmd_locate(&load_config(&cli.config)?, file.as_deref(), labels)
        }
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<i32> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    write_config(path, &RunnerConfig::default())
        .with_context(|| format!("initialise {}", path.display()))?;
    println!("wrote {}", path.display());
    Ok(exit_codes::OK)
}

fn cmd_report(config: &RunnerConfig, file: Option<&Path>, json: bool) -> Result<i32> {
    let lines = read_lines(file)?;
    let mut tree = ResultTree::new();
    tree.parse(&lines);
    tree.complete();

    let root = tree.root();
    if json {
        let payload = serde_json::to_string_pretty(root).context("serialize result tree")?;
        println!("{payload}");
    } else {
        print!("{}", render_tree(root, &config.report));
    }

    if root.green() {
        Ok(exit_codes::OK)
    } else {
        Ok(exit_codes::FAILED)
    }
}

fn cmd_errors(file: Option<&Path>) -> Result<i32> {
    for line in read_lines(file)? {
        if line.trim().is_empty() {
            continue;
        }
        println!("{}", build_error_message(&parse_error_line(&line)));
    }
    Ok(exit_codes::OK)
}

fn cmd_locate(config: &RunnerConfig, file: Option<&Path>, labels: Vec<String>) -> Result<i32> {
    let Some(module) = labels.first() else {
        bail!("locate needs a module label");
    };
    let path = match file {
        Some(path) => path.to_path_buf(),
        None => test_file_path(Path::new("."), &config.tests_dir, module),
    };
    let source = read_source(&path)?;
    let event = TestCompleted {
        labels,
        duration: 0,
        status: TestStatus::Pass,
        messages: Vec::new(),
    };

    match locate_test(&event, &source) {
        Some(location) => {
            println!("{}:{}", location.line + 1, location.column + 1);
            Ok(exit_codes::OK)
        }
        None => {
            debug!(path = %path.display(), labels = ?event.labels, "test not found");
            eprintln!("test not found in {}", path.display());
            Ok(exit_codes::FAILED)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init() {
        let cli = Cli::parse_from(["elm-test-runner", "init"]);
        assert!(matches!(cli.command, Command::Init { force: false }));
    }

    #[test]
    fn parse_init_force() {
        let cli = Cli::parse_from(["elm-test-runner", "init", "--force"]);
        assert!(matches!(cli.command, Command::Init { force: true }));
    }

    #[test]
    fn parse_report_defaults() {
        let cli = Cli::parse_from(["elm-test-runner", "report"]);
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
        assert!(matches!(
            cli.command,
            Command::Report {
                file: None,
                json: false
            }
        ));
    }

    #[test]
    fn parse_report_file_and_json() {
        let cli = Cli::parse_from(["elm-test-runner", "report", "out.jsonl", "--json"]);
        match cli.command {
            Command::Report { file, json } => {
                assert_eq!(file, Some(PathBuf::from("out.jsonl")));
                assert!(json);
            }
            _ => panic!("expected report"),
        }
    }

    #[test]
    fn parse_global_config_after_subcommand() {
        let cli = Cli::parse_from(["elm-test-runner", "errors", "--config", "custom.toml"]);
        assert_eq!(cli.config, PathBuf::from("custom.toml"));
        assert!(matches!(cli.command, Command::Errors { file: None }));
    }

    #[test]
    fn parse_locate_labels() {
        let cli = Cli::parse_from([
            "elm-test-runner",
            "locate",
            "--file",
            "tests/A.elm",
            "A",
            "suite",
            "works",
        ]);
        match cli.command {
            Command::Locate { file, labels } => {
                assert_eq!(file, Some(PathBuf::from("tests/A.elm")));
                assert_eq!(labels, vec!["A", "suite", "works"]);
            }
            _ => panic!("expected locate"),
        }
    }

    #[test]
    fn locate_requires_a_test_below_the_module() {
        assert!(Cli::try_parse_from(["elm-test-runner", "locate", "A"]).is_err());
    }
}
