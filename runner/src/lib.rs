//! Result ingestion for `elm-test --report json`.
//!
//! The crate turns the streamed JSON-lines report of `elm-test` into a
//! hierarchical test tree for an editor's test explorer. The architecture
//! keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (line parsing, failure text,
//!   source lookup, tree aggregation, run coordination). No I/O.
//! - **[`io`]**: Side-effecting operations (config files, reading input).
//!
//! The `elm-test-runner` binary is a thin driver that feeds lines from a file
//! or stdin into [`core::result_tree::ResultTree`] and prints the tree with
//! [`render`].

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod render;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tree;
