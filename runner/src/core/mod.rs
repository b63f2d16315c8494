//! Deterministic, pure logic for ingesting `elm-test` reports.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod locate;
pub mod protocol;
pub mod report;
pub mod result_tree;
pub mod run_state;
pub mod unescape;
