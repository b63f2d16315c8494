//! I/O helpers for the command-line driver.

pub mod config;
pub mod input;
