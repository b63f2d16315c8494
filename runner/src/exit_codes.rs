//! Stable exit codes for runner CLI commands.

/// Command succeeded; for `report`, every test passed.
pub const OK: i32 = 0;
/// Command failed due to unreadable input, invalid config or other errors.
pub const INVALID: i32 = 1;
/// `report` saw a failed test (or no passing test); `locate` found nothing.
pub const FAILED: i32 = 2;
