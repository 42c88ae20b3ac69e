//! Stable exit codes for dispatcher CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid configuration or rule table.
pub const INVALID: i32 = 1;
/// An input file or stream could not be read.
pub const IO: i32 = 2;
