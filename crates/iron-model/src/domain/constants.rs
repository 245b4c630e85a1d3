//! Common model-level constants.
//!
//! Exit codes and well-known key segments shared by the supervisor crates.

/// Exit code reported when supervision itself fails (store unreachable, spawn failure,
/// undeterminable child status, ...).
pub const INTERNAL_FAILURE_EXIT_CODE: i32 = 111;

/// Base added to the signal number when a child is terminated by a signal (shell convention).
pub const SIGNAL_EXIT_BASE: i32 = 128;

/// Key segment under the application prefix where the supervisor writes process metadata.
///
/// Keys below `<prefix>/metadata/` never become environment variables.
pub const METADATA_SEGMENT: &str = "metadata";
