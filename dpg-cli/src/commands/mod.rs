//! Command implementations for the CLI.
//!
//! Each submodule contains the implementation of a specific command.

/// Converts inputs to DPG4 containers.
pub mod convert;
/// Prints the probed streams and target geometry of one file.
pub mod info;

pub use convert::run_convert;
pub use info::run_info;
