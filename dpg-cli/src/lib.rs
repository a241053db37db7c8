// dpg-cli/src/lib.rs
//
// Library portion of the dpgv4 CLI application.
// Contains argument definitions and command logic.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;

// Re-export items needed by the binary or integration tests
pub use cli::{Cli, Commands, ConvertArgs, InfoArgs};
pub use commands::{run_convert, run_info};
pub use error::{CliResult, render_error};
