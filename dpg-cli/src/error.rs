// ============================================================================
// dpg-cli/src/error.rs
// ============================================================================
//
// CLI ERROR HANDLING: Result alias and error presentation
//
// The CLI reuses dpg-core's error type. Every error that reaches main is
// printed once to stderr and ends the process with exit status 1.

use console::style;
use dpg_core::{CoreError, CoreResult};

/// Type alias for CLI results using CoreError.
pub type CliResult<T> = CoreResult<T>;

/// Exit status for any unrecoverable error.
pub const FAILURE_EXIT_CODE: i32 = 1;

/// Renders an error for the terminal, with the failing command's exit code
/// when there is one.
pub fn render_error(error: &CoreError) -> String {
    let mut message = format!("{} {error}", style("Error:").red().bold());
    if let Some(code) = error.exit_code() {
        message.push_str(&format!(" (exit code {code})"));
    }
    message
}
