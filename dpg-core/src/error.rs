// ============================================================================
// dpg-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Custom Error Types for dpg-core
//
// This module defines the error type used throughout the library together
// with a handful of constructors for the recurring subprocess failures.
//
// KEY COMPONENTS:
// - CoreError: Enum of everything that can go wrong during a conversion
// - CoreResult: Result alias using CoreError
// - command_*_error: Helpers that attach command context to process errors

use std::io;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors produced by the dpg-core library.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A required external binary (ffmpeg, ffprobe) is not installed.
    #[error("Required external command not found: {0}")]
    DependencyNotFound(String),

    #[error("Failed to start command '{0}': {1}")]
    CommandStart(String, #[source] io::Error),

    #[error("Failed while waiting for command '{0}': {1}")]
    CommandWait(String, #[source] io::Error),

    /// An external process exited unsuccessfully.
    #[error("Command '{command}' failed with {status}{}", format_stderr(.stderr))]
    CommandFailed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    /// Input the user could never have meant (bad selector, bad geometry, ...).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A value does not fit the fixed-width slot it is written to.
    #[error("Value {value} does not fit in the '{field}' field")]
    Range { field: &'static str, value: String },

    #[error("Failed to parse ffprobe output: {0}")]
    ProbeParse(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Directory traversal error: {0}")]
    Walkdir(#[from] walkdir::Error),

    /// Bytes copied into the container disagree with the sizes in its header.
    #[error("{stream} size mismatch: header says {expected} bytes, wrote {actual}")]
    SizeMismatch {
        stream: &'static str,
        expected: u64,
        actual: u64,
    },

    #[error("Path error: {0}")]
    PathError(String),

    #[error("No processable video files found")]
    NoFilesFound,

    #[error("{0}")]
    OperationFailed(String),
}

impl CoreError {
    /// Exit code of a failed external command, if the process exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            CoreError::CommandFailed { status, .. } => status.code(),
            _ => None,
        }
    }

    /// True for failures reported by an external process that ran to completion.
    pub fn is_command_failure(&self) -> bool {
        matches!(self, CoreError::CommandFailed { .. })
    }
}

fn format_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

/// Result type for dpg-core operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Maps a spawn failure to `DependencyNotFound` when the binary is missing,
/// otherwise to `CommandStart`.
pub fn command_start_error(command: impl Into<String>, err: io::Error) -> CoreError {
    let command = command.into();
    if err.kind() == io::ErrorKind::NotFound {
        CoreError::DependencyNotFound(command)
    } else {
        CoreError::CommandStart(command, err)
    }
}

pub fn command_wait_error(command: impl Into<String>, err: io::Error) -> CoreError {
    CoreError::CommandWait(command.into(), err)
}

pub fn command_failed_error(
    command: impl Into<String>,
    status: ExitStatus,
    stderr: impl Into<String>,
) -> CoreError {
    CoreError::CommandFailed {
        command: command.into(),
        status,
        stderr: stderr.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_maps_to_dependency_not_found() {
        let err = command_start_error("ffmpeg", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, CoreError::DependencyNotFound(ref name) if name == "ffmpeg"));

        let err = command_start_error(
            "ffmpeg",
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert!(matches!(err, CoreError::CommandStart(..)));
    }

    #[test]
    fn test_range_error_message_names_field() {
        let err = CoreError::Range {
            field: "frame_count",
            value: "4294967296".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("frame_count"));
        assert!(message.contains("4294967296"));
    }

    #[test]
    fn test_non_command_errors_have_no_exit_code() {
        assert_eq!(CoreError::Validation("x".into()).exit_code(), None);
        assert!(!CoreError::NoFilesFound.is_command_failure());
    }
}
