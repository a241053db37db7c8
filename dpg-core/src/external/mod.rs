// ============================================================================
// dpg-core/src/external/mod.rs
// ============================================================================
//
// EXTERNAL TOOLS: Interactions with ffmpeg and ffprobe
//
// This module encapsulates every subprocess the converter runs. Traits sit at
// the seams so the pipeline can be driven by test doubles.
//
// KEY COMPONENTS:
// - ffmpeg_builder: Immutable encode/screenshot specs rendered to arguments
// - ffmpeg_executor: FfmpegSpawner/FfmpegProcess and the ffmpeg-sidecar backend
// - ffprobe_executor: MediaProbe and the ffprobe backend
// - check_dependency: Verifies that a tool is installed and answers -version

use crate::error::{CoreResult, command_failed_error, command_start_error};

use std::process::{Command, Stdio};

pub mod ffmpeg_builder;
pub mod ffmpeg_executor;
pub mod ffprobe_executor;

pub use ffmpeg_builder::{
    AudioEncodeSpec, AudioSource, ScreenshotSpec, VideoEncodeSpec, VideoEncodeSpecBuilder,
    VideoFilterChain, render_command_line,
};
pub use ffmpeg_executor::{
    EncoderEvent, FfmpegProcess, FfmpegSpawner, SidecarProcess, SidecarSpawner, run_ffmpeg,
};
pub use ffprobe_executor::{FfprobeExecutor, MediaInfo, MediaProbe};

/// Tools the converter cannot work without.
pub const REQUIRED_TOOLS: [&str; 2] = ["ffmpeg", "ffprobe"];

/// Checks that `cmd_name -version` runs and identifies itself.
///
/// # Errors
///
/// * `CoreError::DependencyNotFound` - the command is not installed
/// * `CoreError::CommandFailed` - it exits non-zero or prints something other
///   than `<cmd_name> version ...`
pub fn check_dependency(cmd_name: &str) -> CoreResult<String> {
    let output = Command::new(cmd_name)
        .arg("-version")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .map_err(|e| {
            log::warn!("Dependency '{cmd_name}' could not be started: {e}");
            command_start_error(cmd_name, e)
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let version_line = stdout.lines().next().unwrap_or_default().to_string();
    if !output.status.success() || !version_line.starts_with(&format!("{cmd_name} version")) {
        return Err(command_failed_error(
            format!("{cmd_name} -version"),
            output.status,
            format!("unexpected version output '{version_line}'"),
        ));
    }

    log::debug!("Found dependency: {version_line}");
    Ok(version_line)
}

/// Runs [`check_dependency`] for every tool in [`REQUIRED_TOOLS`].
pub fn check_required_tools() -> CoreResult<()> {
    for tool in REQUIRED_TOOLS {
        check_dependency(tool)?;
    }
    Ok(())
}
