// ============================================================================
// dpg-core/src/external/ffmpeg_executor.rs
// ============================================================================
//
// FFMPEG EXECUTOR: FFmpeg Process Management and Abstraction
//
// This module spawns ffmpeg and turns its diagnostic output into a stream of
// events for the caller.
//
// KEY COMPONENTS:
// - FfmpegProcess: Trait representing an active FFmpeg process
// - FfmpegSpawner: Trait for creating new FFmpeg processes
// - SidecarSpawner: Concrete implementation using ffmpeg-sidecar
// - run_ffmpeg: Spawn, forward events, wait and map failures
//
// ARCHITECTURE:
// ffmpeg-sidecar parses ffmpeg's stderr into `FfmpegEvent`s. The process
// wrapper narrows those to the few `EncoderEvent`s the converter acts on, so
// tests can drive the pipeline without a real ffmpeg.

use crate::error::{
    CoreError, CoreResult, command_failed_error, command_start_error, command_wait_error,
};
use crate::external::ffmpeg_builder::render_command_line;
use crate::progress_reporting::encoder_event;

use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use std::collections::VecDeque;
use std::process::ExitStatus;

/// Diagnostic lines kept for error messages.
const STDERR_TAIL_LINES: usize = 12;

/// An ffmpeg diagnostic the converter acts on.
#[derive(Debug, Clone, PartialEq)]
pub enum EncoderEvent {
    /// Length of the input, from the `Duration:` banner.
    Duration(f64),
    /// Output position from a status line.
    Progress { time_secs: f64 },
    Log(String),
}

// --- FFmpeg Execution Abstraction ---

/// Trait representing an active ffmpeg process instance.
pub trait FfmpegProcess {
    /// Feeds every event to `handler` until the process closes stderr or
    /// `handler` returns an error.
    fn handle_events<F>(&mut self, handler: F) -> CoreResult<()>
    where
        F: FnMut(EncoderEvent) -> CoreResult<()>;

    /// Waits for the command to complete and returns its exit status.
    fn wait(&mut self) -> CoreResult<ExitStatus>;
}

/// Trait representing something that can spawn an FfmpegProcess.
pub trait FfmpegSpawner {
    type Process: FfmpegProcess;

    /// Starts ffmpeg with `args` (program name excluded).
    fn spawn(&self, args: &[String]) -> CoreResult<Self::Process>;
}

// --- Concrete Implementation using ffmpeg-sidecar ---

/// Wrapper around `ffmpeg_sidecar::child::FfmpegChild` implementing `FfmpegProcess`.
pub struct SidecarProcess(FfmpegChild);

impl FfmpegProcess for SidecarProcess {
    fn handle_events<F>(&mut self, mut handler: F) -> CoreResult<()>
    where
        F: FnMut(EncoderEvent) -> CoreResult<()>,
    {
        let iterator = self.0.iter().map_err(|e| {
            log::error!("failed to read ffmpeg events: {e}");
            CoreError::OperationFailed(format!("could not read ffmpeg output: {e}"))
        })?;
        for event in iterator.filter_map(encoder_event) {
            handler(event)?;
        }
        Ok(())
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        self.0.wait().map_err(|e| command_wait_error("ffmpeg", e))
    }
}

/// Concrete implementation of `FfmpegSpawner` using `ffmpeg-sidecar`.
#[derive(Debug, Clone, Default)]
pub struct SidecarSpawner;

impl FfmpegSpawner for SidecarSpawner {
    type Process = SidecarProcess;

    fn spawn(&self, args: &[String]) -> CoreResult<Self::Process> {
        FfmpegCommand::new()
            .args(args)
            .spawn()
            .map(SidecarProcess)
            .map_err(|e| command_start_error("ffmpeg", e))
    }
}

/// Runs one ffmpeg invocation to completion.
///
/// Every event is passed to `on_event`. A non-zero exit becomes
/// `CoreError::CommandFailed` carrying the rendered command line and the
/// last diagnostic lines.
pub fn run_ffmpeg<S, F>(spawner: &S, args: &[String], mut on_event: F) -> CoreResult<()>
where
    S: FfmpegSpawner,
    F: FnMut(&EncoderEvent),
{
    let command_line = render_command_line("ffmpeg", args);
    log::debug!("running: {command_line}");

    let mut process = spawner.spawn(args)?;
    let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

    let handled = process.handle_events(|event| {
        if let EncoderEvent::Log(line) = &event {
            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line.clone());
        }
        on_event(&event);
        Ok(())
    });
    let status = process.wait()?;
    handled?;

    if status.success() {
        Ok(())
    } else {
        let stderr = tail.into_iter().collect::<Vec<_>>().join("\n");
        Err(command_failed_error(command_line, status, stderr))
    }
}
