//! Progress extraction from ffmpeg events.
//!
//! ffmpeg-sidecar reports the input length once (`ParsedDuration`) and then a
//! stream of `Progress` updates carrying the output position.
//! [`encoder_event`] keeps the events the converter cares about and
//! [`ProgressTracker`] turns them into [`ProgressSnapshot`]s for a
//! [`Reporter`].

use crate::external::ffmpeg_executor::EncoderEvent;
use crate::reporting::{EncodeStage, ProgressSnapshot, Reporter};
use crate::utils::parse_ffmpeg_time;

use ffmpeg_sidecar::event::FfmpegEvent;

/// Narrows a sidecar event to an [`EncoderEvent`].
///
/// Progress updates without a usable `time` (`N/A` before the first packet)
/// and events the converter never looks at are dropped.
#[must_use]
pub fn encoder_event(event: FfmpegEvent) -> Option<EncoderEvent> {
    match event {
        FfmpegEvent::ParsedDuration(parsed) => Some(EncoderEvent::Duration(parsed.duration)),
        FfmpegEvent::Progress(progress) => {
            parse_ffmpeg_time(&progress.time).map(|time_secs| EncoderEvent::Progress { time_secs })
        }
        FfmpegEvent::Log(_, message) => Some(EncoderEvent::Log(message)),
        FfmpegEvent::Error(error) => Some(EncoderEvent::Log(error)),
        _ => None,
    }
}

/// Follows one encode and forwards progress to a reporter.
pub struct ProgressTracker<'a> {
    stage: EncodeStage,
    reporter: &'a dyn Reporter,
    total_secs: Option<f64>,
    /// Set for encodes whose output length is known up front (`-t`).
    fixed_total: bool,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(stage: EncodeStage, reporter: &'a dyn Reporter) -> Self {
        Self {
            stage,
            reporter,
            total_secs: None,
            fixed_total: false,
        }
    }

    /// Uses `total_secs` as the reporting total and ignores `Duration:` lines.
    pub fn with_fixed_total(mut self, total_secs: f64) -> Self {
        self.total_secs = Some(total_secs);
        self.fixed_total = true;
        self
    }

    pub fn total_secs(&self) -> Option<f64> {
        self.total_secs
    }

    pub fn handle(&mut self, event: &EncoderEvent) {
        match event {
            EncoderEvent::Duration(total) => {
                if !self.fixed_total && self.total_secs.is_none() && *total > 0.0 {
                    log::debug!("{}: input duration {total:.2}s", self.stage);
                    self.total_secs = Some(*total);
                }
            }
            EncoderEvent::Progress { time_secs } => {
                let percent = self
                    .total_secs
                    .filter(|&t| t > 0.0)
                    .map(|t| (time_secs / t * 100.0).clamp(0.0, 100.0));
                self.reporter.progress(&ProgressSnapshot {
                    stage: self.stage,
                    current_secs: *time_secs,
                    total_secs: self.total_secs,
                    percent,
                });
            }
            EncoderEvent::Log(line) => {
                log::trace!(target: "ffmpeg_log", "{line}");
            }
        }
    }
}
