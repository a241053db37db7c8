// ============================================================================
// dpg-core/src/config.rs
// ============================================================================
//
// CONFIGURATION: Core Configuration Structures and Constants
//
// This module defines the fixed properties of the target device and the
// user-tunable conversion settings.
//
// KEY COMPONENTS:
// - Screen, audio and bitrate constants of the DPG4 format
// - Framerate: validated MPEG-1 framerate
// - VideoQuality: encoder tuning preset
// - ConversionConfig: per-run settings passed to the pipeline
//
// USAGE:
// Instances of ConversionConfig are created by consumers of the library (like
// dpg-cli) and passed to `process_tasks` to control encoding behavior.

use crate::error::{CoreError, CoreResult};
use crate::subtitles::{SubtitleFont, SubtitleSelector};

use std::fmt;
use std::path::PathBuf;

// ============================================================================
// DEVICE CONSTANTS
// ============================================================================

/// Width of the handheld screen in pixels.
pub const SCREEN_WIDTH: u32 = 256;

/// Height of the handheld screen in pixels.
pub const SCREEN_HEIGHT: u32 = 192;

/// Sample rate of the audio stream, also written to the header.
pub const AUDIO_SAMPLE_RATE: u32 = 32000;

/// MP2 audio bitrate in kbit/s.
pub const AUDIO_BITRATE_KBPS: u32 = 128;

/// MPEG-1 video bitrate in kbit/s.
pub const VIDEO_BITRATE_KBPS: u32 = 256;

/// Outputs shorter than this are re-encoded with the source looped.
pub const MIN_OUTPUT_DURATION_SECS: f64 = 30.0;

/// Extension of produced container files.
pub const CONTAINER_EXTENSION: &str = "dpg";

/// Framerates defined by the MPEG-1 specification.
pub const MPEG_SPEC_FRAMERATES: [f64; 8] = [23.976, 24.0, 25.0, 29.97, 30.0, 50.0, 59.94, 60.0];

/// Framerates libavcodec only accepts with `-strict unofficial`.
pub const MPEG_UNOFFICIAL_FRAMERATES: [f64; 4] = [5.0, 10.0, 12.0, 15.0];

/// Default output framerate.
pub const DEFAULT_FRAMERATE: f64 = 24.0;

// ============================================================================
// FRAMERATE
// ============================================================================

/// An output framerate accepted by the MPEG-1 encoder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Framerate(f64);

impl Framerate {
    pub fn new(fps: f64) -> CoreResult<Self> {
        let known = MPEG_SPEC_FRAMERATES
            .iter()
            .chain(MPEG_UNOFFICIAL_FRAMERATES.iter())
            .any(|&rate| (rate - fps).abs() < f64::EPSILON);
        if known {
            Ok(Self(fps))
        } else {
            Err(CoreError::Validation(format!(
                "unsupported framerate {fps}; choose one of {}",
                supported_framerates()
            )))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Whether the rate is part of the MPEG-1 specification. Other rates
    /// need `-strict unofficial` and may drift out of sync on the device.
    pub fn is_standard(self) -> bool {
        MPEG_SPEC_FRAMERATES
            .iter()
            .any(|&rate| (rate - self.0).abs() < f64::EPSILON)
    }

    /// Seconds of playback represented by `frame_count` frames.
    pub fn duration_of(self, frame_count: u64) -> f64 {
        frame_count as f64 / self.0
    }
}

impl Default for Framerate {
    fn default() -> Self {
        Self(DEFAULT_FRAMERATE)
    }
}

impl fmt::Display for Framerate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn supported_framerates() -> String {
    MPEG_SPEC_FRAMERATES
        .iter()
        .chain(MPEG_UNOFFICIAL_FRAMERATES.iter())
        .map(|rate| rate.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// VIDEO QUALITY
// ============================================================================

/// Encoder tuning preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoQuality {
    #[default]
    Default,
    High,
}

impl TryFrom<u8> for VideoQuality {
    type Error = CoreError;

    fn try_from(level: u8) -> CoreResult<Self> {
        match level {
            1 => Ok(VideoQuality::Default),
            2 => Ok(VideoQuality::High),
            other => Err(CoreError::Validation(format!(
                "unknown quality level {other}; expected 1 or 2"
            ))),
        }
    }
}

impl fmt::Display for VideoQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoQuality::Default => write!(f, "default"),
            VideoQuality::High => write!(f, "high"),
        }
    }
}

// ============================================================================
// CONVERSION CONFIGURATION
// ============================================================================

/// Settings shared by every task of a conversion run.
#[derive(Debug, Clone, Default)]
pub struct ConversionConfig {
    pub framerate: Framerate,
    pub quality: VideoQuality,
    /// Audio stream to encode, counted among audio streams only. `None` picks
    /// the first one.
    pub audio_stream: Option<usize>,
    pub subtitles: SubtitleSelector,
    pub font: SubtitleFont,
    /// Where per-task scratch directories are created. Defaults to the
    /// system temp directory.
    pub temp_dir: Option<PathBuf>,
}

impl ConversionConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if let Some(size) = self.font.size {
            if size == 0 {
                return Err(CoreError::Validation(
                    "subtitle font size must be positive".to_string(),
                ));
            }
        }
        if let Some(name) = &self.font.name {
            if name.trim().is_empty() {
                return Err(CoreError::Validation(
                    "subtitle font name must not be empty".to_string(),
                ));
            }
        }
        if let Some(dir) = &self.temp_dir {
            if dir.exists() && !dir.is_dir() {
                return Err(CoreError::PathError(format!(
                    "temp directory '{}' is not a directory",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framerate_accepts_spec_and_unofficial_rates() {
        assert!(Framerate::new(23.976).unwrap().is_standard());
        assert!(Framerate::new(60.0).unwrap().is_standard());
        let unofficial = Framerate::new(15.0).unwrap();
        assert!(!unofficial.is_standard());
    }

    #[test]
    fn test_framerate_rejects_unknown_rate() {
        let err = Framerate::new(23.0).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(err.to_string().contains("23.976"));
    }

    #[test]
    fn test_framerate_duration() {
        let fps = Framerate::new(24.0).unwrap();
        assert_eq!(fps.duration_of(720), 30.0);
        assert_eq!(fps.duration_of(0), 0.0);
    }

    #[test]
    fn test_quality_levels() {
        assert_eq!(VideoQuality::try_from(1).unwrap(), VideoQuality::Default);
        assert_eq!(VideoQuality::try_from(2).unwrap(), VideoQuality::High);
        assert!(VideoQuality::try_from(3).is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = ConversionConfig::default();
        assert_eq!(config.framerate.value(), DEFAULT_FRAMERATE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_font_size_is_rejected() {
        let mut config = ConversionConfig::default();
        config.font.size = Some(0);
        assert!(config.validate().is_err());
    }
}
