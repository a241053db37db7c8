// ============================================================================
// dpg-core/src/processing/encode.rs
// ============================================================================
//
// STREAM ENCODING: Video and audio elementary streams for one task
//
// Each stream is rendered from an immutable spec and run through ffmpeg with
// progress forwarded to the reporter. Two recoveries exist and each fires at
// most once:
//
// - A video shorter than MIN_OUTPUT_DURATION_SECS is encoded again with the
//   input looped and the output cut at that length.
// - A failed audio encode is replaced by generated silence as long as the
//   video.
//
// Everything else propagates to the caller.

use crate::config::{ConversionConfig, Framerate, MIN_OUTPUT_DURATION_SECS};
use crate::error::{CoreError, CoreResult};
use crate::external::ffmpeg_builder::{AudioEncodeSpec, AudioSource, VideoEncodeSpec};
use crate::external::ffmpeg_executor::{FfmpegSpawner, run_ffmpeg};
use crate::external::ffprobe_executor::{MediaInfo, MediaProbe};
use crate::progress_reporting::ProgressTracker;
use crate::reporting::{EncodeStage, Reporter};

use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
}

/// An elementary stream written into the task's scratch directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedStream {
    pub kind: StreamKind,
    pub path: PathBuf,
    pub size: u64,
}

impl EncodedStream {
    fn from_file(kind: StreamKind, path: &Path) -> CoreResult<Self> {
        let size = fs::metadata(path)?.len();
        Ok(Self {
            kind,
            path: path.to_path_buf(),
            size,
        })
    }
}

#[derive(Debug, Clone)]
pub struct EncodedVideo {
    pub stream: EncodedStream,
    pub frame_count: u64,
    /// The short-source loop was applied.
    pub looped: bool,
}

#[derive(Debug, Clone)]
pub struct EncodedAudio {
    pub stream: EncodedStream,
    /// The track is generated silence rather than a source stream.
    pub silent: bool,
}

/// Runs one ffmpeg invocation as a reported stage.
fn run_stage<S: FfmpegSpawner>(
    spawner: &S,
    reporter: &dyn Reporter,
    stage: EncodeStage,
    args: &[String],
    fixed_total: Option<f64>,
) -> CoreResult<()> {
    reporter.stage_started(stage);
    let mut tracker = ProgressTracker::new(stage, reporter);
    if let Some(total) = fixed_total {
        tracker = tracker.with_fixed_total(total);
    }
    run_ffmpeg(spawner, args, |event| tracker.handle(event))?;
    reporter.stage_finished(stage);
    Ok(())
}

/// Encodes the video stream and counts its frames.
///
/// When the result plays for less than [`MIN_OUTPUT_DURATION_SECS`] the
/// encode is repeated once from a looped copy of `spec` and the frames are
/// counted again.
pub fn encode_video<S, P>(
    spawner: &S,
    probe: &P,
    spec: &VideoEncodeSpec,
    reporter: &dyn Reporter,
) -> CoreResult<EncodedVideo>
where
    S: FfmpegSpawner,
    P: MediaProbe + ?Sized,
{
    let framerate = spec.framerate();
    run_stage(spawner, reporter, EncodeStage::Video, &spec.to_args(), None)?;
    let mut frame_count = probe.count_frames(spec.output())?;
    let mut looped = false;

    let duration = framerate.duration_of(frame_count);
    if duration < MIN_OUTPUT_DURATION_SECS {
        log::info!(
            "video plays for {duration:.2}s, looping the source to {MIN_OUTPUT_DURATION_SECS}s"
        );
        let looped_spec = spec.looped(MIN_OUTPUT_DURATION_SECS)?;
        run_stage(
            spawner,
            reporter,
            EncodeStage::LoopedVideo,
            &looped_spec.to_args(),
            Some(MIN_OUTPUT_DURATION_SECS),
        )?;
        frame_count = probe.count_frames(looped_spec.output())?;
        looped = true;
    }

    log::debug!("video stream has {frame_count} frames");
    Ok(EncodedVideo {
        stream: EncodedStream::from_file(StreamKind::Video, spec.output())?,
        frame_count,
        looped,
    })
}

/// Checks that the configured audio stream exists in a source with audio.
///
/// # Errors
///
/// `CoreError::Validation` when the index is past the probed stream count.
pub fn check_audio_stream(input: &Path, info: &MediaInfo, config: &ConversionConfig) -> CoreResult<()> {
    let index = config.audio_stream.unwrap_or(0);
    if info.audio_streams > 0 && index >= info.audio_streams {
        return Err(CoreError::Validation(format!(
            "audio stream {index} does not exist; {} has {} audio stream(s)",
            input.display(),
            info.audio_streams
        )));
    }
    Ok(())
}

/// Chooses the audio source for a task. A source without audio streams gets
/// `silence_secs` of silence directly.
pub fn plan_audio(
    input: &Path,
    info: &MediaInfo,
    config: &ConversionConfig,
    output: &Path,
    silence_secs: f64,
) -> CoreResult<AudioEncodeSpec> {
    check_audio_stream(input, info, config)?;
    let spec = AudioEncodeSpec::from_stream(input, config.audio_stream.unwrap_or(0), output);

    if info.audio_streams == 0 {
        log::info!("{} has no audio stream, using silence", input.display());
        return spec.with_silence(silence_secs);
    }
    Ok(spec)
}

/// Encodes the audio stream.
///
/// If an encode from a source stream exits non-zero it is retried once with
/// `frame_count / framerate` seconds of silence.
pub fn encode_audio<S: FfmpegSpawner>(
    spawner: &S,
    spec: &AudioEncodeSpec,
    framerate: Framerate,
    frame_count: u64,
    reporter: &dyn Reporter,
) -> CoreResult<EncodedAudio> {
    let stage_for = |spec: &AudioEncodeSpec| match spec.source() {
        AudioSource::Stream { .. } => EncodeStage::Audio,
        AudioSource::Silence { .. } => EncodeStage::SilentAudio,
    };
    let silence_total = |spec: &AudioEncodeSpec| match spec.source() {
        AudioSource::Silence { duration_secs } => Some(*duration_secs),
        AudioSource::Stream { .. } => None,
    };

    let first = run_stage(
        spawner,
        reporter,
        stage_for(spec),
        &spec.to_args(),
        silence_total(spec),
    );

    let silent = match first {
        Ok(()) => matches!(spec.source(), AudioSource::Silence { .. }),
        Err(e) if e.is_command_failure() && matches!(spec.source(), AudioSource::Stream { .. }) => {
            let message = format!("audio encode failed, using silence instead: {e}");
            log::warn!("{message}");
            reporter.warning(&message);

            let silent_spec = spec.with_silence(framerate.duration_of(frame_count))?;
            run_stage(
                spawner,
                reporter,
                EncodeStage::SilentAudio,
                &silent_spec.to_args(),
                silence_total(&silent_spec),
            )?;
            true
        }
        Err(e) => return Err(e),
    };

    Ok(EncodedAudio {
        stream: EncodedStream::from_file(StreamKind::Audio, spec.output())?,
        silent,
    })
}
