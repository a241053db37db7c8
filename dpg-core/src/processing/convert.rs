//! Conversion of one source file into a finished container.
//!
//! The steps run in a fixed order inside a scratch directory that is removed
//! when the task ends: probe, subtitle and geometry decisions, video encode,
//! audio encode, thumbnail, seek index, header and finally the container
//! write.

use crate::config::ConversionConfig;
use crate::container::{
    ContainerHeader, ContainerParts, SeekIndex, SeekIndexBuilder, create_thumbnail,
    decode_screenshot, write_container,
};
use crate::error::CoreResult;
use crate::external::ffmpeg_builder::{ScreenshotSpec, VideoEncodeSpec};
use crate::external::ffmpeg_executor::{FfmpegSpawner, run_ffmpeg};
use crate::external::ffprobe_executor::{MediaInfo, MediaProbe};
use crate::processing::dimensions::calculate_dimensions;
use crate::processing::encode::{check_audio_stream, encode_audio, encode_video, plan_audio};
use crate::reporting::{EncodeStage, Reporter, TaskOutcome};
use crate::subtitles::{find_external_subtitle, resolve_subtitles};
use crate::tasks::MediaTask;
use crate::temp_files::create_temp_dir;

use std::fs;
use std::path::Path;
use std::time::Instant;

const VIDEO_FILE: &str = "video.mpg";
const AUDIO_FILE: &str = "audio.mp2";
const SCREENSHOT_FILE: &str = "screenshot.bmp";

/// Whole seconds into the video at which the thumbnail is taken.
fn screenshot_position(info: &MediaInfo, encoded_secs: f64) -> u64 {
    let duration = info.duration.filter(|d| d.is_finite() && *d > 0.0).unwrap_or(encoded_secs);
    (duration / 10.0).floor().max(0.0) as u64
}

fn build_thumbnail<S: FfmpegSpawner>(
    spawner: &S,
    video: &Path,
    position_secs: u64,
    scratch: &Path,
    reporter: &dyn Reporter,
) -> CoreResult<Vec<u8>> {
    reporter.stage_started(EncodeStage::Screenshot);
    let spec = ScreenshotSpec::new(video, position_secs, scratch.join(SCREENSHOT_FILE));
    run_ffmpeg(spawner, &spec.to_args(), |_| {})?;
    let image = decode_screenshot(&fs::read(spec.output())?)?;
    let thumbnail = create_thumbnail(&image);
    reporter.stage_finished(EncodeStage::Screenshot);
    Ok(thumbnail)
}

fn build_seek_index<P: MediaProbe + ?Sized>(
    probe: &P,
    video: &Path,
    frame_count: u64,
    reporter: &dyn Reporter,
) -> CoreResult<SeekIndex> {
    reporter.stage_started(EncodeStage::SeekIndex);
    let mut builder = SeekIndexBuilder::new();
    probe.for_each_frame(video, &mut |record| builder.push(record))?;
    if builder.frames_seen() != frame_count {
        log::warn!(
            "frame scan saw {} frames, frame count reported {frame_count}",
            builder.frames_seen()
        );
    }
    let index = builder.finish();
    reporter.stage_finished(EncodeStage::SeekIndex);
    Ok(index)
}

/// Converts `task.input_path` into a container at `task.output_path`.
///
/// # Errors
///
/// Any probe, encode, image or I/O failure that the audio fallback does not
/// cover. The destination is never left half-written.
pub fn convert_file<S, P>(
    task: &MediaTask,
    config: &ConversionConfig,
    spawner: &S,
    probe: &P,
    reporter: &dyn Reporter,
) -> CoreResult<TaskOutcome>
where
    S: FfmpegSpawner,
    P: MediaProbe + ?Sized,
{
    let started = Instant::now();
    let input = task.input_path.as_path();
    log::info!("reading input file: {}", input.display());

    let info = probe.probe(input)?;
    check_audio_stream(input, &info, config)?;

    let dimensions = calculate_dimensions(info.aspect_ratio);
    let sidecar = find_external_subtitle(input);
    let subtitles = resolve_subtitles(
        &config.subtitles,
        input,
        &info.subtitle_streams,
        sidecar.as_deref(),
    )?;
    match &subtitles {
        Some(selection) => log::debug!(
            "burning {:?} subtitles from {} (stream {})",
            selection.source,
            selection.file_path.display(),
            selection.stream_index
        ),
        None => log::debug!("no subtitles selected"),
    }

    if !config.framerate.is_standard() {
        let message = format!(
            "framerate {} is outside the MPEG-1 standard; audio may drift out of sync",
            config.framerate
        );
        log::warn!("{message}");
        reporter.warning(&message);
    }

    let scratch = create_temp_dir(config)?;

    let video_spec = VideoEncodeSpec::builder(input, scratch.path().join(VIDEO_FILE))
        .framerate(config.framerate)
        .quality(config.quality)
        .dimensions(dimensions)
        .subtitles(subtitles.map(|selection| selection.filter_expression(&config.font)))
        .build()?;
    let video = encode_video(spawner, probe, &video_spec, reporter)?;
    let encoded_secs = config.framerate.duration_of(video.frame_count);

    let audio_spec = plan_audio(
        input,
        &info,
        config,
        &scratch.path().join(AUDIO_FILE),
        encoded_secs,
    )?;
    let audio = encode_audio(spawner, &audio_spec, config.framerate, video.frame_count, reporter)?;

    let thumbnail = build_thumbnail(
        spawner,
        &video.stream.path,
        screenshot_position(&info, encoded_secs),
        scratch.path(),
        reporter,
    )?;
    let seek_index = build_seek_index(probe, &video.stream.path, video.frame_count, reporter)?;

    reporter.stage_started(EncodeStage::Container);
    let header = ContainerHeader::new(
        video.frame_count,
        config.framerate.value(),
        audio.stream.size,
        video.stream.size,
        seek_index.byte_len() as u64,
    )?;
    let container_size = write_container(
        &task.output_path,
        &ContainerParts {
            header: &header,
            thumbnail: &thumbnail,
            audio: &audio.stream.path,
            video: &video.stream.path,
            seek_index: &seek_index,
        },
    )?;
    reporter.stage_finished(EncodeStage::Container);
    log::info!(
        "done: {} -> {}",
        input.display(),
        task.output_path.display()
    );

    Ok(TaskOutcome {
        input_path: task.input_path.clone(),
        output_path: task.output_path.clone(),
        frame_count: video.frame_count,
        audio_size: audio.stream.size,
        video_size: video.stream.size,
        container_size,
        looped: video.looped,
        silent_audio: audio.silent,
        elapsed: started.elapsed(),
    })
}
