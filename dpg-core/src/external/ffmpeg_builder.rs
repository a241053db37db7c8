//! Immutable ffmpeg invocation specs.
//!
//! Each spec holds typed, validated options and renders its argument list in
//! one place. Retries are expressed as derived copies of a base spec
//! ([`VideoEncodeSpec::looped`], [`AudioEncodeSpec::with_silence`]) instead of
//! edits to an argument vector.

use crate::config::{
    AUDIO_BITRATE_KBPS, AUDIO_SAMPLE_RATE, Framerate, SCREEN_HEIGHT, SCREEN_WIDTH,
    VIDEO_BITRATE_KBPS, VideoQuality,
};
use crate::error::{CoreError, CoreResult};
use crate::processing::dimensions::{Padding, VideoDimensions, calculate_padding};

use std::path::{Path, PathBuf};

/// Options every invocation starts with.
const COMMON_ARGS: [&str; 3] = ["-hide_banner", "-nostdin", "-y"];

fn base_args() -> Vec<String> {
    COMMON_ARGS.iter().map(|s| (*s).to_string()).collect()
}

fn push_all(args: &mut Vec<String>, items: &[&str]) {
    args.extend(items.iter().map(|s| (*s).to_string()));
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Builder for constructing video filter chains
#[derive(Debug, Default)]
pub struct VideoFilterChain {
    filters: Vec<String>,
}

impl VideoFilterChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter to the chain. Empty filters are ignored.
    #[must_use]
    pub fn add_filter(mut self, filter: impl Into<String>) -> Self {
        let filter = filter.into();
        if !filter.is_empty() {
            self.filters.push(filter);
        }
        self
    }

    /// Scales to `dimensions` and pads the result to the full screen.
    #[must_use]
    pub fn add_scale_and_pad(self, dimensions: VideoDimensions, padding: Padding) -> Self {
        self.add_filter(format!("scale={}:{}", dimensions.width, dimensions.height))
            .add_filter(format!(
                "pad={SCREEN_WIDTH}:{SCREEN_HEIGHT}:{}:{}",
                padding.horizontal, padding.vertical
            ))
    }

    /// Builds the filter chain into a single filter string
    #[must_use]
    pub fn build(self) -> Option<String> {
        if self.filters.is_empty() {
            None
        } else {
            Some(self.filters.join(","))
        }
    }
}

/// Encoder tuning arguments for a quality preset.
fn quality_args(quality: VideoQuality) -> Vec<String> {
    let bitrate = format!("{VIDEO_BITRATE_KBPS}k");
    let mut args = base_quality_args(&bitrate);
    match quality {
        VideoQuality::Default => push_all(&mut args, &["-cmp", "2", "-subcmp", "2", "-precmp", "2"]),
        VideoQuality::High => push_all(
            &mut args,
            &[
                "-cmp", "6", "-subcmp", "6", "-precmp", "6", "-dia_size", "3", "-pre_dia_size",
                "3", "-last_pred", "3",
            ],
        ),
    }
    args
}

fn base_quality_args(bitrate: &str) -> Vec<String> {
    let mut args = Vec::new();
    push_all(
        &mut args,
        &[
            "-mbd", "2", "-trellis", "1", "-mpv_flags", "+cbp_rd", "-mpv_flags", "+mv0", "-b:v",
            bitrate,
        ],
    );
    args
}

// ============================================================================
// VIDEO
// ============================================================================

/// MPEG-1 video encode of the first video stream of `input`.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoEncodeSpec {
    input: PathBuf,
    output: PathBuf,
    framerate: Framerate,
    quality: VideoQuality,
    dimensions: VideoDimensions,
    padding: Padding,
    subtitle_filter: Option<String>,
    /// Loop the input indefinitely and cut the output at this many seconds.
    loop_duration: Option<f64>,
}

/// Accumulates options for a [`VideoEncodeSpec`].
#[derive(Debug, Clone)]
pub struct VideoEncodeSpecBuilder {
    input: PathBuf,
    output: PathBuf,
    framerate: Framerate,
    quality: VideoQuality,
    dimensions: VideoDimensions,
    subtitle_filter: Option<String>,
}

impl VideoEncodeSpecBuilder {
    #[must_use]
    pub fn framerate(mut self, framerate: Framerate) -> Self {
        self.framerate = framerate;
        self
    }

    #[must_use]
    pub fn quality(mut self, quality: VideoQuality) -> Self {
        self.quality = quality;
        self
    }

    #[must_use]
    pub fn dimensions(mut self, dimensions: VideoDimensions) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Burns in subtitles using a rendered `subtitles=` filter.
    #[must_use]
    pub fn subtitles(mut self, filter: Option<String>) -> Self {
        self.subtitle_filter = filter;
        self
    }

    /// Validates the geometry and freezes the spec.
    pub fn build(self) -> CoreResult<VideoEncodeSpec> {
        let padding = calculate_padding(self.dimensions)?;
        Ok(VideoEncodeSpec {
            input: self.input,
            output: self.output,
            framerate: self.framerate,
            quality: self.quality,
            dimensions: self.dimensions,
            padding,
            subtitle_filter: self.subtitle_filter,
            loop_duration: None,
        })
    }
}

impl VideoEncodeSpec {
    pub fn builder(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> VideoEncodeSpecBuilder {
        VideoEncodeSpecBuilder {
            input: input.into(),
            output: output.into(),
            framerate: Framerate::default(),
            quality: VideoQuality::default(),
            dimensions: VideoDimensions::SCREEN,
            subtitle_filter: None,
        }
    }

    /// Same encode with the input looped and the output cut at `duration_secs`.
    pub fn looped(&self, duration_secs: f64) -> CoreResult<Self> {
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(CoreError::Validation(format!(
                "invalid loop duration {duration_secs}"
            )));
        }
        Ok(Self {
            loop_duration: Some(duration_secs),
            ..self.clone()
        })
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn framerate(&self) -> Framerate {
        self.framerate
    }

    pub fn loop_duration(&self) -> Option<f64> {
        self.loop_duration
    }

    pub fn filter_chain(&self) -> String {
        VideoFilterChain::new()
            .add_scale_and_pad(self.dimensions, self.padding)
            .add_filter(self.subtitle_filter.clone().unwrap_or_default())
            .build()
            .unwrap_or_default()
    }

    pub fn to_args(&self) -> Vec<String> {
        let mut args = base_args();
        if self.loop_duration.is_some() {
            push_all(&mut args, &["-stream_loop", "-1"]);
        }
        args.push("-i".to_string());
        args.push(path_arg(&self.input));
        push_all(&mut args, &["-map", "0:v:0", "-r"]);
        args.push(self.framerate.to_string());
        if !self.framerate.is_standard() {
            push_all(&mut args, &["-strict", "unofficial"]);
        }
        push_all(&mut args, &["-sws_flags", "lanczos", "-vf"]);
        args.push(self.filter_chain());
        push_all(&mut args, &["-c:v", "mpeg1video"]);
        args.extend(quality_args(self.quality));
        if let Some(duration) = self.loop_duration {
            args.push("-t".to_string());
            args.push(duration.to_string());
        }
        push_all(&mut args, &["-f", "data"]);
        args.push(path_arg(&self.output));
        args
    }
}

// ============================================================================
// AUDIO
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum AudioSource {
    /// The n-th audio stream of a file.
    Stream { input: PathBuf, index: usize },
    /// Generated stereo silence of the given length.
    Silence { duration_secs: f64 },
}

/// MP2 stereo encode at the player's sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioEncodeSpec {
    source: AudioSource,
    output: PathBuf,
}

impl AudioEncodeSpec {
    pub fn from_stream(input: impl Into<PathBuf>, index: usize, output: impl Into<PathBuf>) -> Self {
        Self {
            source: AudioSource::Stream {
                input: input.into(),
                index,
            },
            output: output.into(),
        }
    }

    /// Same encode with the source replaced by `duration_secs` of silence.
    pub fn with_silence(&self, duration_secs: f64) -> CoreResult<Self> {
        if !duration_secs.is_finite() || duration_secs < 0.0 {
            return Err(CoreError::Validation(format!(
                "invalid silence duration {duration_secs}"
            )));
        }
        Ok(Self {
            source: AudioSource::Silence { duration_secs },
            output: self.output.clone(),
        })
    }

    pub fn source(&self) -> &AudioSource {
        &self.source
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn to_args(&self) -> Vec<String> {
        let mut args = base_args();
        match &self.source {
            AudioSource::Stream { input, index } => {
                args.push("-i".to_string());
                args.push(path_arg(input));
                args.push("-map".to_string());
                args.push(format!("0:a:{index}"));
            }
            AudioSource::Silence { duration_secs } => {
                push_all(&mut args, &["-f", "lavfi", "-i"]);
                args.push(format!(
                    "anullsrc=channel_layout=stereo:sample_rate={AUDIO_SAMPLE_RATE}"
                ));
                args.push("-t".to_string());
                args.push(duration_secs.to_string());
            }
        }
        push_all(&mut args, &["-c:a", "mp2", "-b:a"]);
        args.push(format!("{AUDIO_BITRATE_KBPS}k"));
        push_all(&mut args, &["-ac", "2", "-ar"]);
        args.push(AUDIO_SAMPLE_RATE.to_string());
        push_all(&mut args, &["-f", "data"]);
        args.push(path_arg(&self.output));
        args
    }
}

// ============================================================================
// SCREENSHOT
// ============================================================================

/// Single BMP frame grabbed at a given position of a video.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenshotSpec {
    input: PathBuf,
    output: PathBuf,
    position_secs: u64,
}

impl ScreenshotSpec {
    pub fn new(input: impl Into<PathBuf>, position_secs: u64, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            position_secs,
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn to_args(&self) -> Vec<String> {
        let mut args = base_args();
        args.push("-ss".to_string());
        args.push(self.position_secs.to_string());
        args.push("-i".to_string());
        args.push(path_arg(&self.input));
        push_all(&mut args, &["-frames:v", "1", "-f", "image2", "-c:v", "bmp"]);
        args.push(path_arg(&self.output));
        args
    }
}

/// Renders a command line for logs and error messages, quoting arguments
/// that a POSIX shell would split or expand.
pub fn render_command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program.to_string())
        .chain(args.iter().map(|arg| shell_quote(arg)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+,@%".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video_spec() -> VideoEncodeSpec {
        VideoEncodeSpec::builder("/in/movie.mkv", "/tmp/job/video.mpg")
            .dimensions(VideoDimensions { width: 256, height: 144 })
            .build()
            .unwrap()
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_video_filter_chain_empty() {
        assert_eq!(VideoFilterChain::new().build(), None);
    }

    #[test]
    fn test_video_filter_chain_empty_filters_ignored() {
        let chain = VideoFilterChain::new()
            .add_filter("")
            .add_filter("scale=256:144")
            .add_filter(String::new());
        assert_eq!(chain.build(), Some("scale=256:144".to_string()));
    }

    #[test]
    fn test_video_args() {
        let args = video_spec().to_args();
        assert_eq!(&args[..3], &["-hide_banner", "-nostdin", "-y"]);
        assert_eq!(value_after(&args, "-i"), Some("/in/movie.mkv"));
        assert_eq!(value_after(&args, "-map"), Some("0:v:0"));
        assert_eq!(value_after(&args, "-r"), Some("24"));
        assert_eq!(value_after(&args, "-sws_flags"), Some("lanczos"));
        assert_eq!(value_after(&args, "-vf"), Some("scale=256:144,pad=256:192:0:24"));
        assert_eq!(value_after(&args, "-c:v"), Some("mpeg1video"));
        assert_eq!(value_after(&args, "-b:v"), Some("256k"));
        assert_eq!(value_after(&args, "-cmp"), Some("2"));
        assert_eq!(value_after(&args, "-f"), Some("data"));
        assert_eq!(args.last().unwrap(), "/tmp/job/video.mpg");
        assert!(!args.contains(&"-strict".to_string()));
        assert!(!args.contains(&"-stream_loop".to_string()));
        assert!(!args.contains(&"-t".to_string()));
    }

    #[test]
    fn test_high_quality_preset() {
        let args = VideoEncodeSpec::builder("a.mkv", "v.mpg")
            .quality(VideoQuality::High)
            .build()
            .unwrap()
            .to_args();
        assert_eq!(value_after(&args, "-cmp"), Some("6"));
        assert_eq!(value_after(&args, "-dia_size"), Some("3"));
        assert_eq!(value_after(&args, "-last_pred"), Some("3"));
        assert_eq!(value_after(&args, "-trellis"), Some("1"));
    }

    #[test]
    fn test_unofficial_framerate_needs_strict() {
        let args = VideoEncodeSpec::builder("a.mkv", "v.mpg")
            .framerate(Framerate::new(15.0).unwrap())
            .build()
            .unwrap()
            .to_args();
        assert_eq!(value_after(&args, "-r"), Some("15"));
        assert_eq!(value_after(&args, "-strict"), Some("unofficial"));
    }

    #[test]
    fn test_subtitle_filter_follows_padding() {
        let args = VideoEncodeSpec::builder("a.mkv", "v.mpg")
            .subtitles(Some("subtitles=filename=a.mkv:stream_index=0".to_string()))
            .build()
            .unwrap()
            .to_args();
        assert_eq!(
            value_after(&args, "-vf"),
            Some("scale=256:192,pad=256:192:0:0,subtitles=filename=a.mkv:stream_index=0")
        );
    }

    #[test]
    fn test_invalid_geometry_is_rejected_at_build() {
        let err = VideoEncodeSpec::builder("a.mkv", "v.mpg")
            .dimensions(VideoDimensions { width: 256, height: 107 })
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_looped_spec_is_derived_copy() {
        let base = video_spec();
        let looped = base.looped(30.0).unwrap();
        assert_eq!(base.loop_duration(), None);
        assert_eq!(looped.loop_duration(), Some(30.0));

        let args = looped.to_args();
        let loop_pos = args.iter().position(|a| a == "-stream_loop").unwrap();
        let input_pos = args.iter().position(|a| a == "-i").unwrap();
        assert!(loop_pos < input_pos);
        assert_eq!(args[loop_pos + 1], "-1");
        assert_eq!(value_after(&args, "-t"), Some("30"));
        assert_eq!(args.last(), base.to_args().last());
        assert!(base.looped(0.0).is_err());
    }

    #[test]
    fn test_audio_args() {
        let spec = AudioEncodeSpec::from_stream("/in/movie.mkv", 1, "/tmp/job/audio.mp2");
        let args = spec.to_args();
        assert_eq!(value_after(&args, "-i"), Some("/in/movie.mkv"));
        assert_eq!(value_after(&args, "-map"), Some("0:a:1"));
        assert_eq!(value_after(&args, "-c:a"), Some("mp2"));
        assert_eq!(value_after(&args, "-b:a"), Some("128k"));
        assert_eq!(value_after(&args, "-ac"), Some("2"));
        assert_eq!(value_after(&args, "-ar"), Some("32000"));
        assert_eq!(value_after(&args, "-f"), Some("data"));
        assert_eq!(args.last().unwrap(), "/tmp/job/audio.mp2");
    }

    #[test]
    fn test_silent_audio_args() {
        let base = AudioEncodeSpec::from_stream("/in/movie.mkv", 0, "audio.mp2");
        let silent = base.with_silence(30.125).unwrap();
        assert_eq!(silent.source(), &AudioSource::Silence { duration_secs: 30.125 });
        assert_eq!(silent.output(), base.output());

        let args = silent.to_args();
        assert_eq!(value_after(&args, "-f"), Some("lavfi"));
        assert_eq!(
            value_after(&args, "-i"),
            Some("anullsrc=channel_layout=stereo:sample_rate=32000")
        );
        assert_eq!(value_after(&args, "-t"), Some("30.125"));
        assert!(!args.contains(&"-map".to_string()));
        assert!(!args.contains(&"/in/movie.mkv".to_string()));
        assert!(base.with_silence(f64::NAN).is_err());
    }

    #[test]
    fn test_screenshot_args() {
        let args = ScreenshotSpec::new("video.mpg", 4, "shot.bmp").to_args();
        let ss_pos = args.iter().position(|a| a == "-ss").unwrap();
        let input_pos = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss_pos < input_pos);
        assert_eq!(args[ss_pos + 1], "4");
        assert_eq!(value_after(&args, "-frames:v"), Some("1"));
        assert_eq!(args.last().unwrap(), "shot.bmp");
    }

    #[test]
    fn test_render_command_line() {
        let args = vec![
            "-i".to_string(),
            "/films/World - 2.mp4".to_string(),
            "-vf".to_string(),
            "scale=256:144".to_string(),
            "it's".to_string(),
        ];
        assert_eq!(
            render_command_line("ffmpeg", &args),
            r"ffmpeg -i '/films/World - 2.mp4' -vf scale=256:144 'it'\''s'"
        );
    }
}
