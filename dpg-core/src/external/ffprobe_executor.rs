//! FFprobe integration for media analysis.
//!
//! The probe answers three questions: what is in a source file (aspect
//! ratio, duration, audio and subtitle streams), how many frames an encoded
//! video has, and the picture type and position of each of those frames.

use crate::container::seek_index::{FrameRecord, PictureType};
use crate::error::{
    CoreError, CoreResult, command_failed_error, command_start_error, command_wait_error,
};
use crate::subtitles::SubtitleStream;
use crate::utils::parse_ratio;

use ffprobe::{Config, FfProbe, FfProbeError, Stream, ffprobe, ffprobe_config};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Command, Stdio};

const FFPROBE: &str = "ffprobe";

/// What the pipeline needs to know about a source file.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MediaInfo {
    /// Duration in seconds
    pub duration: Option<f64>,
    /// Display aspect ratio of the first video stream
    pub aspect_ratio: Option<f64>,
    pub audio_streams: usize,
    pub subtitle_streams: Vec<SubtitleStream>,
}

/// Media inspection used by the pipeline.
pub trait MediaProbe {
    fn probe(&self, path: &Path) -> CoreResult<MediaInfo>;

    /// Number of decoded frames in the first video stream.
    fn count_frames(&self, path: &Path) -> CoreResult<u64>;

    /// Calls `visit` for every frame of the first video stream, in decode order.
    fn for_each_frame(
        &self,
        path: &Path,
        visit: &mut dyn FnMut(FrameRecord) -> CoreResult<()>,
    ) -> CoreResult<()>;
}

fn is_type(stream: &Stream, codec_type: &str) -> bool {
    stream.codec_type.as_deref() == Some(codec_type)
}

fn parse_seconds(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
}

fn stream_aspect_ratio(stream: &Stream) -> Option<f64> {
    stream
        .display_aspect_ratio
        .as_deref()
        .and_then(parse_ratio)
        .or_else(|| match (stream.width, stream.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some(w as f64 / h as f64),
            _ => None,
        })
}

/// Builds [`MediaInfo`] from probe metadata and the tags of the subtitle
/// streams (in stream order).
pub fn media_info_from(metadata: &FfProbe, subtitle_tags: Vec<SubtitleTags>) -> MediaInfo {
    let video = metadata.streams.iter().find(|s| is_type(s, "video"));
    let aspect_ratio = video.and_then(stream_aspect_ratio);
    let duration = parse_seconds(metadata.format.duration.as_deref())
        .or_else(|| parse_seconds(video.and_then(|s| s.duration.as_deref())));

    let audio_streams = metadata.streams.iter().filter(|s| is_type(s, "audio")).count();
    let subtitle_count = metadata
        .streams
        .iter()
        .filter(|s| is_type(s, "subtitle"))
        .count();
    let mut tags = subtitle_tags.into_iter();
    let subtitle_streams = (0..subtitle_count)
        .map(|index| {
            let tags = tags.next().unwrap_or_default();
            SubtitleStream {
                index,
                language: tags.tag("language"),
                title: tags.tag("title"),
            }
        })
        .collect();

    MediaInfo {
        duration,
        aspect_ratio,
        audio_streams,
        subtitle_streams,
    }
}

/// Reads `nb_read_frames` of the first video stream from `count_frames` metadata.
pub fn frame_count_from(metadata: &FfProbe) -> CoreResult<u64> {
    let stream = metadata
        .streams
        .iter()
        .find(|s| is_type(s, "video"))
        .ok_or_else(|| CoreError::ProbeParse("no video stream found".to_string()))?;
    let count = stream
        .nb_read_frames
        .as_deref()
        .ok_or_else(|| CoreError::ProbeParse("nb_read_frames missing".to_string()))?;
    count
        .trim()
        .parse::<u64>()
        .map_err(|_| CoreError::ProbeParse(format!("invalid frame count '{count}'")))
}

fn map_ffprobe_error(err: FfProbeError, context: &str) -> CoreError {
    match err {
        FfProbeError::Io(io_err) => command_start_error(format!("{FFPROBE} ({context})"), io_err),
        FfProbeError::Status(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            command_failed_error(format!("{FFPROBE} ({context})"), output.status, stderr)
        }
        FfProbeError::Deserialize(err) => {
            CoreError::ProbeParse(format!("{context} output: {err}"))
        }
        _ => CoreError::ProbeParse(format!("unknown ffprobe error during {context}: {err:?}")),
    }
}

/// Tags of one subtitle stream. The probe metadata has no title tag, so
/// these come from a separate `-show_entries stream_tags` query.
#[derive(Debug, Default, Deserialize)]
pub struct SubtitleTags {
    #[serde(default)]
    tags: HashMap<String, String>,
}

impl SubtitleTags {
    fn tag(&self, key: &str) -> Option<String> {
        self.tags
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.clone())
    }
}

#[derive(Debug, Deserialize)]
struct SubtitleTagListing {
    #[serde(default)]
    streams: Vec<SubtitleTags>,
}

/// Parses the `-select_streams s -show_entries stream_tags` JSON listing.
pub fn parse_subtitle_tags(json: &str) -> CoreResult<Vec<SubtitleTags>> {
    let listing: SubtitleTagListing = serde_json::from_str(json)?;
    Ok(listing.streams)
}

/// Parses one `-print_format compact` row. Rows other than `frame|...` give `None`.
pub fn parse_frame_line(line: &str) -> CoreResult<Option<FrameRecord>> {
    let mut fields = line.trim().split('|');
    if fields.next() != Some("frame") {
        return Ok(None);
    }

    let mut pict_type = None;
    let mut byte_offset = None;
    for field in fields {
        let Some((key, value)) = field.split_once('=') else {
            continue;
        };
        match key {
            "pict_type" => pict_type = value.parse::<PictureType>().ok(),
            "pkt_pos" => {
                byte_offset = match value {
                    "N/A" => None,
                    v => Some(v.parse::<u64>().map_err(|_| {
                        CoreError::ProbeParse(format!("invalid pkt_pos '{v}' in '{line}'"))
                    })?),
                }
            }
            _ => {}
        }
    }

    let pict_type = pict_type
        .ok_or_else(|| CoreError::ProbeParse(format!("frame without pict_type: '{line}'")))?;
    Ok(Some(FrameRecord {
        pict_type,
        byte_offset,
    }))
}

/// [`MediaProbe`] backed by the `ffprobe` binary.
#[derive(Debug, Clone, Default)]
pub struct FfprobeExecutor;

impl FfprobeExecutor {
    pub fn new() -> Self {
        Self
    }

    fn subtitle_tags(&self, path: &Path) -> CoreResult<Vec<SubtitleTags>> {
        let output = Command::new(FFPROBE)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-select_streams",
                "s",
                "-show_entries",
                "stream_tags=language,title",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| command_start_error(FFPROBE, e))?;

        if !output.status.success() {
            return Err(command_failed_error(
                format!("{FFPROBE} (subtitle tags) {}", path.display()),
                output.status,
                String::from_utf8_lossy(&output.stderr),
            ));
        }
        parse_subtitle_tags(&String::from_utf8_lossy(&output.stdout))
    }
}

impl MediaProbe for FfprobeExecutor {
    fn probe(&self, path: &Path) -> CoreResult<MediaInfo> {
        log::debug!("Running ffprobe (via crate) for media info on: {}", path.display());
        let metadata = ffprobe(path).map_err(|e| map_ffprobe_error(e, "media info"))?;

        let has_subtitles = metadata.streams.iter().any(|s| is_type(s, "subtitle"));
        let tags = if has_subtitles {
            self.subtitle_tags(path)?
        } else {
            Vec::new()
        };

        let info = media_info_from(&metadata, tags);
        log::debug!(
            "probed {}: duration {:?}, aspect {:?}, {} audio, {} subtitle stream(s)",
            path.display(),
            info.duration,
            info.aspect_ratio,
            info.audio_streams,
            info.subtitle_streams.len()
        );
        Ok(info)
    }

    fn count_frames(&self, path: &Path) -> CoreResult<u64> {
        let config = Config::builder().count_frames(true).build();
        let metadata =
            ffprobe_config(config, path).map_err(|e| map_ffprobe_error(e, "frame count"))?;
        frame_count_from(&metadata)
    }

    fn for_each_frame(
        &self,
        path: &Path,
        visit: &mut dyn FnMut(FrameRecord) -> CoreResult<()>,
    ) -> CoreResult<()> {
        let mut child = Command::new(FFPROBE)
            .args([
                "-v",
                "error",
                "-print_format",
                "compact",
                "-select_streams",
                "v:0",
                "-show_entries",
                "frame=pict_type,pkt_pos",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| command_start_error(FFPROBE, e))?;

        let scanned = match child.stdout.take() {
            Some(stdout) => scan_frames(BufReader::new(stdout), visit),
            None => Err(CoreError::OperationFailed(
                "ffprobe stdout was not captured".to_string(),
            )),
        };
        if scanned.is_err() {
            let _ = child.kill();
        }

        let status = child
            .wait()
            .map_err(|e| command_wait_error(FFPROBE, e))?;
        scanned?;
        if !status.success() {
            return Err(command_failed_error(
                format!("{FFPROBE} (frames) {}", path.display()),
                status,
                "",
            ));
        }
        Ok(())
    }
}

fn scan_frames<R: BufRead>(
    reader: R,
    visit: &mut dyn FnMut(FrameRecord) -> CoreResult<()>,
) -> CoreResult<()> {
    for line in reader.lines() {
        if let Some(record) = parse_frame_line(&line?)? {
            visit(record)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffprobe::Format;
    use std::io::Cursor;

    fn stream(codec_type: &str) -> Stream {
        let mut stream = Stream::default();
        stream.codec_type = Some(codec_type.to_string());
        stream
    }

    fn metadata(streams: Vec<Stream>, duration: Option<&str>) -> FfProbe {
        let mut format = Format::default();
        format.duration = duration.map(str::to_string);
        FfProbe { streams, format }
    }

    #[test]
    fn test_media_info_from_metadata() {
        let mut video = stream("video");
        video.display_aspect_ratio = Some("16:9".to_string());
        video.duration = Some("12.5".to_string());
        let streams = vec![
            video,
            stream("audio"),
            stream("audio"),
            stream("subtitle"),
            stream("subtitle"),
            stream("subtitle"),
        ];
        let tags = parse_subtitle_tags(
            r#"{"streams": [
                {"index": 3, "tags": {"language": "eng", "title": "Signs"}},
                {"index": 4, "tags": {"LANGUAGE": "fin"}},
                {"index": 5}
            ]}"#,
        )
        .unwrap();

        let info = media_info_from(&metadata(streams, Some("1420.300000")), tags);
        assert_eq!(info.duration, Some(1420.3));
        assert_eq!(info.aspect_ratio, Some(16.0 / 9.0));
        assert_eq!(info.audio_streams, 2);
        assert_eq!(
            info.subtitle_streams,
            vec![
                SubtitleStream {
                    index: 0,
                    language: Some("eng".to_string()),
                    title: Some("Signs".to_string()),
                },
                SubtitleStream {
                    index: 1,
                    language: Some("fin".to_string()),
                    title: None,
                },
                SubtitleStream {
                    index: 2,
                    language: None,
                    title: None,
                },
            ]
        );
    }

    #[test]
    fn test_missing_aspect_and_format_duration() {
        let mut video = stream("video");
        video.display_aspect_ratio = Some("0:1".to_string());
        video.duration = Some("9.5".to_string());

        let info = media_info_from(&metadata(vec![video], None), Vec::new());
        assert_eq!(info.aspect_ratio, None);
        assert_eq!(info.duration, Some(9.5));
        assert_eq!(info.audio_streams, 0);
        assert!(info.subtitle_streams.is_empty());
    }

    #[test]
    fn test_aspect_falls_back_to_frame_size() {
        let mut video = stream("video");
        video.width = Some(720);
        video.height = Some(480);

        let info = media_info_from(&metadata(vec![video], None), Vec::new());
        assert_eq!(info.aspect_ratio, Some(1.5));
    }

    #[test]
    fn test_invalid_tag_listing_is_an_error() {
        assert!(matches!(parse_subtitle_tags("not json"), Err(CoreError::Json(_))));
    }

    #[test]
    fn test_frame_count_from_metadata() {
        let mut video = stream("video");
        video.nb_read_frames = Some("722".to_string());
        assert_eq!(frame_count_from(&metadata(vec![video], None)).unwrap(), 722);

        assert!(frame_count_from(&metadata(Vec::new(), None)).is_err());
        assert!(frame_count_from(&metadata(vec![stream("video")], None)).is_err());
    }

    #[test]
    fn test_ffprobe_status_maps_to_command_failed() {
        use std::os::unix::process::ExitStatusExt;
        use std::process::{ExitStatus, Output};

        let err = map_ffprobe_error(
            FfProbeError::Status(Output {
                status: ExitStatus::from_raw(1 << 8),
                stdout: Vec::new(),
                stderr: b"movie.mkv: Invalid data found".to_vec(),
            }),
            "media info",
        );
        assert!(err.is_command_failure());
        assert!(err.to_string().contains("Invalid data found"));
    }

    #[test]
    fn test_parse_frame_line() {
        assert_eq!(
            parse_frame_line("frame|pict_type=I|pkt_pos=500000").unwrap(),
            Some(FrameRecord {
                pict_type: PictureType::I,
                byte_offset: Some(500000),
            })
        );
        assert_eq!(
            parse_frame_line("frame|pkt_pos=N/A|pict_type=B").unwrap(),
            Some(FrameRecord {
                pict_type: PictureType::B,
                byte_offset: None,
            })
        );
        assert_eq!(parse_frame_line("side_data|side_data_type=foo").unwrap(), None);
        assert_eq!(parse_frame_line("").unwrap(), None);
        assert!(parse_frame_line("frame|pkt_pos=12").is_err());
        assert!(parse_frame_line("frame|pict_type=P|pkt_pos=abc").is_err());
    }

    #[test]
    fn test_scan_frames_stops_on_visitor_error() {
        let input = "frame|pict_type=I|pkt_pos=0\nframe|pict_type=P|pkt_pos=10\nframe|pict_type=I|pkt_pos=20\n";
        let mut seen = Vec::new();
        let result = scan_frames(Cursor::new(input), &mut |record| {
            seen.push(record);
            if seen.len() == 2 {
                Err(CoreError::OperationFailed("stop".to_string()))
            } else {
                Ok(())
            }
        });
        assert!(result.is_err());
        assert_eq!(seen.len(), 2);
    }
}
