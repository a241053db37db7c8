//! Subtitle stream selection for hard-burned subtitles.
//!
//! The user picks a subtitle track by combined index, by language or title,
//! or disables subtitles. Sidecar files next to the input (same base name,
//! one of [`EXTERNAL_SUBTITLE_EXTENSIONS`]) occupy the lowest combined
//! indices, followed by the streams embedded in the input file.

use crate::error::{CoreError, CoreResult};

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Extensions tried, in order, when looking for a sidecar subtitle file.
pub const EXTERNAL_SUBTITLE_EXTENSIONS: [&str; 4] = ["ass", "ssa", "srt", "vtt"];

/// Characters the filter option parser treats specially inside a value.
const OPTION_SPECIAL_CHARS: [char; 3] = ['\\', ':', '\''];

/// Characters with special meaning in ffmpeg filtergraph syntax.
const FILTER_SPECIAL_CHARS: [char; 7] = ['\\', '\'', '[', ']', '=', ';', ','];

/// What the user asked for on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubtitleSelector {
    /// First available stream, if any.
    #[default]
    Auto,
    Disabled,
    /// Combined index across sidecar and internal streams.
    Index(usize),
    /// Case-insensitive match against the language or title tag.
    Language(String),
}

impl FromStr for SubtitleSelector {
    type Err = CoreError;

    fn from_str(value: &str) -> CoreResult<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(CoreError::Validation(
                "subtitle selector must not be empty".to_string(),
            ));
        }
        match value.parse::<i64>() {
            Ok(index) if index < 0 => Ok(SubtitleSelector::Disabled),
            Ok(index) => usize::try_from(index)
                .map(SubtitleSelector::Index)
                .map_err(|_| CoreError::Validation(format!("subtitle index {index} is too large"))),
            Err(_) => Ok(SubtitleSelector::Language(value.to_string())),
        }
    }
}

impl fmt::Display for SubtitleSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubtitleSelector::Auto => write!(f, "auto"),
            SubtitleSelector::Disabled => write!(f, "disabled"),
            SubtitleSelector::Index(index) => write!(f, "#{index}"),
            SubtitleSelector::Language(language) => write!(f, "'{language}'"),
        }
    }
}

/// A subtitle stream embedded in the input file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubtitleStream {
    /// Position among the file's subtitle streams.
    pub index: usize,
    pub language: Option<String>,
    pub title: Option<String>,
}

impl SubtitleStream {
    fn matches(&self, query: &str) -> bool {
        [&self.language, &self.title]
            .into_iter()
            .flatten()
            .any(|tag| tag.eq_ignore_ascii_case(query))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleSource {
    Internal,
    External,
}

/// The resolved subtitle stream to burn into the video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleSelection {
    pub source: SubtitleSource,
    /// File handed to the subtitles filter: the sidecar or the input itself.
    pub file_path: PathBuf,
    /// Stream index within `file_path`.
    pub stream_index: usize,
}

/// Font overrides for rendered subtitles (libass style).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubtitleFont {
    pub name: Option<String>,
    pub size: Option<u32>,
}

impl SubtitleSelection {
    /// Renders the `subtitles` video filter for this selection.
    pub fn filter_expression(&self, font: &SubtitleFont) -> String {
        let mut options = vec![
            format!("filename={}", escape_filter_path(&self.file_path)),
            format!("stream_index={}", self.stream_index),
        ];

        let mut style = Vec::new();
        if let Some(name) = &font.name {
            style.push(format!("FontName={name}"));
        }
        if let Some(size) = font.size {
            style.push(format!("FontSize={size}"));
        }
        if !style.is_empty() {
            options.push(format!("force_style='{}'", style.join(",")));
        }

        format!("subtitles={}", options.join(":"))
    }
}

fn escape_chars(raw: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if special.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Escapes a file path for use as a filter option value inside `-vf`.
///
/// The value is escaped once for the option parser and once more for the
/// filtergraph parser, which unescapes first.
pub fn escape_filter_path(path: &Path) -> String {
    let option_value = escape_chars(&path.to_string_lossy(), &OPTION_SPECIAL_CHARS);
    escape_chars(&option_value, &FILTER_SPECIAL_CHARS)
}

/// Looks for a sidecar subtitle file sharing the input's base name.
pub fn find_external_subtitle(input: &Path) -> Option<PathBuf> {
    EXTERNAL_SUBTITLE_EXTENSIONS
        .iter()
        .map(|ext| input.with_extension(ext))
        .find(|candidate| candidate.is_file())
}

/// Decides which subtitle stream, if any, gets burned into the video.
pub fn resolve_subtitles(
    selector: &SubtitleSelector,
    input: &Path,
    internal: &[SubtitleStream],
    external: Option<&Path>,
) -> CoreResult<Option<SubtitleSelection>> {
    let external_count = usize::from(external.is_some());

    let selection = match selector {
        SubtitleSelector::Disabled => None,
        SubtitleSelector::Auto => {
            if external_count + internal.len() == 0 {
                None
            } else {
                Some(select_by_index(0, input, internal, external)?)
            }
        }
        SubtitleSelector::Index(index) => Some(select_by_index(*index, input, internal, external)?),
        SubtitleSelector::Language(language) => {
            if let Some(sidecar) = external {
                return Err(CoreError::Validation(format!(
                    "cannot select subtitles by language '{language}': external subtitle file '{}' has no language metadata",
                    sidecar.display()
                )));
            }
            let mut sorted: Vec<&SubtitleStream> = internal.iter().collect();
            sorted.sort_by_key(|stream| stream.index);
            let position = sorted
                .iter()
                .position(|stream| stream.matches(language))
                .ok_or_else(|| {
                    CoreError::Validation(format!(
                        "no subtitle stream matches language '{language}'"
                    ))
                })?;
            Some(SubtitleSelection {
                source: SubtitleSource::Internal,
                file_path: input.to_path_buf(),
                stream_index: position,
            })
        }
    };

    match &selection {
        Some(sel) => log::debug!(
            "subtitles {selector}: {:?} stream {} of {}",
            sel.source,
            sel.stream_index,
            sel.file_path.display()
        ),
        None => log::debug!("subtitles {selector}: none"),
    }
    Ok(selection)
}

fn select_by_index(
    index: usize,
    input: &Path,
    internal: &[SubtitleStream],
    external: Option<&Path>,
) -> CoreResult<SubtitleSelection> {
    if let Some(sidecar) = external {
        if index == 0 {
            return Ok(SubtitleSelection {
                source: SubtitleSource::External,
                file_path: sidecar.to_path_buf(),
                stream_index: 0,
            });
        }
    }

    let external_count = usize::from(external.is_some());
    let internal_index = index - external_count.min(index);
    if internal_index >= internal.len() {
        return Err(CoreError::Validation(format!(
            "subtitle stream {index} does not exist ({} available)",
            internal.len() + external_count
        )));
    }
    Ok(SubtitleSelection {
        source: SubtitleSource::Internal,
        file_path: input.to_path_buf(),
        stream_index: internal_index,
    })
}
