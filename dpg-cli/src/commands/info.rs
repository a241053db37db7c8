//! Implementation of the 'info' subcommand.
//!
//! Prints what the converter would see for one file so the user can choose
//! `--aid` and `--sid` values before converting.

use crate::cli::InfoArgs;
use crate::error::CliResult;

use console::style;
use dpg_core::external::check_dependency;
use dpg_core::processing::calculate_padding;
use dpg_core::subtitles::find_external_subtitle;
use dpg_core::utils::display_name;
use dpg_core::{
    CoreError, FfprobeExecutor, MediaInfo, MediaProbe, calculate_dimensions, format_duration,
};
use std::path::{Path, PathBuf};

/// One line of the subtitle listing, numbered the way `--sid` counts.
fn subtitle_lines(info: &MediaInfo, sidecar: Option<&Path>) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(path) = sidecar {
        lines.push(format!("#0  external  {}", display_name(path)));
    }
    let offset = usize::from(sidecar.is_some());
    for stream in &info.subtitle_streams {
        lines.push(format!(
            "#{:<2} internal  language={} title={}",
            stream.index + offset,
            stream.language.as_deref().unwrap_or("-"),
            stream.title.as_deref().unwrap_or("-")
        ));
    }
    lines
}

fn print_field(label: &str, value: impl std::fmt::Display) {
    println!("  {:<18} {}", style(label).cyan(), value);
}

pub fn run_info(args: &InfoArgs) -> CliResult<()> {
    let input: PathBuf = args.input.clone();
    if !input.is_file() {
        return Err(CoreError::PathError(format!(
            "input '{}' is not a file",
            input.display()
        )));
    }
    check_dependency("ffprobe")?;

    let info = FfprobeExecutor::new().probe(&input)?;
    let dimensions = calculate_dimensions(info.aspect_ratio);
    let padding = calculate_padding(dimensions)?;
    let sidecar = find_external_subtitle(&input);

    println!("{}", style(display_name(&input)).bold());
    print_field(
        "Duration:",
        info.duration.map_or_else(|| "unknown".to_string(), format_duration),
    );
    print_field(
        "Aspect ratio:",
        info.aspect_ratio
            .map_or_else(|| "unknown".to_string(), |a| format!("{a:.4}")),
    );
    print_field("Encoded size:", dimensions);
    print_field(
        "Padding:",
        format!(
            "{}px left/right, {}px top/bottom",
            padding.horizontal, padding.vertical
        ),
    );
    print_field("Audio streams:", info.audio_streams);

    let lines = subtitle_lines(&info, sidecar.as_deref());
    if lines.is_empty() {
        print_field("Subtitles:", "none");
    } else {
        print_field("Subtitles:", lines.len());
        for line in lines {
            println!("    {line}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpg_core::SubtitleStream;

    #[test]
    fn test_subtitle_lines_number_sidecar_first() {
        let info = MediaInfo {
            subtitle_streams: vec![SubtitleStream {
                index: 0,
                language: Some("eng".to_string()),
                title: None,
            }],
            ..MediaInfo::default()
        };

        let lines = subtitle_lines(&info, Some(Path::new("/films/movie.srt")));
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("#0  external  movie.srt"));
        assert!(lines[1].starts_with("#1  internal  language=eng title=-"));
    }

    #[test]
    fn test_subtitle_lines_without_streams() {
        assert!(subtitle_lines(&MediaInfo::default(), None).is_empty());
    }
}
