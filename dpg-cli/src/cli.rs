// dpg-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{Args, Parser, Subcommand};
use dpg_core::{Framerate, SubtitleSelector};
use std::path::PathBuf;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "dpgv4: convert videos for MoonShell on the Nintendo DS",
    long_about = "Converts video files into DPG4 containers (MPEG-1 video, MP2 audio, \
                  thumbnail and seek index) using ffmpeg and ffprobe."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit newline-delimited JSON events instead of progress bars
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Converts video files or directories of video files to DPG4
    Convert(ConvertArgs),
    /// Shows the streams and target geometry of a video file
    Info(InfoArgs),
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Video files or directories to convert
    #[arg(required = true, value_name = "INPUT")]
    pub inputs: Vec<PathBuf>,

    /// Output .dpg file (single input) or output directory
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Video quality preset: 1 (default) or 2 (high, slower)
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=2))]
    pub quality: u8,

    /// Output framerate (23.976, 24, 25, 29.97, 30, 50, 59.94, 60; or 5, 10, 12, 15)
    #[arg(short = 'r', long, default_value = "24", value_parser = parse_framerate)]
    pub framerate: Framerate,

    /// Audio stream to encode, counted among audio streams (default: first)
    #[arg(short = 'a', long = "aid", value_name = "AID")]
    pub audio_stream: Option<usize>,

    /// Subtitle stream index, language or title; -1 disables subtitles
    #[arg(
        short = 's',
        long = "sid",
        value_name = "SID|LANG",
        allow_hyphen_values = true,
        value_parser = parse_subtitle_selector
    )]
    pub subtitles: Option<SubtitleSelector>,

    /// Font for subtitles (libass style FontName)
    #[arg(short = 'f', long = "font", value_name = "FONT", env = "DPG_SUBTITLE_FONT")]
    pub font: Option<String>,

    /// Font size for subtitles
    #[arg(long, value_name = "SIZE", value_parser = clap::value_parser!(u32).range(1..))]
    pub font_size: Option<u32>,

    /// Directory for per-file scratch directories (default: system temp dir)
    #[arg(long, value_name = "DIR")]
    pub temp_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Video file to inspect
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,
}

fn parse_framerate(value: &str) -> Result<Framerate, String> {
    let fps: f64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    Framerate::new(fps).map_err(|e| e.to_string())
}

fn parse_subtitle_selector(value: &str) -> Result<SubtitleSelector, String> {
    value.parse().map_err(|e: dpg_core::CoreError| e.to_string())
}
