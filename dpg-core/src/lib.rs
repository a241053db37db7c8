//! Core library for converting video files into the DPG4 container played by
//! MoonShell on the Nintendo DS.
//!
//! This crate plans output paths, drives ffmpeg and ffprobe to produce the
//! MPEG-1 video and MP2 audio streams, and assembles them with a thumbnail
//! and a keyframe seek index into a single container file.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use dpg_core::{
//!     ConversionConfig, FfprobeExecutor, NullReporter, SidecarSpawner, collect_input_files,
//!     create_task_list, process_tasks,
//! };
//!
//! dpg_core::check_required_tools().unwrap();
//!
//! let inputs = collect_input_files(&["/path/to/movies"]).unwrap();
//! let tasks = create_task_list(&inputs, None).unwrap();
//!
//! let outcomes = process_tasks(
//!     &tasks,
//!     &ConversionConfig::default(),
//!     &SidecarSpawner,
//!     &FfprobeExecutor::new(),
//!     &NullReporter,
//! )
//! .unwrap();
//! println!("converted {} files", outcomes.len());
//! ```

pub mod config;
pub mod container;
pub mod discovery;
pub mod error;
pub mod external;
pub mod processing;
pub mod progress_reporting;
pub mod reporting;
pub mod subtitles;
pub mod tasks;
pub mod temp_files;
pub mod utils;

// Re-exports for public API
pub use config::{ConversionConfig, Framerate, VideoQuality};
pub use discovery::{VIDEO_EXTENSIONS, collect_input_files};
pub use error::{CoreError, CoreResult};
pub use external::{
    FfmpegSpawner, FfprobeExecutor, MediaInfo, MediaProbe, SidecarSpawner, check_dependency,
    check_required_tools,
};
pub use processing::{VideoDimensions, calculate_dimensions, convert_file, process_tasks};
pub use reporting::{
    BatchSummary, EncodeStage, JsonReporter, NullReporter, ProgressSnapshot, Reporter,
    TaskOutcome, TerminalReporter,
};
pub use subtitles::{SubtitleFont, SubtitleSelector, SubtitleStream};
pub use tasks::{MediaTask, create_task_list};
pub use utils::{format_bytes, format_duration, parse_ffmpeg_time};
