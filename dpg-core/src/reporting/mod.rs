//! Status and progress sinks for the conversion pipeline.
//!
//! The pipeline never prints or touches global state. Everything the user
//! sees goes through a caller-supplied [`Reporter`].

use crate::tasks::MediaTask;
use crate::utils::{format_bytes, format_duration};

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Steps of a single conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeStage {
    Video,
    /// Re-encode of a short source, looped to the minimum duration.
    LoopedVideo,
    Audio,
    /// Re-encode against a synthesized silent track.
    SilentAudio,
    Screenshot,
    SeekIndex,
    Container,
}

impl EncodeStage {
    pub fn as_str(self) -> &'static str {
        match self {
            EncodeStage::Video => "video",
            EncodeStage::LoopedVideo => "looped_video",
            EncodeStage::Audio => "audio",
            EncodeStage::SilentAudio => "silent_audio",
            EncodeStage::Screenshot => "screenshot",
            EncodeStage::SeekIndex => "seek_index",
            EncodeStage::Container => "container",
        }
    }

    /// Stages that run ffmpeg long enough to show a progress bar.
    pub fn is_encode(self) -> bool {
        matches!(
            self,
            EncodeStage::Video
                | EncodeStage::LoopedVideo
                | EncodeStage::Audio
                | EncodeStage::SilentAudio
        )
    }
}

impl fmt::Display for EncodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EncodeStage::Video => "Encoding video",
            EncodeStage::LoopedVideo => "Re-encoding looped video",
            EncodeStage::Audio => "Encoding audio",
            EncodeStage::SilentAudio => "Encoding silent audio",
            EncodeStage::Screenshot => "Extracting screenshot",
            EncodeStage::SeekIndex => "Building seek index",
            EncodeStage::Container => "Writing container",
        };
        f.pad(label)
    }
}

/// Position of a running encode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub stage: EncodeStage,
    pub current_secs: f64,
    pub total_secs: Option<f64>,
    /// 0 to 100, `None` while the total is unknown.
    pub percent: Option<f64>,
}

/// Result of one finished task.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub frame_count: u64,
    pub audio_size: u64,
    pub video_size: u64,
    pub container_size: u64,
    pub looped: bool,
    pub silent_audio: bool,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub completed: usize,
    pub total: usize,
    pub total_size: u64,
    pub elapsed: Duration,
}

/// Receiver of pipeline events. Every method defaults to a no-op.
pub trait Reporter: Send + Sync {
    fn batch_started(&self, _tasks: &[MediaTask]) {}
    fn task_started(&self, _position: usize, _total: usize, _task: &MediaTask) {}
    fn stage_started(&self, _stage: EncodeStage) {}
    fn progress(&self, _snapshot: &ProgressSnapshot) {}
    fn stage_finished(&self, _stage: EncodeStage) {}
    fn warning(&self, _message: &str) {}
    fn task_finished(&self, _outcome: &TaskOutcome) {}
    fn task_failed(&self, _task: &MediaTask, _message: &str) {}
    fn batch_finished(&self, _summary: &BatchSummary) {}
}

/// No-op reporter that discards all updates.
pub struct NullReporter;

impl Reporter for NullReporter {}

/// Human-friendly reporter with a progress bar per encode.
pub struct TerminalReporter {
    progress: Mutex<Option<ProgressBar>>,
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalReporter {
    pub fn new() -> Self {
        Self {
            progress: Mutex::new(None),
        }
    }

    fn finish_progress(&self) {
        if let Ok(mut guard) = self.progress.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }

    fn start_progress(&self, stage: EncodeStage) {
        self.finish_progress();
        let pb = ProgressBar::new(100);
        let template = format!("  {stage:<24} [{{bar:40}}] {{percent:>3}}% | {{msg}}");
        if let Ok(bar_style) = ProgressStyle::default_bar().template(&template) {
            pb.set_style(bar_style.progress_chars("=> "));
        }
        pb.enable_steady_tick(Duration::from_millis(120));
        if let Ok(mut guard) = self.progress.lock() {
            *guard = Some(pb);
        }
    }
}

impl Reporter for TerminalReporter {
    fn batch_started(&self, tasks: &[MediaTask]) {
        if tasks.len() > 1 {
            println!("\n{}", style("BATCH").bold().cyan());
            println!("  Converting {} files", tasks.len());
            for (idx, task) in tasks.iter().enumerate() {
                println!("  {}. {}", idx + 1, task.input_path.display());
            }
        }
    }

    fn task_started(&self, position: usize, total: usize, task: &MediaTask) {
        println!(
            "\n{} {}",
            style(format!("[{position}/{total}]")).bold().cyan(),
            style(task.input_path.display()).bold()
        );
        println!("  {:<8} {}", style("Output:").bold(), task.output_path.display());
    }

    fn stage_started(&self, stage: EncodeStage) {
        if stage.is_encode() {
            self.start_progress(stage);
        } else {
            println!("  {}{}", style("› ").magenta(), stage);
        }
    }

    fn progress(&self, snapshot: &ProgressSnapshot) {
        if let Ok(guard) = self.progress.lock() {
            if let Some(pb) = guard.as_ref() {
                if let Some(percent) = snapshot.percent {
                    pb.set_position(percent.clamp(0.0, 100.0) as u64);
                }
                pb.set_message(format!(
                    "{} / {}",
                    format_duration(snapshot.current_secs),
                    snapshot
                        .total_secs
                        .map_or_else(|| "??:??:??".to_string(), format_duration)
                ));
            }
        }
    }

    fn stage_finished(&self, stage: EncodeStage) {
        if stage.is_encode() {
            self.finish_progress();
            println!("  {} {}", style("✓").green(), stage);
        }
    }

    fn warning(&self, message: &str) {
        self.finish_progress();
        println!("  {}", style(format!("WARN: {message}")).yellow().bold());
    }

    fn task_finished(&self, outcome: &TaskOutcome) {
        println!(
            "  {} {} ({}, {} frames, {})",
            style("Saved").green().bold(),
            style(outcome.output_path.display()).green(),
            format_bytes(outcome.container_size),
            outcome.frame_count,
            format_duration(outcome.elapsed.as_secs_f64())
        );
    }

    fn task_failed(&self, task: &MediaTask, message: &str) {
        self.finish_progress();
        eprintln!(
            "\n{} {}",
            style("ERROR").red().bold(),
            style(task.input_path.display()).red().bold()
        );
        eprintln!("  {message}");
    }

    fn batch_finished(&self, summary: &BatchSummary) {
        if summary.total > 1 {
            println!("\n{}", style("BATCH SUMMARY").bold().cyan());
            println!(
                "  {}",
                style(format!("{} of {} converted", summary.completed, summary.total)).bold()
            );
            println!(
                "  Size: {} | Time: {}",
                format_bytes(summary.total_size),
                format_duration(summary.elapsed.as_secs_f64())
            );
        }
    }
}

/// Newline-delimited JSON events, one object per line.
pub struct JsonReporter {
    writer: Mutex<Box<dyn Write + Send>>,
    last_progress_bucket: Mutex<i32>,
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonReporter {
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
            last_progress_bucket: Mutex::new(-1),
        }
    }

    fn timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }

    fn write_value(&self, value: serde_json::Value) {
        let Ok(mut writer) = self.writer.lock() else {
            log::debug!("json event writer is poisoned, dropping event");
            return;
        };
        if let Err(e) = writeln!(writer, "{value}").and_then(|()| writer.flush()) {
            log::debug!("failed to write json event: {e}");
        }
    }
}

impl Reporter for JsonReporter {
    fn batch_started(&self, tasks: &[MediaTask]) {
        let files: Vec<_> = tasks
            .iter()
            .map(|t| {
                json!({
                    "input": t.input_path.display().to_string(),
                    "output": t.output_path.display().to_string(),
                })
            })
            .collect();
        self.write_value(json!({
            "type": "batch_started",
            "total_files": tasks.len(),
            "files": files,
            "timestamp": Self::timestamp(),
        }));
    }

    fn task_started(&self, position: usize, total: usize, task: &MediaTask) {
        self.write_value(json!({
            "type": "task_started",
            "position": position,
            "total": total,
            "input_file": task.input_path.display().to_string(),
            "output_file": task.output_path.display().to_string(),
            "timestamp": Self::timestamp(),
        }));
    }

    fn stage_started(&self, stage: EncodeStage) {
        if let Ok(mut bucket) = self.last_progress_bucket.lock() {
            *bucket = -1;
        }
        self.write_value(json!({
            "type": "stage_started",
            "stage": stage.as_str(),
            "timestamp": Self::timestamp(),
        }));
    }

    fn progress(&self, snapshot: &ProgressSnapshot) {
        let Some(percent) = snapshot.percent else {
            return;
        };
        let bucket = (percent as i32) / 5;
        if let Ok(mut guard) = self.last_progress_bucket.lock() {
            if bucket <= *guard {
                return;
            }
            *guard = bucket;
        }
        self.write_value(json!({
            "type": "progress",
            "stage": snapshot.stage.as_str(),
            "percent": percent,
            "current_seconds": snapshot.current_secs,
            "total_seconds": snapshot.total_secs,
            "timestamp": Self::timestamp(),
        }));
    }

    fn stage_finished(&self, stage: EncodeStage) {
        self.write_value(json!({
            "type": "stage_finished",
            "stage": stage.as_str(),
            "timestamp": Self::timestamp(),
        }));
    }

    fn warning(&self, message: &str) {
        self.write_value(json!({
            "type": "warning",
            "message": message,
            "timestamp": Self::timestamp(),
        }));
    }

    fn task_finished(&self, outcome: &TaskOutcome) {
        self.write_value(json!({
            "type": "task_finished",
            "input_file": outcome.input_path.display().to_string(),
            "output_file": outcome.output_path.display().to_string(),
            "frame_count": outcome.frame_count,
            "audio_size": outcome.audio_size,
            "video_size": outcome.video_size,
            "container_size": outcome.container_size,
            "looped": outcome.looped,
            "silent_audio": outcome.silent_audio,
            "duration_seconds": outcome.elapsed.as_secs_f64(),
            "timestamp": Self::timestamp(),
        }));
    }

    fn task_failed(&self, task: &MediaTask, message: &str) {
        self.write_value(json!({
            "type": "error",
            "input_file": task.input_path.display().to_string(),
            "message": message,
            "timestamp": Self::timestamp(),
        }));
    }

    fn batch_finished(&self, summary: &BatchSummary) {
        self.write_value(json!({
            "type": "batch_finished",
            "completed": summary.completed,
            "total_files": summary.total,
            "total_size": summary.total_size,
            "duration_seconds": summary.elapsed.as_secs_f64(),
            "timestamp": Self::timestamp(),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn lines(&self) -> Vec<serde_json::Value> {
            let bytes = self.0.lock().unwrap().clone();
            String::from_utf8(bytes)
                .unwrap()
                .lines()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect()
        }
    }

    fn snapshot(percent: f64) -> ProgressSnapshot {
        ProgressSnapshot {
            stage: EncodeStage::Video,
            current_secs: percent,
            total_secs: Some(100.0),
            percent: Some(percent),
        }
    }

    #[test]
    fn test_json_reporter_writes_one_object_per_line() {
        let buffer = SharedBuffer::default();
        let reporter = JsonReporter::with_writer(Box::new(buffer.clone()));
        let task = MediaTask::new("/in/a.mkv", "/in/a.dpg");

        reporter.task_started(1, 1, &task);
        reporter.stage_started(EncodeStage::Audio);
        reporter.warning("audio failed");

        let lines = buffer.lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["type"], "task_started");
        assert_eq!(lines[0]["input_file"], "/in/a.mkv");
        assert_eq!(lines[1]["stage"], "audio");
        assert_eq!(lines[2]["message"], "audio failed");
    }

    #[test]
    fn test_json_progress_is_throttled_to_five_percent_steps() {
        let buffer = SharedBuffer::default();
        let reporter = JsonReporter::with_writer(Box::new(buffer.clone()));

        reporter.stage_started(EncodeStage::Video);
        for percent in [0.0, 1.0, 4.9, 5.0, 6.0, 12.0, 100.0] {
            reporter.progress(&snapshot(percent));
        }

        let percents: Vec<f64> = buffer
            .lines()
            .iter()
            .filter(|v| v["type"] == "progress")
            .map(|v| v["percent"].as_f64().unwrap())
            .collect();
        assert_eq!(percents, vec![0.0, 5.0, 12.0, 100.0]);
    }

    #[test]
    fn test_unknown_total_is_not_reported_as_json_progress() {
        let buffer = SharedBuffer::default();
        let reporter = JsonReporter::with_writer(Box::new(buffer.clone()));
        reporter.progress(&ProgressSnapshot {
            stage: EncodeStage::Video,
            current_secs: 3.0,
            total_secs: None,
            percent: None,
        });
        assert!(buffer.lines().is_empty());
    }

    struct BrokenPipe(Arc<Mutex<usize>>);

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            *self.0.lock().unwrap() += 1;
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_json_write_errors_do_not_stop_reporting() {
        let attempts = Arc::new(Mutex::new(0));
        let reporter = JsonReporter::with_writer(Box::new(BrokenPipe(attempts.clone())));

        reporter.warning("first");
        let after_first = *attempts.lock().unwrap();
        reporter.warning("second");

        assert!(after_first >= 1);
        assert!(*attempts.lock().unwrap() > after_first);
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(EncodeStage::LoopedVideo.as_str(), "looped_video");
        assert!(EncodeStage::SilentAudio.is_encode());
        assert!(!EncodeStage::Container.is_encode());
    }
}
