// dpg-core/tests/common/mod.rs
//
// Test doubles for the ffmpeg and ffprobe seams.

#![allow(dead_code)]

use dpg_core::container::{FrameRecord, PictureType};
use dpg_core::error::{CoreError, CoreResult};
use dpg_core::external::{EncoderEvent, FfmpegProcess, FfmpegSpawner, MediaInfo, MediaProbe};
use dpg_core::reporting::{BatchSummary, EncodeStage, ProgressSnapshot, Reporter, TaskOutcome};
use dpg_core::tasks::MediaTask;

use image::{ImageFormat, Rgb, RgbImage};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::os::unix::process::ExitStatusExt; // For ExitStatus::from_raw
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::rc::Rc;
use std::sync::Mutex;

// --- ffmpeg ---

/// What a mocked ffmpeg run leaves at its output path (the last argument).
#[derive(Clone, Debug)]
pub enum DummyOutput {
    Nothing,
    Bytes(usize),
    Bmp { width: u32, height: u32 },
}

#[derive(Clone)]
pub struct MockFfmpegProcess {
    pub events_to_emit: Vec<EncoderEvent>,
    pub exit_status: ExitStatus,
}

impl FfmpegProcess for MockFfmpegProcess {
    fn handle_events<F>(&mut self, mut handler: F) -> CoreResult<()>
    where
        F: FnMut(EncoderEvent) -> CoreResult<()>,
    {
        for event in self.events_to_emit.clone() {
            handler(event)?;
        }
        Ok(())
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        Ok(self.exit_status)
    }
}

struct MockFfmpegExpectation {
    arg_pattern: String,
    process: MockFfmpegProcess,
    output: DummyOutput,
}

/// Spawner answering calls from a queue of expectations. The first pending
/// expectation whose pattern starts any argument is consumed.
#[derive(Clone, Default)]
pub struct MockFfmpegSpawner {
    expectations: Rc<RefCell<Vec<MockFfmpegExpectation>>>,
    received_calls: Rc<RefCell<Vec<Vec<String>>>>,
}

impl MockFfmpegSpawner {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_success_expectation(
        &self,
        arg_pattern: &str,
        events: Vec<EncoderEvent>,
        output: DummyOutput,
    ) {
        self.expectations.borrow_mut().push(MockFfmpegExpectation {
            arg_pattern: arg_pattern.to_string(),
            process: MockFfmpegProcess {
                events_to_emit: events,
                exit_status: ExitStatus::from_raw(0),
            },
            output,
        });
    }

    pub fn add_exit_error_expectation(&self, arg_pattern: &str, stderr: &[&str], exit_code: i32) {
        self.expectations.borrow_mut().push(MockFfmpegExpectation {
            arg_pattern: arg_pattern.to_string(),
            process: MockFfmpegProcess {
                events_to_emit: stderr
                    .iter()
                    .map(|line| EncoderEvent::Log(line.to_string()))
                    .collect(),
                exit_status: ExitStatus::from_raw(exit_code << 8),
            },
            output: DummyOutput::Nothing,
        });
    }

    pub fn get_received_calls(&self) -> Vec<Vec<String>> {
        self.received_calls.borrow().clone()
    }

    pub fn calls_matching(&self, arg_pattern: &str) -> Vec<Vec<String>> {
        self.get_received_calls()
            .into_iter()
            .filter(|args| args.iter().any(|a| a.starts_with(arg_pattern)))
            .collect()
    }

    pub fn pending_expectations(&self) -> usize {
        self.expectations.borrow().len()
    }
}

fn write_dummy_output(path: &Path, output: &DummyOutput) {
    match output {
        DummyOutput::Nothing => {}
        DummyOutput::Bytes(len) => std::fs::write(path, vec![0xA5; *len]).unwrap(),
        DummyOutput::Bmp { width, height } => {
            RgbImage::from_pixel(*width, *height, Rgb([255, 0, 0]))
                .save_with_format(path, ImageFormat::Bmp)
                .unwrap();
        }
    }
}

impl FfmpegSpawner for MockFfmpegSpawner {
    type Process = MockFfmpegProcess;

    fn spawn(&self, args: &[String]) -> CoreResult<Self::Process> {
        self.received_calls.borrow_mut().push(args.to_vec());

        let mut expectations = self.expectations.borrow_mut();
        let found = expectations
            .iter()
            .position(|exp| args.iter().any(|arg| arg.starts_with(&exp.arg_pattern)));
        let Some(index) = found else {
            panic!("MockFfmpegSpawner: No expectation found for command args: {args:?}");
        };
        let expectation = expectations.remove(index);

        let output_path = PathBuf::from(args.last().expect("ffmpeg args end with the output"));
        write_dummy_output(&output_path, &expectation.output);
        Ok(expectation.process)
    }
}

// --- ffprobe ---

/// Probe returning canned answers. Successive `count_frames` calls pop
/// from `frame_counts`; the last value repeats.
pub struct MockProbe {
    pub info: MediaInfo,
    frame_counts: RefCell<VecDeque<u64>>,
    frames: Vec<FrameRecord>,
    pub count_calls: RefCell<Vec<PathBuf>>,
    pub probe_error: Option<String>,
}

impl MockProbe {
    pub fn new(info: MediaInfo, frame_counts: &[u64], frames: Vec<FrameRecord>) -> Self {
        Self {
            info,
            frame_counts: RefCell::new(frame_counts.iter().copied().collect()),
            frames,
            count_calls: RefCell::new(Vec::new()),
            probe_error: None,
        }
    }
}

impl MediaProbe for MockProbe {
    fn probe(&self, _path: &Path) -> CoreResult<MediaInfo> {
        match &self.probe_error {
            Some(message) => Err(CoreError::ProbeParse(message.clone())),
            None => Ok(self.info.clone()),
        }
    }

    fn count_frames(&self, path: &Path) -> CoreResult<u64> {
        self.count_calls.borrow_mut().push(path.to_path_buf());
        let mut counts = self.frame_counts.borrow_mut();
        let count = if counts.len() > 1 {
            counts.pop_front()
        } else {
            counts.front().copied()
        };
        count.ok_or_else(|| CoreError::ProbeParse("no frame count configured".to_string()))
    }

    fn for_each_frame(
        &self,
        _path: &Path,
        visit: &mut dyn FnMut(FrameRecord) -> CoreResult<()>,
    ) -> CoreResult<()> {
        for frame in &self.frames {
            visit(*frame)?;
        }
        Ok(())
    }
}

/// A GOP pattern of `count` frames with an I-frame every `gop` frames,
/// each frame `frame_bytes` long.
pub fn frame_records(count: u64, gop: u64, frame_bytes: u64) -> Vec<FrameRecord> {
    (0..count)
        .map(|n| FrameRecord {
            pict_type: if n % gop == 0 { PictureType::I } else { PictureType::P },
            byte_offset: Some(n * frame_bytes),
        })
        .collect()
}

// --- reporting ---

#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    BatchStarted(usize),
    TaskStarted(usize, usize),
    StageStarted(EncodeStage),
    StageFinished(EncodeStage),
    Warning(String),
    TaskFinished(PathBuf),
    TaskFailed(PathBuf, String),
    BatchFinished { completed: usize, total: usize },
}

#[derive(Default)]
pub struct RecordingReporter {
    pub events: Mutex<Vec<Recorded>>,
    pub snapshots: Mutex<Vec<ProgressSnapshot>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<Recorded> {
        self.events.lock().unwrap().clone()
    }

    pub fn stages_started(&self) -> Vec<EncodeStage> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Recorded::StageStarted(stage) => Some(stage),
                _ => None,
            })
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Recorded::Warning(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Recorded) {
        self.events.lock().unwrap().push(event);
    }
}

impl Reporter for RecordingReporter {
    fn batch_started(&self, tasks: &[MediaTask]) {
        self.push(Recorded::BatchStarted(tasks.len()));
    }

    fn task_started(&self, position: usize, total: usize, _task: &MediaTask) {
        self.push(Recorded::TaskStarted(position, total));
    }

    fn stage_started(&self, stage: EncodeStage) {
        self.push(Recorded::StageStarted(stage));
    }

    fn progress(&self, snapshot: &ProgressSnapshot) {
        self.snapshots.lock().unwrap().push(*snapshot);
    }

    fn stage_finished(&self, stage: EncodeStage) {
        self.push(Recorded::StageFinished(stage));
    }

    fn warning(&self, message: &str) {
        self.push(Recorded::Warning(message.to_string()));
    }

    fn task_finished(&self, outcome: &TaskOutcome) {
        self.push(Recorded::TaskFinished(outcome.output_path.clone()));
    }

    fn task_failed(&self, task: &MediaTask, message: &str) {
        self.push(Recorded::TaskFailed(task.input_path.clone(), message.to_string()));
    }

    fn batch_finished(&self, summary: &BatchSummary) {
        self.push(Recorded::BatchFinished {
            completed: summary.completed,
            total: summary.total,
        });
    }
}
