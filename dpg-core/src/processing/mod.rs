//! Conversion orchestration.
//!
//! `dimensions` holds the screen geometry, `encode` the per-stream ffmpeg
//! runs with their recoveries, `convert` the pipeline for one file, and this
//! module the batch driver on top of it.

pub mod convert;
pub mod dimensions;
pub mod encode;

pub use convert::convert_file;
pub use dimensions::{Padding, VideoDimensions, calculate_dimensions, calculate_padding};
pub use encode::{EncodedAudio, EncodedStream, EncodedVideo, StreamKind};

use crate::config::ConversionConfig;
use crate::error::CoreResult;
use crate::external::ffmpeg_executor::FfmpegSpawner;
use crate::external::ffprobe_executor::MediaProbe;
use crate::reporting::{BatchSummary, Reporter, TaskOutcome};
use crate::tasks::MediaTask;

use std::time::Instant;

/// Converts every task in order and stops at the first failure.
///
/// The failing task is reported through [`Reporter::task_failed`] and its
/// error returned; containers finished before it stay in place.
pub fn process_tasks<S, P>(
    tasks: &[MediaTask],
    config: &ConversionConfig,
    spawner: &S,
    probe: &P,
    reporter: &dyn Reporter,
) -> CoreResult<Vec<TaskOutcome>>
where
    S: FfmpegSpawner,
    P: MediaProbe + ?Sized,
{
    config.validate()?;

    let started = Instant::now();
    reporter.batch_started(tasks);

    let mut outcomes = Vec::with_capacity(tasks.len());
    for (position, task) in tasks.iter().enumerate() {
        reporter.task_started(position + 1, tasks.len(), task);
        match convert_file(task, config, spawner, probe, reporter) {
            Ok(outcome) => {
                reporter.task_finished(&outcome);
                outcomes.push(outcome);
            }
            Err(e) => {
                log::error!("conversion of {} failed: {e}", task.input_path.display());
                reporter.task_failed(task, &e.to_string());
                return Err(e);
            }
        }
    }

    reporter.batch_finished(&BatchSummary {
        completed: outcomes.len(),
        total: tasks.len(),
        total_size: outcomes.iter().map(|o| o.container_size).sum(),
        elapsed: started.elapsed(),
    });
    Ok(outcomes)
}
