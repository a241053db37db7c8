//! Implementation of the 'convert' subcommand.
//!
//! Maps the parsed arguments onto a `ConversionConfig`, expands the inputs
//! into tasks and hands them to the dpg-core batch driver.

use crate::cli::ConvertArgs;
use crate::error::CliResult;

use dpg_core::{
    ConversionConfig, FfprobeExecutor, JsonReporter, Reporter, SidecarSpawner, SubtitleFont,
    TerminalReporter, VideoQuality, check_required_tools, collect_input_files, create_task_list,
    process_tasks,
};

use log::{debug, info};

/// Builds the conversion settings from command-line arguments.
pub fn build_config(args: &ConvertArgs) -> CliResult<ConversionConfig> {
    let config = ConversionConfig {
        framerate: args.framerate,
        quality: VideoQuality::try_from(args.quality)?,
        audio_stream: args.audio_stream,
        subtitles: args.subtitles.clone().unwrap_or_default(),
        font: SubtitleFont {
            name: args.font.clone(),
            size: args.font_size,
        },
        temp_dir: args.temp_dir.clone(),
    };
    config.validate()?;
    Ok(config)
}

pub fn run_convert(args: &ConvertArgs, json: bool) -> CliResult<()> {
    let config = build_config(args)?;
    debug!("conversion settings: {config:?}");

    let inputs = collect_input_files(&args.inputs)?;
    let tasks = create_task_list(&inputs, args.output.as_deref())?;
    info!("found {} file(s) to convert", tasks.len());

    check_required_tools()?;

    let reporter: Box<dyn Reporter> = if json {
        Box::new(JsonReporter::new())
    } else {
        Box::new(TerminalReporter::new())
    };
    process_tasks(
        &tasks,
        &config,
        &SidecarSpawner,
        &FfprobeExecutor::new(),
        reporter.as_ref(),
    )?;
    Ok(())
}
