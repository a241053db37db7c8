// dpg-cli/src/main.rs
//
// Entry point of the `dpgv4` binary: parses arguments, sets up logging,
// dispatches to the selected subcommand and maps errors to exit status 1.

use clap::Parser;
use dpg_cli::error::FAILURE_EXIT_CODE;
use dpg_cli::{Cli, Commands, logging, render_error, run_convert, run_info};
use std::process;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match &cli.command {
        Commands::Convert(args) => run_convert(args, cli.json),
        Commands::Info(args) => run_info(args),
    };

    if let Err(e) = result {
        log::debug!("exiting after error: {e:?}");
        eprintln!("{}", render_error(&e));
        process::exit(FAILURE_EXIT_CODE);
    }
}
