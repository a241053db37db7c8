// ============================================================================
// dpg-cli/src/logging.rs
// ============================================================================
//
// LOGGING SETUP: env_logger backend for the `log` facade
//
// Lines are written to stderr as `YYYY-MM-DD HH:MM:SS [LEVEL] message`.
// `--verbose` selects Debug, otherwise Info; RUST_LOG overrides both, e.g.
// RUST_LOG=ffmpeg_log=trace shows every line ffmpeg prints.

use log::LevelFilter;
use std::io::Write;

/// Level used when RUST_LOG is not set.
pub fn default_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Initializes the global logger. Safe to call more than once.
pub fn init(verbose: bool) {
    let result = env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(default_level(verbose))
        .parse_default_env()
        .try_init();

    if result.is_ok() {
        log::debug!("logger initialized with level {}", default_level(verbose));
    }
}
