//! Temporary file management utilities.
//!
//! Every task encodes into its own scratch directory. The `tempfile` crate
//! removes it on drop, so intermediates disappear on success and on error.

use crate::config::ConversionConfig;
use crate::error::CoreResult;
use std::path::PathBuf;
use tempfile::{Builder as TempFileBuilder, TempDir};

/// Prefix of every scratch directory.
pub const SCRATCH_PREFIX: &str = "dpgv4-";

/// Creates a scratch directory in `config.temp_dir`, or the system temp
/// directory when none is set. Auto-cleaned when dropped.
pub fn create_temp_dir(config: &ConversionConfig) -> CoreResult<TempDir> {
    let base: PathBuf = match &config.temp_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            dir.clone()
        }
        None => std::env::temp_dir(),
    };

    let dir = TempFileBuilder::new().prefix(SCRATCH_PREFIX).tempdir_in(&base)?;
    log::debug!("scratch directory: {}", dir.path().display());
    Ok(dir)
}
