//! Mapping of input files to output container paths.
//!
//! Without an output target every container lands next to its source. With
//! a single input the target is either the container path itself or a
//! directory. With several inputs the target is a directory root that mirrors
//! the layout of the inputs below their common ancestor.

use crate::config::CONTAINER_EXTENSION;
use crate::error::{CoreError, CoreResult};

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

/// One input file and the container it will be converted into.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MediaTask {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}

impl MediaTask {
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
        }
    }
}

/// The input path with its extension replaced by the container extension.
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension(CONTAINER_EXTENSION)
}

fn default_output_filename(input: &Path) -> CoreResult<PathBuf> {
    let name = input.file_name().ok_or_else(|| {
        CoreError::PathError(format!("input '{}' has no file name", input.display()))
    })?;
    Ok(Path::new(name).with_extension(CONTAINER_EXTENSION))
}

fn has_container_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(CONTAINER_EXTENSION))
}

/// Longest shared leading sequence of path components.
pub fn common_path<'a, I>(paths: I) -> PathBuf
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut paths = paths.into_iter();
    let Some(first) = paths.next() else {
        return PathBuf::new();
    };

    let mut common: Vec<Component<'a>> = first.components().collect();
    for path in paths {
        let shared = common
            .iter()
            .zip(path.components())
            .take_while(|(a, b)| **a == *b)
            .count();
        common.truncate(shared);
    }
    common.iter().collect()
}

/// Builds the sorted list of conversion tasks for `inputs`.
pub fn create_task_list(
    inputs: &BTreeSet<PathBuf>,
    output: Option<&Path>,
) -> CoreResult<Vec<MediaTask>> {
    let Some(output) = output else {
        return Ok(inputs
            .iter()
            .map(|input| MediaTask::new(input, default_output_path(input)))
            .collect());
    };

    if inputs.len() == 1 {
        let Some(input) = inputs.iter().next() else {
            return Ok(Vec::new());
        };
        let output_path = if has_container_extension(output) {
            output.to_path_buf()
        } else {
            output.join(default_output_filename(input)?)
        };
        return Ok(vec![MediaTask::new(input, output_path)]);
    }

    let absolute = inputs.iter().filter(|p| p.is_absolute()).count();
    if absolute != 0 && absolute != inputs.len() {
        return Err(CoreError::Validation(format!(
            "cannot place outputs under '{}': inputs mix absolute and relative paths",
            output.display()
        )));
    }

    let root = common_path(inputs.iter().map(PathBuf::as_path));
    log::debug!("common input path: '{}'", root.display());

    inputs
        .iter()
        .map(|input| {
            let relative = input.strip_prefix(&root).map_err(|_| {
                CoreError::PathError(format!(
                    "'{}' is not below '{}'",
                    input.display(),
                    root.display()
                ))
            })?;
            Ok(MediaTask::new(input, default_output_path(&output.join(relative))))
        })
        .collect()
}
