//! Expansion of command-line inputs into the set of files to convert.
//!
//! Files named explicitly are always taken. Directories are walked
//! recursively and contribute every file with a known video extension.

use crate::error::{CoreError, CoreResult};

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Extensions (lowercase) picked up when walking a directory.
pub const VIDEO_EXTENSIONS: [&str; 13] = [
    "avi", "flv", "m4v", "mkv", "mov", "mp4", "mpeg", "mpg", "ogm", "ogv", "ts", "webm", "wmv",
];

/// Checks whether `path` has one of [`VIDEO_EXTENSIONS`] (case-insensitive).
#[must_use]
pub fn has_video_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            VIDEO_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Makes `path` absolute and folds `.` and `..` components lexically, so
/// different spellings of one file compare equal. Symlinks are kept as named.
fn normalize_path(path: &Path) -> CoreResult<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in std::path::absolute(path)?.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    Ok(normalized)
}

/// Resolves `inputs` into an ordered, deduplicated set of absolute file paths.
///
/// # Errors
///
/// * `CoreError::PathError` - an input does not exist
/// * `CoreError::Walkdir` - a directory could not be traversed
/// * `CoreError::NoFilesFound` - nothing to convert was found
pub fn collect_input_files<P: AsRef<Path>>(inputs: &[P]) -> CoreResult<BTreeSet<PathBuf>> {
    let mut files = BTreeSet::new();

    for input in inputs {
        let input = input.as_ref();
        if !input.exists() {
            return Err(CoreError::PathError(format!(
                "input '{}' does not exist",
                input.display()
            )));
        }

        if input.is_dir() {
            for entry in WalkDir::new(input).follow_links(true).sort_by_file_name() {
                let entry = entry?;
                if entry.file_type().is_file() && has_video_extension(entry.path()) {
                    files.insert(normalize_path(entry.path())?);
                }
            }
        } else {
            files.insert(normalize_path(input)?);
        }
    }

    if files.is_empty() {
        return Err(CoreError::NoFilesFound);
    }
    log::debug!("collected {} input file(s)", files.len());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::tempdir;

    #[test]
    fn test_has_video_extension() {
        assert!(has_video_extension(Path::new("a.mkv")));
        assert!(has_video_extension(Path::new("a.MP4")));
        assert!(has_video_extension(Path::new("dir/a.WebM")));
        assert!(!has_video_extension(Path::new("a.srt")));
        assert!(!has_video_extension(Path::new("a.dpg")));
        assert!(!has_video_extension(Path::new("mkv")));
    }

    #[test]
    fn test_directories_are_walked_recursively() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("season 1")).unwrap();
        File::create(dir.path().join("a.mkv")).unwrap();
        File::create(dir.path().join("a.srt")).unwrap();
        File::create(dir.path().join("season 1").join("b.AVI")).unwrap();

        let files = collect_input_files(&[dir.path()]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.mkv", "b.AVI"]);
        assert!(files.iter().all(|p| p.is_absolute()));
    }

    #[test]
    fn test_explicit_files_are_kept_and_deduplicated() {
        let dir = tempdir().unwrap();
        let clip = dir.path().join("clip.unknown");
        File::create(&clip).unwrap();

        let files = collect_input_files(&[clip.as_path(), clip.as_path(), dir.path()]).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_parent_components_are_folded_before_deduplication() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let clip = dir.path().join("x.mkv");
        File::create(&clip).unwrap();
        let roundabout = dir.path().join("sub").join("..").join(".").join("x.mkv");

        let files = collect_input_files(&[roundabout.as_path(), clip.as_path()]).unwrap();
        assert_eq!(files.into_iter().collect::<Vec<_>>(), vec![clip]);
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let dir = tempdir().unwrap();
        let err = collect_input_files(&[dir.path().join("missing.mkv")]).unwrap_err();
        assert!(matches!(err, CoreError::PathError(_)));
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_empty_directory_has_no_files() {
        let dir = tempdir().unwrap();
        let err = collect_input_files(&[dir.path()]).unwrap_err();
        assert!(matches!(err, CoreError::NoFilesFound));
    }
}
