//! Assembly of the final container file.
//!
//! Sections are written in header, thumbnail, audio, video, seek index order
//! into a temporary file next to the destination, which is renamed into
//! place once every section has been checked against the header.

use crate::container::header::{ContainerHeader, HEADER_SIZE};
use crate::container::seek_index::SeekIndex;
use crate::container::thumbnail::THUMBNAIL_SIZE;
use crate::error::{CoreError, CoreResult};

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tempfile::Builder as TempFileBuilder;

/// Everything that goes into one container.
#[derive(Debug)]
pub struct ContainerParts<'a> {
    pub header: &'a ContainerHeader,
    pub thumbnail: &'a [u8],
    pub audio: &'a Path,
    pub video: &'a Path,
    pub seek_index: &'a SeekIndex,
}

fn check_size(stream: &'static str, expected: u64, actual: u64) -> CoreResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(CoreError::SizeMismatch {
            stream,
            expected,
            actual,
        })
    }
}

fn copy_stream<W: Write>(stream: &'static str, path: &Path, expected: u32, out: &mut W) -> CoreResult<()> {
    let mut file = File::open(path)?;
    let copied = io::copy(&mut file, out)?;
    check_size(stream, u64::from(expected), copied)
}

/// Writes the container to `destination` and returns its size in bytes.
///
/// Parent directories are created as needed. On error the destination is
/// left untouched.
pub fn write_container(destination: &Path, parts: &ContainerParts<'_>) -> CoreResult<u64> {
    let header = parts.header;
    check_size("thumbnail", THUMBNAIL_SIZE as u64, parts.thumbnail.len() as u64)?;
    check_size(
        "seek index",
        u64::from(header.seek_index_size()),
        parts.seek_index.byte_len() as u64,
    )?;

    let parent = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let temp = TempFileBuilder::new()
        .prefix(".dpg-")
        .suffix(".part")
        .tempfile_in(parent)?;

    {
        let mut out = BufWriter::new(temp.as_file());
        out.write_all(&header.to_bytes())?;
        out.write_all(parts.thumbnail)?;
        copy_stream("audio", parts.audio, header.audio_size(), &mut out)?;
        copy_stream("video", parts.video, header.video_size(), &mut out)?;
        out.write_all(&parts.seek_index.to_bytes())?;
        out.flush()?;
    }
    temp.as_file().sync_all()?;

    let written = temp.as_file().metadata()?.len();
    check_size("container", header.container_len(), written)?;

    temp.persist(destination).map_err(|e| CoreError::Io(e.error))?;
    log::debug!(
        "wrote {} ({} bytes, {} header + {} thumbnail)",
        destination.display(),
        written,
        HEADER_SIZE,
        THUMBNAIL_SIZE
    );
    Ok(written)
}
