//! Keyframe seek index (the "GOP" block at the end of a container).
//!
//! Every intra-coded frame of the encoded video contributes one entry of two
//! little-endian `i32` values: its frame number and its byte offset inside
//! the video stream.

use crate::error::{CoreError, CoreResult};

use std::fmt;
use std::str::FromStr;

/// Size of one packed entry.
pub const SEEK_ENTRY_SIZE: usize = 8;

/// Picture type of a decoded frame as reported by ffprobe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureType {
    I,
    P,
    B,
    Other,
}

impl FromStr for PictureType {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value.trim() {
            "I" => PictureType::I,
            "P" => PictureType::P,
            "B" => PictureType::B,
            _ => PictureType::Other,
        })
    }
}

impl fmt::Display for PictureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PictureType::I => "I",
            PictureType::P => "P",
            PictureType::B => "B",
            PictureType::Other => "?",
        };
        f.write_str(name)
    }
}

/// Metadata of one decoded frame, in decode order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRecord {
    pub pict_type: PictureType,
    /// Packet position in the stream; `None` when ffprobe prints `N/A`.
    pub byte_offset: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekIndexEntry {
    pub frame_number: i32,
    pub byte_offset: i32,
}

/// Packed seek index for one video stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeekIndex {
    entries: Vec<SeekIndexEntry>,
}

impl SeekIndex {
    pub fn entries(&self) -> &[SeekIndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Size of the packed index in bytes.
    pub fn byte_len(&self) -> usize {
        self.entries.len() * SEEK_ENTRY_SIZE
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.byte_len());
        for entry in &self.entries {
            bytes.extend_from_slice(&entry.frame_number.to_le_bytes());
            bytes.extend_from_slice(&entry.byte_offset.to_le_bytes());
        }
        bytes
    }
}

/// Accumulates frame records in arrival order and keeps the I-frames.
#[derive(Debug, Default)]
pub struct SeekIndexBuilder {
    next_frame: u64,
    entries: Vec<SeekIndexEntry>,
}

impl SeekIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the next frame of the stream.
    ///
    /// # Errors
    ///
    /// * `CoreError::Range` - the frame number or offset does not fit `i32`
    /// * `CoreError::ProbeParse` - an I-frame has no packet position
    pub fn push(&mut self, record: FrameRecord) -> CoreResult<()> {
        let frame = self.next_frame;
        self.next_frame += 1;

        if record.pict_type != PictureType::I {
            return Ok(());
        }

        let offset = record.byte_offset.ok_or_else(|| {
            CoreError::ProbeParse(format!("I-frame {frame} has no packet position"))
        })?;
        let frame_number = i32::try_from(frame).map_err(|_| CoreError::Range {
            field: "seek frame number",
            value: frame.to_string(),
        })?;
        let byte_offset = i32::try_from(offset).map_err(|_| CoreError::Range {
            field: "seek byte offset",
            value: offset.to_string(),
        })?;

        self.entries.push(SeekIndexEntry {
            frame_number,
            byte_offset,
        });
        Ok(())
    }

    /// Number of frames seen so far.
    pub fn frames_seen(&self) -> u64 {
        self.next_frame
    }

    pub fn finish(self) -> SeekIndex {
        log::debug!(
            "seek index: {} keyframes in {} frames",
            self.entries.len(),
            self.next_frame
        );
        SeekIndex {
            entries: self.entries,
        }
    }
}
