//! The fixed 52-byte DPG4 header.
//!
//! Layout (all integers little-endian `u32`):
//!
//! | Offset | Field |
//! |---|---|
//! | 0 | magic `DPG4` |
//! | 4 | frame count |
//! | 8 | framerate × 256 |
//! | 12 | audio sample rate |
//! | 16 | audio codec |
//! | 20 | audio start |
//! | 24 | audio size |
//! | 28 | video start |
//! | 32 | video size |
//! | 36 | video end |
//! | 40 | seek index size |
//! | 44 | pixel format |
//! | 48 | thumbnail marker `THM0` |

use crate::config::AUDIO_SAMPLE_RATE;
use crate::container::thumbnail::THUMBNAIL_SIZE;
use crate::error::{CoreError, CoreResult};

/// Size of the packed header in bytes.
pub const HEADER_SIZE: usize = 52;

/// The audio stream starts right after the header and the thumbnail.
pub const AUDIO_START: u32 = (HEADER_SIZE + THUMBNAIL_SIZE) as u32;

const MAGIC: &[u8; 4] = b"DPG4";
const THUMBNAIL_MARKER: &[u8; 4] = b"THM0";

/// Audio codecs understood by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum AudioCodec {
    Mp2Stereo = 0,
    GsmMono = 1,
    GsmStereo = 2,
    VorbisStereo = 3,
}

/// Pixel formats the header can announce.
///
/// Only the header field uses this; the video itself is always MPEG-1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum PixelFormat {
    Rgb15 = 0,
    Rgb18 = 1,
    Rgb21 = 2,
    Rgb24 = 3,
}

/// Validated header values. Build with [`ContainerHeader::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    frame_count: u32,
    framerate_fixed: u32,
    audio_codec: AudioCodec,
    audio_size: u32,
    video_start: u32,
    video_size: u32,
    video_end: u32,
    seek_index_size: u32,
    pixel_format: PixelFormat,
}

fn fit_u32(field: &'static str, value: u64) -> CoreResult<u32> {
    u32::try_from(value).map_err(|_| CoreError::Range {
        field,
        value: value.to_string(),
    })
}

fn fixed_point_framerate(framerate: f64) -> CoreResult<u32> {
    let scaled = (framerate * 256.0).trunc();
    if !scaled.is_finite() || scaled < 0.0 || scaled > f64::from(u32::MAX) {
        return Err(CoreError::Range {
            field: "framerate",
            value: framerate.to_string(),
        });
    }
    Ok(scaled as u32)
}

impl ContainerHeader {
    /// Checks that every derived field fits its 32-bit slot.
    ///
    /// # Errors
    ///
    /// `CoreError::Range` naming the first field that does not fit.
    pub fn new(
        frame_count: u64,
        framerate: f64,
        audio_size: u64,
        video_size: u64,
        seek_index_size: u64,
    ) -> CoreResult<Self> {
        let frame_count = fit_u32("frame_count", frame_count)?;
        let framerate_fixed = fixed_point_framerate(framerate)?;
        let audio_size = fit_u32("audio_size", audio_size)?;
        let video_size = fit_u32("video_size", video_size)?;
        let seek_index_size = fit_u32("gop_size", seek_index_size)?;

        let video_start = fit_u32("video_start", u64::from(AUDIO_START) + u64::from(audio_size))?;
        let video_end = fit_u32("video_end", u64::from(video_start) + u64::from(video_size))?;

        Ok(Self {
            frame_count,
            framerate_fixed,
            audio_codec: AudioCodec::Mp2Stereo,
            audio_size,
            video_start,
            video_size,
            video_end,
            seek_index_size,
            pixel_format: PixelFormat::Rgb24,
        })
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn audio_size(&self) -> u32 {
        self.audio_size
    }

    pub fn video_start(&self) -> u32 {
        self.video_start
    }

    pub fn video_size(&self) -> u32 {
        self.video_size
    }

    pub fn video_end(&self) -> u32 {
        self.video_end
    }

    pub fn seek_index_size(&self) -> u32 {
        self.seek_index_size
    }

    /// Total length of a container described by this header.
    pub fn container_len(&self) -> u64 {
        u64::from(self.video_end) + u64::from(self.seek_index_size)
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let fields = [
            self.frame_count,
            self.framerate_fixed,
            AUDIO_SAMPLE_RATE,
            self.audio_codec as u32,
            AUDIO_START,
            self.audio_size,
            self.video_start,
            self.video_size,
            self.video_end,
            self.seek_index_size,
            self.pixel_format as u32,
        ];

        let mut bytes = [0u8; HEADER_SIZE];
        bytes[..4].copy_from_slice(MAGIC);
        for (slot, value) in bytes[4..48].chunks_exact_mut(4).zip(fields) {
            slot.copy_from_slice(&value.to_le_bytes());
        }
        bytes[48..].copy_from_slice(THUMBNAIL_MARKER);
        bytes
    }
}
