// ============================================================================
// dpg-core/src/container/mod.rs
// ============================================================================
//
// CONTAINER: DPG4 File Layout
//
// Byte-level building blocks of a DPG4 file and the writer that assembles
// them:
//
//   [header 52][thumbnail 98304][audio][video][seek index]
//
// KEY COMPONENTS:
// - header: ContainerHeader with range-checked fields
// - thumbnail: 256x192 preview packed as 15-bit BGR
// - seek_index: I-frame number/offset table
// - writer: atomic container assembly with size checks

pub mod header;
pub mod seek_index;
pub mod thumbnail;
pub mod writer;

pub use header::{AUDIO_START, AudioCodec, ContainerHeader, HEADER_SIZE, PixelFormat};
pub use seek_index::{FrameRecord, PictureType, SeekIndex, SeekIndexBuilder, SeekIndexEntry};
pub use thumbnail::{THUMBNAIL_SIZE, create_thumbnail, decode_screenshot, pack_pixel};
pub use writer::{ContainerParts, write_container};
