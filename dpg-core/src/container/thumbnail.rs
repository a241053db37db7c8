//! Preview thumbnail shown by the player's file browser.
//!
//! The thumbnail is a full-screen image in 15-bit BGR with the top bit set,
//! stored row by row as little-endian `u16` values.

use crate::config::{SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::error::CoreResult;

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};

/// Size of the packed thumbnail block in bytes.
pub const THUMBNAIL_SIZE: usize = (SCREEN_WIDTH * SCREEN_HEIGHT * 2) as usize;

/// Packs one RGB888 pixel into the player's 16-bit format.
#[must_use]
pub fn pack_pixel(Rgb([red, green, blue]): Rgb<u8>) -> u16 {
    0x8000 | (u16::from(blue >> 3) << 10) | (u16::from(green >> 3) << 5) | u16::from(red >> 3)
}

/// Decodes a still frame (BMP, PNG) produced by the screenshot step.
pub fn decode_screenshot(bytes: &[u8]) -> CoreResult<DynamicImage> {
    Ok(image::load_from_memory(bytes)?)
}

/// Fits `image` onto a black screen-sized canvas, preserving aspect ratio.
fn fit_to_screen(image: &DynamicImage) -> RgbImage {
    if image.width() == SCREEN_WIDTH && image.height() == SCREEN_HEIGHT {
        return image.to_rgb8();
    }

    let scaled = image
        .resize(SCREEN_WIDTH, SCREEN_HEIGHT, FilterType::Lanczos3)
        .to_rgb8();
    let mut canvas = RgbImage::from_pixel(SCREEN_WIDTH, SCREEN_HEIGHT, Rgb([0, 0, 0]));
    let x = (SCREEN_WIDTH - scaled.width().min(SCREEN_WIDTH)) / 2;
    let y = (SCREEN_HEIGHT - scaled.height().min(SCREEN_HEIGHT)) / 2;
    imageops::overlay(&mut canvas, &scaled, i64::from(x), i64::from(y));
    canvas
}

/// Converts a decoded frame into the packed thumbnail block.
pub fn create_thumbnail(image: &DynamicImage) -> Vec<u8> {
    let canvas = fit_to_screen(image);
    let mut bytes = Vec::with_capacity(THUMBNAIL_SIZE);
    for pixel in canvas.pixels() {
        bytes.extend_from_slice(&pack_pixel(*pixel).to_le_bytes());
    }
    bytes
}
