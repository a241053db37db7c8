//! Target geometry for the handheld screen.
//!
//! The encoded picture always fills one screen axis and is shrunk along the
//! other to keep the source aspect ratio. The remaining space is split evenly
//! into letterbox or pillarbox bars by [`calculate_padding`].

use crate::config::{SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::error::{CoreError, CoreResult};

use std::fmt;

/// Size of the scaled picture before padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoDimensions {
    pub width: u32,
    pub height: u32,
}

impl VideoDimensions {
    /// The full screen, used when the source aspect ratio is unknown.
    pub const SCREEN: VideoDimensions = VideoDimensions {
        width: SCREEN_WIDTH,
        height: SCREEN_HEIGHT,
    };
}

impl fmt::Display for VideoDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Bars added on each side of the picture to center it on the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Padding {
    pub horizontal: u32,
    pub vertical: u32,
}

/// Computes the encode size for a source with the given display aspect ratio.
///
/// The derived axis is floored to an even number of pixels so the leftover
/// screen space can always be split into two equal bars.
pub fn calculate_dimensions(aspect_ratio: Option<f64>) -> VideoDimensions {
    let Some(aspect) = aspect_ratio.filter(|a| a.is_finite() && *a > 0.0) else {
        log::debug!(
            "target video dimensions: {} (source aspect ratio unknown)",
            VideoDimensions::SCREEN
        );
        return VideoDimensions::SCREEN;
    };

    let screen_aspect = f64::from(SCREEN_WIDTH) / f64::from(SCREEN_HEIGHT);
    let dimensions = if aspect >= screen_aspect {
        VideoDimensions {
            width: SCREEN_WIDTH,
            height: even_floor(f64::from(SCREEN_WIDTH) / aspect, SCREEN_HEIGHT),
        }
    } else {
        VideoDimensions {
            width: even_floor(aspect * f64::from(SCREEN_HEIGHT), SCREEN_WIDTH),
            height: SCREEN_HEIGHT,
        }
    };

    log::debug!(
        "target video dimensions: {dimensions} (source aspect ratio {aspect:.4})"
    );
    dimensions
}

fn even_floor(value: f64, bound: u32) -> u32 {
    let floored = value.floor().clamp(2.0, f64::from(bound)) as u32;
    floored & !1
}

/// Splits the unused screen area into equal bars around `dimensions`.
pub fn calculate_padding(dimensions: VideoDimensions) -> CoreResult<Padding> {
    let VideoDimensions { width, height } = dimensions;
    if width > SCREEN_WIDTH || height > SCREEN_HEIGHT {
        return Err(CoreError::Validation(format!(
            "video dimensions {dimensions} exceed the {SCREEN_WIDTH}x{SCREEN_HEIGHT} screen"
        )));
    }

    let spare_width = SCREEN_WIDTH - width;
    let spare_height = SCREEN_HEIGHT - height;
    if spare_width % 2 != 0 || spare_height % 2 != 0 {
        return Err(CoreError::Validation(format!(
            "video dimensions {dimensions} cannot be centered on the screen"
        )));
    }

    Ok(Padding {
        horizontal: spare_width / 2,
        vertical: spare_height / 2,
    })
}
