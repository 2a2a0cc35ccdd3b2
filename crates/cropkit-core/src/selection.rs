//! Crop selection descriptors shared by the selection widget, the session and
//! the manipulation engine.
//!
//! # Coordinate System
//!
//! - Values are pixels in the source image's oriented coordinate space
//! - Origin is the top-left corner
//! - The session never inspects or validates a selection; engines clamp it

use serde::{Deserialize, Serialize};

/// A rectangular region of the source image reported by the selection widget.
///
/// Serialized with the JS crop-action field names (`originX`, `originY`,
/// `width`, `height`) so hosts can hand the widget's report straight through.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropSelection {
    /// Left edge in pixels.
    pub origin_x: f64,
    /// Top edge in pixels.
    pub origin_y: f64,
    /// Region width in pixels.
    pub width: f64,
    /// Region height in pixels.
    pub height: f64,
}

impl CropSelection {
    pub fn new(origin_x: f64, origin_y: f64, width: f64, height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            width,
            height,
        }
    }
}

/// Desired width:height ratio of the crop region.
///
/// Serialized as a two-element array, e.g. `[16, 9]`. Defaults to a square.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct AspectRatio {
    pub width: f64,
    pub height: f64,
}

impl AspectRatio {
    pub const SQUARE: AspectRatio = AspectRatio {
        width: 1.0,
        height: 1.0,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::SQUARE
    }
}

impl From<[f64; 2]> for AspectRatio {
    fn from([width, height]: [f64; 2]) -> Self {
        Self { width, height }
    }
}

impl From<AspectRatio> for [f64; 2] {
    fn from(aspect: AspectRatio) -> Self {
        [aspect.width, aspect.height]
    }
}

/// Shape the selection widget constrains the region to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropShape {
    #[default]
    Rect,
}
