//! Pixel-rectangle cropping.
//!
//! Selections arrive from the selection widget untouched, so they may be
//! fractional, negative, or run past the image edge. [`resolve_crop_rect`]
//! turns one into a rectangle that is guaranteed to lie inside the image.
//!
//! # Behavior
//!
//! - Coordinates are rounded to the nearest pixel
//! - The origin is clamped into the image
//! - The extent is clamped so the region ends at the image edge
//! - Minimum output dimension is 1x1 pixels for a non-empty image

use crate::decode::DecodedImage;
use crate::selection::CropSelection;

/// A crop region in whole pixels, always inside the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    /// True when the rectangle covers the whole `width` x `height` image.
    pub fn covers(&self, width: u32, height: u32) -> bool {
        self.x == 0 && self.y == 0 && self.width == width && self.height == height
    }
}

/// Clamp a selection to an image of the given dimensions.
///
/// An axis of length zero resolves to an empty span.
pub fn resolve_crop_rect(
    selection: &CropSelection,
    image_width: u32,
    image_height: u32,
) -> PixelRect {
    let (x, width) = clamp_span(selection.origin_x, selection.width, image_width);
    let (y, height) = clamp_span(selection.origin_y, selection.height, image_height);
    PixelRect { x, y, width, height }
}

/// Clamp one axis. NaN and negative values collapse to zero.
fn clamp_span(origin: f64, extent: f64, limit: u32) -> (u32, u32) {
    if limit == 0 {
        return (0, 0);
    }
    let to_px = |v: f64| if v.is_nan() { 0 } else { v.round().max(0.0) as u64 };

    let start = to_px(origin).min(limit as u64 - 1) as u32;
    let end = (start as u64 + to_px(extent)).min(limit as u64) as u32;

    (start, end.saturating_sub(start).max(1))
}

/// Crop an image to a selection.
///
/// Full-image selections return a copy of the source.
pub fn apply_crop(image: &DecodedImage, selection: &CropSelection) -> DecodedImage {
    let rect = resolve_crop_rect(selection, image.width, image.height);
    crop_to_rect(image, rect)
}

/// Crop an image to a rectangle produced by [`resolve_crop_rect`].
pub fn crop_to_rect(image: &DecodedImage, rect: PixelRect) -> DecodedImage {
    if rect.covers(image.width, image.height) {
        return image.clone();
    }

    let channels = DecodedImage::CHANNELS;
    let src_stride = image.width as usize * channels;
    let row_len = rect.width as usize * channels;
    let mut output = Vec::with_capacity(row_len * rect.height as usize);

    for row in rect.y..rect.y + rect.height {
        let start = row as usize * src_stride + rect.x as usize * channels;
        output.extend_from_slice(&image.pixels[start..start + row_len]);
    }

    DecodedImage::new(rect.width, rect.height, output)
}


// ============================================================================
// Property-Based Tests
// ============================================================================
