//! Image transformation operations.
//!
//! Only cropping is supported. Crop coordinates are pixels in the oriented
//! source image with the origin at the top-left corner.

mod crop;

pub use crop::{apply_crop, crop_to_rect, resolve_crop_rect, PixelRect};
