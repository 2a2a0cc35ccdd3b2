//! Source image decoding for the manipulation engine.
//!
//! This module provides functionality for:
//! - Sniffing the source format (PNG, JPEG)
//! - Decoding to RGBA pixel data
//! - Applying EXIF orientation so selections match what the user saw
//!
//! # Examples
//!
//! ```ignore
//! use cropkit_core::decode::decode_image;
//!
//! let bytes = std::fs::read("photo.png").unwrap();
//! let image = decode_image(&bytes).unwrap();
//! println!("Decoded {}x{} image", image.width, image.height);
//! ```

mod raster;
mod types;

pub use raster::decode_image;
pub use types::{DecodeError, DecodedImage, Orientation};
