//! Output encoding for cropped images.
//!
//! This module provides functionality for:
//! - Lossless PNG encoding (the crop session default)
//! - JPEG encoding with quality derived from `SaveOptions::compress`
//!
//! # Examples
//!
//! ```ignore
//! use cropkit_core::encode::{encode_image, SaveOptions};
//!
//! let bytes = encode_image(&cropped, &SaveOptions::lossless()).unwrap();
//! std::fs::write("out.png", bytes).unwrap();
//! ```

mod jpeg;
mod png;
mod types;

pub use jpeg::encode_jpeg;
pub use png::encode_png;
pub use types::{EncodeError, SaveFormat, SaveOptions};

use crate::decode::DecodedImage;

/// Encode a decoded image according to `options`.
pub fn encode_image(image: &DecodedImage, options: &SaveOptions) -> Result<Vec<u8>, EncodeError> {
    match options.format {
        SaveFormat::Png => encode_png(&image.pixels, image.width, image.height),
        SaveFormat::Jpeg => encode_jpeg(
            &image.pixels,
            image.width,
            image.height,
            options.jpeg_quality(),
        ),
    }
}

/// Check dimensions and buffer length before handing pixels to a codec.
pub(crate) fn validate(
    pixels: &[u8],
    width: u32,
    height: u32,
    channels: usize,
) -> Result<(), EncodeError> {
    if width == 0 || height == 0 {
        return Err(EncodeError::InvalidDimensions { width, height });
    }

    let expected = width as usize * height as usize * channels;
    if pixels.len() != expected {
        return Err(EncodeError::InvalidPixelData {
            expected,
            actual: pixels.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_image_dispatches_on_format() {
        let img = DecodedImage::new(4, 4, vec![50u8; 64]);

        let png = encode_image(&img, &SaveOptions::lossless()).unwrap();
        assert_eq!(&png[1..4], b"PNG");

        let jpeg_opts = SaveOptions {
            format: SaveFormat::Jpeg,
            compress: 0.5,
        };
        let jpeg = encode_image(&img, &jpeg_opts).unwrap();
        assert_eq!(&jpeg[0..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_validate() {
        assert!(validate(&[0; 12], 1, 3, 4).is_ok());
        assert!(matches!(
            validate(&[0; 12], 0, 3, 4),
            Err(EncodeError::InvalidDimensions { width: 0, height: 3 })
        ));
        assert!(matches!(
            validate(&[0; 11], 1, 3, 4),
            Err(EncodeError::InvalidPixelData { expected: 12, actual: 11 })
        ));
    }
}
