//! Output format selection and encoding errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Pixel data length doesn't match expected dimensions
    #[error("Invalid pixel data: expected {expected} bytes, got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Width or height is zero
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// The underlying codec failed
    #[error("{format} encoding failed: {message}")]
    EncodingFailed {
        format: SaveFormat,
        message: String,
    },
}

/// Output container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveFormat {
    /// Lossless; `compress` is ignored.
    #[default]
    Png,
    Jpeg,
}

impl SaveFormat {
    pub fn extension(self) -> &'static str {
        match self {
            SaveFormat::Png => "png",
            SaveFormat::Jpeg => "jpg",
        }
    }
}

impl std::fmt::Display for SaveFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveFormat::Png => f.write_str("PNG"),
            SaveFormat::Jpeg => f.write_str("JPEG"),
        }
    }
}

/// How the engine should write its output.
///
/// The default is lossless PNG at full quality, which is what the crop
/// session requests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveOptions {
    pub format: SaveFormat,
    /// Quality from 0.0 (smallest) to 1.0 (best). Only lossy formats use it.
    pub compress: f32,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            format: SaveFormat::Png,
            compress: 1.0,
        }
    }
}

impl SaveOptions {
    /// Lossless raster output at full quality.
    pub fn lossless() -> Self {
        Self::default()
    }

    /// `compress` mapped onto the 1-100 JPEG quality scale.
    pub fn jpeg_quality(&self) -> u8 {
        if self.compress.is_nan() {
            return 100;
        }
        ((self.compress.clamp(0.0, 1.0) * 100.0).round() as u8).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_lossless_full_quality() {
        let opts = SaveOptions::default();
        assert_eq!(opts.format, SaveFormat::Png);
        assert_eq!(opts.compress, 1.0);
        assert_eq!(opts, SaveOptions::lossless());
    }

    #[test]
    fn test_jpeg_quality_mapping() {
        let q = |compress| {
            SaveOptions {
                format: SaveFormat::Jpeg,
                compress,
            }
            .jpeg_quality()
        };
        assert_eq!(q(1.0), 100);
        assert_eq!(q(0.9), 90);
        assert_eq!(q(0.0), 1);
        assert_eq!(q(-3.0), 1);
        assert_eq!(q(7.0), 100);
        assert_eq!(q(f32::NAN), 100);
    }

    #[test]
    fn test_partial_options_fill_defaults() {
        let opts: SaveOptions = serde_json::from_str(r#"{"format":"jpeg"}"#).unwrap();
        assert_eq!(opts.format, SaveFormat::Jpeg);
        assert_eq!(opts.compress, 1.0);
    }

    #[test]
    fn test_format_metadata() {
        assert_eq!(SaveFormat::Png.extension(), "png");
        assert_eq!(SaveFormat::Jpeg.extension(), "jpg");
    }

    #[test]
    fn test_encode_error_display() {
        let err = EncodeError::EncodingFailed {
            format: SaveFormat::Png,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "PNG encoding failed: boom");
    }
}
