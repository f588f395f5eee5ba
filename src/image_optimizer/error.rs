//! Image finishing error types
//!
//! Provides structured error handling with HTTP status mapping so the upload
//! layer can translate failures without inspecting messages.
//!
//! Only [`ImageError::UnsupportedImage`] (and the pixel-bomb guard) are meant to
//! reach callers of the pipeline; conversion and encode failures are recovered
//! by fallback strategies inside the pipeline whenever one applies.

use super::converter::ConversionError;
use super::format::ImageFamily;
use thiserror::Error;

/// Errors that can occur while finishing an image
#[derive(Debug, Error)]
pub enum ImageError {
    // === Decoding Errors ===
    /// Every decode path was exhausted
    #[error("Unsupported image ({family}): {reason}")]
    UnsupportedImage { family: ImageFamily, reason: String },

    /// Failed to decode image data
    #[error("Failed to decode image: {message}")]
    DecodeFailed { message: String },

    /// The external conversion tool failed
    #[error("Conversion failed: {0}")]
    ConversionFailed(#[from] ConversionError),

    // === Processing Errors ===
    /// Resize operation failed
    #[error("Resize failed: {message}")]
    ResizeFailed { message: String },

    /// Encoding to JPEG failed
    #[error("Failed to encode to {format}: {message}")]
    EncodeFailed { format: String, message: String },

    // === Safety Errors ===
    /// Image dimensions exceed safety limits (image bomb protection)
    #[error("Image dimensions {width}x{height} ({pixels} pixels) exceed limit of {max_pixels} pixels")]
    ImageBombDetected {
        width: u32,
        height: u32,
        pixels: u64,
        max_pixels: u64,
    },
}

impl ImageError {
    /// Maps image errors to HTTP status codes
    ///
    /// Status mapping:
    /// - UnsupportedImage, DecodeFailed → 415 (Unsupported Media Type)
    /// - ImageBombDetected → 400 (Bad Request)
    /// - ConversionFailed → 502 (Bad Gateway, the external tool misbehaved)
    /// - ResizeFailed, EncodeFailed → 500 (Internal Server Error)
    pub fn to_http_status(&self) -> u16 {
        match self {
            ImageError::UnsupportedImage { .. } | ImageError::DecodeFailed { .. } => 415,
            ImageError::ImageBombDetected { .. } => 400,
            ImageError::ConversionFailed(_) => 502,
            ImageError::ResizeFailed { .. } | ImageError::EncodeFailed { .. } => 500,
        }
    }

    /// Whether the caller should see this as "unsupported image"
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            ImageError::UnsupportedImage { .. }
                | ImageError::DecodeFailed { .. }
                | ImageError::ImageBombDetected { .. }
        )
    }

    /// Helper constructors for common error patterns
    pub fn unsupported(family: ImageFamily, reason: impl Into<String>) -> Self {
        ImageError::UnsupportedImage {
            family,
            reason: reason.into(),
        }
    }

    pub fn decode_failed(message: impl Into<String>) -> Self {
        ImageError::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn resize_failed(message: impl Into<String>) -> Self {
        ImageError::ResizeFailed {
            message: message.into(),
        }
    }

    pub fn encode_failed(format: impl Into<String>, message: impl Into<String>) -> Self {
        ImageError::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn image_bomb(width: u32, height: u32, max_pixels: u64) -> Self {
        ImageError::ImageBombDetected {
            width,
            height,
            pixels: width as u64 * height as u64,
            max_pixels,
        }
    }
}
