//! Image bomb protection
//!
//! Source dimensions are read from the container header and checked against
//! [`ImageConfig`] limits before any pixel buffer is allocated.

use image::io::Reader as ImageReader;
use std::io::Cursor;

use super::config::ImageConfig;
use super::error::ImageError;

/// Validate source dimensions against the configured limits
pub fn validate_dimensions(width: u32, height: u32, config: &ImageConfig) -> Result<(), ImageError> {
    let pixels = width as u64 * height as u64;

    if width > config.max_source_dimension
        || height > config.max_source_dimension
        || pixels > config.max_source_pixels
    {
        tracing::warn!(
            width,
            height,
            pixels,
            max_pixels = config.max_source_pixels,
            max_dimension = config.max_source_dimension,
            "rejecting oversized source image"
        );
        return Err(ImageError::image_bomb(
            width,
            height,
            config.max_source_pixels,
        ));
    }

    Ok(())
}

/// Read width and height from the header without decoding pixels.
///
/// Returns `None` when the header cannot be parsed; the decoder will then
/// report the real problem.
pub fn peek_dimensions(data: &[u8], format: image::ImageFormat) -> Option<(u32, u32)> {
    ImageReader::with_format(Cursor::new(data), format)
        .into_dimensions()
        .ok()
}
