//! Bounding-box downscaling with fast_image_resize

use fast_image_resize::{FilterType, Image, PixelType, ResizeAlg, Resizer};
use image::RgbImage;
use std::num::NonZeroU32;

use super::error::ImageError;

/// Target size for fitting `width`x`height` inside a `max_dimension` square.
///
/// Never upscales. Each output edge is at least 1 pixel.
pub fn fit_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest == 0 || longest <= max_dimension {
        return (width, height);
    }

    let scale = max_dimension as f64 / longest as f64;
    let target_w = ((width as f64 * scale).round() as u32).clamp(1, max_dimension);
    let target_h = ((height as f64 * scale).round() as u32).clamp(1, max_dimension);
    (target_w, target_h)
}

/// Downscale `image` to fit within `max_dimension`, preserving aspect ratio.
///
/// Images already inside the box are returned as an unchanged copy.
pub fn fit_within(image: &RgbImage, max_dimension: u32) -> Result<RgbImage, ImageError> {
    let (src_w, src_h) = image.dimensions();
    let (target_w, target_h) = fit_dimensions(src_w, src_h, max_dimension);

    if (target_w, target_h) == (src_w, src_h) {
        return Ok(image.clone());
    }

    resize_rgb(image, target_w, target_h)
}

/// Resize an RGB raster using a Catmull-Rom (bicubic) convolution
pub fn resize_rgb(image: &RgbImage, target_w: u32, target_h: u32) -> Result<RgbImage, ImageError> {
    let (src_w, src_h) = image.dimensions();

    let src_width =
        NonZeroU32::new(src_w).ok_or_else(|| ImageError::resize_failed("Source width is 0"))?;
    let src_height =
        NonZeroU32::new(src_h).ok_or_else(|| ImageError::resize_failed("Source height is 0"))?;
    let dst_width =
        NonZeroU32::new(target_w).ok_or_else(|| ImageError::resize_failed("Target width is 0"))?;
    let dst_height =
        NonZeroU32::new(target_h).ok_or_else(|| ImageError::resize_failed("Target height is 0"))?;

    let src_image = Image::from_vec_u8(
        src_width,
        src_height,
        image.as_raw().clone(),
        PixelType::U8x3,
    )
    .map_err(|e| ImageError::resize_failed(format!("Failed to create source image: {:?}", e)))?;

    let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x3);

    // Convolution filters antialias when downscaling
    let mut resizer = Resizer::new(ResizeAlg::Convolution(FilterType::CatmullRom));

    resizer
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| ImageError::resize_failed(format!("Resize operation failed: {:?}", e)))?;

    RgbImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| ImageError::resize_failed("Failed to create output image buffer"))
}
