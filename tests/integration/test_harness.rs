// Shared fixtures for end-to-end finishing tests

use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage, RgbaImage};
use shiage::image_optimizer::{EncoderConfig, ImageConfig};
use shiage::watermark::{GlyphSource, TextWatermarker, WatermarkConfig, Watermarker};
use shiage::Pipeline;
use std::io::Cursor;
use std::sync::Arc;

/// Product-photo stand-in: smooth gradients with a mild blocky texture
pub fn product_photo(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let texture = ((x / 16 + y / 16) % 3) as u8 * 4;
        Rgb([
            (x * 200 / width) as u8 + texture,
            (y * 200 / height) as u8 + texture,
            180 - ((x + y) * 120 / (width + height)) as u8,
        ])
    })
}

pub fn encode(image: DynamicImage, format: ImageOutputFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(
        DynamicImage::ImageRgb8(product_photo(width, height)),
        ImageOutputFormat::Jpeg(92),
    )
}

pub fn png_rgba_bytes(image: RgbaImage) -> Vec<u8> {
    encode(DynamicImage::ImageRgba8(image), ImageOutputFormat::Png)
}

/// Minimal ISO-BMFF header that sniffs as HEIC but no decoder can read
pub fn heic_bytes() -> Vec<u8> {
    let mut data = vec![0, 0, 0, 24];
    data.extend_from_slice(b"ftypheic");
    data.extend_from_slice(&[0, 0, 0, 0]);
    data.extend_from_slice(b"mif1heic");
    data.extend_from_slice(&[0u8; 256]);
    data
}

pub fn text_watermarker() -> Arc<dyn Watermarker> {
    Arc::new(TextWatermarker::new(GlyphSource::Bitmap, &WatermarkConfig::default()).unwrap())
}

/// In-process pipeline with the text watermark and no converter
pub fn default_pipeline() -> Pipeline {
    Pipeline::new(
        ImageConfig::default(),
        EncoderConfig::default(),
        None,
        Some(text_watermarker()),
    )
}

pub fn is_jpeg(data: &[u8]) -> bool {
    data.starts_with(&[0xFF, 0xD8, 0xFF])
}
