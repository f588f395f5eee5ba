//! Turn arbitrary upload bytes into an upright 24-bit RGB raster
//!
//! Decode order:
//! 1. Natively decodable families go through the `image` crate, with the
//!    EXIF orientation applied afterwards.
//! 2. HEIC/HEIF, or anything the native decoders reject, is handed to the
//!    [`ConverterBackend`] and its JPEG output decoded natively.
//! 3. If neither path yields pixels the upload is [`ImageError::UnsupportedImage`].

use image::io::Reader as ImageReader;
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use std::sync::Arc;

use super::config::ImageConfig;
use super::converter::ConverterBackend;
use super::error::ImageError;
use super::format::{self, ImageFamily};
use super::security::{peek_dimensions, validate_dimensions};

/// Which decode path produced the raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodePath {
    Native,
    Converter,
}

impl DecodePath {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecodePath::Native => "native",
            DecodePath::Converter => "converter",
        }
    }
}

/// Output of [`Normalizer::normalize`]
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub image: RgbImage,
    pub family: ImageFamily,
    pub path: DecodePath,
}

pub struct Normalizer {
    limits: ImageConfig,
    converter: Option<Arc<dyn ConverterBackend>>,
}

impl Normalizer {
    pub fn new(limits: ImageConfig, converter: Option<Arc<dyn ConverterBackend>>) -> Self {
        Self { limits, converter }
    }

    /// Decode an upload into an orientation-corrected RGB raster.
    pub fn normalize(
        &self,
        data: &[u8],
        filename: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<NormalizedImage, ImageError> {
        let family = format::probe(data, filename, content_type);

        if data.is_empty() {
            return Err(ImageError::unsupported(family, "empty input"));
        }

        let native_failure = if family.is_natively_decodable() {
            match self.decode_native(data, family) {
                Ok(image) => {
                    return Ok(NormalizedImage {
                        image,
                        family,
                        path: DecodePath::Native,
                    })
                }
                // Oversized sources are not retried through the converter
                Err(err @ ImageError::ImageBombDetected { .. }) => return Err(err),
                Err(err) => {
                    tracing::debug!(family = %family, error = %err, "native decode failed");
                    err.to_string()
                }
            }
        } else {
            format!("no in-process decoder for {family}")
        };

        let Some(converter) = &self.converter else {
            return Err(ImageError::unsupported(
                family,
                format!("{native_failure}; no external converter configured"),
            ));
        };

        let jpeg = converter.convert(data, family).map_err(|err| {
            tracing::warn!(
                family = %family,
                converter = converter.name(),
                error = %err,
                "external conversion failed"
            );
            ImageError::unsupported(family, format!("{native_failure}; {err}"))
        })?;

        // Never trust converter output that does not look like a JPEG
        if format::sniff_magic(&jpeg) != ImageFamily::Jpeg {
            return Err(ImageError::unsupported(
                family,
                "converter output is not a JPEG stream",
            ));
        }

        let image = self
            .decode_native(&jpeg, ImageFamily::Jpeg)
            .map_err(|err| match err {
                ImageError::ImageBombDetected { .. } => err,
                other => ImageError::unsupported(
                    family,
                    format!("converted output could not be decoded: {other}"),
                ),
            })?;

        Ok(NormalizedImage {
            image,
            family,
            path: DecodePath::Converter,
        })
    }

    /// In-process decode with size guard, orientation and alpha flattening.
    fn decode_native(&self, data: &[u8], family: ImageFamily) -> Result<RgbImage, ImageError> {
        // Trust the bytes over the declared type when they disagree
        let format = image::guess_format(data)
            .ok()
            .or_else(|| family.image_format())
            .ok_or_else(|| ImageError::decode_failed("unrecognized image data"))?;

        if let Some((width, height)) = peek_dimensions(data, format) {
            validate_dimensions(width, height, &self.limits)?;
        }

        let decoded = ImageReader::with_format(Cursor::new(data), format)
            .decode()
            .map_err(|e| ImageError::decode_failed(e.to_string()))?;

        let oriented = match exif_orientation(data, format) {
            Some(orientation) => apply_orientation(decoded, orientation),
            None => decoded,
        };

        Ok(flatten_onto_white(oriented))
    }
}

/// EXIF orientation (1-8) of the primary image, if present and not identity
pub fn exif_orientation(data: &[u8], format: ImageFormat) -> Option<u32> {
    if !matches!(
        format,
        ImageFormat::Jpeg | ImageFormat::Tiff | ImageFormat::WebP | ImageFormat::Png
    ) {
        return None;
    }

    let exif = exif::Reader::new()
        .read_from_container(&mut Cursor::new(data))
        .ok()?;

    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .filter(|value| (2..=8).contains(value))
}

/// Rotate/flip so the image displays upright
pub fn apply_orientation(image: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        // Transpose
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        // Transverse
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}

/// Drop the alpha channel by compositing onto an opaque white background
pub fn flatten_onto_white(image: DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.into_rgb8();
    }

    let rgba = image.into_rgba8();
    let (width, height) = rgba.dimensions();
    let mut out = RgbImage::new(width, height);

    for (dst, src) in out.pixels_mut().zip(rgba.pixels()) {
        let alpha = src[3] as u32;
        for c in 0..3 {
            dst[c] = ((src[c] as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        }
    }

    out
}
