//! Size-constrained JPEG encoding
//!
//! A [`QualityEncoder`] turns one raster into JPEG bytes at a requested
//! quality. [`encode_under_cap`] drives it through a quality search so the
//! result lands under a byte cap at the highest quality that fits:
//!
//! - [`SearchPlan::Binary`] bisects `[min_quality, max_quality]`, keeping the
//!   last result at or under the cap.
//! - [`SearchPlan::Linear`] steps down from a starting quality, for backends
//!   where every attempt is expensive or size is not monotonic in quality.
//!
//! When even the floor quality is over the cap, the floor result is returned
//! with `degraded = true` instead of an error.

use image::codecs::jpeg::JpegEncoder;
use image::{ImageEncoder as _, RgbImage};
use std::io::Cursor;

use super::config::{EncoderConfig, SearchStrategy};
use super::converter::ConverterBackend;
use super::error::ImageError;
use super::format::ImageFamily;

/// Produces JPEG bytes for a fixed raster at a requested quality
pub trait QualityEncoder {
    /// Backend label for logs and metrics
    fn backend(&self) -> &'static str;

    fn encode_at(&self, quality: u8) -> Result<Vec<u8>, ImageError>;
}

/// Encode an RGB raster to baseline JPEG with the `image` crate
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let mut output = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut output, quality.clamp(1, 100));

    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ColorType::Rgb8,
        )
        .map_err(|e| ImageError::encode_failed("jpeg", e.to_string()))?;

    Ok(output.into_inner())
}

/// In-process JPEG encoder
pub struct InProcessJpeg<'a> {
    image: &'a RgbImage,
}

impl<'a> InProcessJpeg<'a> {
    pub fn new(image: &'a RgbImage) -> Self {
        Self { image }
    }
}

impl QualityEncoder for InProcessJpeg<'_> {
    fn backend(&self) -> &'static str {
        "in_process"
    }

    fn encode_at(&self, quality: u8) -> Result<Vec<u8>, ImageError> {
        encode_jpeg(self.image, quality)
    }
}

/// Encoder backed by the external converter's compression path.
///
/// The raster is serialized to lossless PNG once; every quality attempt is a
/// separate converter invocation on that intermediate.
pub struct ExternalJpeg<'a> {
    converter: &'a dyn ConverterBackend,
    intermediate: Vec<u8>,
    max_dimension: u32,
}

impl<'a> ExternalJpeg<'a> {
    pub fn prepare(
        converter: &'a dyn ConverterBackend,
        image: &RgbImage,
        max_dimension: u32,
    ) -> Result<Self, ImageError> {
        let mut intermediate = Vec::new();
        image::codecs::png::PngEncoder::new(&mut intermediate)
            .write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ColorType::Rgb8,
            )
            .map_err(|e| ImageError::encode_failed("png", e.to_string()))?;

        Ok(Self {
            converter,
            intermediate,
            max_dimension,
        })
    }
}

impl QualityEncoder for ExternalJpeg<'_> {
    fn backend(&self) -> &'static str {
        "external"
    }

    fn encode_at(&self, quality: u8) -> Result<Vec<u8>, ImageError> {
        let data = self.converter.compress(
            &self.intermediate,
            ImageFamily::Png,
            quality,
            self.max_dimension,
        )?;

        if !data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Err(ImageError::encode_failed(
                "jpeg",
                format!("{} returned a non-JPEG stream", self.converter.name()),
            ));
        }
        Ok(data)
    }
}

/// Byte cap and allowed quality band
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeConstraint {
    pub max_bytes: usize,
    pub min_quality: u8,
    pub max_quality: u8,
}

impl SizeConstraint {
    pub fn new(max_bytes: usize, min_quality: u8, max_quality: u8) -> Self {
        let min_quality = min_quality.clamp(1, 100);
        let max_quality = max_quality.clamp(min_quality, 100);
        Self {
            max_bytes,
            min_quality,
            max_quality,
        }
    }

    pub fn from_config(config: &EncoderConfig) -> Self {
        Self::new(config.max_bytes, config.min_quality, config.max_quality)
    }

    pub fn fits(&self, len: usize) -> bool {
        len <= self.max_bytes
    }
}

/// How the quality range is walked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPlan {
    Binary,
    Linear { start: u8, step: u8 },
}

impl SearchPlan {
    pub fn from_config(config: &EncoderConfig) -> Self {
        match config.search {
            SearchStrategy::Binary => SearchPlan::Binary,
            SearchStrategy::Linear => SearchPlan::Linear {
                start: config.linear_start_quality,
                step: config.linear_step,
            },
        }
    }
}

/// Result of a size-constrained encode
#[derive(Debug, Clone)]
pub struct EncodeOutcome {
    pub data: Vec<u8>,
    pub quality: u8,
    /// Over the cap because even the floor quality did not fit
    pub degraded: bool,
    pub attempts: u32,
}

/// Encode under `constraint.max_bytes` at the highest quality the plan finds.
///
/// Errors only when the encoder itself fails; an unreachable cap yields a
/// degraded outcome.
pub fn encode_under_cap(
    encoder: &dyn QualityEncoder,
    constraint: &SizeConstraint,
    plan: SearchPlan,
) -> Result<EncodeOutcome, ImageError> {
    let outcome = match plan {
        SearchPlan::Binary => binary_search(encoder, constraint)?,
        SearchPlan::Linear { start, step } => linear_search(encoder, constraint, start, step)?,
    };

    if outcome.degraded {
        tracing::warn!(
            backend = encoder.backend(),
            quality = outcome.quality,
            bytes = outcome.data.len(),
            max_bytes = constraint.max_bytes,
            "floor quality still exceeds byte cap"
        );
    } else {
        tracing::debug!(
            backend = encoder.backend(),
            quality = outcome.quality,
            bytes = outcome.data.len(),
            attempts = outcome.attempts,
            "encoded under byte cap"
        );
    }

    Ok(outcome)
}

/// Encode once at a fixed quality
pub fn encode_fixed(
    encoder: &dyn QualityEncoder,
    constraint: &SizeConstraint,
    quality: u8,
) -> Result<EncodeOutcome, ImageError> {
    let data = encoder.encode_at(quality)?;
    Ok(EncodeOutcome {
        degraded: !constraint.fits(data.len()),
        data,
        quality,
        attempts: 1,
    })
}

fn binary_search(
    encoder: &dyn QualityEncoder,
    constraint: &SizeConstraint,
) -> Result<EncodeOutcome, ImageError> {
    let mut attempts = 1;

    // Most product photos fit at the ceiling; try it before bisecting
    let top = encoder.encode_at(constraint.max_quality)?;
    if constraint.fits(top.len()) || constraint.max_quality == constraint.min_quality {
        return Ok(EncodeOutcome {
            degraded: !constraint.fits(top.len()),
            data: top,
            quality: constraint.max_quality,
            attempts,
        });
    }

    let mut best: Option<(u8, Vec<u8>)> = None;
    let mut floor: Option<Vec<u8>> = None;
    let mut low = constraint.min_quality as i32;
    let mut high = constraint.max_quality as i32 - 1;

    while low <= high {
        let mid = low + (high - low) / 2;
        let data = encoder.encode_at(mid as u8)?;
        attempts += 1;

        if constraint.fits(data.len()) {
            best = Some((mid as u8, data));
            low = mid + 1;
        } else {
            if mid == constraint.min_quality as i32 {
                floor = Some(data);
            }
            high = mid - 1;
        }
    }

    if let Some((quality, data)) = best {
        return Ok(EncodeOutcome {
            data,
            quality,
            degraded: false,
            attempts,
        });
    }

    let data = match floor {
        Some(data) => data,
        None => {
            attempts += 1;
            encoder.encode_at(constraint.min_quality)?
        }
    };

    Ok(EncodeOutcome {
        data,
        quality: constraint.min_quality,
        degraded: true,
        attempts,
    })
}

fn linear_search(
    encoder: &dyn QualityEncoder,
    constraint: &SizeConstraint,
    start: u8,
    step: u8,
) -> Result<EncodeOutcome, ImageError> {
    let step = step.max(1);
    let mut quality = start.clamp(constraint.min_quality, constraint.max_quality);
    let mut attempts = 0;

    loop {
        let data = encoder.encode_at(quality)?;
        attempts += 1;

        let fits = constraint.fits(data.len());
        if fits || quality <= constraint.min_quality {
            return Ok(EncodeOutcome {
                data,
                quality,
                degraded: !fits,
                attempts,
            });
        }

        quality = quality.saturating_sub(step).max(constraint.min_quality);
    }
}
