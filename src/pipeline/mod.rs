//! Finishing pipeline: normalize, resize, watermark, encode.
//!
//! ```text
//! NORMALIZE -> RESIZE -> WATERMARK -> ENCODE -> DONE
//!                                       |
//!                                       +-> FALLBACK_ENCODE -> DONE
//! ```
//!
//! Only a failed normalization ends a request with an error. A resize error
//! retries with the `image` crate's resampler, and any error from the primary
//! encoder drops to a single in-process encode at a fixed quality against the
//! already-watermarked raster.
//!
//! A [`Pipeline`] holds only immutable configuration and shared read-only
//! collaborators, so one instance can serve concurrent requests.

use image::imageops::{self, FilterType};
use image::RgbImage;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::error::AppError;
use crate::image_optimizer::{
    encode_fixed, encode_under_cap, fit_dimensions, fit_within, ConverterBackend, DecodePath,
    EncodeOutcome, EncoderBackendKind, EncoderConfig, ExternalJpeg, FinishingMetrics, ImageConfig,
    ImageError, ImageFamily, InProcessJpeg, MagickConverter, Normalizer, SearchPlan,
    SizeConstraint,
};
use crate::watermark::{asset, build_watermarker, Watermarker};

/// States visited by a finishing run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Normalize,
    Resize,
    Watermark,
    Encode,
    FallbackEncode,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Normalize => "normalize",
            Stage::Resize => "resize",
            Stage::Watermark => "watermark",
            Stage::Encode => "encode",
            Stage::FallbackEncode => "fallback_encode",
            Stage::Done => "done",
        }
    }
}

/// One upload to finish
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub bytes: Vec<u8>,
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

impl ConversionRequest {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            filename: None,
            content_type: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Finished JPEG and how it was produced
#[derive(Debug, Clone)]
pub struct FinishedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    /// Over the byte cap because the floor quality did not fit
    pub degraded: bool,
    /// The primary encoder failed and the fixed-quality encode ran
    pub fallback_used: bool,
    pub source_family: ImageFamily,
    pub stages: Vec<Stage>,
    pub metrics: FinishingMetrics,
}

pub struct Pipeline {
    image: ImageConfig,
    encoder: EncoderConfig,
    normalizer: Normalizer,
    converter: Option<Arc<dyn ConverterBackend>>,
    watermarker: Option<Arc<dyn Watermarker>>,
}

impl Pipeline {
    pub fn new(
        image: ImageConfig,
        encoder: EncoderConfig,
        converter: Option<Arc<dyn ConverterBackend>>,
        watermarker: Option<Arc<dyn Watermarker>>,
    ) -> Self {
        Self {
            normalizer: Normalizer::new(image.clone(), converter.clone()),
            image,
            encoder,
            converter,
            watermarker,
        }
    }

    /// Build from configuration, loading the shared watermark asset on first use.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let converter: Option<Arc<dyn ConverterBackend>> = if config.converter.enabled {
            Some(Arc::new(MagickConverter::from_config(&config.converter)))
        } else {
            None
        };

        let watermark_asset = if config.watermark.enabled {
            asset::init_global(config.watermark.asset_path.as_deref())
        } else {
            None
        };
        let watermarker = build_watermarker(&config.watermark, watermark_asset)?;

        tracing::info!(
            max_dimension = config.image.max_dimension,
            max_bytes = config.encoder.max_bytes,
            converter = config.converter.enabled,
            watermark = watermarker.as_ref().map(|w| w.kind().as_label()).unwrap_or("none"),
            backend = ?config.encoder.backend,
            "Finishing pipeline ready"
        );

        Ok(Self::new(
            config.image.clone(),
            config.encoder.clone(),
            converter,
            watermarker,
        ))
    }

    pub fn has_watermark(&self) -> bool {
        self.watermarker.is_some()
    }

    /// Run one upload through every stage.
    pub fn finish(&self, request: &ConversionRequest) -> Result<FinishedImage, ImageError> {
        let span = tracing::info_span!(
            "finish_image",
            filename = request.filename.as_deref().unwrap_or("-"),
            bytes = request.bytes.len()
        );
        let _guard = span.enter();

        let started = Instant::now();
        let mut stages = vec![Stage::Normalize];
        let metrics = FinishingMetrics::builder().original_size(request.bytes.len());

        let normalized = self.normalizer.normalize(
            &request.bytes,
            request.filename.as_deref(),
            request.content_type.as_deref(),
        )?;
        let normalize_time = started.elapsed();
        let (source_w, source_h) = normalized.image.dimensions();
        tracing::debug!(
            family = %normalized.family,
            path = normalized.path.as_str(),
            width = source_w,
            height = source_h,
            "normalized"
        );
        let metrics = metrics
            .source_family(normalized.family)
            .used_converter(normalized.path == DecodePath::Converter)
            .source_dimensions(source_w, source_h)
            .normalize_time(normalize_time);

        stages.push(Stage::Resize);
        let stage_start = Instant::now();
        let resized = self.resize(&normalized.image);
        drop(normalized.image);
        let metrics = metrics.resize_time(stage_start.elapsed());

        stages.push(Stage::Watermark);
        let stage_start = Instant::now();
        let marked = match &self.watermarker {
            Some(watermarker) => watermarker.watermark(&resized),
            None => resized,
        };
        let metrics = metrics.watermark_time(stage_start.elapsed());
        let (width, height) = marked.dimensions();

        stages.push(Stage::Encode);
        let stage_start = Instant::now();
        let constraint = SizeConstraint::from_config(&self.encoder);
        let (outcome, fallback_used) = match self.encode_primary(&marked, &constraint) {
            Ok(outcome) => (outcome, false),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    quality = self.encoder.fallback_quality,
                    "primary encoder failed, using fixed-quality fallback"
                );
                stages.push(Stage::FallbackEncode);
                let fallback = InProcessJpeg::new(&marked);
                (
                    encode_fixed(&fallback, &constraint, self.encoder.fallback_quality)?,
                    true,
                )
            }
        };
        stages.push(Stage::Done);

        let metrics = metrics
            .encode_time(stage_start.elapsed())
            .output_size(outcome.data.len())
            .output_dimensions(width, height)
            .quality(outcome.quality)
            .encode_attempts(outcome.attempts)
            .fallback_used(fallback_used)
            .degraded(outcome.degraded)
            .total_time(started.elapsed())
            .build();

        tracing::info!(
            width,
            height,
            quality = outcome.quality,
            output_bytes = outcome.data.len(),
            attempts = outcome.attempts,
            degraded = outcome.degraded,
            fallback = fallback_used,
            compression_ratio = metrics.compression_ratio(),
            elapsed_ms = metrics.total_time.as_millis() as u64,
            "image finished"
        );

        Ok(FinishedImage {
            data: outcome.data,
            width,
            height,
            quality: outcome.quality,
            degraded: outcome.degraded,
            fallback_used,
            source_family: metrics.source_family,
            stages,
            metrics,
        })
    }

    fn resize(&self, image: &RgbImage) -> RgbImage {
        match fit_within(image, self.image.max_dimension) {
            Ok(resized) => resized,
            Err(err) => {
                let (width, height) =
                    fit_dimensions(image.width(), image.height(), self.image.max_dimension);
                tracing::warn!(error = %err, width, height, "resize failed, retrying with image crate");
                imageops::resize(image, width, height, FilterType::CatmullRom)
            }
        }
    }

    fn encode_primary(
        &self,
        image: &RgbImage,
        constraint: &SizeConstraint,
    ) -> Result<EncodeOutcome, ImageError> {
        let plan = SearchPlan::from_config(&self.encoder);
        match self.encoder.backend {
            EncoderBackendKind::InProcess => {
                encode_under_cap(&InProcessJpeg::new(image), constraint, plan)
            }
            EncoderBackendKind::External => {
                let converter = self.converter.as_deref().ok_or_else(|| {
                    ImageError::encode_failed("jpeg", "external backend selected but no converter")
                })?;
                let encoder = ExternalJpeg::prepare(converter, image, self.image.max_dimension)?;
                encode_under_cap(&encoder, constraint, plan)
            }
        }
    }
}
