//! Per-request finishing metrics
//!
//! Collected by the pipeline and attached to every finished image so callers
//! can log or export them however they like.

use super::format::ImageFamily;
use std::time::Duration;

/// Metrics for a single finishing run
#[derive(Debug, Clone)]
pub struct FinishingMetrics {
    /// Upload size in bytes
    pub original_size: usize,
    /// Finished JPEG size in bytes
    pub output_size: usize,
    /// Decoded source dimensions (width, height), after orientation
    pub source_dimensions: (u32, u32),
    /// Finished dimensions (width, height)
    pub output_dimensions: (u32, u32),
    pub source_family: ImageFamily,
    /// Whether the external converter produced the raster
    pub used_converter: bool,
    /// JPEG quality of the returned bytes
    pub quality: u8,
    /// Number of JPEG encodes the quality search performed
    pub encode_attempts: u32,
    /// The primary encoder failed and the fixed-quality fallback ran
    pub fallback_used: bool,
    /// Output exceeds the byte cap even at the floor quality
    pub degraded: bool,
    pub normalize_time: Duration,
    pub resize_time: Duration,
    pub watermark_time: Duration,
    pub encode_time: Duration,
    pub total_time: Duration,
}

impl Default for FinishingMetrics {
    fn default() -> Self {
        Self {
            original_size: 0,
            output_size: 0,
            source_dimensions: (0, 0),
            output_dimensions: (0, 0),
            source_family: ImageFamily::Unknown,
            used_converter: false,
            quality: 0,
            encode_attempts: 0,
            fallback_used: false,
            degraded: false,
            normalize_time: Duration::ZERO,
            resize_time: Duration::ZERO,
            watermark_time: Duration::ZERO,
            encode_time: Duration::ZERO,
            total_time: Duration::ZERO,
        }
    }
}

impl FinishingMetrics {
    pub fn builder() -> FinishingMetricsBuilder {
        FinishingMetricsBuilder::default()
    }

    /// Output size divided by upload size
    pub fn compression_ratio(&self) -> f64 {
        if self.original_size == 0 {
            0.0
        } else {
            self.output_size as f64 / self.original_size as f64
        }
    }

    /// Can be negative when a tiny upload grew after watermarking
    pub fn bytes_saved(&self) -> i64 {
        self.original_size as i64 - self.output_size as i64
    }

    pub fn was_resized(&self) -> bool {
        self.source_dimensions != self.output_dimensions
    }

    /// Output pixels divided by source pixels
    pub fn resize_ratio(&self) -> f64 {
        let source = self.source_dimensions.0 as u64 * self.source_dimensions.1 as u64;
        let output = self.output_dimensions.0 as u64 * self.output_dimensions.1 as u64;
        if source == 0 {
            0.0
        } else {
            output as f64 / source as f64
        }
    }

    /// Upload bytes processed per second
    pub fn throughput_bytes_per_sec(&self) -> f64 {
        if self.total_time.as_secs_f64() == 0.0 {
            0.0
        } else {
            self.original_size as f64 / self.total_time.as_secs_f64()
        }
    }
}

/// Builder for FinishingMetrics
#[derive(Debug, Clone, Default)]
pub struct FinishingMetricsBuilder {
    metrics: FinishingMetrics,
}

impl FinishingMetricsBuilder {
    pub fn original_size(mut self, size: usize) -> Self {
        self.metrics.original_size = size;
        self
    }

    pub fn output_size(mut self, size: usize) -> Self {
        self.metrics.output_size = size;
        self
    }

    pub fn source_dimensions(mut self, width: u32, height: u32) -> Self {
        self.metrics.source_dimensions = (width, height);
        self
    }

    pub fn output_dimensions(mut self, width: u32, height: u32) -> Self {
        self.metrics.output_dimensions = (width, height);
        self
    }

    pub fn source_family(mut self, family: ImageFamily) -> Self {
        self.metrics.source_family = family;
        self
    }

    pub fn used_converter(mut self, used: bool) -> Self {
        self.metrics.used_converter = used;
        self
    }

    pub fn quality(mut self, quality: u8) -> Self {
        self.metrics.quality = quality;
        self
    }

    pub fn encode_attempts(mut self, attempts: u32) -> Self {
        self.metrics.encode_attempts = attempts;
        self
    }

    pub fn fallback_used(mut self, used: bool) -> Self {
        self.metrics.fallback_used = used;
        self
    }

    pub fn degraded(mut self, degraded: bool) -> Self {
        self.metrics.degraded = degraded;
        self
    }

    pub fn normalize_time(mut self, time: Duration) -> Self {
        self.metrics.normalize_time = time;
        self
    }

    pub fn resize_time(mut self, time: Duration) -> Self {
        self.metrics.resize_time = time;
        self
    }

    pub fn watermark_time(mut self, time: Duration) -> Self {
        self.metrics.watermark_time = time;
        self
    }

    pub fn encode_time(mut self, time: Duration) -> Self {
        self.metrics.encode_time = time;
        self
    }

    pub fn total_time(mut self, time: Duration) -> Self {
        self.metrics.total_time = time;
        self
    }

    pub fn build(self) -> FinishingMetrics {
        self.metrics
    }
}
