//! Image finishing building blocks
//!
//! Leaf stages used by the pipeline:
//! - [`format`]: classify uploads by content-type, extension and magic bytes
//! - [`converter`]: out-of-process conversion behind [`ConverterBackend`]
//! - [`normalize`]: decode anything into an upright RGB raster
//! - [`resize`]: fit a raster inside a bounding box
//! - [`encoder`]: JPEG encoding under a byte cap
//!
//! # Image bomb protection
//!
//! Source dimensions are checked from the container header before decoding;
//! see [`security::validate_dimensions`].

// Core modules
pub mod config;
pub mod converter;
pub mod encoder;
pub mod error;
pub mod format;
pub mod metrics;
pub mod normalize;
pub mod resize;
pub mod security;

// Re-export commonly used types
pub use config::{ConverterConfig, EncoderBackendKind, EncoderConfig, ImageConfig, SearchStrategy};
pub use converter::{ConversionError, ConverterBackend, MagickConverter};
pub use encoder::{
    encode_fixed, encode_jpeg, encode_under_cap, EncodeOutcome, ExternalJpeg, InProcessJpeg,
    QualityEncoder, SearchPlan, SizeConstraint,
};
pub use error::ImageError;
pub use format::{probe, ImageFamily};
pub use metrics::{FinishingMetrics, FinishingMetricsBuilder};
pub use normalize::{DecodePath, NormalizedImage, Normalizer};
pub use resize::{fit_dimensions, fit_within};
pub use security::validate_dimensions;
