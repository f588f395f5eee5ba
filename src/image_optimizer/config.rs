use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CONVERTER_PROGRAM, DEFAULT_CONVERTER_TIMEOUT_SECS, DEFAULT_FALLBACK_QUALITY,
    DEFAULT_LINEAR_START_QUALITY, DEFAULT_LINEAR_STEP, DEFAULT_MAX_BYTES, DEFAULT_MAX_DIMENSION,
    DEFAULT_MAX_QUALITY, DEFAULT_MAX_SOURCE_DIMENSION, DEFAULT_MAX_SOURCE_PIXELS,
    DEFAULT_MIN_QUALITY, DEFAULT_NORMALIZE_QUALITY,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Longest edge of the finished image
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,

    /// Largest source width/height accepted before decoding
    #[serde(default = "default_max_source_dimension")]
    pub max_source_dimension: u32,

    /// Largest source pixel count accepted before decoding
    #[serde(default = "default_max_source_pixels")]
    pub max_source_pixels: u64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            max_source_dimension: DEFAULT_MAX_SOURCE_DIMENSION,
            max_source_pixels: DEFAULT_MAX_SOURCE_PIXELS,
        }
    }
}

/// How the encoder walks the quality range
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategy {
    /// Bisect [min_quality, max_quality] for the highest quality under the cap
    #[default]
    Binary,
    /// Step down from linear_start_quality by linear_step until under the cap
    Linear,
}

/// Which backend produces JPEG bytes during the quality search
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EncoderBackendKind {
    /// The `image` crate's JPEG encoder
    #[default]
    InProcess,
    /// The external converter's compression path
    External,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Byte cap for the finished JPEG
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Floor of the quality band
    #[serde(default = "default_min_quality")]
    pub min_quality: u8,

    /// Ceiling of the quality band
    #[serde(default = "default_max_quality")]
    pub max_quality: u8,

    #[serde(default)]
    pub search: SearchStrategy,

    /// First quality tried by the linear search
    #[serde(default = "default_linear_start_quality")]
    pub linear_start_quality: u8,

    /// Decrement per linear step
    #[serde(default = "default_linear_step")]
    pub linear_step: u8,

    /// Fixed quality for the in-process fallback encode
    #[serde(default = "default_fallback_quality")]
    pub fallback_quality: u8,

    #[serde(default)]
    pub backend: EncoderBackendKind,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            min_quality: DEFAULT_MIN_QUALITY,
            max_quality: DEFAULT_MAX_QUALITY,
            search: SearchStrategy::default(),
            linear_start_quality: DEFAULT_LINEAR_START_QUALITY,
            linear_step: DEFAULT_LINEAR_STEP,
            fallback_quality: DEFAULT_FALLBACK_QUALITY,
            backend: EncoderBackendKind::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Whether the external converter may be invoked at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Executable name or path
    #[serde(default = "default_converter_program")]
    pub program: String,

    /// JPEG quality of the normalization pass
    #[serde(default = "default_normalize_quality")]
    pub normalize_quality: u8,

    /// Kill the child process after this many seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: DEFAULT_CONVERTER_PROGRAM.to_string(),
            normalize_quality: DEFAULT_NORMALIZE_QUALITY,
            timeout_secs: DEFAULT_CONVERTER_TIMEOUT_SECS,
        }
    }
}

fn default_max_dimension() -> u32 {
    DEFAULT_MAX_DIMENSION
}

fn default_max_source_dimension() -> u32 {
    DEFAULT_MAX_SOURCE_DIMENSION
}

fn default_max_source_pixels() -> u64 {
    DEFAULT_MAX_SOURCE_PIXELS
}

fn default_max_bytes() -> usize {
    DEFAULT_MAX_BYTES
}

fn default_min_quality() -> u8 {
    DEFAULT_MIN_QUALITY
}

fn default_max_quality() -> u8 {
    DEFAULT_MAX_QUALITY
}

fn default_linear_start_quality() -> u8 {
    DEFAULT_LINEAR_START_QUALITY
}

fn default_linear_step() -> u8 {
    DEFAULT_LINEAR_STEP
}

fn default_fallback_quality() -> u8 {
    DEFAULT_FALLBACK_QUALITY
}

fn default_converter_program() -> String {
    DEFAULT_CONVERTER_PROGRAM.to_string()
}

fn default_normalize_quality() -> u8 {
    DEFAULT_NORMALIZE_QUALITY
}

fn default_timeout_secs() -> u64 {
    DEFAULT_CONVERTER_TIMEOUT_SECS
}

fn default_true() -> bool {
    true
}
