//! Watermark error types.
//!
//! Watermark failures only happen while resources are loaded; applying a
//! prepared watermark cannot fail.

use thiserror::Error;

/// Errors that can occur while preparing a watermark.
#[derive(Debug, Error)]
pub enum WatermarkError {
    /// The logo raster could not be read or decoded
    #[error("Failed to load watermark asset '{path}': {message}")]
    AssetLoad { path: String, message: String },

    /// The configured font file could not be read or parsed
    #[error("Failed to load font '{path}': {message}")]
    FontLoad { path: String, message: String },

    /// Text or paint settings cannot be rendered
    #[error("Invalid watermark text: {0}")]
    InvalidText(String),
}
