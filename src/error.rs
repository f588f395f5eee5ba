// Error types module

use thiserror::Error;

use crate::image_optimizer::ImageError;
use crate::watermark::WatermarkError;

/// Top-level error for the CLI and configuration loading
///
/// Finishing errors stay typed (`ImageError`, `WatermarkError`) so callers can
/// still tell an unsupported upload from a broken deployment.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration errors (invalid YAML, missing env vars, out-of-range values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reading inputs or writing finished files
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An upload could not be finished
    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    /// The watermark could not be prepared
    #[error("Watermark error: {0}")]
    Watermark(#[from] WatermarkError),
}
