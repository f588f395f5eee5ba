// Shiage product-image finishing library

pub mod config;
pub mod constants;
pub mod error;
pub mod image_optimizer;
pub mod logging;
pub mod pipeline;
pub mod watermark;

pub use config::Config;
pub use error::AppError;
pub use pipeline::{ConversionRequest, FinishedImage, Pipeline, Stage};
