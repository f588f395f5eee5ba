// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::AppError;
use crate::image_optimizer::{ConverterConfig, EncoderBackendKind, EncoderConfig, ImageConfig};
use crate::watermark::WatermarkConfig;

pub mod logging;

pub use logging::{LogFormat, LoggingConfig};

/// Every section is optional; omitted sections take their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub encoder: EncoderConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub watermark: WatermarkConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        // First, check that all referenced environment variables exist
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        // An empty document is a valid all-defaults config
        if substituted.trim().is_empty() {
            return Ok(Config::default());
        }

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    /// Read, substitute and validate a config file in one step.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let config = Self::from_file(path).map_err(AppError::Config)?;
        config.validate().map_err(AppError::Config)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        // Image limits
        if self.image.max_dimension == 0 {
            return Err("image.max_dimension must be greater than 0".to_string());
        }
        if self.image.max_source_dimension == 0 || self.image.max_source_pixels == 0 {
            return Err("image source limits must be greater than 0".to_string());
        }

        // Encoder
        let encoder = &self.encoder;
        if encoder.max_bytes == 0 {
            return Err("encoder.max_bytes must be greater than 0".to_string());
        }
        let qualities = [
            ("min_quality", encoder.min_quality),
            ("max_quality", encoder.max_quality),
            ("linear_start_quality", encoder.linear_start_quality),
            ("fallback_quality", encoder.fallback_quality),
        ];
        for (name, quality) in qualities {
            if !(1..=100).contains(&quality) {
                return Err(format!(
                    "encoder.{} must be between 1 and 100, got {}",
                    name, quality
                ));
            }
        }
        if encoder.min_quality > encoder.max_quality {
            return Err(format!(
                "encoder.min_quality ({}) cannot exceed encoder.max_quality ({})",
                encoder.min_quality, encoder.max_quality
            ));
        }
        if encoder.linear_step == 0 {
            return Err("encoder.linear_step must be greater than 0".to_string());
        }
        if encoder.backend == EncoderBackendKind::External && !self.converter.enabled {
            return Err(
                "encoder.backend 'external' requires converter.enabled to be true".to_string(),
            );
        }

        // Converter
        if self.converter.program.trim().is_empty() {
            return Err("converter.program cannot be empty".to_string());
        }
        if !(1..=100).contains(&self.converter.normalize_quality) {
            return Err(format!(
                "converter.normalize_quality must be between 1 and 100, got {}",
                self.converter.normalize_quality
            ));
        }
        if self.converter.timeout_secs == 0 {
            return Err("converter.timeout_secs must be greater than 0".to_string());
        }

        self.watermark.validate()?;

        if self.logging.level.trim().is_empty() {
            return Err("logging.level cannot be empty".to_string());
        }

        Ok(())
    }
}
