// Configuration unit tests

use shiage::config::*;
use shiage::image_optimizer::{EncoderBackendKind, SearchStrategy};
use std::path::Path;

#[test]
fn test_can_deserialize_full_yaml_config() {
    let yaml = r##"
image:
  max_dimension: 1800
  max_source_dimension: 16000
  max_source_pixels: 80000000
encoder:
  max_bytes: 307200
  min_quality: 55
  max_quality: 88
  search: binary
  fallback_quality: 80
  backend: external
converter:
  enabled: true
  program: "magick convert"
  normalize_quality: 92
  timeout_secs: 10
watermark:
  enabled: true
  asset_path: /srv/brand/watermark.png
  text: "ACME STORE"
  angle_degrees: -30
  base_opacity: 0.1
  overlay_opacity: 0.16
  shadow_color: "#000"
logging:
  level: debug
  format: json
"##;
    let config: Config = serde_yaml::from_str(yaml).expect("Failed to deserialize YAML");

    assert_eq!(config.image.max_source_dimension, 16000);
    assert_eq!(config.image.max_source_pixels, 80_000_000);
    assert_eq!(config.encoder.search, SearchStrategy::Binary);
    assert_eq!(config.encoder.backend, EncoderBackendKind::External);
    assert_eq!(config.encoder.fallback_quality, 80);
    assert_eq!(config.converter.normalize_quality, 92);
    assert_eq!(config.converter.timeout_secs, 10);
    assert_eq!(
        config.watermark.asset_path.as_deref(),
        Some(Path::new("/srv/brand/watermark.png"))
    );
    assert_eq!(config.watermark.angle_degrees, -30.0);
    assert_eq!(config.logging.level, "debug");
    assert!(config.validate().is_ok());
}

#[test]
fn test_default_config_is_valid() {
    assert!(Config::default().validate().is_ok());
}

#[test]
fn test_bad_watermark_color_fails_validation() {
    let yaml = r##"
watermark:
  fill_color: "#12345G"
"##;
    let config = Config::from_yaml_with_env(yaml).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_empty_text_only_rejected_when_enabled() {
    let mut config = Config::default();
    config.watermark.text = "   ".to_string();
    assert!(config.validate().is_err());

    config.watermark.enabled = false;
    assert!(config.validate().is_ok());
}

#[test]
fn test_unknown_log_format_rejected() {
    assert!(Config::from_yaml_with_env("logging:\n  format: xml\n").is_err());
}

#[test]
fn test_missing_file_is_error() {
    let err = Config::from_file("/nonexistent/shiage.yaml").unwrap_err();
    assert!(err.contains("Failed to read config file"));
}
