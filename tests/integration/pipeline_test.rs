//! End-to-end finishing scenarios
//!
//! Each test drives `Pipeline::finish` the way an upload handler would and
//! checks the finished bytes by decoding them again.

use super::test_harness::*;
use image::{Rgba, RgbaImage};
use shiage::config::Config;
use shiage::image_optimizer::{
    encode_under_cap, fit_within, ConverterBackend, EncoderConfig, ImageConfig, ImageError, ImageFamily,
    InProcessJpeg, MagickConverter, Normalizer, SearchPlan, SizeConstraint,
};
use shiage::watermark::asset;
use shiage::{ConversionRequest, Pipeline, Stage};
use std::sync::Arc;

#[test]
fn test_large_jpeg_finishes_under_cap() {
    let pipeline = default_pipeline();
    let request = ConversionRequest::new(jpeg_bytes(4000, 3000))
        .with_filename("sneaker.jpg")
        .with_content_type("image/jpeg");

    let finished = pipeline.finish(&request).unwrap();

    assert_eq!((finished.width, finished.height), (1800, 1350));
    assert!(finished.data.len() <= 300 * 1024, "{} bytes", finished.data.len());
    assert!((55..=88).contains(&finished.quality));
    assert!(!finished.degraded);
    assert!(!finished.fallback_used);
    assert!(is_jpeg(&finished.data));
    assert!(finished.metrics.was_resized());
    assert_eq!(finished.metrics.source_dimensions, (4000, 3000));
}

#[test]
fn test_round_trip_dimensions_match_resizer() {
    let pipeline = default_pipeline();
    let request = ConversionRequest::new(jpeg_bytes(2400, 1000)).with_filename("rug.jpg");

    let finished = pipeline.finish(&request).unwrap();
    let decoded = image::load_from_memory(&finished.data).unwrap();

    assert_eq!((decoded.width(), decoded.height()), (1800, 750));
    assert_eq!((decoded.width(), decoded.height()), (finished.width, finished.height));
}

#[test]
fn test_portrait_heic_without_tool_is_unsupported() {
    let converter: Arc<dyn ConverterBackend> =
        Arc::new(MagickConverter::new("/nonexistent/shiage-convert"));
    let pipeline = Pipeline::new(
        ImageConfig::default(),
        EncoderConfig::default(),
        Some(converter),
        Some(text_watermarker()),
    );
    let request = ConversionRequest::new(heic_bytes())
        .with_filename("IMG_3000x4000.HEIC")
        .with_content_type("application/octet-stream");

    let err = pipeline.finish(&request).unwrap_err();

    assert!(err.is_unsupported());
    assert_eq!(err.to_http_status(), 415);
    assert!(matches!(
        err,
        ImageError::UnsupportedImage {
            family: ImageFamily::Heif,
            ..
        }
    ));
}

#[test]
fn test_heic_without_any_converter_is_unsupported() {
    let request = ConversionRequest::new(heic_bytes()).with_content_type("image/heic");
    let err = default_pipeline().finish(&request).unwrap_err();
    assert!(err.is_unsupported());
}

#[test]
fn test_garbage_is_unsupported() {
    let request = ConversionRequest::new(b"definitely not an image".to_vec());
    let err = default_pipeline().finish(&request).unwrap_err();
    assert!(err.is_unsupported());
}

#[test]
fn test_finishing_is_deterministic() {
    let pipeline = default_pipeline();
    let request = ConversionRequest::new(jpeg_bytes(900, 700)).with_filename("lamp.jpg");

    let first = pipeline.finish(&request).unwrap();
    let second = pipeline.finish(&request).unwrap();

    assert_eq!(first.data, second.data);
    assert_eq!(first.quality, second.quality);
}

#[test]
fn test_concurrent_requests_share_one_pipeline() {
    let pipeline = Arc::new(default_pipeline());
    let bytes = jpeg_bytes(640, 480);
    let expected = pipeline.finish(&ConversionRequest::new(bytes.clone())).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let pipeline = Arc::clone(&pipeline);
            let bytes = bytes.clone();
            std::thread::spawn(move || pipeline.finish(&ConversionRequest::new(bytes)).unwrap())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap().data, expected.data);
    }
}

#[test]
fn test_transparent_png_is_flattened_onto_white() {
    let pipeline = Pipeline::new(ImageConfig::default(), EncoderConfig::default(), None, None);
    let transparent = RgbaImage::from_pixel(64, 48, Rgba([200, 0, 0, 0]));
    let request = ConversionRequest::new(png_rgba_bytes(transparent)).with_filename("cutout.png");

    let finished = pipeline.finish(&request).unwrap();
    let decoded = image::load_from_memory(&finished.data).unwrap().to_rgb8();

    assert_eq!(decoded.dimensions(), (64, 48));
    assert!(decoded.pixels().all(|p| p[0] >= 250 && p[1] >= 250 && p[2] >= 250));
}

#[test]
fn test_disabled_watermark_matches_plain_encode() {
    let bytes = jpeg_bytes(500, 400);
    let image_config = ImageConfig {
        max_dimension: 300,
        ..Default::default()
    };
    let encoder_config = EncoderConfig::default();

    let plain = Pipeline::new(image_config.clone(), encoder_config.clone(), None, None);
    assert!(!plain.has_watermark());
    let finished = plain.finish(&ConversionRequest::new(bytes.clone())).unwrap();

    let normalized = Normalizer::new(image_config, None)
        .normalize(&bytes, None, None)
        .unwrap();
    let resized = fit_within(&normalized.image, 300).unwrap();
    let expected = encode_under_cap(
        &InProcessJpeg::new(&resized),
        &SizeConstraint::from_config(&encoder_config),
        SearchPlan::Binary,
    )
    .unwrap();

    assert_eq!(finished.data, expected.data);
    assert_eq!(finished.stages.len(), 5);

    let marked = Pipeline::new(
        ImageConfig {
            max_dimension: 300,
            ..Default::default()
        },
        encoder_config,
        None,
        Some(text_watermarker()),
    )
    .finish(&ConversionRequest::new(bytes))
    .unwrap();
    assert_ne!(marked.data, finished.data);
}

#[test]
fn test_tiny_cap_returns_degraded_jpeg() {
    let encoder = EncoderConfig {
        max_bytes: 512,
        ..Default::default()
    };
    let pipeline = Pipeline::new(ImageConfig::default(), encoder, None, Some(text_watermarker()));

    let finished = pipeline
        .finish(&ConversionRequest::new(jpeg_bytes(800, 600)))
        .unwrap();

    assert!(finished.degraded);
    assert!(finished.metrics.degraded);
    assert_eq!(finished.quality, 55);
    assert!(image::load_from_memory(&finished.data).is_ok());
    assert_eq!(finished.stages.last(), Some(&Stage::Done));
}

#[test]
fn test_pipeline_from_config_loads_shared_asset() {
    let dir = tempfile::tempdir().unwrap();
    let logo_path = dir.path().join("watermark.png");
    RgbaImage::from_pixel(120, 40, Rgba([30, 30, 30, 220]))
        .save(&logo_path)
        .unwrap();

    let yaml = format!(
        "image:\n  max_dimension: 400\nconverter:\n  enabled: false\nwatermark:\n  asset_path: {}\n",
        logo_path.display()
    );
    let config = Config::from_yaml_with_env(&yaml).unwrap();
    config.validate().unwrap();

    let pipeline = Pipeline::from_config(&config).unwrap();
    assert!(pipeline.has_watermark());

    let shared = asset::global().expect("asset initialized");
    assert_eq!(shared.dimensions(), (120, 40));

    let finished = pipeline
        .finish(&ConversionRequest::new(jpeg_bytes(800, 800)))
        .unwrap();
    assert_eq!((finished.width, finished.height), (400, 400));
}
