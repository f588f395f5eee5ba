//! Pipeline behavior with a scripted external converter
//!
//! The converter is `/bin/sh <script>`, so these run anywhere a POSIX shell
//! exists without ImageMagick installed.
#![cfg(unix)]

use super::test_harness::*;
use shiage::image_optimizer::{
    ConverterBackend, EncoderBackendKind, EncoderConfig, ImageConfig, ImageError, ImageFamily,
    MagickConverter,
};
use shiage::{ConversionRequest, Pipeline, Stage};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn scripted(body: &str) -> (TempDir, Arc<dyn ConverterBackend>) {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("fake-convert.sh");
    std::fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
    let converter = MagickConverter::new("/bin/sh")
        .with_prefix_args([script])
        .with_timeout(Duration::from_secs(5));
    (dir, Arc::new(converter))
}

// Copies the first argument to the last one
const COPY: &str = r#"for out; do :; done
cp "$1" "$out""#;

// Writes a canned JPEG sitting next to the script
const CANNED: &str = r#"for out; do :; done
cp "$(dirname "$0")/canned.jpg" "$out""#;

const FAIL: &str = "exit 3";

fn external_encoder() -> EncoderConfig {
    EncoderConfig {
        backend: EncoderBackendKind::External,
        ..Default::default()
    }
}

fn write_canned(dir: &Path, width: u32, height: u32) {
    std::fs::write(dir.join("canned.jpg"), jpeg_bytes(width, height)).unwrap();
}

#[test]
fn test_heic_through_converter() {
    let (dir, converter) = scripted(CANNED);
    write_canned(dir.path(), 600, 800);

    let pipeline = Pipeline::new(
        ImageConfig {
            max_dimension: 400,
            ..Default::default()
        },
        EncoderConfig::default(),
        Some(converter),
        Some(text_watermarker()),
    );
    let request = ConversionRequest::new(heic_bytes()).with_filename("IMG_0007.heic");

    let finished = pipeline.finish(&request).unwrap();
    assert_eq!((finished.width, finished.height), (300, 400));
    assert_eq!(finished.source_family, ImageFamily::Heif);
    assert!(finished.metrics.used_converter);
    assert!(is_jpeg(&finished.data));
}

#[test]
fn test_unconverted_bytes_never_pass_as_jpeg() {
    // A "converter" that echoes its input back unchanged
    let (_dir, converter) = scripted(COPY);
    let pipeline = Pipeline::new(
        ImageConfig::default(),
        EncoderConfig::default(),
        Some(converter),
        None,
    );
    let request = ConversionRequest::new(heic_bytes()).with_content_type("image/heif");

    let err = pipeline.finish(&request).unwrap_err();
    assert!(matches!(err, ImageError::UnsupportedImage { .. }));
}

#[test]
fn test_failing_converter_is_unsupported_for_heic() {
    let (_dir, converter) = scripted(FAIL);
    let pipeline = Pipeline::new(
        ImageConfig::default(),
        EncoderConfig::default(),
        Some(converter),
        None,
    );

    let err = pipeline
        .finish(&ConversionRequest::new(heic_bytes()).with_filename("x.heic"))
        .unwrap_err();
    assert!(err.is_unsupported());
    assert!(err.to_string().contains("exited"));
}

#[test]
fn test_external_compression_success() {
    let (dir, converter) = scripted(CANNED);
    write_canned(dir.path(), 320, 240);

    let pipeline = Pipeline::new(
        ImageConfig::default(),
        external_encoder(),
        Some(converter),
        None,
    );
    let finished = pipeline
        .finish(&ConversionRequest::new(jpeg_bytes(320, 240)))
        .unwrap();

    assert!(!finished.fallback_used);
    assert_eq!(finished.quality, 88);
    assert_eq!(finished.metrics.encode_attempts, 1);
    assert!(!finished.stages.contains(&Stage::FallbackEncode));
}

#[test]
fn test_failing_external_compression_falls_back() {
    let (_dir, converter) = scripted(FAIL);
    let pipeline = Pipeline::new(
        ImageConfig::default(),
        external_encoder(),
        Some(converter),
        Some(text_watermarker()),
    );

    let finished = pipeline
        .finish(&ConversionRequest::new(jpeg_bytes(640, 480)).with_filename("mug.jpg"))
        .unwrap();

    assert!(finished.fallback_used);
    assert_eq!(finished.quality, 82);
    assert_eq!(
        finished.stages,
        vec![
            Stage::Normalize,
            Stage::Resize,
            Stage::Watermark,
            Stage::Encode,
            Stage::FallbackEncode,
            Stage::Done
        ]
    );
    let decoded = image::load_from_memory(&finished.data).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (640, 480));
}

#[test]
fn test_hung_converter_is_killed_and_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("hang.sh");
    std::fs::write(&script, "#!/bin/sh\nsleep 30\n").unwrap();
    let converter: Arc<dyn ConverterBackend> = Arc::new(
        MagickConverter::new("/bin/sh")
            .with_prefix_args([script])
            .with_timeout(Duration::from_millis(200)),
    );

    let pipeline = Pipeline::new(
        ImageConfig::default(),
        external_encoder(),
        Some(converter),
        None,
    );

    let started = std::time::Instant::now();
    let finished = pipeline
        .finish(&ConversionRequest::new(jpeg_bytes(200, 200)))
        .unwrap();

    assert!(finished.fallback_used);
    assert!(started.elapsed() < Duration::from_secs(10));
}
