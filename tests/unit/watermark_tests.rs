// Watermarker unit tests

use image::{Rgb, RgbImage, Rgba, RgbaImage};
use shiage::watermark::{
    build_watermarker, render_text_tile, rotate_rgba, GlyphSource, WatermarkAsset,
    WatermarkConfig, WatermarkError, WatermarkKind, WatermarkPlan,
};
use std::sync::Arc;

fn logo() -> Arc<WatermarkAsset> {
    let image = RgbaImage::from_fn(60, 30, |x, _| {
        if x % 10 < 5 {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([255, 255, 255, 0])
        }
    });
    Arc::new(WatermarkAsset::from_image(image))
}

fn photo(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 3 % 256) as u8, ((x ^ y) % 256) as u8])
    })
}

#[test]
fn test_both_strategies_keep_dimensions() {
    let config = WatermarkConfig::default();
    let image = photo(320, 200);

    for asset in [Some(logo()), None] {
        let marker = build_watermarker(&config, asset).unwrap().unwrap();
        let out = marker.watermark(&image);
        assert_eq!(out.dimensions(), image.dimensions());
    }
}

#[test]
fn test_watermark_deterministic_across_instances() {
    let config = WatermarkConfig::default();
    let image = photo(300, 300);

    let a = build_watermarker(&config, Some(logo())).unwrap().unwrap();
    let b = build_watermarker(&config, Some(logo())).unwrap().unwrap();
    assert_eq!(a.watermark(&image).as_raw(), b.watermark(&image).as_raw());
}

#[test]
fn test_mark_reaches_every_quadrant() {
    let config = WatermarkConfig::default();
    let marker = build_watermarker(&config, Some(logo())).unwrap().unwrap();
    assert_eq!(marker.kind(), WatermarkKind::Asset);

    let (width, height) = (400u32, 400u32);
    let image = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    let out = marker.watermark(&image);

    // Brick tiling leaves no corner unmarked, so no crop removes the mark
    for (x0, y0) in [(0, 0), (200, 0), (0, 200), (200, 200)] {
        let marked = (y0..y0 + 200)
            .flat_map(|y| (x0..x0 + 200).map(move |x| (x, y)))
            .any(|(x, y)| out.get_pixel(x, y)[0] < 255);
        assert!(marked, "quadrant at ({x0}, {y0}) has no mark");
    }
}

#[test]
fn test_plan_is_pure_function_of_dimensions() {
    let a = WatermarkPlan::new(1800, 1350, 338, 169, -22.0, 0.08, vec![0.08, 0.14]);
    let b = WatermarkPlan::new(1800, 1350, 338, 169, -22.0, 0.08, vec![0.08, 0.14]);
    assert_eq!(a, b);
    assert_eq!(a.placements(1800, 1350, 400, 300), b.placements(1800, 1350, 400, 300));
}

#[test]
fn test_rotation_preserves_content() {
    let tile = RgbaImage::from_pixel(40, 20, Rgba([10, 20, 30, 255]));
    let rotated = rotate_rgba(&tile, -22.0);
    assert!(rotated.width() > 40 && rotated.height() > 20);

    let opaque = rotated.pixels().filter(|p| p[3] == 255).count();
    // Area is preserved up to edge antialiasing
    assert!(opaque > 600 && opaque <= 800, "opaque pixels {opaque}");
}

#[test]
fn test_text_tile_layers() {
    let config = WatermarkConfig::default();
    let tile = render_text_tile(&GlyphSource::Bitmap, "SAMPLE", 24, &config.paints().unwrap())
        .unwrap();

    // Outline is light, fill is dark; both must appear
    assert!(tile.pixels().any(|p| p[3] == 255 && p[0] > 200));
    assert!(tile.pixels().any(|p| p[3] == 255 && p[0] < 60));
}

#[test]
fn test_empty_text_rejected() {
    let config = WatermarkConfig::default();
    let result = render_text_tile(&GlyphSource::Bitmap, "  ", 24, &config.paints().unwrap());
    assert!(matches!(result, Err(WatermarkError::InvalidText(_))));

    let config = WatermarkConfig {
        text: String::new(),
        ..Default::default()
    };
    assert!(build_watermarker(&config, None).is_err());
}
