// Resizer unit tests

use image::{Rgb, RgbImage};
use rstest::rstest;
use shiage::image_optimizer::{fit_dimensions, fit_within};

#[rstest]
#[case(4000, 3000, 1800, (1800, 1350))]
#[case(3000, 4000, 1800, (1350, 1800))]
#[case(1800, 1800, 1800, (1800, 1800))]
#[case(1200, 800, 1800, (1200, 800))]
#[case(5000, 10, 1000, (1000, 2))]
#[case(10, 5000, 1000, (2, 1000))]
fn test_fit_dimensions(
    #[case] width: u32,
    #[case] height: u32,
    #[case] max: u32,
    #[case] expected: (u32, u32),
) {
    assert_eq!(fit_dimensions(width, height, max), expected);
}

#[rstest]
#[case(1999, 1333)]
#[case(2500, 1700)]
#[case(1801, 97)]
fn test_aspect_ratio_preserved(#[case] width: u32, #[case] height: u32) {
    let (w, h) = fit_dimensions(width, height, 1800);
    assert_eq!(w.max(h), 1800);
    let before = width as f64 / height as f64;
    let after = w as f64 / h as f64;
    assert!((before - after).abs() / before < 0.01, "{before} vs {after}");
}

#[test]
fn test_small_image_untouched() {
    let image = RgbImage::from_fn(120, 90, |x, y| Rgb([x as u8, y as u8, 7]));
    let out = fit_within(&image, 1800).unwrap();
    assert_eq!(out, image);
}

#[test]
fn test_large_image_downscaled() {
    let image = RgbImage::from_pixel(900, 300, Rgb([200, 100, 50]));
    let out = fit_within(&image, 450).unwrap();
    assert_eq!(out.dimensions(), (450, 150));
    let px = out.get_pixel(225, 75);
    assert!(px[0].abs_diff(200) <= 1 && px[1].abs_diff(100) <= 1 && px[2].abs_diff(50) <= 1);
}
