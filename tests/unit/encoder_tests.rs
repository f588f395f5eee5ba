// SizeConstrainedEncoder unit tests

use image::{Rgb, RgbImage};
use shiage::image_optimizer::{
    encode_fixed, encode_jpeg, encode_under_cap, ImageError, InProcessJpeg, QualityEncoder,
    SearchPlan, SizeConstraint,
};
use std::cell::RefCell;

/// Deterministic high-entropy image, hard to compress
fn noisy(width: u32, height: u32) -> RgbImage {
    let mut state: u32 = 0x9E37_79B9;
    RgbImage::from_fn(width, height, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [r, g, b, _] = state.to_le_bytes();
        Rgb([r, g, b])
    })
}

/// Size model: one kilobyte per quality point
struct Linear {
    calls: RefCell<Vec<u8>>,
}

impl QualityEncoder for Linear {
    fn backend(&self) -> &'static str {
        "model"
    }

    fn encode_at(&self, quality: u8) -> Result<Vec<u8>, ImageError> {
        self.calls.borrow_mut().push(quality);
        Ok(vec![0; quality as usize * 1024])
    }
}

#[test]
fn test_binary_search_lands_on_highest_fitting_quality() {
    let model = Linear {
        calls: RefCell::new(Vec::new()),
    };
    let constraint = SizeConstraint::new(70 * 1024, 55, 88);

    let outcome = encode_under_cap(&model, &constraint, SearchPlan::Binary).unwrap();
    assert_eq!(outcome.quality, 70);
    assert!(!outcome.degraded);
    assert_eq!(outcome.attempts as usize, model.calls.borrow().len());
    // Bisecting 34 qualities never needs more than ceiling + log2 attempts
    assert!(outcome.attempts <= 7);
}

#[test]
fn test_linear_search_steps_down() {
    let model = Linear {
        calls: RefCell::new(Vec::new()),
    };
    let constraint = SizeConstraint::new(72 * 1024, 55, 88);

    let outcome = encode_under_cap(
        &model,
        &constraint,
        SearchPlan::Linear { start: 85, step: 5 },
    )
    .unwrap();
    assert_eq!(outcome.quality, 70);
    assert_eq!(*model.calls.borrow(), vec![85, 80, 75, 70]);
}

#[test]
fn test_real_jpeg_under_cap() {
    let image = noisy(256, 256);
    // Whatever q70 produces is reachable by construction
    let cap = encode_jpeg(&image, 70).unwrap().len();
    let constraint = SizeConstraint::new(cap, 55, 88);

    let outcome =
        encode_under_cap(&InProcessJpeg::new(&image), &constraint, SearchPlan::Binary).unwrap();
    assert!(outcome.data.len() <= cap);
    assert!((55..=88).contains(&outcome.quality));
    assert!(!outcome.degraded);
    assert!(outcome.quality >= 65, "quality {}", outcome.quality);

    let decoded = image::load_from_memory(&outcome.data).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (256, 256));
}

#[test]
fn test_unreachable_cap_is_degraded_not_error() {
    let image = noisy(128, 128);
    let constraint = SizeConstraint::new(200, 55, 88);

    for plan in [SearchPlan::Binary, SearchPlan::Linear { start: 85, step: 5 }] {
        let outcome = encode_under_cap(&InProcessJpeg::new(&image), &constraint, plan).unwrap();
        assert!(outcome.degraded);
        assert_eq!(outcome.quality, 55);
        assert!(outcome.data.len() > 200);
        // Still a structurally valid JPEG
        assert!(image::load_from_memory(&outcome.data).is_ok());
    }
}

#[test]
fn test_fixed_encode_flags_overrun() {
    let image = noisy(64, 64);
    let tight = SizeConstraint::new(100, 55, 88);
    let roomy = SizeConstraint::new(1024 * 1024, 55, 88);

    assert!(encode_fixed(&InProcessJpeg::new(&image), &tight, 82).unwrap().degraded);
    let outcome = encode_fixed(&InProcessJpeg::new(&image), &roomy, 82).unwrap();
    assert!(!outcome.degraded);
    assert_eq!(outcome.quality, 82);
    assert_eq!(outcome.attempts, 1);
}

#[test]
fn test_encode_jpeg_is_deterministic() {
    let image = noisy(80, 60);
    assert_eq!(encode_jpeg(&image, 75).unwrap(), encode_jpeg(&image, 75).unwrap());
}

#[test]
fn test_constraint_band_is_ordered() {
    let constraint = SizeConstraint::new(1000, 90, 60);
    assert!(constraint.min_quality <= constraint.max_quality);
}
