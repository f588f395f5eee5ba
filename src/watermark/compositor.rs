//! Watermark compositor for blending sprites onto images.
//!
//! - Rotates a tile sprite once per request ([`rotate_rgba`])
//! - Blends it at every planned position with a pass opacity ([`blend_sprite`])
//!
//! All arithmetic is plain `f32` in a fixed order, so identical inputs give
//! byte-identical output.

use super::plan::{PlacementPosition, WatermarkPlan};
use image::{Rgb, RgbImage, Rgba, RgbaImage};

/// Composite `sprite` onto an opaque target at `pos` with extra `opacity`.
///
/// Parts of the sprite outside the target are clipped.
pub fn blend_sprite(target: &mut RgbImage, sprite: &RgbaImage, pos: PlacementPosition, opacity: f32) {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity == 0.0 {
        return;
    }

    let target_width = target.width() as i32;
    let target_height = target.height() as i32;

    // Visible region clamped to target bounds
    let x_start = pos.x.max(0);
    let y_start = pos.y.max(0);
    let x_end = (pos.x + sprite.width() as i32).min(target_width);
    let y_end = (pos.y + sprite.height() as i32).min(target_height);

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let wx = (tx - pos.x) as u32;
            let wy = (ty - pos.y) as u32;

            let fg = sprite.get_pixel(wx, wy);
            if fg[3] == 0 {
                continue;
            }

            let bg = target.get_pixel(tx as u32, ty as u32);
            let blended = blend_onto_opaque(*bg, *fg, opacity);
            target.put_pixel(tx as u32, ty as u32, blended);
        }
    }
}

/// Blend a translucent pixel onto an opaque one.
fn blend_onto_opaque(background: Rgb<u8>, foreground: Rgba<u8>, opacity: f32) -> Rgb<u8> {
    let alpha = (foreground[3] as f32 / 255.0) * opacity;
    let channel = |fg: u8, bg: u8| -> u8 {
        let value = fg as f32 * alpha + bg as f32 * (1.0 - alpha);
        value.round().clamp(0.0, 255.0) as u8
    };

    Rgb([
        channel(foreground[0], background[0]),
        channel(foreground[1], background[1]),
        channel(foreground[2], background[2]),
    ])
}

/// Porter-Duff "over" for two straight-alpha pixels.
pub fn blend_over(bottom: Rgba<u8>, top: Rgba<u8>) -> Rgba<u8> {
    let top_alpha = top[3] as f32 / 255.0;
    let bottom_alpha = bottom[3] as f32 / 255.0;

    let out_alpha = top_alpha + bottom_alpha * (1.0 - top_alpha);
    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend = |t: u8, b: u8| -> u8 {
        let value =
            (t as f32 * top_alpha + b as f32 * bottom_alpha * (1.0 - top_alpha)) / out_alpha;
        value.round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend(top[0], bottom[0]),
        blend(top[1], bottom[1]),
        blend(top[2], bottom[2]),
        (out_alpha * 255.0).round() as u8,
    ])
}

/// Rotate a sprite about its center by `degrees` in image coordinates.
///
/// Uses the same rotation as [`WatermarkPlan::tile_centers`], so a tile and
/// its grid row share one direction. The canvas grows to the rotated bounding
/// box and sampling is bilinear on premultiplied values.
pub fn rotate_rgba(image: &RgbaImage, degrees: f32) -> RgbaImage {
    if degrees.rem_euclid(360.0) == 0.0 {
        return image.clone();
    }

    let theta = degrees.to_radians();
    let (sin, cos) = theta.sin_cos();

    let src_w = image.width() as f32;
    let src_h = image.height() as f32;

    // Tolerance keeps quarter turns from gaining a pixel to float noise
    let dst_w = (src_w * cos.abs() + src_h * sin.abs() - 1e-3).ceil().max(1.0) as u32;
    let dst_h = (src_w * sin.abs() + src_h * cos.abs() - 1e-3).ceil().max(1.0) as u32;
    let mut rotated = RgbaImage::new(dst_w, dst_h);

    let src_cx = src_w / 2.0;
    let src_cy = src_h / 2.0;
    let dst_cx = dst_w as f32 / 2.0;
    let dst_cy = dst_h as f32 / 2.0;

    for dy in 0..dst_h {
        for dx in 0..dst_w {
            // Inverse-rotate the destination pixel center into source space
            let rx = dx as f32 + 0.5 - dst_cx;
            let ry = dy as f32 + 0.5 - dst_cy;
            let sx = rx * cos + ry * sin + src_cx - 0.5;
            let sy = -rx * sin + ry * cos + src_cy - 0.5;

            rotated.put_pixel(dx, dy, sample_bilinear(image, sx, sy));
        }
    }

    rotated
}

/// Bilinear sample with transparent pixels outside the image.
fn sample_bilinear(image: &RgbaImage, x: f32, y: f32) -> Rgba<u8> {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let fetch = |xi: i64, yi: i64| -> [f32; 4] {
        if xi < 0 || yi < 0 || xi >= image.width() as i64 || yi >= image.height() as i64 {
            return [0.0; 4];
        }
        let p = image.get_pixel(xi as u32, yi as u32);
        let a = p[3] as f32 / 255.0;
        [p[0] as f32 * a, p[1] as f32 * a, p[2] as f32 * a, p[3] as f32]
    };

    let p00 = fetch(x0, y0);
    let p10 = fetch(x0 + 1, y0);
    let p01 = fetch(x0, y0 + 1);
    let p11 = fetch(x0 + 1, y0 + 1);

    let mut out = [0.0f32; 4];
    for c in 0..4 {
        let top = p00[c] * (1.0 - fx) + p10[c] * fx;
        let bottom = p01[c] * (1.0 - fx) + p11[c] * fx;
        out[c] = top * (1.0 - fy) + bottom * fy;
    }

    let alpha = out[3];
    if alpha < 0.5 {
        return Rgba([0, 0, 0, 0]);
    }

    let unpremultiply = |v: f32| (v * 255.0 / alpha).round().clamp(0.0, 255.0) as u8;
    Rgba([
        unpremultiply(out[0]),
        unpremultiply(out[1]),
        unpremultiply(out[2]),
        alpha.round().clamp(0.0, 255.0) as u8,
    ])
}

/// Rotate `tile` by the plan angle and composite it at every placement, once
/// per opacity pass.
pub fn composite_tiles(image: &RgbImage, tile: &RgbaImage, plan: &WatermarkPlan) -> RgbImage {
    let sprite = rotate_rgba(tile, plan.angle_degrees);
    let (width, height) = image.dimensions();
    let placements = plan.placements(width, height, sprite.width(), sprite.height());

    let mut output = image.clone();
    for &opacity in &plan.passes {
        for pos in &placements {
            blend_sprite(&mut output, &sprite, *pos, opacity);
        }
    }

    tracing::debug!(
        tiles = placements.len(),
        passes = plan.passes.len(),
        sprite_width = sprite.width(),
        sprite_height = sprite.height(),
        "Composited watermark tiles"
    );

    output
}
