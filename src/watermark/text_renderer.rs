//! Text watermark rendering.
//!
//! Renders the brand string into an RGBA tile used by the text fallback. Each
//! tile draws the string three times at the same position:
//!
//! 1. a dark shadow offset by 1-2 px
//! 2. a light outline (the glyph mask dilated by one pixel)
//! 3. the dark fill on top
//!
//! so the mark stays legible on both light and dark photos.
//!
//! Glyphs come from a TrueType/OpenType font when one is configured, or from
//! a built-in 5x7 bitmap set otherwise, so the fallback never depends on a
//! file being present.

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::{GrayImage, Luma, Rgba, RgbaImage};
use std::path::Path;
use std::sync::Arc;

use super::compositor::blend_over;
use super::config::TextPaints;
use super::WatermarkError;

/// RGB paint color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// White color.
    pub fn white() -> Self {
        Self::new(255, 255, 255)
    }

    /// Black color.
    pub fn black() -> Self {
        Self::new(0, 0, 0)
    }
}

/// Parse a hex color string into RGB components.
///
/// Supports both #RGB and #RRGGBB formats.
///
/// # Examples
///
/// ```ignore
/// let white = parse_hex_color("#FFF").unwrap();
/// assert_eq!(white, Color::new(255, 255, 255));
/// ```
pub fn parse_hex_color(hex: &str) -> Result<Color, WatermarkError> {
    let hex = hex
        .strip_prefix('#')
        .ok_or_else(|| WatermarkError::InvalidText("Color must start with '#'".to_string()))?;

    let digit = |s: &str| {
        u8::from_str_radix(s, 16)
            .map_err(|_| WatermarkError::InvalidText(format!("Invalid hex digit in '#{}'", hex)))
    };

    if !hex.is_ascii() {
        return Err(WatermarkError::InvalidText(format!(
            "Invalid hex digit in '#{}'",
            hex
        )));
    }

    match hex.len() {
        // Each digit doubled: 0xF -> 0xFF
        3 => Ok(Color::new(
            digit(&hex[0..1])? * 17,
            digit(&hex[1..2])? * 17,
            digit(&hex[2..3])? * 17,
        )),
        6 => Ok(Color::new(
            digit(&hex[0..2])?,
            digit(&hex[2..4])?,
            digit(&hex[4..6])?,
        )),
        _ => Err(WatermarkError::InvalidText(format!(
            "Color must be #RGB or #RRGGBB format, got {} characters",
            hex.len()
        ))),
    }
}

/// Where glyph outlines come from
#[derive(Clone)]
pub enum GlyphSource {
    Font(Arc<FontVec>),
    /// Built-in 5x7 uppercase bitmap glyphs
    Bitmap,
}

impl std::fmt::Debug for GlyphSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GlyphSource::Font(_) => f.write_str("GlyphSource::Font"),
            GlyphSource::Bitmap => f.write_str("GlyphSource::Bitmap"),
        }
    }
}

impl GlyphSource {
    /// Load a font file, or use the bitmap glyphs when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, WatermarkError> {
        let Some(path) = path else {
            return Ok(GlyphSource::Bitmap);
        };

        let font_load = |message: String| WatermarkError::FontLoad {
            path: path.display().to_string(),
            message,
        };

        let data = std::fs::read(path).map_err(|e| font_load(e.to_string()))?;
        let font = FontVec::try_from_vec(data).map_err(|e| font_load(e.to_string()))?;
        Ok(GlyphSource::Font(Arc::new(font)))
    }

    /// Coverage mask of `text` with glyphs roughly `px_height` tall.
    pub fn coverage_mask(&self, text: &str, px_height: u32) -> GrayImage {
        match self {
            GlyphSource::Font(font) => font_mask(font.as_ref(), text, px_height.max(1) as f32),
            GlyphSource::Bitmap => bitmap_mask(text, px_height),
        }
    }
}

fn font_mask(font: &FontVec, text: &str, px: f32) -> GrayImage {
    let scale = PxScale::from(px);
    let scaled_font = font.as_scaled(scale);

    let mut width = 0.0f32;
    let mut prev_glyph: Option<ab_glyph::GlyphId> = None;
    for c in text.chars() {
        let glyph_id = scaled_font.glyph_id(c);
        if let Some(prev) = prev_glyph {
            width += scaled_font.kern(prev, glyph_id);
        }
        width += scaled_font.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);
    }

    // One pixel of padding on every side
    let canvas_width = width.ceil() as u32 + 2;
    let canvas_height = scaled_font.height().ceil() as u32 + 2;
    let mut mask = GrayImage::new(canvas_width.max(1), canvas_height.max(1));

    let baseline_y = 1.0 + scaled_font.ascent();
    let mut cursor_x = 1.0f32;
    let mut prev_glyph: Option<ab_glyph::GlyphId> = None;

    for c in text.chars() {
        let glyph_id = scaled_font.glyph_id(c);
        if let Some(prev) = prev_glyph {
            cursor_x += scaled_font.kern(prev, glyph_id);
        }

        let glyph = glyph_id.with_scale_and_position(scale, ab_glyph::point(cursor_x, baseline_y));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                let x = px as i32 + bounds.min.x as i32;
                let y = py as i32 + bounds.min.y as i32;
                if x >= 0 && y >= 0 && (x as u32) < mask.width() && (y as u32) < mask.height() {
                    let value = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
                    let existing = mask.get_pixel(x as u32, y as u32)[0];
                    mask.put_pixel(x as u32, y as u32, Luma([existing.max(value)]));
                }
            });
        }

        cursor_x += scaled_font.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);
    }

    mask
}

/// Rows of a 5x7 glyph, bit 4 is the leftmost column
fn bitmap_glyph(c: char) -> [u8; 7] {
    match c.to_ascii_uppercase() {
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x0A, 0x04, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        '&' => [0x0C, 0x12, 0x14, 0x08, 0x15, 0x12, 0x0D],
        ' ' => [0x00; 7],
        // Anything else renders as '?'
        _ => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04],
    }
}

fn bitmap_mask(text: &str, px_height: u32) -> GrayImage {
    // 7 rows of ink plus one row of leading
    let cell = (px_height / 8).max(1);
    let advance = 6 * cell;
    let count = text.chars().count() as u32;

    let width = (count * advance).saturating_sub(cell).max(1) + 2;
    let height = 7 * cell + 2;
    let mut mask = GrayImage::new(width, height);

    for (i, c) in text.chars().enumerate() {
        let rows = bitmap_glyph(c);
        let origin_x = 1 + i as u32 * advance;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..5u32 {
                if (*bits >> (4 - col)) & 1 == 0 {
                    continue;
                }
                let x0 = origin_x + col * cell;
                let y0 = 1 + row as u32 * cell;
                for y in y0..y0 + cell {
                    for x in x0..x0 + cell {
                        mask.put_pixel(x, y, Luma([255]));
                    }
                }
            }
        }
    }

    mask
}

/// Grow a mask by one pixel in every direction (3x3 max filter).
///
/// The result is two pixels wider and taller than the input.
fn dilate(mask: &GrayImage) -> GrayImage {
    let mut out = GrayImage::new(mask.width() + 2, mask.height() + 2);
    for (x, y, px) in mask.enumerate_pixels() {
        let value = px[0];
        if value == 0 {
            continue;
        }
        for dy in 0..3 {
            for dx in 0..3 {
                let target = out.get_pixel_mut(x + dx, y + dy);
                target[0] = target[0].max(value);
            }
        }
    }
    out
}

/// Paint `color` through `mask` onto `tile` with the mask's top-left at (x, y).
fn paint_mask(tile: &mut RgbaImage, mask: &GrayImage, x: u32, y: u32, color: Color) {
    for (mx, my, px) in mask.enumerate_pixels() {
        let coverage = px[0];
        if coverage == 0 {
            continue;
        }
        let (tx, ty) = (x + mx, y + my);
        if tx >= tile.width() || ty >= tile.height() {
            continue;
        }
        let existing = *tile.get_pixel(tx, ty);
        let paint = Rgba([color.r, color.g, color.b, coverage]);
        tile.put_pixel(tx, ty, blend_over(existing, paint));
    }
}

/// Shadow offset in pixels for a given glyph height (1 or 2)
pub fn shadow_offset(px_height: u32) -> u32 {
    (px_height / 24).clamp(1, 2)
}

/// Render an unrotated text tile: shadow, outline, then fill.
pub fn render_text_tile(
    glyphs: &GlyphSource,
    text: &str,
    px_height: u32,
    paints: &TextPaints,
) -> Result<RgbaImage, WatermarkError> {
    if text.trim().is_empty() {
        return Err(WatermarkError::InvalidText(
            "Cannot render empty text".to_string(),
        ));
    }

    Ok(draw_text_tile(glyphs, text, px_height, paints))
}

/// [`render_text_tile`] without the empty-text check.
pub(crate) fn draw_text_tile(
    glyphs: &GlyphSource,
    text: &str,
    px_height: u32,
    paints: &TextPaints,
) -> RgbaImage {
    let mask = glyphs.coverage_mask(text, px_height);
    let outline = dilate(&mask);
    let offset = shadow_offset(px_height);

    // Outline occupies one pixel around the mask, shadow extends down-right
    let mut tile = RgbaImage::new(mask.width() + 2 + offset, mask.height() + 2 + offset);

    paint_mask(&mut tile, &mask, 1 + offset, 1 + offset, paints.shadow);
    paint_mask(&mut tile, &outline, 0, 0, paints.outline);
    paint_mask(&mut tile, &mask, 1, 1, paints.fill);

    tile
}
