//! Watermark configuration types.
//!
//! One canonical tiling geometry is shared by the asset and text strategies;
//! everything here is a tunable visual parameter.
//!
//! ```yaml
//! watermark:
//!   enabled: true
//!   asset_path: assets/watermark.png
//!   text: "ACME STORE"
//!   angle_degrees: -22
//!   base_opacity: 0.08
//!   overlay_opacity: 0.14
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::text_renderer::{parse_hex_color, Color};
use crate::constants::{
    DEFAULT_WATERMARK_ANGLE_DEGREES, DEFAULT_WATERMARK_ASSET_PATH, DEFAULT_WATERMARK_ASSET_SCALE,
    DEFAULT_WATERMARK_BASE_OPACITY, DEFAULT_WATERMARK_MARGIN_FRACTION,
    DEFAULT_WATERMARK_OVERLAY_OPACITY, DEFAULT_WATERMARK_TEXT, DEFAULT_WATERMARK_TEXT_OPACITY,
    DEFAULT_WATERMARK_TEXT_SCALE,
};

fn default_true() -> bool {
    true
}

fn default_asset_path() -> Option<PathBuf> {
    Some(PathBuf::from(DEFAULT_WATERMARK_ASSET_PATH))
}

fn default_text() -> String {
    DEFAULT_WATERMARK_TEXT.to_string()
}

fn default_angle() -> f32 {
    DEFAULT_WATERMARK_ANGLE_DEGREES
}

fn default_base_opacity() -> f32 {
    DEFAULT_WATERMARK_BASE_OPACITY
}

fn default_overlay_opacity() -> f32 {
    DEFAULT_WATERMARK_OVERLAY_OPACITY
}

fn default_text_opacity() -> f32 {
    DEFAULT_WATERMARK_TEXT_OPACITY
}

fn default_asset_scale() -> f32 {
    DEFAULT_WATERMARK_ASSET_SCALE
}

fn default_margin_fraction() -> f32 {
    DEFAULT_WATERMARK_MARGIN_FRACTION
}

fn default_text_scale() -> f32 {
    DEFAULT_WATERMARK_TEXT_SCALE
}

fn default_shadow_color() -> String {
    "#000000".to_string()
}

fn default_outline_color() -> String {
    "#FFFFFF".to_string()
}

fn default_fill_color() -> String {
    "#1E1E1E".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkConfig {
    /// Turn watermarking off entirely (internal previews)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Logo raster loaded once at startup; missing file means text fallback
    #[serde(default = "default_asset_path")]
    pub asset_path: Option<PathBuf>,

    /// Brand string drawn by the text fallback
    #[serde(default = "default_text")]
    pub text: String,

    /// TrueType/OpenType font for the text fallback; built-in glyphs when unset
    #[serde(default)]
    pub font_path: Option<PathBuf>,

    /// Grid rotation, negative is counter-clockwise
    #[serde(default = "default_angle")]
    pub angle_degrees: f32,

    #[serde(default = "default_base_opacity")]
    pub base_opacity: f32,

    #[serde(default = "default_overlay_opacity")]
    pub overlay_opacity: f32,

    #[serde(default = "default_text_opacity")]
    pub text_opacity: f32,

    /// Asset tile width relative to the shorter image side
    #[serde(default = "default_asset_scale")]
    pub asset_scale: f32,

    /// Gap between tiles relative to the shorter image side
    #[serde(default = "default_margin_fraction")]
    pub margin_fraction: f32,

    /// Glyph height relative to the shorter image side
    #[serde(default = "default_text_scale")]
    pub text_scale: f32,

    #[serde(default = "default_shadow_color")]
    pub shadow_color: String,

    #[serde(default = "default_outline_color")]
    pub outline_color: String,

    #[serde(default = "default_fill_color")]
    pub fill_color: String,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            asset_path: default_asset_path(),
            text: default_text(),
            font_path: None,
            angle_degrees: DEFAULT_WATERMARK_ANGLE_DEGREES,
            base_opacity: DEFAULT_WATERMARK_BASE_OPACITY,
            overlay_opacity: DEFAULT_WATERMARK_OVERLAY_OPACITY,
            text_opacity: DEFAULT_WATERMARK_TEXT_OPACITY,
            asset_scale: DEFAULT_WATERMARK_ASSET_SCALE,
            margin_fraction: DEFAULT_WATERMARK_MARGIN_FRACTION,
            text_scale: DEFAULT_WATERMARK_TEXT_SCALE,
            shadow_color: default_shadow_color(),
            outline_color: default_outline_color(),
            fill_color: default_fill_color(),
        }
    }
}

/// Parsed text paints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextPaints {
    pub shadow: Color,
    pub outline: Color,
    pub fill: Color,
}

impl WatermarkConfig {
    pub fn paints(&self) -> Result<TextPaints, super::WatermarkError> {
        Ok(TextPaints {
            shadow: parse_hex_color(&self.shadow_color)?,
            outline: parse_hex_color(&self.outline_color)?,
            fill: parse_hex_color(&self.fill_color)?,
        })
    }

    /// Check ranges; returns a message naming the offending field.
    pub fn validate(&self) -> Result<(), String> {
        let opacities = [
            ("base_opacity", self.base_opacity),
            ("overlay_opacity", self.overlay_opacity),
            ("text_opacity", self.text_opacity),
        ];
        for (name, value) in opacities {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!(
                    "watermark.{} must be between 0 and 1, got {}",
                    name, value
                ));
            }
        }

        let fractions = [
            ("asset_scale", self.asset_scale),
            ("margin_fraction", self.margin_fraction),
            ("text_scale", self.text_scale),
        ];
        for (name, value) in fractions {
            if !(value > 0.0 && value <= 1.0) {
                return Err(format!(
                    "watermark.{} must be in (0, 1], got {}",
                    name, value
                ));
            }
        }

        if !self.angle_degrees.is_finite() {
            return Err("watermark.angle_degrees must be finite".to_string());
        }

        if self.enabled && self.text.trim().is_empty() {
            return Err("watermark.text cannot be empty when watermarking is enabled".to_string());
        }

        self.paints().map_err(|e| e.to_string())?;

        Ok(())
    }
}
