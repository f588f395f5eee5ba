//! Watermark strategies.
//!
//! Both strategies share the tiling geometry of [`WatermarkPlan`] and differ
//! only in the tile they stamp:
//!
//! - [`AssetWatermarker`]: the brand logo, composited twice per tile (a faint
//!   base pass, then a slightly stronger overlay pass)
//! - [`TextWatermarker`]: the brand string with shadow, outline and fill,
//!   used when no logo is available
//!
//! Watermarks are applied after resizing and before encoding. Applying a
//! prepared watermarker cannot fail.

use image::imageops::{self, FilterType};
use image::{RgbImage, RgbaImage};
use std::sync::Arc;

use crate::constants::MIN_WATERMARK_TILE_PX;

use super::asset::WatermarkAsset;
use super::compositor::composite_tiles;
use super::config::{TextPaints, WatermarkConfig};
use super::plan::WatermarkPlan;
use super::text_renderer::{draw_text_tile, GlyphSource};
use super::WatermarkError;

/// Which strategy produced the mark
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatermarkKind {
    Asset,
    Text,
}

impl WatermarkKind {
    pub fn as_label(&self) -> &'static str {
        match self {
            WatermarkKind::Asset => "asset",
            WatermarkKind::Text => "text",
        }
    }
}

/// A tiled diagonal watermark strategy.
pub trait Watermarker: Send + Sync {
    fn kind(&self) -> WatermarkKind;

    /// Tiling parameters for an image of the given size
    fn plan(&self, width: u32, height: u32) -> WatermarkPlan;

    /// Composite the mark onto a copy of `image`
    fn apply(&self, image: &RgbImage, plan: &WatermarkPlan) -> RgbImage;

    /// Plan and apply in one step
    fn watermark(&self, image: &RgbImage) -> RgbImage {
        let plan = self.plan(image.width(), image.height());
        self.apply(image, &plan)
    }
}

/// Tiles the brand logo.
pub struct AssetWatermarker {
    asset: Arc<WatermarkAsset>,
    angle_degrees: f32,
    asset_scale: f32,
    margin_fraction: f32,
    base_opacity: f32,
    overlay_opacity: f32,
}

impl AssetWatermarker {
    pub fn new(asset: Arc<WatermarkAsset>, config: &WatermarkConfig) -> Self {
        Self {
            asset,
            angle_degrees: config.angle_degrees,
            asset_scale: config.asset_scale,
            margin_fraction: config.margin_fraction,
            base_opacity: config.base_opacity,
            overlay_opacity: config.overlay_opacity,
        }
    }

    /// Logo size for an image: width is `asset_scale` of the shorter side,
    /// never below `MIN_WATERMARK_TILE_PX`
    pub fn tile_size(&self, width: u32, height: u32) -> (u32, u32) {
        let (asset_w, asset_h) = self.asset.dimensions();
        let shorter = width.min(height) as f32;
        let tile_w = (shorter * self.asset_scale)
            .round()
            .max(MIN_WATERMARK_TILE_PX as f32);
        let tile_h = (tile_w * asset_h as f32 / asset_w.max(1) as f32).round().max(1.0);
        (tile_w as u32, tile_h as u32)
    }
}

impl Watermarker for AssetWatermarker {
    fn kind(&self) -> WatermarkKind {
        WatermarkKind::Asset
    }

    fn plan(&self, width: u32, height: u32) -> WatermarkPlan {
        let (tile_w, tile_h) = self.tile_size(width, height);
        WatermarkPlan::new(
            width,
            height,
            tile_w,
            tile_h,
            self.angle_degrees,
            self.margin_fraction,
            vec![self.base_opacity, self.overlay_opacity],
        )
    }

    fn apply(&self, image: &RgbImage, plan: &WatermarkPlan) -> RgbImage {
        let tile: RgbaImage = imageops::resize(
            self.asset.image(),
            plan.tile_width,
            plan.tile_height,
            FilterType::CatmullRom,
        );
        composite_tiles(image, &tile, plan)
    }
}

/// Tiles the brand string when no logo is available.
pub struct TextWatermarker {
    glyphs: GlyphSource,
    text: String,
    paints: TextPaints,
    angle_degrees: f32,
    text_scale: f32,
    margin_fraction: f32,
    opacity: f32,
}

impl TextWatermarker {
    pub fn new(glyphs: GlyphSource, config: &WatermarkConfig) -> Result<Self, WatermarkError> {
        let text = config.text.trim().to_string();
        if text.is_empty() {
            return Err(WatermarkError::InvalidText(
                "Cannot render empty text".to_string(),
            ));
        }

        Ok(Self {
            glyphs,
            text,
            paints: config.paints()?,
            angle_degrees: config.angle_degrees,
            text_scale: config.text_scale,
            margin_fraction: config.margin_fraction,
            opacity: config.text_opacity,
        })
    }

    /// Glyph height for an image, never below 8 px
    pub fn glyph_height(&self, width: u32, height: u32) -> u32 {
        let shorter = width.min(height) as f32;
        ((shorter * self.text_scale).round() as u32).max(8)
    }

    fn tile(&self, width: u32, height: u32) -> RgbaImage {
        draw_text_tile(
            &self.glyphs,
            &self.text,
            self.glyph_height(width, height),
            &self.paints,
        )
    }

    fn plan_for_tile(&self, width: u32, height: u32, tile: &RgbaImage) -> WatermarkPlan {
        WatermarkPlan::new(
            width,
            height,
            tile.width(),
            tile.height(),
            self.angle_degrees,
            self.margin_fraction,
            vec![self.opacity],
        )
    }
}

impl Watermarker for TextWatermarker {
    fn kind(&self) -> WatermarkKind {
        WatermarkKind::Text
    }

    fn plan(&self, width: u32, height: u32) -> WatermarkPlan {
        let tile = self.tile(width, height);
        self.plan_for_tile(width, height, &tile)
    }

    fn apply(&self, image: &RgbImage, plan: &WatermarkPlan) -> RgbImage {
        let tile = self.tile(image.width(), image.height());
        composite_tiles(image, &tile, plan)
    }

    // Plan and composite from a single rendered tile
    fn watermark(&self, image: &RgbImage) -> RgbImage {
        let tile = self.tile(image.width(), image.height());
        let plan = self.plan_for_tile(image.width(), image.height(), &tile);
        composite_tiles(image, &tile, &plan)
    }
}

/// Pick the strategy for a configuration.
///
/// Returns `None` when watermarking is disabled. A missing asset selects the
/// text strategy; an unreadable configured font is an error.
pub fn build_watermarker(
    config: &WatermarkConfig,
    asset: Option<Arc<WatermarkAsset>>,
) -> Result<Option<Arc<dyn Watermarker>>, WatermarkError> {
    if !config.enabled {
        tracing::info!("Watermarking disabled");
        return Ok(None);
    }

    if let Some(asset) = asset {
        return Ok(Some(Arc::new(AssetWatermarker::new(asset, config))));
    }

    let glyphs = GlyphSource::load(config.font_path.as_deref())?;
    if matches!(glyphs, GlyphSource::Bitmap) {
        tracing::info!(text = %config.text, "Using built-in glyphs for text watermark");
    }

    Ok(Some(Arc::new(TextWatermarker::new(glyphs, config)?)))
}
