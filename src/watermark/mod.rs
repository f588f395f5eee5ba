//! Diagonal tiled watermark for finished product images.
//!
//! The brand logo (or, without one, the brand string) is stamped on a rotated
//! brick grid over the whole image at low opacity, so no single crop removes
//! it and it stays visible on light and dark backgrounds.
//!
//! # Configuration Example
//!
//! ```yaml
//! watermark:
//!   enabled: true
//!   asset_path: assets/watermark.png
//!   text: "SAMPLE"
//!   angle_degrees: -22
//!   base_opacity: 0.08
//!   overlay_opacity: 0.14
//! ```

pub mod asset;
pub mod compositor;
pub mod config;
pub mod error;
pub mod plan;
pub mod processor;
pub mod text_renderer;

pub use asset::WatermarkAsset;
pub use compositor::{blend_sprite, composite_tiles, rotate_rgba};
pub use config::{TextPaints, WatermarkConfig};
pub use error::WatermarkError;
pub use plan::{is_visible, PlacementPosition, WatermarkPlan};
pub use processor::{
    build_watermarker, AssetWatermarker, TextWatermarker, WatermarkKind, Watermarker,
};
pub use text_renderer::{parse_hex_color, render_text_tile, Color, GlyphSource};
