// Constants module - centralized default values for configuration
//
// This module defines all default values used throughout the codebase.
// Using constants instead of magic numbers keeps the tunable knobs of the
// finishing pipeline in one place.

// =============================================================================
// Image defaults
// =============================================================================

/// Longest edge of a finished image in pixels
pub const DEFAULT_MAX_DIMENSION: u32 = 1800;

/// Largest source width or height accepted for decoding
pub const DEFAULT_MAX_SOURCE_DIMENSION: u32 = 20_000;

/// Largest source pixel count accepted for decoding (100 megapixels)
pub const DEFAULT_MAX_SOURCE_PIXELS: u64 = 100_000_000;

// =============================================================================
// Encoder defaults
// =============================================================================

/// Byte cap for a finished JPEG (300 KiB)
pub const DEFAULT_MAX_BYTES: usize = 300 * 1024;

/// Lowest quality the quality search may settle on
pub const DEFAULT_MIN_QUALITY: u8 = 55;

/// Highest quality the quality search starts from
pub const DEFAULT_MAX_QUALITY: u8 = 88;

/// Starting quality for the linear step-down search
pub const DEFAULT_LINEAR_START_QUALITY: u8 = 85;

/// Quality decrement per step of the linear search
pub const DEFAULT_LINEAR_STEP: u8 = 5;

/// Quality used by the in-process fallback encode
pub const DEFAULT_FALLBACK_QUALITY: u8 = 82;

// =============================================================================
// Converter defaults
// =============================================================================

/// Executable invoked for out-of-process conversion (ImageMagick 6 naming)
pub const DEFAULT_CONVERTER_PROGRAM: &str = "convert";

/// Quality of the JPEG produced by format normalization
pub const DEFAULT_NORMALIZE_QUALITY: u8 = 90;

/// Wall-clock limit for a single converter invocation in seconds
pub const DEFAULT_CONVERTER_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Watermark defaults
// =============================================================================

/// Rotation of the tiling grid in degrees (negative is counter-clockwise)
pub const DEFAULT_WATERMARK_ANGLE_DEGREES: f32 = -22.0;

/// Opacity of the faint first asset pass
pub const DEFAULT_WATERMARK_BASE_OPACITY: f32 = 0.08;

/// Opacity of the stronger second asset pass
pub const DEFAULT_WATERMARK_OVERLAY_OPACITY: f32 = 0.14;

/// Opacity of the text fallback tile
pub const DEFAULT_WATERMARK_TEXT_OPACITY: f32 = 0.20;

/// Asset tile width as a fraction of the shorter image side
pub const DEFAULT_WATERMARK_ASSET_SCALE: f32 = 0.25;

/// Gap between tiles as a fraction of the shorter image side
pub const DEFAULT_WATERMARK_MARGIN_FRACTION: f32 = 0.08;

/// Smallest logo tile width in pixels, whatever the image size
pub const MIN_WATERMARK_TILE_PX: u32 = 16;

/// Text fallback glyph height as a fraction of the shorter image side
pub const DEFAULT_WATERMARK_TEXT_SCALE: f32 = 0.045;

/// Brand string drawn by the text fallback
pub const DEFAULT_WATERMARK_TEXT: &str = "SAMPLE";

/// Bundled watermark asset location, relative to the working directory
pub const DEFAULT_WATERMARK_ASSET_PATH: &str = "assets/watermark.png";

// =============================================================================
// Logging defaults
// =============================================================================

/// Log level used when RUST_LOG is not set
pub const DEFAULT_LOG_LEVEL: &str = "info";
