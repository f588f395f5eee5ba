//! Process-wide watermark asset
//!
//! The brand logo is decoded once at startup and shared read-only by every
//! request. A missing or unreadable asset is logged and the pipeline falls
//! back to the text watermark.

use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use super::WatermarkError;

static GLOBAL_ASSET: OnceLock<Option<Arc<WatermarkAsset>>> = OnceLock::new();

/// Decoded logo raster
#[derive(Debug, Clone)]
pub struct WatermarkAsset {
    image: RgbaImage,
    source: PathBuf,
}

impl WatermarkAsset {
    /// Read and decode the asset at `path`
    pub fn load(path: &Path) -> Result<Self, WatermarkError> {
        let asset_load = |message: String| WatermarkError::AssetLoad {
            path: path.display().to_string(),
            message,
        };

        let data = std::fs::read(path).map_err(|e| asset_load(e.to_string()))?;
        let image = image::load_from_memory(&data)
            .map_err(|e| asset_load(e.to_string()))?
            .into_rgba8();

        if image.width() == 0 || image.height() == 0 {
            return Err(asset_load("image has no pixels".to_string()));
        }

        Ok(Self {
            image,
            source: path.to_path_buf(),
        })
    }

    /// Wrap an in-memory raster
    pub fn from_image(image: RgbaImage) -> Self {
        Self {
            image,
            source: PathBuf::from("<memory>"),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Load an optional asset, logging instead of failing.
pub fn load_optional(path: Option<&Path>) -> Option<Arc<WatermarkAsset>> {
    let path = path?;
    match WatermarkAsset::load(path) {
        Ok(asset) => {
            let (width, height) = asset.dimensions();
            tracing::info!(
                path = %path.display(),
                width,
                height,
                "Loaded watermark asset"
            );
            Some(Arc::new(asset))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Watermark asset unavailable, using text watermark");
            None
        }
    }
}

/// Initialize the shared asset on first call; later calls return the same value.
pub fn init_global(path: Option<&Path>) -> Option<Arc<WatermarkAsset>> {
    GLOBAL_ASSET.get_or_init(|| load_optional(path)).clone()
}

/// The shared asset, if [`init_global`] has run and found one
pub fn global() -> Option<Arc<WatermarkAsset>> {
    GLOBAL_ASSET.get().and_then(|asset| asset.clone())
}
