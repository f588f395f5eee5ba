//! Tiling geometry for the diagonal watermark.
//!
//! Tiles sit on a brick grid: rows are `step_y` apart, tiles within a row are
//! `step_x` apart, and every odd row is shifted by half a step so no column
//! of marks lines up. The grid is rotated about the image center by
//! `angle_degrees`; each row is clipped to a padded image rectangle before any
//! center is produced, and placements are culled to tiles that touch the image.
//!
//! # Example
//!
//! ```ignore
//! let plan = WatermarkPlan::new(1800, 1350, 338, 120, -22.0, 0.08, vec![0.08, 0.14]);
//! for pos in plan.placements(1800, 1350, sprite.width(), sprite.height()) {
//!     // blend sprite at pos
//! }
//! ```

/// Top-left corner of one tile in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementPosition {
    pub x: i32,
    pub y: i32,
}

impl PlacementPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Tiling parameters derived from image dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkPlan {
    /// Grid rotation about the image center, negative is counter-clockwise
    pub angle_degrees: f32,
    /// Unrotated tile size
    pub tile_width: u32,
    pub tile_height: u32,
    /// Distance between neighbouring tile centers along the rotated axes
    pub step_x: u32,
    pub step_y: u32,
    /// Horizontal shift applied to every odd row
    pub row_offset: u32,
    /// Opacity of each compositing pass, applied in order
    pub passes: Vec<f32>,
}

impl WatermarkPlan {
    /// Plan a grid of `tile_width` x `tile_height` tiles with a gap of
    /// `margin_fraction` of the shorter image side.
    pub fn new(
        image_width: u32,
        image_height: u32,
        tile_width: u32,
        tile_height: u32,
        angle_degrees: f32,
        margin_fraction: f32,
        passes: Vec<f32>,
    ) -> Self {
        let shorter = image_width.min(image_height).max(1);
        let margin = (shorter as f32 * margin_fraction).round().max(1.0) as u32;
        let tile_width = tile_width.max(1);
        let tile_height = tile_height.max(1);
        let step_x = tile_width + margin;

        Self {
            angle_degrees,
            tile_width,
            tile_height,
            step_x,
            step_y: tile_height + margin,
            row_offset: step_x / 2,
            passes,
        }
    }

    /// Tile centers that can reach the image, row by row.
    ///
    /// Only grid cells whose center lies inside the image rectangle grown by
    /// one step diagonal plus half a tile diagonal are produced, so the count
    /// tracks the image area rather than the whole rotated canvas.
    pub fn tile_centers(&self, image_width: u32, image_height: u32) -> Vec<(f64, f64)> {
        let width = image_width as f64;
        let height = image_height as f64;

        let step_x = self.step_x as f64;
        let step_y = self.step_y as f64;
        let pad = step_x.hypot(step_y) + (self.tile_width as f64).hypot(self.tile_height as f64) / 2.0;
        let (min_x, max_x) = (-pad, width + pad);
        let (min_y, max_y) = (-pad, height + pad);

        // Rows farther from the center than the padded half-diagonal miss the rectangle
        let reach = (width + 2.0 * pad).hypot(height + 2.0 * pad) / 2.0;
        let rows = (reach / step_y).ceil() as i64;

        let (cx, cy) = (width / 2.0, height / 2.0);
        let theta = (self.angle_degrees as f64).to_radians();
        let (sin, cos) = theta.sin_cos();

        let mut centers = Vec::new();
        for row in -rows..=rows {
            let shift = if row.rem_euclid(2) == 1 {
                self.row_offset as f64
            } else {
                0.0
            };
            let gy = row as f64 * step_y;
            let x0 = cx - gy * sin;
            let y0 = cy + gy * cos;

            // Along the row a center is (x0 + gx*cos, y0 + gx*sin)
            let Some((lo_x, hi_x)) = slab(x0, cos, min_x, max_x) else {
                continue;
            };
            let Some((lo_y, hi_y)) = slab(y0, sin, min_y, max_y) else {
                continue;
            };
            let (lo, hi) = (lo_x.max(lo_y), hi_x.min(hi_y));
            if lo > hi {
                continue;
            }

            let first = ((lo - shift) / step_x).ceil() as i64;
            let last = ((hi - shift) / step_x).floor() as i64;
            for col in first..=last {
                let gx = col as f64 * step_x + shift;
                centers.push((x0 + gx * cos, y0 + gx * sin));
            }
        }
        centers
    }

    /// Top-left positions for a `sprite_width` x `sprite_height` sprite
    /// centered on each tile, keeping only those that overlap the image.
    pub fn placements(
        &self,
        image_width: u32,
        image_height: u32,
        sprite_width: u32,
        sprite_height: u32,
    ) -> Vec<PlacementPosition> {
        let half_w = sprite_width as f64 / 2.0;
        let half_h = sprite_height as f64 / 2.0;

        self.tile_centers(image_width, image_height)
            .into_iter()
            .map(|(x, y)| {
                PlacementPosition::new((x - half_w).round() as i32, (y - half_h).round() as i32)
            })
            .filter(|pos| {
                is_visible(
                    *pos,
                    image_width,
                    image_height,
                    sprite_width,
                    sprite_height,
                )
            })
            .collect()
    }
}

/// Parameter range `t` for which `origin + t * dir` stays within `[min, max]`.
fn slab(origin: f64, dir: f64, min: f64, max: f64) -> Option<(f64, f64)> {
    if dir.abs() < 1e-12 {
        return (min..=max).contains(&origin).then_some((f64::NEG_INFINITY, f64::INFINITY));
    }
    let a = (min - origin) / dir;
    let b = (max - origin) / dir;
    Some((a.min(b), a.max(b)))
}

/// Check whether a placed sprite overlaps the image at all.
pub fn is_visible(
    pos: PlacementPosition,
    image_width: u32,
    image_height: u32,
    sprite_width: u32,
    sprite_height: u32,
) -> bool {
    pos.x < image_width as i32
        && pos.y < image_height as i32
        && pos.x + sprite_width as i32 > 0
        && pos.y + sprite_height as i32 > 0
}
