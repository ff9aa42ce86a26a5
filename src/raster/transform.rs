//! Affine pixel-to-geographic transforms.

use crate::geometry::Point;
use serde::{Deserialize, Serialize};

/// Affine transform in GDAL coefficient order.
///
/// `x = c[0] + col * c[1] + row * c[2]` and `y = c[3] + col * c[4] + row * c[5]`,
/// where `(col, row)` address pixel corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform(pub [f64; 6]);

impl GeoTransform {
    /// North-up transform with square or rectangular pixels.
    pub const fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self([origin_x, pixel_width, 0.0, origin_y, 0.0, -pixel_height])
    }

    /// Map a pixel-space point (`x` = column, `y` = row) to geographic coordinates.
    pub fn apply(&self, p: Point) -> Point {
        let c = &self.0;
        Point::new(
            c[0] + p.x * c[1] + p.y * c[2],
            c[3] + p.x * c[4] + p.y * c[5],
        )
    }

    /// Whether the transform has no rotation terms.
    pub fn is_axis_aligned(&self) -> bool {
        self.0[2] == 0.0 && self.0[4] == 0.0
    }

    /// Geographic x of the raster's left edge.
    pub const fn origin_x(&self) -> f64 {
        self.0[0]
    }

    /// Geographic y of the raster's top edge.
    pub const fn origin_y(&self) -> f64 {
        self.0[3]
    }

    /// Horizontal pixel size.
    pub const fn pixel_width(&self) -> f64 {
        self.0[1]
    }

    /// Vertical pixel size (negative for north-up rasters).
    pub const fn pixel_height(&self) -> f64 {
        self.0[5]
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_north_up_apply() {
        let t = GeoTransform::north_up(500_000.0, 4_000_000.0, 0.5, 0.5);
        let p = t.apply(Point::new(10.0, 20.0));
        assert_eq!(p, Point::new(500_005.0, 3_999_990.0));
        assert!(t.is_axis_aligned());
    }

    #[test]
    fn test_rotated_is_not_axis_aligned() {
        let t = GeoTransform([0.0, 1.0, 0.1, 0.0, 0.1, -1.0]);
        assert!(!t.is_axis_aligned());
        let p = t.apply(Point::new(1.0, 1.0));
        assert!((p.x - 1.1).abs() < 1e-12);
        assert!((p.y + 0.9).abs() < 1e-12);
    }
}
