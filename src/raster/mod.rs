//! Read-only raster sources.
//!
//! A [`RasterSource`] is shared by every chip worker, so implementations
//! must be `Send + Sync` and never mutate on read.

mod geotiff;
mod loader;
mod memory;
mod mosaic;
mod transform;
mod world_file;

pub use geotiff::{GeoTags, is_tiff, read_geotiff_transform};
pub use loader::{load_raster, load_rasters};
pub use memory::InMemoryRaster;
pub use mosaic::Mosaic;
pub use transform::GeoTransform;
pub use world_file::{find_world_file, parse_world_file, read_world_file};

use crate::error::{Error, Result};

/// A rectangular block of pixels inside a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// First row.
    pub row: usize,
    /// First column.
    pub col: usize,
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub cols: usize,
}

impl Region {
    /// Create a region.
    pub const fn new(row: usize, col: usize, rows: usize, cols: usize) -> Self {
        Self {
            row,
            col,
            rows,
            cols,
        }
    }

    /// Number of pixels in the region.
    pub const fn len(&self) -> usize {
        self.rows * self.cols
    }

    /// Whether the region holds no pixels.
    pub const fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    /// Fail unless the region lies inside a `height x width` raster.
    pub fn check_within(&self, height: usize, width: usize) -> Result<()> {
        if self.row + self.rows > height || self.col + self.cols > width {
            return Err(Error::RegionOutOfBounds {
                row: self.row,
                row_end: self.row + self.rows,
                col: self.col,
                col_end: self.col + self.cols,
                height,
                width,
            });
        }
        Ok(())
    }
}

/// An addressable multi-band pixel grid.
pub trait RasterSource: Send + Sync {
    /// Width in pixels.
    fn width(&self) -> usize;

    /// Height in pixels.
    fn height(&self) -> usize;

    /// Number of bands.
    fn band_count(&self) -> usize;

    /// Pixel-to-geographic transform, if the raster is georeferenced.
    fn geo_transform(&self) -> Option<GeoTransform>;

    /// Read one band of `region` into `out` (row-major, `region.cols` stride).
    ///
    /// `region` must lie inside the raster and `out` must hold exactly
    /// `region.len()` values.
    fn read_region(&self, region: Region, band: usize, out: &mut [u8]) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_bounds() {
        assert!(Region::new(0, 0, 10, 10).check_within(10, 10).is_ok());
        assert!(Region::new(5, 0, 6, 10).check_within(10, 10).is_err());
        assert!(Region::new(0, 0, 0, 3).is_empty());
        assert_eq!(Region::new(1, 2, 3, 4).len(), 12);
    }
}
