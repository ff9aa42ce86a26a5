//! Virtual raster assembled from several georeferenced images.

use super::{GeoTransform, InMemoryRaster, RasterSource, Region};
use crate::constants::PIXEL_SIZE_TOLERANCE;
use crate::error::{Error, Result};
use tracing::debug;

/// A source image placed on the mosaic grid.
#[derive(Debug)]
struct Placed {
    raster: InMemoryRaster,
    row_offset: usize,
    col_offset: usize,
}

/// Several north-up rasters with equal pixel size on one common grid.
///
/// Pixels not covered by any source read as zero. Where sources overlap,
/// the later source wins.
#[derive(Debug)]
pub struct Mosaic {
    sources: Vec<Placed>,
    width: usize,
    height: usize,
    bands: usize,
    transform: GeoTransform,
}

impl Mosaic {
    /// Place `rasters` on a common grid using their transforms.
    pub fn build(rasters: Vec<InMemoryRaster>) -> Result<Self> {
        let Some(first) = rasters.first() else {
            return Err(Error::NoInputImages);
        };
        let bands = first.band_count();
        let reference = first.geo_transform().ok_or_else(|| Error::MosaicMismatch {
            message: "images without georeferencing cannot be combined".to_string(),
        })?;

        let mut left = f64::INFINITY;
        let mut top = f64::NEG_INFINITY;
        let mut right = f64::NEG_INFINITY;
        let mut bottom = f64::INFINITY;

        for (index, raster) in rasters.iter().enumerate() {
            let t = raster.geo_transform().ok_or_else(|| Error::MosaicMismatch {
                message: format!("image {index} has no georeferencing"),
            })?;
            check_compatible(index, &t, &reference)?;
            if raster.band_count() != bands {
                return Err(Error::MosaicMismatch {
                    message: format!(
                        "image {index} has {} band(s), expected {bands}",
                        raster.band_count()
                    ),
                });
            }
            #[allow(clippy::cast_precision_loss)]
            let (w, h) = (raster.width() as f64, raster.height() as f64);
            left = left.min(t.origin_x());
            top = top.max(t.origin_y());
            right = right.max(t.pixel_width().mul_add(w, t.origin_x()));
            bottom = bottom.min(t.pixel_height().mul_add(h, t.origin_y()));
        }

        let pixel_w = reference.pixel_width();
        let pixel_h = reference.pixel_height();
        let width = grid_units(right - left, pixel_w);
        let height = grid_units(bottom - top, pixel_h);
        let transform = GeoTransform([left, pixel_w, 0.0, top, 0.0, pixel_h]);

        let sources = rasters
            .into_iter()
            .map(|raster| {
                let t = raster.geo_transform().unwrap_or(reference);
                let col_offset = grid_units(t.origin_x() - left, pixel_w);
                let row_offset = grid_units(t.origin_y() - top, pixel_h);
                debug!(
                    "Mosaic source {}x{} placed at row {}, col {}",
                    raster.width(),
                    raster.height(),
                    row_offset,
                    col_offset
                );
                Placed {
                    raster,
                    row_offset,
                    col_offset,
                }
            })
            .collect();

        Ok(Self {
            sources,
            width,
            height,
            bands,
            transform,
        })
    }

    /// Number of placed source images.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }
}

/// Whole pixels spanned by `distance` at `pixel_size`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn grid_units(distance: f64, pixel_size: f64) -> usize {
    (distance / pixel_size).round().max(0.0) as usize
}

fn check_compatible(index: usize, t: &GeoTransform, reference: &GeoTransform) -> Result<()> {
    if !t.is_axis_aligned() {
        return Err(Error::MosaicMismatch {
            message: format!("image {index} is rotated"),
        });
    }
    if t.pixel_width() <= 0.0 || t.pixel_height() >= 0.0 {
        return Err(Error::MosaicMismatch {
            message: format!("image {index} is not north-up"),
        });
    }
    let close = |a: f64, b: f64| (a - b).abs() <= PIXEL_SIZE_TOLERANCE * b.abs().max(1.0);
    if !close(t.pixel_width(), reference.pixel_width())
        || !close(t.pixel_height(), reference.pixel_height())
    {
        return Err(Error::MosaicMismatch {
            message: format!(
                "image {index} has pixel size {}x{}, expected {}x{}",
                t.pixel_width(),
                t.pixel_height(),
                reference.pixel_width(),
                reference.pixel_height()
            ),
        });
    }
    Ok(())
}

impl RasterSource for Mosaic {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn band_count(&self) -> usize {
        self.bands
    }

    fn geo_transform(&self) -> Option<GeoTransform> {
        Some(self.transform)
    }

    fn read_region(&self, region: Region, band: usize, out: &mut [u8]) -> Result<()> {
        if band >= self.bands {
            return Err(Error::BandOutOfRange {
                band,
                band_count: self.bands,
            });
        }
        region.check_within(self.height, self.width)?;
        out.fill(0);

        let mut scratch = Vec::new();
        for placed in &self.sources {
            let row_start = region.row.max(placed.row_offset);
            let col_start = region.col.max(placed.col_offset);
            let row_end = (region.row + region.rows).min(placed.row_offset + placed.raster.height());
            let col_end = (region.col + region.cols).min(placed.col_offset + placed.raster.width());
            if row_start >= row_end || col_start >= col_end {
                continue;
            }

            let local = Region::new(
                row_start - placed.row_offset,
                col_start - placed.col_offset,
                row_end - row_start,
                col_end - col_start,
            );
            scratch.resize(local.len(), 0);
            placed.raster.read_region(local, band, &mut scratch)?;

            for (r, src_row) in scratch.chunks_exact(local.cols).enumerate() {
                let dst_start = (row_start - region.row + r) * region.cols + (col_start - region.col);
                out[dst_start..dst_start + local.cols].copy_from_slice(src_row);
            }
        }
        Ok(())
    }
}
