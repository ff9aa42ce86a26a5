//! Raster held fully in memory.

use super::{GeoTransform, RasterSource, Region};
use crate::error::{Error, Result};

/// Band-interleaved-by-pixel 8-bit raster.
#[derive(Debug, Clone)]
pub struct InMemoryRaster {
    width: usize,
    height: usize,
    bands: usize,
    data: Vec<u8>,
    transform: Option<GeoTransform>,
}

impl InMemoryRaster {
    /// Wrap interleaved pixel data.
    ///
    /// `data` must hold `width * height * bands` values.
    pub fn new(width: usize, height: usize, bands: usize, data: Vec<u8>) -> Result<Self> {
        if bands == 0 {
            return Err(Error::BandOutOfRange {
                band: 0,
                band_count: 0,
            });
        }
        let expected = width * height * bands;
        if data.len() != expected {
            return Err(Error::MosaicMismatch {
                message: format!(
                    "pixel buffer holds {} values, expected {expected} for {width}x{height}x{bands}",
                    data.len()
                ),
            });
        }
        Ok(Self {
            width,
            height,
            bands,
            data,
            transform: None,
        })
    }

    /// Raster of the given shape filled by `f(row, col, band)`.
    pub fn from_fn(
        width: usize,
        height: usize,
        bands: usize,
        f: impl Fn(usize, usize, usize) -> u8,
    ) -> Result<Self> {
        let mut data = Vec::with_capacity(width * height * bands);
        for row in 0..height {
            for col in 0..width {
                for band in 0..bands {
                    data.push(f(row, col, band));
                }
            }
        }
        Self::new(width, height, bands, data)
    }

    /// Attach a georeferencing transform.
    #[must_use]
    pub fn with_transform(mut self, transform: Option<GeoTransform>) -> Self {
        self.transform = transform;
        self
    }

    /// Value at `(row, col, band)`.
    pub fn pixel(&self, row: usize, col: usize, band: usize) -> u8 {
        self.data[(row * self.width + col) * self.bands + band]
    }
}

impl RasterSource for InMemoryRaster {
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
        self.transform
    }

    fn read_region(&self, region: Region, band: usize, out: &mut [u8]) -> Result<()> {
        if band >= self.bands {
            return Err(Error::BandOutOfRange {
                band,
                band_count: self.bands,
            });
        }
        region.check_within(self.height, self.width)?;

        for (r, out_row) in out.chunks_exact_mut(region.cols).take(region.rows).enumerate() {
            let row = region.row + r;
            for (c, value) in out_row.iter_mut().enumerate() {
                *value = self.pixel(row, region.col + c, band);
            }
        }
        Ok(())
    }
}
