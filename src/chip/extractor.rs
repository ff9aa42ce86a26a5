//! Chip image extraction.

use super::ChipWindow;
use crate::constants::{CHIP_BANDS, DEFAULT_CHANNEL_ORDER};
use crate::error::{Error, Result};
use crate::raster::{RasterSource, Region};
use image::ImageError;
use image::error::{ParameterError, ParameterErrorKind};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Raster bands feeding the three chip channels, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelOrder(pub [usize; CHIP_BANDS]);

impl Default for ChannelOrder {
    fn default() -> Self {
        Self(DEFAULT_CHANNEL_ORDER)
    }
}

impl ChannelOrder {
    /// Build from a slice, which must hold exactly three band indices.
    pub fn from_slice(bands: &[usize]) -> Result<Self> {
        let order: [usize; CHIP_BANDS] =
            bands.try_into().map_err(|_| Error::InvalidChannelOrder {
                order: bands.to_vec(),
                reason: format!("expected {CHIP_BANDS} band indices, got {}", bands.len()),
            })?;
        Ok(Self(order))
    }

    /// Fail unless every selected band exists in a raster with `band_count` bands.
    pub fn validate(&self, band_count: usize) -> Result<()> {
        if let Some(&band) = self.0.iter().find(|&&b| b >= band_count) {
            return Err(Error::InvalidChannelOrder {
                order: self.0.to_vec(),
                reason: format!("band {band} does not exist, raster has {band_count} band(s)"),
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for ChannelOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.0[0], self.0[1], self.0[2])
    }
}

/// Pixels of one chip window, three interleaved 8-bit channels.
#[derive(Debug, Clone)]
pub struct ChipImage {
    /// The window this chip was read from.
    pub window: ChipWindow,
    /// `height * width * 3` values, row-major.
    pub pixels: Vec<u8>,
}

impl ChipImage {
    /// Chip width in pixels.
    pub const fn width(&self) -> usize {
        self.window.width
    }

    /// Chip height in pixels.
    pub const fn height(&self) -> usize {
        self.window.height
    }

    /// Value of `channel` at chip-local `(row, col)`.
    pub fn pixel(&self, row: usize, col: usize, channel: usize) -> u8 {
        self.pixels[(row * self.window.width + col) * CHIP_BANDS + channel]
    }

    /// Write the chip as an RGB PNG.
    pub fn save_png(&self, path: &Path) -> Result<()> {
        #[allow(clippy::cast_possible_truncation)]
        let (width, height) = (self.window.width as u32, self.window.height as u32);
        let buffer = image::RgbImage::from_raw(width, height, self.pixels.clone()).ok_or_else(|| {
            Error::ChipWrite {
                path: path.to_path_buf(),
                source: ImageError::Parameter(ParameterError::from_kind(
                    ParameterErrorKind::DimensionMismatch,
                )),
            }
        })?;
        buffer.save(path).map_err(|e| Error::ChipWrite {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Read `window` from `raster`, selecting bands by `order`.
///
/// Pixels of the window outside the raster are zero.
pub fn extract_chip(
    raster: &dyn RasterSource,
    window: &ChipWindow,
    order: ChannelOrder,
) -> Result<ChipImage> {
    let mut pixels = vec![0u8; window.width * window.height * CHIP_BANDS];

    let rows = raster
        .height()
        .saturating_sub(window.row_offset)
        .min(window.height);
    let cols = raster
        .width()
        .saturating_sub(window.col_offset)
        .min(window.width);
    let region = Region::new(window.row_offset, window.col_offset, rows, cols);

    if !region.is_empty() {
        let mut band_buf = vec![0u8; region.len()];
        for (channel, &band) in order.0.iter().enumerate() {
            raster.read_region(region, band, &mut band_buf)?;
            for (r, src_row) in band_buf.chunks_exact(cols).enumerate() {
                let dst_row = r * window.width * CHIP_BANDS;
                for (c, &value) in src_row.iter().enumerate() {
                    pixels[dst_row + c * CHIP_BANDS + channel] = value;
                }
            }
        }
    }

    Ok(ChipImage {
        window: *window,
        pixels,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::cast_possible_truncation)]
mod tests {
    use super::*;
    use crate::raster::InMemoryRaster;

    fn window(row_offset: usize, col_offset: usize, size: usize) -> ChipWindow {
        ChipWindow {
            id: 0,
            row_offset,
            col_offset,
            width: size,
            height: size,
        }
    }

    #[test]
    fn test_extract_reorders_bands() {
        let raster = InMemoryRaster::from_fn(8, 8, 4, |r, c, b| (b * 50 + r + c) as u8).unwrap();
        let chip = extract_chip(&raster, &window(2, 3, 4), ChannelOrder([3, 0, 1])).unwrap();
        assert_eq!(chip.pixel(0, 0, 0), 150 + 5);
        assert_eq!(chip.pixel(0, 0, 1), 5);
        assert_eq!(chip.pixel(1, 2, 2), 50 + 3 + 5);
    }

    #[test]
    fn test_extract_pads_past_edge_with_zero() {
        let raster = InMemoryRaster::from_fn(10, 10, 3, |_, _, _| 9).unwrap();
        let chip = extract_chip(&raster, &window(8, 8, 4), ChannelOrder::default()).unwrap();
        assert_eq!(chip.pixels.len(), 4 * 4 * 3);
        assert_eq!(chip.pixel(1, 1, 0), 9);
        assert_eq!(chip.pixel(2, 0, 0), 0);
        assert_eq!(chip.pixel(0, 3, 2), 0);
    }

    #[test]
    fn test_channel_order_validation() {
        assert!(ChannelOrder([0, 1, 2]).validate(3).is_ok());
        assert!(ChannelOrder([0, 0, 0]).validate(1).is_ok());
        assert!(matches!(
            ChannelOrder([0, 1, 3]).validate(3),
            Err(Error::InvalidChannelOrder { .. })
        ));
        assert!(ChannelOrder::from_slice(&[0, 1]).is_err());
        assert_eq!(ChannelOrder::from_slice(&[2, 1, 0]).unwrap(), ChannelOrder([2, 1, 0]));
    }

    #[test]
    fn test_save_png_round_trips_dimensions() {
        let dir = tempfile::TempDir::new().unwrap();
        let raster = InMemoryRaster::from_fn(6, 6, 3, |r, _, _| r as u8).unwrap();
        let chip = extract_chip(&raster, &window(0, 0, 4), ChannelOrder::default()).unwrap();
        let path = dir.path().join("chip.png");
        chip.save_png(&path).unwrap();
        let decoded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (4, 4));
        assert_eq!(decoded.get_pixel(0, 3)[0], 3);
    }
}
