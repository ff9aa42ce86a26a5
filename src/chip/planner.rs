//! Overlapping chip grid over a raster extent.

use crate::constants::DEFAULT_OVERLAP_DIVISOR;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// One chip window in raster pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipWindow {
    /// Position of the window in grid order.
    pub id: usize,
    /// First row covered.
    pub row_offset: usize,
    /// First column covered.
    pub col_offset: usize,
    /// Width in pixels (may extend past the raster edge).
    pub width: usize,
    /// Height in pixels (may extend past the raster edge).
    pub height: usize,
}

impl ChipWindow {
    /// Whether two windows share at least one pixel.
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.row_offset < other.row_offset + other.height
            && other.row_offset < self.row_offset + self.height
            && self.col_offset < other.col_offset + other.width
            && other.col_offset < self.col_offset + self.width
    }
}

/// Chip windows covering a raster, in row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipGrid {
    /// Raster height in pixels.
    pub raster_rows: usize,
    /// Raster width in pixels.
    pub raster_cols: usize,
    /// Chip edge length.
    pub chip_size: usize,
    /// Overlap between adjacent chips.
    pub overlap: usize,
    /// Offset between consecutive chips along an axis.
    pub stride: usize,
    /// Number of chip rows.
    pub grid_rows: usize,
    /// Number of chip columns.
    pub grid_cols: usize,
    /// The windows.
    pub windows: Vec<ChipWindow>,
}

impl ChipGrid {
    /// Number of windows.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Whether the grid has no windows.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Window by id.
    pub fn get(&self, id: usize) -> Option<&ChipWindow> {
        self.windows.get(id)
    }
}

/// Overlap used when none is configured.
pub const fn default_overlap(chip_size: u32) -> u32 {
    chip_size / DEFAULT_OVERLAP_DIVISOR
}

/// Offsets `0, stride, 2 * stride, ...` strictly below `extent`.
fn axis_offsets(extent: usize, stride: usize) -> Vec<usize> {
    (0..extent).step_by(stride).collect()
}

/// Plan the chip grid for a `rows x cols` raster.
///
/// Consecutive windows along each axis start `chip_size - overlap` apart.
/// The last window on each axis keeps the full chip size and may extend
/// past the raster, so every pixel is covered.
pub fn plan_chips(rows: usize, cols: usize, chip_size: u32, overlap: u32) -> Result<ChipGrid> {
    if chip_size == 0 || chip_size <= overlap {
        return Err(Error::InvalidChipSize { chip_size, overlap });
    }
    let size = chip_size as usize;
    let stride = (chip_size - overlap) as usize;

    let row_offsets = axis_offsets(rows, stride);
    let col_offsets = axis_offsets(cols, stride);

    let windows = row_offsets
        .iter()
        .flat_map(|&row_offset| {
            col_offsets.iter().map(move |&col_offset| (row_offset, col_offset))
        })
        .enumerate()
        .map(|(id, (row_offset, col_offset))| ChipWindow {
            id,
            row_offset,
            col_offset,
            width: size,
            height: size,
        })
        .collect();

    Ok(ChipGrid {
        raster_rows: rows,
        raster_cols: cols,
        chip_size: size,
        overlap: overlap as usize,
        stride,
        grid_rows: row_offsets.len(),
        grid_cols: col_offsets.len(),
        windows,
    })
}
