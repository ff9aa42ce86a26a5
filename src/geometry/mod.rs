//! Planar geometry used by reprojection, merging and mask filtering.

mod bbox;
mod polygon;

pub use bbox::BoundingBox;
pub use polygon::{Point, Polygon};

use serde::{Deserialize, Serialize};

/// A geometry that cannot take part in area computations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum GeometryError {
    /// A coordinate is NaN or infinite.
    #[error("coordinate is not finite")]
    NonFinite,
    /// Zero or negative width or height.
    #[error("box has no area")]
    Degenerate,
    /// A polygon ring with fewer than three distinct vertices.
    #[error("polygon ring has fewer than 3 vertices")]
    TooFewVertices,
}
