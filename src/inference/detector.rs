//! Detector capability.

use super::LabelMap;
use crate::chip::ChipImage;
use crate::error::Result;
use crate::geometry::BoundingBox;
use serde::{Deserialize, Serialize};

/// A detection in chip-local pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    /// Box in chip pixels (`x` = column, `y` = row).
    pub bbox: BoundingBox,
    /// Class identifier from the label map.
    pub class_id: u32,
    /// Detector score.
    pub score: f32,
}

/// Scores a chip image.
///
/// Implementations are shared across worker threads. Every returned
/// detection has `score >= score_thresh`; order is unspecified.
pub trait Detector: Send + Sync {
    /// Detect objects in `chip`.
    fn detect(
        &self,
        chip: &ChipImage,
        label_map: &LabelMap,
        score_thresh: f32,
    ) -> Result<Vec<RawDetection>>;
}
