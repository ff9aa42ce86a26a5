//! Chip-local to raster-global coordinate mapping.

use super::MergedDetection;
use crate::chip::ChipWindow;
use crate::geometry::{BoundingBox, Polygon};
use crate::inference::RawDetection;
use crate::raster::GeoTransform;
use serde::{Deserialize, Serialize};

/// A detection in raster pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalDetection {
    /// Stable index across the run (chip order, then detector order).
    pub id: usize,
    /// Window the detection came from.
    pub chip: usize,
    /// Box in raster pixels.
    pub bbox: BoundingBox,
    /// Class identifier.
    pub class_id: u32,
    /// Detector score.
    pub score: f32,
}

/// A merged detection with its outline in the output frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Footprint {
    /// The detection.
    pub detection: MergedDetection,
    /// Outline, geographic if the raster is georeferenced, else pixel.
    pub polygon: Polygon,
}

impl Footprint {
    /// Pair `detection` with its outline under `transform`.
    pub fn new(detection: MergedDetection, transform: Option<GeoTransform>) -> Self {
        let polygon = footprint(&detection.bbox, transform);
        Self { detection, polygon }
    }
}

/// Move a chip-local detection into the raster frame.
#[allow(clippy::cast_precision_loss)]
pub fn reproject(raw: &RawDetection, window: &ChipWindow, id: usize) -> GlobalDetection {
    GlobalDetection {
        id,
        chip: window.id,
        bbox: raw
            .bbox
            .translate(window.col_offset as f64, window.row_offset as f64),
        class_id: raw.class_id,
        score: raw.score,
    }
}

/// Outline of a raster-frame box, mapped through `transform` when present.
pub fn footprint(bbox: &BoundingBox, transform: Option<GeoTransform>) -> Polygon {
    let ring = bbox.to_polygon();
    match transform {
        Some(t) => Polygon::new(ring.points().iter().map(|&p| t.apply(p)).collect()),
        None => ring,
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    #[test]
    fn test_reproject_translates_exactly() {
        let window = ChipWindow {
            id: 5,
            row_offset: 250,
            col_offset: 500,
            width: 300,
            height: 300,
        };
        let raw = RawDetection {
            bbox: BoundingBox::new(10.5, 20.25, 30.0, 40.0),
            class_id: 3,
            score: 0.8,
        };
        let global = reproject(&raw, &window, 17);
        assert_eq!(global.id, 17);
        assert_eq!(global.chip, 5);
        assert_eq!(global.bbox, BoundingBox::new(510.5, 270.25, 530.0, 290.0));
        assert_eq!(global.class_id, 3);
        assert_eq!(global.score, 0.8);
    }

    #[test]
    fn test_footprint_without_transform_is_pixel_box() {
        let bbox = BoundingBox::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(footprint(&bbox, None), bbox.to_polygon());
    }

    #[test]
    fn test_footprint_through_north_up_transform() {
        let transform = GeoTransform::north_up(1000.0, 2000.0, 0.5, 0.5);
        let polygon = footprint(&BoundingBox::new(0.0, 0.0, 10.0, 20.0), Some(transform));
        let points = polygon.points();
        assert_eq!(points.len(), 4);
        assert_eq!(points[0], Point::new(1000.0, 2000.0));
        assert_eq!(points[2], Point::new(1005.0, 1990.0));
    }
}
