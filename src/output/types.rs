//! Output data types.

use crate::aggregate::Footprint;
use crate::geometry::{BoundingBox, Polygon};
use crate::inference::LabelMap;

/// A final detection ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Class identifier.
    pub class_id: u32,
    /// Class name from the label map.
    pub class_name: String,
    /// Detector score of the kept detection.
    pub score: f32,
    /// Number of raw detections merged into this one.
    pub merged_count: usize,
    /// Box in raster pixel coordinates.
    pub pixel_bbox: BoundingBox,
    /// Outline in the output frame.
    pub polygon: Polygon,
}

impl Detection {
    /// Build from a footprint, naming the class from `label_map`.
    pub fn from_footprint(footprint: &Footprint, label_map: &LabelMap) -> Self {
        let merged = &footprint.detection;
        Self {
            class_id: merged.class_id,
            class_name: label_map
                .name(merged.class_id)
                .map_or_else(|| merged.class_id.to_string(), str::to_string),
            score: merged.score,
            merged_count: merged.merged_count(),
            pixel_bbox: merged.bbox,
            polygon: footprint.polygon.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::aggregate::MergedDetection;

    #[test]
    fn test_from_footprint_names_class() {
        let bbox = BoundingBox::new(0.0, 0.0, 4.0, 4.0);
        let footprint = Footprint {
            detection: MergedDetection {
                class_id: 2,
                score: 0.8,
                bbox,
                seed: 5,
                chip: 1,
                members: vec![3, 5],
            },
            polygon: bbox.to_polygon(),
        };
        let labels = LabelMap::from_pairs([(2, "truck")]);

        let detection = Detection::from_footprint(&footprint, &labels);
        assert_eq!(detection.class_name, "truck");
        assert_eq!(detection.merged_count, 2);
        assert_eq!(detection.score, 0.8);

        let unnamed = Detection::from_footprint(&footprint, &LabelMap::default());
        assert_eq!(unnamed.class_name, "2");
    }
}
