//! GeoJSON output format writer.

use crate::error::Result;
use crate::output::{Detection, OutputWriter, write_json};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A GeoJSON FeatureCollection of detections.
#[derive(Debug, Serialize, Deserialize)]
pub struct FeatureCollection {
    /// Always `FeatureCollection`.
    #[serde(rename = "type")]
    pub kind: String,
    /// One feature per detection.
    pub features: Vec<Feature>,
}

/// One detection as a GeoJSON feature.
#[derive(Debug, Serialize, Deserialize)]
pub struct Feature {
    /// Always `Feature`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Footprint polygon.
    pub geometry: PolygonGeometry,
    /// Detection attributes.
    pub properties: FeatureProperties,
}

/// GeoJSON Polygon geometry.
#[derive(Debug, Serialize, Deserialize)]
pub struct PolygonGeometry {
    /// Always `Polygon`.
    #[serde(rename = "type")]
    pub kind: String,
    /// A single closed exterior ring.
    pub coordinates: Vec<Vec<[f64; 2]>>,
}

/// Attributes attached to each feature.
#[derive(Debug, Serialize, Deserialize)]
pub struct FeatureProperties {
    /// Class identifier.
    pub class_id: u32,
    /// Class name.
    pub class_name: String,
    /// Detector score.
    pub score: f32,
    /// Number of raw detections merged into this one.
    pub merged_count: usize,
    /// Box in raster pixels as `[xmin, ymin, xmax, ymax]`.
    pub pixel_bbox: [f64; 4],
}

impl From<&Detection> for Feature {
    fn from(d: &Detection) -> Self {
        let b = &d.pixel_bbox;
        Self {
            kind: "Feature".to_string(),
            geometry: PolygonGeometry {
                kind: "Polygon".to_string(),
                coordinates: vec![d.polygon.closed_positions()],
            },
            properties: FeatureProperties {
                class_id: d.class_id,
                class_name: d.class_name.clone(),
                score: d.score,
                merged_count: d.merged_count,
                pixel_bbox: [b.xmin, b.ymin, b.xmax, b.ymax],
            },
        }
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self {
            kind: "FeatureCollection".to_string(),
            features: iter.into_iter().collect(),
        }
    }
}

/// Writer collecting detections into one FeatureCollection.
pub struct GeoJsonWriter {
    features: Vec<Feature>,
    output_path: PathBuf,
}

impl GeoJsonWriter {
    /// Create a writer for `output_path`. Nothing is written until finalize.
    pub fn new(output_path: &Path) -> Self {
        Self {
            features: Vec::new(),
            output_path: output_path.to_path_buf(),
        }
    }
}

impl OutputWriter for GeoJsonWriter {
    fn write_header(&mut self) -> Result<()> {
        // Written at finalize
        Ok(())
    }

    fn write_detection(&mut self, detection: &Detection) -> Result<()> {
        self.features.push(Feature::from(detection));
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        let collection: FeatureCollection = std::mem::take(&mut self.features).into_iter().collect();
        write_json(&self.output_path, &collection)
    }
}
