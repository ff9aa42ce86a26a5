//! Mask geometry and detection filtering.

use super::Footprint;
use crate::error::{Error, Result};
use crate::geometry::{GeometryError, Polygon};
use rayon::prelude::*;
use rstar::{AABB, RTree, RTreeObject};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

/// A mask polygon with optional holes.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskPolygon {
    /// Outer ring.
    pub exterior: Polygon,
    /// Inner rings; their interiors are not part of the polygon.
    pub holes: Vec<Polygon>,
}

impl MaskPolygon {
    /// Polygon without holes.
    pub const fn new(exterior: Polygon) -> Self {
        Self {
            exterior,
            holes: Vec::new(),
        }
    }

    /// Whether `other` shares at least one point with this polygon.
    ///
    /// Boundary contact counts. A ring lying wholly inside a hole does not
    /// intersect.
    pub fn intersects(&self, other: &Polygon) -> bool {
        if !self.exterior.intersects(other) {
            return false;
        }
        let Some(&sample) = other.points().first() else {
            return false;
        };
        for hole in &self.holes {
            if hole.edges_intersect(other) {
                return true;
            }
            if hole.contains_point(sample) {
                return false;
            }
        }
        true
    }

    fn from_rings(rings: &[Vec<Vec<f64>>]) -> std::result::Result<Option<Self>, GeometryError> {
        let Some((exterior, holes)) = rings.split_first() else {
            return Ok(None);
        };
        Ok(Some(Self {
            exterior: Polygon::from_positions(exterior)?,
            holes: holes
                .iter()
                .map(|ring| Polygon::from_positions(ring))
                .collect::<std::result::Result<_, _>>()?,
        }))
    }
}

struct IndexedPolygon {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedPolygon {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Read-only mask: the union of its polygons.
pub struct MaskGeometry {
    polygons: Vec<MaskPolygon>,
    index: RTree<IndexedPolygon>,
}

impl std::fmt::Debug for MaskGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaskGeometry")
            .field("polygons", &self.polygons.len())
            .finish()
    }
}

fn envelope_of(polygon: &Polygon) -> AABB<[f64; 2]> {
    let (lo, hi) = polygon.envelope();
    AABB::from_corners(lo, hi)
}

impl MaskGeometry {
    /// Index `polygons` for intersection queries.
    pub fn new(polygons: Vec<MaskPolygon>) -> Self {
        let index = RTree::bulk_load(
            polygons
                .iter()
                .enumerate()
                .map(|(index, p)| IndexedPolygon {
                    index,
                    envelope: envelope_of(&p.exterior),
                })
                .collect(),
        );
        Self { polygons, index }
    }

    /// Load a GeoJSON mask.
    ///
    /// Accepts a FeatureCollection, a Feature, or a bare geometry. Polygon,
    /// MultiPolygon and GeometryCollection members are used; other geometry
    /// types are ignored with a warning.
    pub fn from_geojson_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::MaskRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_geojson_str(&contents, path)
    }

    /// Parse GeoJSON text. `path` is only used in error messages.
    pub fn from_geojson_str(contents: &str, path: &Path) -> Result<Self> {
        let document: GeoJsonObject =
            serde_json::from_str(contents).map_err(|e| Error::MaskParse {
                path: path.to_path_buf(),
                source: e,
            })?;

        let mut polygons = Vec::new();
        collect_polygons(&document, &mut polygons).map_err(|e| Error::MaskGeometry {
            path: path.to_path_buf(),
            source: e,
        })?;

        if polygons.is_empty() {
            warn!("Mask '{}' contains no polygons; every detection will be dropped", path.display());
        } else {
            debug!("Loaded {} mask polygon(s) from '{}'", polygons.len(), path.display());
        }
        Ok(Self::new(polygons))
    }

    /// Number of polygons.
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    /// Whether the mask has no polygons.
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Whether `polygon` intersects any mask polygon.
    pub fn intersects(&self, polygon: &Polygon) -> bool {
        self.index
            .locate_in_envelope_intersecting(&envelope_of(polygon))
            .any(|entry| self.polygons[entry.index].intersects(polygon))
    }
}

/// Keep the footprints that intersect `mask`, preserving order.
///
/// With no mask every footprint is kept.
pub fn filter_by_mask(mask: Option<&MaskGeometry>, footprints: Vec<Footprint>) -> Vec<Footprint> {
    let Some(mask) = mask else {
        return footprints;
    };
    let before = footprints.len();
    let kept: Vec<Footprint> = footprints
        .into_par_iter()
        .filter(|f| mask.intersects(&f.polygon))
        .collect();
    debug!("Mask kept {} of {} detections", kept.len(), before);
    kept
}

type Ring = Vec<Vec<f64>>;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum GeoJsonObject {
    FeatureCollection {
        features: Vec<GeoJsonObject>,
    },
    Feature {
        geometry: Option<Box<GeoJsonObject>>,
    },
    Polygon {
        coordinates: Vec<Ring>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Ring>>,
    },
    GeometryCollection {
        geometries: Vec<GeoJsonObject>,
    },
    #[serde(other)]
    Unsupported,
}

fn collect_polygons(
    object: &GeoJsonObject,
    out: &mut Vec<MaskPolygon>,
) -> std::result::Result<(), GeometryError> {
    match object {
        GeoJsonObject::FeatureCollection { features } => {
            for feature in features {
                collect_polygons(feature, out)?;
            }
        }
        GeoJsonObject::Feature { geometry } => {
            if let Some(geometry) = geometry {
                collect_polygons(geometry, out)?;
            }
        }
        GeoJsonObject::Polygon { coordinates } => {
            out.extend(MaskPolygon::from_rings(coordinates)?);
        }
        GeoJsonObject::MultiPolygon { coordinates } => {
            for rings in coordinates {
                out.extend(MaskPolygon::from_rings(rings)?);
            }
        }
        GeoJsonObject::GeometryCollection { geometries } => {
            for geometry in geometries {
                collect_polygons(geometry, out)?;
            }
        }
        GeoJsonObject::Unsupported => {
            warn!("Ignoring non-polygon geometry in mask");
        }
    }
    Ok(())
}
