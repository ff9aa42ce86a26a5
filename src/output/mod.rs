//! Output format writers.

mod csv;
mod debug;
mod geojson;
mod json;
pub mod progress;
mod publish;
mod types;
mod writer;

pub use csv::CsvWriter;
pub use debug::{ChipSummary, DebugArtifact, MergeGroup};
pub use geojson::{Feature, FeatureCollection, FeatureProperties, GeoJsonWriter, PolygonGeometry};
pub use json::write_json;
pub use publish::{StagedFile, publish};
pub use types::Detection;
pub use writer::{OutputWriter, write_all};
