//! Configuration type definitions.

use crate::chip::ChannelOrder;
use crate::constants::{DEFAULT_CHIP_SIZE, DEFAULT_MERGE_THRESH, DEFAULT_SCORE_THRESH};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default prediction settings.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// External detector program.
    #[serde(default)]
    pub detector: DetectorConfig,

    /// Filesystem locations.
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Default prediction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Chip edge length in pixels.
    pub chip_size: u32,

    /// Overlap between adjacent chips (`chip_size / 6` when unset).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlap: Option<u32>,

    /// Raster bands used as the chip's three channels.
    pub channel_order: ChannelOrder,

    /// Minimum detector score kept.
    pub score_thresh: f32,

    /// IOU at or above which same-class detections merge.
    pub merge_thresh: f32,

    /// Output format.
    pub format: OutputFormat,

    /// Worker threads (rayon default when unset).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,

    /// Keep the working directory after the run.
    pub save_temp: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            chip_size: DEFAULT_CHIP_SIZE,
            overlap: None,
            channel_order: ChannelOrder::default(),
            score_thresh: DEFAULT_SCORE_THRESH,
            merge_thresh: DEFAULT_MERGE_THRESH,
            format: OutputFormat::GeoJson,
            threads: None,
            save_temp: false,
        }
    }
}

/// External detector settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Program run once per chip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,

    /// Arguments placed before the model, label map and chip paths.
    pub args: Vec<String>,
}

/// Filesystem locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Parent of the working directory (system temp dir when unset).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// GeoJSON FeatureCollection.
    GeoJson,
    /// CSV with one row per detection.
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GeoJson => write!(f, "geojson"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "geojson" | "json" => Ok(Self::GeoJson),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
