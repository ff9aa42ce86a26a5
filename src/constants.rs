//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track.

/// Application name used for config directories and user-facing messages.
pub const APP_NAME: &str = "geochip";

/// Configuration file name inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV_VAR: &str = "GEOCHIP_CONFIG";

/// Default chip edge length in pixels.
pub const DEFAULT_CHIP_SIZE: u32 = 300;

/// Divisor applied to the chip size when no explicit overlap is configured.
///
/// A 300 pixel chip overlaps its neighbours by 50 pixels.
pub const DEFAULT_OVERLAP_DIVISOR: u32 = 6;

/// Default band selection (first three bands, in order).
pub const DEFAULT_CHANNEL_ORDER: [usize; 3] = [0, 1, 2];

/// Default minimum detector score.
pub const DEFAULT_SCORE_THRESH: f32 = 0.5;

/// Default IOU threshold for merging duplicate detections.
pub const DEFAULT_MERGE_THRESH: f32 = 0.05;

/// Number of bands in a chip image.
pub const CHIP_BANDS: usize = 3;

/// Threshold value bounds.
pub mod threshold {
    /// Minimum valid threshold value.
    pub const MIN: f32 = 0.0;
    /// Maximum valid threshold value.
    pub const MAX: f32 = 1.0;
    /// Decimal places for score formatting.
    pub const DECIMAL_PLACES: usize = 4;
}

/// Names of files staged in the working directory.
pub mod work_files {
    /// Subdirectory of the working root used when working files are kept.
    pub const RETAINED_DIR: &str = "predict";
    /// Marker identifying a retained directory created by geochip.
    pub const RETAINED_MARKER: &str = ".geochip-workdir";
    /// Directory holding chip images handed to the detector.
    pub const CHIPS_DIR: &str = "chips";
    /// Chip grid manifest.
    pub const CHIPS_INFO: &str = "chips_info.json";
    /// Raw per-chip detections.
    pub const PREDICTIONS: &str = "predictions.json";
    /// Merged detections before mask filtering.
    pub const UNFILTERED_PREDICTIONS: &str = "unfiltered_predictions.geojson";
    /// Prefix of scoped temporary working directories.
    pub const TEMP_PREFIX: &str = "geochip-";
}

/// World file sidecar extensions, tried in order.
pub const WORLD_FILE_EXTENSIONS: &[&str] = &["tfw", "pgw", "jgw", "wld"];

/// Relative tolerance when comparing pixel sizes of mosaic inputs.
pub const PIXEL_SIZE_TOLERANCE: f64 = 1e-9;
