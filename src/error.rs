//! Error types for geochip.

use crate::geometry::GeometryError;
use std::path::PathBuf;

/// Result type alias for geochip operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad failure class of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid settings, detected before any chip is processed.
    Configuration,
    /// Unreadable input or unwritable output.
    Io,
    /// The external detector failed on a chip.
    Detection,
    /// A malformed geometry in an input file.
    Geometry,
}

/// Top-level error type for geochip.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Chip size and overlap do not describe a valid grid.
    #[error("invalid chip size {chip_size} with overlap {overlap} (chip size must be positive and larger than the overlap)")]
    InvalidChipSize {
        /// Requested chip edge length in pixels.
        chip_size: u32,
        /// Requested overlap in pixels.
        overlap: u32,
    },

    /// Channel order does not select valid raster bands.
    #[error("invalid channel order {order:?}: {reason}")]
    InvalidChannelOrder {
        /// The requested band indices.
        order: Vec<usize>,
        /// Why the order was rejected.
        reason: String,
    },

    /// No detector program was given on the command line or in the config.
    #[error("no detector program configured (use --detector or set detector.program in config)")]
    DetectorNotConfigured,

    /// No input images were given.
    #[error("at least one input image is required")]
    NoInputImages,

    /// Failed to decode a raster image.
    #[error("failed to read raster '{path}'")]
    RasterRead {
        /// Path to the image.
        path: PathBuf,
        /// Underlying decode error.
        #[source]
        source: image::ImageError,
    },

    /// A read outside the raster extent was requested.
    #[error("raster region rows {row}..{row_end}, cols {col}..{col_end} is outside a {height}x{width} raster")]
    RegionOutOfBounds {
        /// First requested row.
        row: usize,
        /// One past the last requested row.
        row_end: usize,
        /// First requested column.
        col: usize,
        /// One past the last requested column.
        col_end: usize,
        /// Raster height.
        height: usize,
        /// Raster width.
        width: usize,
    },

    /// A band index outside the raster was requested.
    #[error("band {band} requested from a raster with {band_count} band(s)")]
    BandOutOfRange {
        /// Requested band.
        band: usize,
        /// Number of bands in the raster.
        band_count: usize,
    },

    /// Failed to read a world file.
    #[error("failed to read world file '{path}'")]
    WorldFileRead {
        /// Path to the world file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// GeoTIFF georeferencing tags could not be read.
    #[error("failed to read GeoTIFF tags from '{path}': {message}")]
    GeoTiffTags {
        /// Path to the image.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },

    /// World file could not be parsed.
    #[error("failed to parse world file '{path}': {message}")]
    WorldFileParse {
        /// Path to the world file.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },

    /// Input images cannot be combined into one virtual raster.
    #[error("cannot mosaic input images: {message}")]
    MosaicMismatch {
        /// Description of the mismatch.
        message: String,
    },

    /// Failed to read the label map.
    #[error("failed to read label map '{path}'")]
    LabelMapRead {
        /// Path to the label map.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Label map syntax error.
    #[error("failed to parse label map '{path}' at line {line}: {message}")]
    LabelMapParse {
        /// Path to the label map.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// Description of the syntax error.
        message: String,
    },

    /// Failed to read the mask file.
    #[error("failed to read mask file '{path}'")]
    MaskRead {
        /// Path to the mask file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Mask file is not valid GeoJSON.
    #[error("failed to parse mask file '{path}'")]
    MaskParse {
        /// Path to the mask file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Mask file holds a polygon that cannot be used.
    #[error("invalid polygon in mask file '{path}'")]
    MaskGeometry {
        /// Path to the mask file.
        path: PathBuf,
        /// What was wrong with the polygon.
        #[source]
        source: GeometryError,
    },

    /// Failed to write a chip image for the detector.
    #[error("failed to write chip image '{path}'")]
    ChipWrite {
        /// Path to the chip image.
        path: PathBuf,
        /// Underlying encode error.
        #[source]
        source: image::ImageError,
    },

    /// Detector program could not be started.
    #[error("failed to start detector program '{program}'")]
    DetectorSpawn {
        /// Program that failed to start.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Detector failed on a chip.
    #[error("detection failed on chip {chip}: {reason}")]
    Detection {
        /// Chip identifier.
        chip: usize,
        /// Description of the failure.
        reason: String,
    },

    /// Detector output could not be parsed.
    #[error("detector returned unparsable output for chip {chip}")]
    DetectorOutput {
        /// Chip identifier.
        chip: usize,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Failed to create the working directory.
    #[error("failed to create working directory '{path}'")]
    WorkDirCreate {
        /// Path to the working directory.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to build the worker pool.
    #[error("failed to build worker pool: {reason}")]
    ThreadPool {
        /// Description of the failure.
        reason: String,
    },

    /// Failed to write an output file.
    #[error("failed to write output file '{path}'")]
    OutputWrite {
        /// Path to the output file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write JSON output file.
    #[error("failed to write JSON output file '{path}'")]
    JsonWrite {
        /// Path to the JSON file.
        path: PathBuf,
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Failed to write CSV output file.
    #[error("failed to write CSV output file '{path}'")]
    CsvWrite {
        /// Path to the CSV file.
        path: PathBuf,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },
}

impl Error {
    /// Classify this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigDirNotFound
            | Self::ConfigRead { .. }
            | Self::ConfigParse { .. }
            | Self::ConfigWrite { .. }
            | Self::ConfigSerialize { .. }
            | Self::ConfigValidation { .. }
            | Self::InvalidChipSize { .. }
            | Self::InvalidChannelOrder { .. }
            | Self::DetectorNotConfigured
            | Self::NoInputImages
            | Self::MosaicMismatch { .. }
            | Self::ThreadPool { .. } => ErrorKind::Configuration,
            Self::DetectorSpawn { .. } | Self::Detection { .. } | Self::DetectorOutput { .. } => {
                ErrorKind::Detection
            }
            Self::MaskGeometry { .. } => ErrorKind::Geometry,
            Self::RasterRead { .. }
            | Self::RegionOutOfBounds { .. }
            | Self::BandOutOfRange { .. }
            | Self::WorldFileRead { .. }
            | Self::GeoTiffTags { .. }
            | Self::WorldFileParse { .. }
            | Self::LabelMapRead { .. }
            | Self::LabelMapParse { .. }
            | Self::MaskRead { .. }
            | Self::MaskParse { .. }
            | Self::ChipWrite { .. }
            | Self::WorkDirCreate { .. }
            | Self::OutputWrite { .. }
            | Self::JsonWrite { .. }
            | Self::CsvWrite { .. } => ErrorKind::Io,
        }
    }
}
