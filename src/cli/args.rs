//! CLI argument definitions.

use super::validators::parse_threshold;
use crate::config::OutputFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Tiled object detection over large geospatial rasters.
#[derive(Debug, Parser)]
#[command(name = "geochip")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v: debug, -vv: trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print warnings and errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Detect objects in one or more images.
    Predict(Box<PredictArgs>),
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create default configuration file.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
}

/// Arguments for the predict command.
#[derive(Debug, Args)]
pub struct PredictArgs {
    /// Model file passed to the detector program.
    pub inference_graph: PathBuf,

    /// Label map (`item { id: .. name: .. }` format).
    pub label_map: PathBuf,

    /// Input images; several are mosaicked into one raster.
    #[arg(required = true, num_args = 1..)]
    pub images: Vec<PathBuf>,

    /// Output file.
    pub output: PathBuf,

    /// Write chip grid and merge groups as JSON.
    #[arg(long, value_name = "PATH")]
    pub debug_output: Option<PathBuf>,

    /// Keep only detections intersecting this GeoJSON geometry.
    #[arg(long, value_name = "PATH", env = "GEOCHIP_MASK")]
    pub mask: Option<PathBuf>,

    /// Raster bands used as the chip's red, green and blue channels.
    #[arg(long, num_args = 3, value_names = ["R", "G", "B"])]
    pub channel_order: Option<Vec<usize>>,

    /// Chip edge length in pixels.
    #[arg(long, env = "GEOCHIP_CHIP_SIZE")]
    pub chip_size: Option<u32>,

    /// Overlap between adjacent chips in pixels (default: chip size / 6).
    #[arg(long, env = "GEOCHIP_OVERLAP")]
    pub overlap: Option<u32>,

    /// Minimum detector score (0.0-1.0).
    #[arg(long, value_parser = parse_threshold, env = "GEOCHIP_SCORE_THRESH")]
    pub score_thresh: Option<f32>,

    /// IOU at or above which same-class detections merge (0.0-1.0).
    #[arg(long, value_parser = parse_threshold, env = "GEOCHIP_MERGE_THRESH")]
    pub merge_thresh: Option<f32>,

    /// Output format (geojson, csv).
    #[arg(short, long, env = "GEOCHIP_FORMAT")]
    pub format: Option<OutputFormat>,

    /// Detector program run once per chip (overrides config).
    #[arg(long, value_name = "PROGRAM", env = "GEOCHIP_DETECTOR")]
    pub detector: Option<String>,

    /// Extra argument for the detector program; repeatable (overrides config).
    #[arg(long = "detector-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub detector_args: Vec<String>,

    /// Directory under which the working directory is created.
    #[arg(long, value_name = "DIR", env = "GEOCHIP_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    /// Keep chips and intermediate files in `<work-dir>/predict`.
    #[arg(long)]
    pub save_temp: bool,

    /// Worker threads (default: one per CPU).
    #[arg(short = 'j', long, env = "GEOCHIP_THREADS")]
    pub threads: Option<usize>,

    /// Disable the progress bar.
    #[arg(long)]
    pub no_progress: bool,
}
