//! Tiled detection over one raster.

use crate::aggregate::{
    Footprint, GlobalDetection, MaskGeometry, MergeOutcome, filter_by_mask, merge_detections,
    reproject,
};
use crate::chip::{ChannelOrder, ChipGrid, default_overlap, extract_chip, plan_chips};
use crate::config::{validate_chip_geometry, validate_threshold};
use crate::constants::{DEFAULT_CHIP_SIZE, DEFAULT_MERGE_THRESH, DEFAULT_SCORE_THRESH, work_files};
use crate::error::Result;
use crate::inference::{Detector, LabelMap, RawDetection};
use crate::output::progress::inc_progress;
use crate::output::{Detection, GeoJsonWriter, write_all, write_json};
use crate::raster::{GeoTransform, RasterSource};
use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Computing the chip grid.
    Planning,
    /// Extracting chips and running the detector.
    Detecting,
    /// Moving detections into the raster frame.
    Reprojecting,
    /// Merging duplicates from overlapping chips.
    Merging,
    /// Dropping detections outside the mask.
    MaskFiltering,
    /// Finished.
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Planning => "planning",
            Self::Detecting => "detecting",
            Self::Reprojecting => "reprojecting",
            Self::Merging => "merging",
            Self::MaskFiltering => "mask filtering",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Shared, read-only inputs of a run.
pub struct PipelineInputs<'a> {
    /// Raster to scan.
    pub raster: &'a dyn RasterSource,
    /// Detector applied to every chip.
    pub detector: &'a dyn Detector,
    /// Class names.
    pub label_map: &'a LabelMap,
    /// Optional area of interest.
    pub mask: Option<&'a MaskGeometry>,
}

/// Tunable parameters of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineOptions {
    /// Chip edge length in pixels.
    pub chip_size: u32,
    /// Overlap between adjacent chips in pixels.
    pub overlap: u32,
    /// Raster bands fed to the detector.
    pub channel_order: ChannelOrder,
    /// Minimum detector score.
    pub score_thresh: f32,
    /// IOU threshold for merging.
    pub merge_thresh: f32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            chip_size: DEFAULT_CHIP_SIZE,
            overlap: default_overlap(DEFAULT_CHIP_SIZE),
            channel_order: ChannelOrder::default(),
            score_thresh: DEFAULT_SCORE_THRESH,
            merge_thresh: DEFAULT_MERGE_THRESH,
        }
    }
}

impl PipelineOptions {
    /// Check the options against a raster with `band_count` bands.
    pub fn validate(&self, band_count: usize) -> Result<()> {
        validate_chip_geometry(self.chip_size, self.overlap)?;
        validate_threshold("score_thresh", self.score_thresh)?;
        validate_threshold("merge_thresh", self.merge_thresh)?;
        self.channel_order.validate(band_count)
    }
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// The chip grid.
    pub grid: ChipGrid,
    /// Raw detection count per chip, by chip id.
    pub chip_detections: Vec<usize>,
    /// All detections in the raster frame, by id.
    pub detections: Vec<GlobalDetection>,
    /// Merge result before mask filtering.
    pub merge: MergeOutcome,
    /// Final detections with their outlines.
    pub footprints: Vec<Footprint>,
    /// Transform used for the outlines.
    pub geo_transform: Option<GeoTransform>,
}

impl PipelineRun {
    /// Number of raw detections.
    pub fn raw_count(&self) -> usize {
        self.detections.len()
    }

    /// Number of merged detections removed by the mask.
    pub fn masked_out(&self) -> usize {
        self.merge.detections.len() - self.footprints.len()
    }
}

#[derive(Serialize)]
struct ChipsInfo<'a> {
    raster_width: usize,
    raster_height: usize,
    band_count: usize,
    channel_order: ChannelOrder,
    geo_transform: Option<GeoTransform>,
    grid: &'a ChipGrid,
}

fn enter(stage: Stage) {
    debug!("Stage: {}", stage);
}

/// Run detection over `inputs.raster` and aggregate the results.
///
/// Chip extraction and detection run on the current rayon pool; merging
/// starts only after every chip has been processed. The first chip error
/// aborts the run. Intermediate artifacts are written into `work_dir`.
pub fn run_pipeline(
    inputs: &PipelineInputs<'_>,
    options: &PipelineOptions,
    work_dir: &Path,
    progress: Option<&ProgressBar>,
) -> Result<PipelineRun> {
    let raster = inputs.raster;
    options.validate(raster.band_count())?;
    let start = Instant::now();
    let transform = raster.geo_transform();

    enter(Stage::Planning);
    let grid = plan_chips(
        raster.height(),
        raster.width(),
        options.chip_size,
        options.overlap,
    )?;
    info!(
        "Planned {} chips ({}x{}) over {}x{} raster",
        grid.len(),
        grid.grid_rows,
        grid.grid_cols,
        raster.width(),
        raster.height()
    );
    write_json(
        &work_dir.join(work_files::CHIPS_INFO),
        &ChipsInfo {
            raster_width: raster.width(),
            raster_height: raster.height(),
            band_count: raster.band_count(),
            channel_order: options.channel_order,
            geo_transform: transform,
            grid: &grid,
        },
    )?;

    enter(Stage::Detecting);
    let per_chip: Vec<Vec<RawDetection>> = grid
        .windows
        .par_iter()
        .map(|window| -> Result<Vec<RawDetection>> {
            let chip = extract_chip(raster, window, options.channel_order)?;
            let raw = inputs
                .detector
                .detect(&chip, inputs.label_map, options.score_thresh)?;
            inc_progress(progress);
            Ok(raw)
        })
        .collect::<Result<_>>()?;

    enter(Stage::Reprojecting);
    let chip_detections: Vec<usize> = per_chip.iter().map(Vec::len).collect();
    let first_ids: Vec<usize> = chip_detections
        .iter()
        .scan(0, |next, &count| {
            let first = *next;
            *next += count;
            Some(first)
        })
        .collect();
    let detections: Vec<GlobalDetection> = per_chip
        .par_iter()
        .zip(&grid.windows)
        .zip(first_ids)
        .flat_map_iter(|((raws, window), first)| {
            raws.iter()
                .enumerate()
                .map(move |(i, raw)| reproject(raw, window, first + i))
        })
        .collect();
    info!("Detected {} objects in {} chips", detections.len(), grid.len());
    write_json(&work_dir.join(work_files::PREDICTIONS), &detections)?;

    enter(Stage::Merging);
    let merge = merge_detections(&detections, f64::from(options.merge_thresh));
    let merged: Vec<Footprint> = merge
        .detections
        .par_iter()
        .map(|d| Footprint::new(d.clone(), transform))
        .collect();
    info!(
        "Merged into {} detections ({} duplicates)",
        merge.detections.len(),
        merge.merges
    );

    enter(Stage::MaskFiltering);
    let footprints = match inputs.mask {
        Some(mask) => {
            let unfiltered: Vec<Detection> = merged
                .iter()
                .map(|f| Detection::from_footprint(f, inputs.label_map))
                .collect();
            let mut writer =
                GeoJsonWriter::new(&work_dir.join(work_files::UNFILTERED_PREDICTIONS));
            write_all(&mut writer, &unfiltered)?;
            let kept = filter_by_mask(Some(mask), merged);
            info!("Mask kept {} of {} detections", kept.len(), unfiltered.len());
            kept
        }
        None => merged,
    };

    enter(Stage::Done);
    debug!("Pipeline finished in {:.2?}", start.elapsed());

    Ok(PipelineRun {
        grid,
        chip_detections,
        detections,
        merge,
        footprints,
        geo_transform: transform,
    })
}
