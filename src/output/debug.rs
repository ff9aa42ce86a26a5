//! Debug artifact describing how a run tiled and merged.

use crate::aggregate::SkippedDetection;
use crate::chip::ChipGrid;
use crate::error::Result;
use crate::geometry::BoundingBox;
use crate::output::write_json;
use crate::pipeline::PipelineRun;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Chip grid, per-chip counts and merge groups of one run.
#[derive(Debug, Serialize, Deserialize)]
pub struct DebugArtifact {
    /// When the artifact was written.
    pub created: DateTime<Utc>,
    /// The chip grid.
    pub grid: ChipGrid,
    /// Per-chip detection counts.
    pub chips: Vec<ChipSummary>,
    /// One entry per merged detection.
    pub merge_groups: Vec<MergeGroup>,
    /// Detections dropped for malformed geometry.
    pub skipped: Vec<SkippedDetection>,
    /// Merged detections removed by the mask.
    pub masked_out: usize,
}

/// Detections reported for one chip.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChipSummary {
    /// Chip id.
    pub id: usize,
    /// First raster row.
    pub row_offset: usize,
    /// First raster column.
    pub col_offset: usize,
    /// Raw detections at or above the score threshold.
    pub detections: usize,
}

/// Detections merged into one.
#[derive(Debug, Serialize, Deserialize)]
pub struct MergeGroup {
    /// Class identifier.
    pub class_id: u32,
    /// Kept detection.
    pub seed: usize,
    /// Kept box in raster pixels.
    pub bbox: BoundingBox,
    /// Every detection id in the group.
    pub members: Vec<usize>,
    /// Chips the members came from, ascending and deduplicated.
    pub chips: Vec<usize>,
}

impl DebugArtifact {
    /// Summarize `run`.
    pub fn from_run(run: &PipelineRun) -> Self {
        let chips = run
            .grid
            .windows
            .iter()
            .zip(&run.chip_detections)
            .map(|(w, &detections)| ChipSummary {
                id: w.id,
                row_offset: w.row_offset,
                col_offset: w.col_offset,
                detections,
            })
            .collect();

        let merge_groups = run
            .merge
            .detections
            .iter()
            .map(|d| {
                let mut chips: Vec<usize> = d
                    .members
                    .iter()
                    .filter_map(|&id| run.detections.get(id).map(|g| g.chip))
                    .collect();
                chips.sort_unstable();
                chips.dedup();
                MergeGroup {
                    class_id: d.class_id,
                    seed: d.seed,
                    bbox: d.bbox,
                    members: d.members.clone(),
                    chips,
                }
            })
            .collect();

        Self {
            created: Utc::now(),
            grid: run.grid.clone(),
            chips,
            merge_groups,
            skipped: run.merge.skipped.clone(),
            masked_out: run.masked_out(),
        }
    }

    /// Write as JSON.
    pub fn write(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }
}
