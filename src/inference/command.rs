//! Detector backed by an external program.

use super::{Detector, LabelMap, RawDetection};
use crate::chip::ChipImage;
use crate::error::{Error, Result};
use crate::geometry::BoundingBox;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{trace, warn};

/// One detection as printed by a detector program.
///
/// `bbox` is `[ymin, xmin, ymax, xmax]` normalized to `[0, 1]` of the chip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireDetection {
    /// Normalized box.
    #[serde(rename = "box")]
    pub bbox: [f64; 4],
    /// Class identifier.
    pub class_id: u32,
    /// Detector score.
    pub score: f32,
}

impl WireDetection {
    /// Scale the normalized box to chip pixels.
    #[allow(clippy::cast_precision_loss)]
    pub fn to_raw(&self, chip_width: usize, chip_height: usize) -> RawDetection {
        let [ymin, xmin, ymax, xmax] = self.bbox;
        let (w, h) = (chip_width as f64, chip_height as f64);
        RawDetection {
            bbox: BoundingBox::new(xmin * w, ymin * h, xmax * w, ymax * h),
            class_id: self.class_id,
            score: self.score,
        }
    }
}

/// Runs `<program> [args...] <inference_graph> <label_map> <chip.png>` per chip.
///
/// The program must print a JSON array of [`WireDetection`] on stdout and
/// exit with status zero.
#[derive(Debug, Clone)]
pub struct CommandDetector {
    program: String,
    args: Vec<String>,
    inference_graph: PathBuf,
    label_map_path: PathBuf,
    chips_dir: PathBuf,
}

impl CommandDetector {
    /// Create a detector writing chip images into `chips_dir`.
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        inference_graph: &Path,
        label_map_path: &Path,
        chips_dir: &Path,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            inference_graph: inference_graph.to_path_buf(),
            label_map_path: label_map_path.to_path_buf(),
            chips_dir: chips_dir.to_path_buf(),
        }
    }

    /// Path of the staged image for chip `id`.
    pub fn chip_path(&self, id: usize) -> PathBuf {
        self.chips_dir.join(format!("chip_{id:06}.png"))
    }
}

/// Parse detector stdout for chip `chip`.
pub fn parse_detector_output(stdout: &[u8], chip: usize) -> Result<Vec<WireDetection>> {
    serde_json::from_slice(stdout).map_err(|e| Error::DetectorOutput { chip, source: e })
}

impl Detector for CommandDetector {
    fn detect(
        &self,
        chip: &ChipImage,
        label_map: &LabelMap,
        score_thresh: f32,
    ) -> Result<Vec<RawDetection>> {
        let id = chip.window.id;
        let chip_path = self.chip_path(id);
        chip.save_png(&chip_path)?;

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(&self.inference_graph)
            .arg(&self.label_map_path)
            .arg(&chip_path)
            .output()
            .map_err(|e| Error::DetectorSpawn {
                program: self.program.clone(),
                source: e,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Detection {
                chip: id,
                reason: format!("detector exited with {}: {}", output.status, stderr.trim()),
            });
        }

        let wire = parse_detector_output(&output.stdout, id)?;
        trace!("Chip {} returned {} raw detections", id, wire.len());

        Ok(wire
            .iter()
            .filter(|d| d.score >= score_thresh)
            .filter(|d| {
                let known = label_map.contains(d.class_id);
                if !known {
                    warn!("Chip {}: dropping detection with unknown class {}", id, d.class_id);
                }
                known
            })
            .map(|d| d.to_raw(chip.width(), chip.height()))
            .collect())
    }
}
