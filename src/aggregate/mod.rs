//! Turning per-chip detections into one global detection set.

mod mask;
mod merge;
mod reproject;

pub use mask::{MaskGeometry, MaskPolygon, filter_by_mask};
pub use merge::{MergeOutcome, MergedDetection, SkippedDetection, merge_detections};
pub use reproject::{Footprint, GlobalDetection, footprint, reproject};
