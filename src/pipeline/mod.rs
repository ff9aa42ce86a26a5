//! Processing pipeline components.

mod driver;
mod predict;
mod workdir;

pub use driver::{PipelineInputs, PipelineOptions, PipelineRun, Stage, run_pipeline};
pub use predict::{PredictRequest, PredictSummary, predict};
pub use workdir::{WorkDir, cleanup_all_work_dirs};
