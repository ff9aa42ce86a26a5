//! End-to-end prediction: load inputs, run the pipeline, publish outputs.

use super::driver::{PipelineInputs, PipelineOptions, PipelineRun, run_pipeline};
use super::workdir::WorkDir;
use crate::aggregate::MaskGeometry;
use crate::chip::plan_chips;
use crate::config::OutputFormat;
use crate::error::{Error, Result};
use crate::inference::{CommandDetector, LabelMap};
use crate::output::{
    CsvWriter, DebugArtifact, Detection, GeoJsonWriter, OutputWriter, StagedFile, progress,
    publish, write_all,
};
use crate::raster::load_rasters;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Everything needed for one prediction run.
#[derive(Debug, Clone)]
pub struct PredictRequest {
    /// Model file handed to the detector program.
    pub inference_graph: PathBuf,
    /// Label map file.
    pub label_map: PathBuf,
    /// Input images; several are mosaicked.
    pub images: Vec<PathBuf>,
    /// Primary output path.
    pub output: PathBuf,
    /// Optional debug artifact path.
    pub debug_output: Option<PathBuf>,
    /// Optional mask GeoJSON.
    pub mask: Option<PathBuf>,
    /// Primary output format.
    pub format: OutputFormat,
    /// Detection parameters.
    pub options: PipelineOptions,
    /// Detector program.
    pub detector_program: String,
    /// Arguments placed before the model, label map and chip paths.
    pub detector_args: Vec<String>,
    /// Worker threads (rayon default when `None`).
    pub threads: Option<usize>,
    /// Parent of the working directory.
    pub work_root: Option<PathBuf>,
    /// Keep the working directory.
    pub save_temp: bool,
    /// Show a progress bar.
    pub progress: bool,
}

/// Outcome of a successful prediction.
#[derive(Debug, Clone)]
pub struct PredictSummary {
    /// Chips processed.
    pub chips: usize,
    /// Raw detections across all chips.
    pub raw_detections: usize,
    /// Detections after merging.
    pub merged_detections: usize,
    /// Detections written.
    pub final_detections: usize,
    /// Files published.
    pub outputs: Vec<PathBuf>,
    /// Working directory, if kept.
    pub work_dir: Option<PathBuf>,
    /// Wall-clock time.
    pub elapsed: Duration,
}

/// Run a prediction and publish its outputs.
///
/// Outputs become visible only once all of them have been written; on any
/// error no output is left behind.
pub fn predict(request: &PredictRequest) -> Result<PredictSummary> {
    let start = Instant::now();
    let options = &request.options;

    crate::config::validate_chip_geometry(options.chip_size, options.overlap)?;
    if request.images.is_empty() {
        return Err(Error::NoInputImages);
    }

    let label_map = LabelMap::from_file(&request.label_map)?;
    info!("Loaded {} classes from label map", label_map.len());

    let raster = load_rasters(&request.images)?;
    options.validate(raster.band_count())?;

    let mask = request
        .mask
        .as_deref()
        .map(MaskGeometry::from_geojson_file)
        .transpose()?;

    let pool = build_thread_pool(request.threads)?;

    let work_dir = WorkDir::acquire(request.work_root.as_deref(), request.save_temp)?;
    let detector = CommandDetector::new(
        request.detector_program.clone(),
        request.detector_args.clone(),
        &request.inference_graph,
        &request.label_map,
        &work_dir.chips_dir(),
    );

    let inputs = PipelineInputs {
        raster: raster.as_ref(),
        detector: &detector,
        label_map: &label_map,
        mask: mask.as_ref(),
    };

    let chip_count = plan_chips(
        raster.height(),
        raster.width(),
        options.chip_size,
        options.overlap,
    )?
    .len();
    let pb = progress::create_chip_progress(chip_count, request.progress);
    let run = pool.install(|| run_pipeline(&inputs, options, work_dir.path(), pb.as_ref()));
    let run = match run {
        Ok(run) => run,
        Err(e) => {
            if let Some(pb) = pb {
                pb.abandon();
            }
            return Err(e);
        }
    };
    progress::finish_progress(pb, "done");

    let outputs = write_outputs(request, &run, &label_map)?;

    let summary = PredictSummary {
        chips: run.grid.len(),
        raw_detections: run.raw_count(),
        merged_detections: run.merge.detections.len(),
        final_detections: run.footprints.len(),
        outputs,
        work_dir: work_dir.is_retained().then(|| work_dir.path().to_path_buf()),
        elapsed: start.elapsed(),
    };
    info!(
        "Wrote {} detections to {} in {:.1}s",
        summary.final_detections,
        request.output.display(),
        summary.elapsed.as_secs_f64()
    );
    Ok(summary)
}

fn build_thread_pool(threads: Option<usize>) -> Result<rayon::ThreadPool> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder.build().map_err(|e| Error::ThreadPool {
        reason: e.to_string(),
    })
}

fn write_outputs(
    request: &PredictRequest,
    run: &PipelineRun,
    label_map: &LabelMap,
) -> Result<Vec<PathBuf>> {
    let detections: Vec<Detection> = run
        .footprints
        .iter()
        .map(|f| Detection::from_footprint(f, label_map))
        .collect();

    let mut staged = Vec::new();

    let primary = StagedFile::new(&request.output)?;
    let mut writer: Box<dyn OutputWriter> = match request.format {
        OutputFormat::GeoJson => Box::new(GeoJsonWriter::new(primary.path())),
        OutputFormat::Csv => Box::new(CsvWriter::new(primary.path())?),
    };
    write_all(writer.as_mut(), &detections)?;
    drop(writer);
    staged.push(primary);

    if let Some(debug_path) = &request.debug_output {
        let debug = StagedFile::new(debug_path)?;
        DebugArtifact::from_run(run).write(debug.path())?;
        staged.push(debug);
    }

    if detections.is_empty() {
        warn!("No detections survived; writing an empty result");
    }
    publish(staged)
}
