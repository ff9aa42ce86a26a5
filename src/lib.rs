//! Geochip - tiled object detection over large geospatial rasters.
//!
//! A raster too large for a detector is cut into overlapping chips, each
//! chip is scored by an external detector, and the per-chip detections are
//! moved into the raster frame, merged across chip overlaps and optionally
//! clipped to a mask.

#![warn(missing_docs)]

pub mod aggregate;
pub mod chip;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod geometry;
pub mod inference;
pub mod output;
pub mod pipeline;
pub mod raster;

use chip::{ChannelOrder, default_overlap};
use clap::Parser;
use cli::{Cli, Command, ConfigAction, PredictArgs};
use config::{Config, config_file_path, load_default_config, save_default_config};
use pipeline::{PipelineOptions, PredictRequest, predict};
use tracing::{info, warn};

pub use error::{Error, Result};

/// Main entry point for the geochip CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    // Remove scoped working directories on interrupt
    if let Err(e) = ctrlc::set_handler(|| {
        pipeline::cleanup_all_work_dirs();
        std::process::exit(130); // 128 + SIGINT(2)
    }) {
        warn!("Failed to install Ctrl+C handler: {e}");
    }

    match cli.command {
        Command::Config { action } => handle_config_command(action),
        Command::Predict(args) => {
            let config = load_default_config()?;
            let request = build_predict_request(&args, &config, cli.quiet)?;
            let summary = predict(&request)?;
            info!(
                "{} chips, {} raw detections, {} after merging, {} written",
                summary.chips,
                summary.raw_detections,
                summary.merged_detections,
                summary.final_detections
            );
            if let Some(dir) = summary.work_dir {
                info!("Intermediate files kept in {}", dir.display());
            }
            Ok(())
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter_str = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_str));

    fmt().with_env_filter(filter).init();
}

/// Merge CLI arguments over configuration values.
///
/// Configuration problems are reported here, before any input is read.
pub fn build_predict_request(
    args: &PredictArgs,
    config: &Config,
    quiet: bool,
) -> Result<PredictRequest> {
    config::validate_config(config)?;
    let defaults = &config.defaults;

    let chip_size = args.chip_size.unwrap_or(defaults.chip_size);
    let overlap = args
        .overlap
        .or(defaults.overlap)
        .unwrap_or_else(|| default_overlap(chip_size));
    config::validate_chip_geometry(chip_size, overlap)?;

    let channel_order = match &args.channel_order {
        Some(bands) => ChannelOrder::from_slice(bands)?,
        None => defaults.channel_order,
    };

    let threads = args.threads.or(defaults.threads);
    if threads == Some(0) {
        return Err(Error::ConfigValidation {
            message: "threads must be at least 1".to_string(),
        });
    }

    let detector_program = args
        .detector
        .clone()
        .or_else(|| config.detector.program.clone())
        .ok_or(Error::DetectorNotConfigured)?;
    let detector_args = if args.detector_args.is_empty() {
        config.detector.args.clone()
    } else {
        args.detector_args.clone()
    };

    Ok(PredictRequest {
        inference_graph: args.inference_graph.clone(),
        label_map: args.label_map.clone(),
        images: args.images.clone(),
        output: args.output.clone(),
        debug_output: args.debug_output.clone(),
        mask: args.mask.clone(),
        format: args.format.unwrap_or(defaults.format),
        options: PipelineOptions {
            chip_size,
            overlap,
            channel_order,
            score_thresh: args.score_thresh.unwrap_or(defaults.score_thresh),
            merge_thresh: args.merge_thresh.unwrap_or(defaults.merge_thresh),
        },
        detector_program,
        detector_args,
        threads,
        work_root: args.work_dir.clone().or_else(|| config.paths.work_dir.clone()),
        save_temp: args.save_temp || defaults.save_temp,
        progress: !quiet && !args.no_progress,
    })
}

fn handle_config_command(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init => {
            let path = config_file_path()?;
            if path.exists() {
                println!("Configuration file already exists: {}", path.display());
            } else {
                let saved_path = save_default_config(&Config::default())?;
                println!("Created configuration file: {}", saved_path.display());
                println!("\nNext steps:");
                println!("  set [detector] program in the file, then run");
                println!("  geochip predict <model> <labels.pbtxt> <image>... <output.geojson>");
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_default_config()?;
            let text = toml::to_string_pretty(&config)
                .map_err(|e| Error::ConfigSerialize { source: e })?;
            println!("{text}");
            Ok(())
        }
        ConfigAction::Path => {
            let path = config_file_path()?;
            println!("{}", path.display());
            Ok(())
        }
    }
}
