//! Measures the average distance to the region of interest frame by frame and appends it to the distance log.

use std::path::PathBuf;

use clap::Parser;
use log::{error, info};

use roi_distance::camera::synthetic::{Scene, SyntheticCamera};
use roi_distance::config::Config;
use roi_distance::distance_log::DistanceLog;
use roi_distance::overlay::LogDisplay;
use roi_distance::pipeline::Pipeline;
use roi_distance::util::KeyboardEvent;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "roi-distance")]
#[command(about = "Average distance to a region in front of the depth camera")]
#[command(version)]
struct Cli {
    /// TOML config file. Defaults are used for everything not set.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Distance log to append to.
    #[arg(long)]
    log: Option<PathBuf>,

    /// Samples at or beyond this distance in cm are ignored.
    #[arg(long)]
    threshold: Option<f32>,

    /// Stop after this many frames.
    #[arg(long)]
    frames: Option<u64>,

    /// Capture on a separate thread.
    #[arg(long)]
    pipelined: bool,

    /// Distance of the synthetic scene in cm.
    #[arg(long, default_value_t = 80.0)]
    scene_distance: f32,

    /// Share of synthetic pixels without depth.
    #[arg(long, default_value_t = 0.05)]
    scene_holes: f32,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(log) = cli.log {
        config.log_path = log;
    }
    if let Some(threshold) = cli.threshold {
        config.threshold_cm = threshold;
    }
    if cli.frames.is_some() {
        config.pipeline.max_frames = cli.frames;
    }
    config.pipeline.pipelined |= cli.pipelined;

    let log = DistanceLog::open(&config.log_path)?;
    let pipeline = Pipeline::new(config)?;

    let mut camera = SyntheticCamera::new(Scene {
        distance_cm: cli.scene_distance,
        invalid_ratio: cli.scene_holes,
        ..Default::default()
    });

    let stop = KeyboardEvent::new("q");
    info!("press q and Enter to quit");

    let report = pipeline.run(&mut camera, &mut LogDisplay, Some(&log), &stop.flag())?;
    info!(
        "{} frames written to {}",
        report.frames,
        log.path().display()
    );
    Ok(())
}
