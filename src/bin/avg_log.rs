//! Averages the values of a distance log.

use std::path::PathBuf;

use clap::Parser;

use roi_distance::config::Config;
use roi_distance::distance_log::{HeaderPolicy, aggregate_file};

#[derive(Parser)]
#[command(name = "avg-log")]
#[command(about = "Mean of the first field of every line of a distance log")]
#[command(version)]
struct Cli {
    /// The distance log. Defaults to `log_path` of the config.
    path: Option<PathBuf>,

    /// Config file, its `log_path` and `log_header` are used unless given on the command line.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ignore the first line. The measuring binary never writes a header, use this only for logs from elsewhere.
    #[arg(long)]
    skip_header: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let path = cli.path.unwrap_or(config.log_path);
    let header = if cli.skip_header {
        HeaderPolicy::SkipFirstLine
    } else {
        config.log_header
    };

    let summary = aggregate_file(&path, header)?;
    log::debug!("{} values in {}", summary.count, path.display());
    println!("Avg height: {:.2} cm", summary.mean);
    Ok(())
}
