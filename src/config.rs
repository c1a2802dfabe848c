//! Runtime configuration, read from a TOML file. Every field has a default, so an empty file is a valid configuration.
//!
//! ```toml
//! threshold_cm = 120.0
//! log_path = "avg_log.txt"
//!
//! [camera]
//! resolution = { width = 1280, height = 720 }
//! depth_mode = "performance"
//! unit = "centimeter"
//!
//! [region]
//! diag = 40
//! stride = 10
//! offset = [0, 0]
//! ```

use std::{fs, path::Path, path::PathBuf, time::Duration};

use serde::Deserialize;

use crate::camera::{BRIGHTNESS_RANGE, CameraConfig};
use crate::distance_log::{DEFAULT_LOG_PATH, HeaderPolicy};
use crate::error::{Error, Result};
use crate::estimator::{DEFAULT_THRESHOLD_CM, check_threshold};
use crate::region::RegionConfig;

/// Settings of the frame loop.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Stop after this many frames, run until stopped otherwise.
    pub max_frames: Option<u64>,
    /// Pause after each frame in ms.
    pub frame_delay_ms: u64,
    /// Capture on a separate thread, handing frames over through a bounded queue.
    pub pipelined: bool,
    pub queue_depth: usize,
    /// Log fps every this many frames.
    pub info_interval: u64,
    /// Consecutive failed grabs after which the loop gives up, `None` retries forever.
    pub max_failed_grabs: Option<u32>,
}
impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_frames: None,
            frame_delay_ms: 10,
            pipelined: false,
            queue_depth: 4,
            info_interval: 30,
            max_failed_grabs: None,
        }
    }
}
impl PipelineConfig {
    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.frame_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Samples at or beyond this distance (cm) are not averaged.
    pub threshold_cm: f32,
    pub log_path: PathBuf,
    /// Header handling of the log aggregation.
    pub log_header: HeaderPolicy,
    pub camera: CameraConfig,
    pub region: RegionConfig,
    /// Offsets from the frame center of single point markers.
    pub markers: Vec<(i64, i64)>,
    pub pipeline: PipelineConfig,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            threshold_cm: DEFAULT_THRESHOLD_CM,
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            log_header: HeaderPolicy::None,
            camera: CameraConfig::default(),
            region: RegionConfig::default(),
            markers: Vec::new(),
            pipeline: PipelineConfig::default(),
        }
    }
}
impl Config {
    /// Reads and validates the config file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the values serde cannot check.
    pub fn validate(&self) -> Result<()> {
        check_threshold(self.threshold_cm)?;
        self.region.check(self.camera.resolution)?;
        if self.pipeline.queue_depth == 0 {
            return Err(Error::InvalidConfig("queue_depth must be > 0".to_string()));
        }
        if !BRIGHTNESS_RANGE.contains(&self.camera.brightness) {
            return Err(Error::InvalidConfig(format!(
                "brightness {} outside of {:?}",
                self.camera.brightness, BRIGHTNESS_RANGE
            )));
        }
        Ok(())
    }
}
