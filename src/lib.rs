#![doc = include_str!("../README.md")]

pub mod camera;
pub mod config;
pub mod distance_log;
pub mod error;
pub mod estimator;
pub mod overlay;
pub mod pipeline;
pub mod region;
pub mod util;

pub use error::{Error, Result};
pub use estimator::{Estimate, Point3, estimate, point_distance};
pub use util::{ColorFormat, DEFAULT_RESOLUTION, Resolution};
