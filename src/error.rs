//! Error type shared by the whole crate.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Threshold must be a finite, strictly positive distance.
    #[error("invalid threshold {0}: must be finite and > 0")]
    InvalidThreshold(f32),

    /// `estimate` was called without any samples at all.
    #[error("sample set is empty")]
    EmptySampleSet,

    #[error("region stride must be > 0")]
    InvalidStride,

    #[error("camera error: {0}")]
    Camera(String),

    #[error("camera is not opened")]
    CameraNotOpened,

    /// A grab did not produce a new frame. Carries the provider status code.
    #[error("grab failed with status {code} ({message})")]
    Grab { code: i32, message: &'static str },

    #[error("pixel ({x}, {y}) is outside of the {width}x{height} frame")]
    PixelOutOfBounds {
        x: i64,
        y: i64,
        width: u32,
        height: u32,
    },

    #[error("expected {expected} points, got {got}")]
    PointCountMismatch { expected: usize, got: usize },

    #[error("log contains no values")]
    EmptyLog,

    #[error("line {line}: cannot parse {field:?} as a distance")]
    Parse { line: usize, field: String },

    #[error("failed to parse config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("log sink lock poisoned")]
    LockPoisoned,

    #[error("capture thread terminated unexpectedly")]
    CaptureThread,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
