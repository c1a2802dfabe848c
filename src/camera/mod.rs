//! Interface to the stereo camera. The depth reconstruction itself happens inside the camera SDK, this crate only consumes the resulting point cloud through the `DepthCamera` trait.

pub mod frame;
pub mod synthetic;

use serde::Deserialize;

use crate::error::Result;
use crate::estimator::Point3;
use crate::util::{ColorFormat, DEFAULT_RESOLUTION, Resolution};

use frame::Frame;

/// Depth reconstruction quality requested from the SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthMode {
    #[default]
    Performance,
    Quality,
    Ultra,
}

/// `Fill` asks the SDK to interpolate holes in the depth map, `Standard` keeps them as invalid values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensingMode {
    #[default]
    Standard,
    Fill,
}

/// Unit of the point cloud coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Millimeter,
    #[default]
    Centimeter,
    Meter,
}
impl Unit {
    /// How many of this unit make up one centimeter.
    pub fn per_cm(&self) -> f32 {
        match self {
            Unit::Millimeter => 10.0,
            Unit::Centimeter => 1.0,
            Unit::Meter => 0.01,
        }
    }
    pub fn from_cm(&self, cm: f32) -> f32 {
        cm * self.per_cm()
    }
    pub fn to_cm(&self, value: f32) -> f32 {
        value / self.per_cm()
    }
}

/// Which of the two sensors delivers the color image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Left,
    Right,
}

/// Brightness settings accepted by the camera.
pub const BRIGHTNESS_RANGE: std::ops::RangeInclusive<u8> = 0..=8;

/// Everything that is passed to the camera when opening it. Immutable once the camera is open.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub resolution: Resolution,
    pub fps: u32,
    pub depth_mode: DepthMode,
    pub sensing_mode: SensingMode,
    pub unit: Unit,
    pub brightness: u8,
    pub view: View,
    pub color_format: ColorFormat,
}
impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            fps: 30,
            depth_mode: DepthMode::Performance,
            sensing_mode: SensingMode::Standard,
            unit: Unit::Centimeter,
            brightness: 4,
            view: View::Left,
            color_format: ColorFormat::Bgr,
        }
    }
}

/// Static information reported by a camera after opening it.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraInfo {
    pub model: String,
    pub serial_number: u32,
    pub firmware: u32,
    pub resolution: Resolution,
    pub fps: u32,
}

/// A stereo camera delivering color images and point clouds.
///
/// The expected call order per frame is `grab()` followed by any of the `retrieve_*` functions, which all refer to the most recently grabbed frame.
pub trait DepthCamera {
    /// Opens the camera with `config`. Failing to open is fatal for the caller.
    fn open(&mut self, config: &CameraConfig) -> Result<CameraInfo>;

    /// Captures the next frame. An error means no new frame is available, retrieving afterwards yields the previous frame.
    fn grab(&mut self) -> Result<()>;

    /// Copies the color image of the current frame into `frame`.
    fn retrieve_image(&self, frame: &mut Frame) -> Result<()>;

    /// Copies the point cloud of the current frame into `frame`.
    fn retrieve_point_cloud(&self, frame: &mut Frame) -> Result<()>;

    /// The 3D point seen at pixel `(x, y)` of the current frame.
    fn retrieve_depth_point(&self, x: i64, y: i64) -> Result<Point3>;

    /// Resolution of the frames delivered after `open()`.
    fn resolution(&self) -> Resolution;

    /// The unit of the point cloud coordinates.
    fn unit(&self) -> Unit;

    fn close(&mut self);
}

/// Name of a camera status code.
pub fn status_message(code: i32) -> &'static str {
    match code {
        0 => "SUCCESS",
        1 => "FAILURE",
        2 => "NO_GPU_COMPATIBLE",
        3 => "NOT_ENOUGH_GPU_MEMORY",
        4 => "CAMERA_NOT_DETECTED",
        5 => "SENSOR_NOT_DETECTED",
        6 => "INVALID_RESOLUTION",
        7 => "LOW_USB_BANDWIDTH",
        8 => "CALIBRATION_FILE_NOT_AVAILABLE",
        9 => "INVALID_CALIBRATION_FILE",
        10 => "INVALID_SVO_FILE",
        11 => "SVO_RECORDING_ERROR",
        12 => "INVALID_COORDINATE_SYSTEM",
        13 => "INVALID_FIRMWARE",
        14 => "INVALID_FUNCTION_PARAMETERS",
        15 => "NOT_A_NEW_FRAME",
        16 => "CUDA_ERROR",
        17 => "CAMERA_NOT_INITIALIZED",
        18 => "NVIDIA_DRIVER_OUT_OF_DATE",
        19 => "INVALID_FUNCTION_CALL",
        20 => "CORRUPTED_SDK_INSTALLATION",
        21 => "INCOMPATIBLE_SDK_VERSION",
        22 => "END_OF_SVO_FILE_REACHED",
        _ => "OTHERS",
    }
}
