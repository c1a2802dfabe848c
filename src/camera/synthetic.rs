//! A camera without hardware. It renders a plane in front of the sensor, optionally with a far background band and a fraction of pixels without depth, so the whole frame loop can run and be tested offline.

use log::{debug, info};

use crate::error::{Error, Result};
use crate::estimator::{Point3, magnitude};
use crate::util::Resolution;

use super::frame::{Frame, INVALID_POINT, PointCloud, get_normalized_depth};
use super::{CameraConfig, CameraInfo, DepthCamera, Unit, status_message};

const NOT_A_NEW_FRAME: i32 = 15;

/// Scene rendered by `SyntheticCamera`. All lengths in cm.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    /// Depth of the plane at the image center.
    pub distance_cm: f32,
    /// Depth change per pixel row below the center, a tilted floor has a positive value.
    pub tilt_cm_per_row: f32,
    /// Depth change between consecutive frames.
    pub drift_cm_per_frame: f32,
    /// Share of pixels without depth, in `[0, 1]`.
    pub invalid_ratio: f32,
    /// Columns from this x on show the background at `background_cm` instead of the plane.
    pub background: Option<(u32, f32)>,
    /// Focal length in pixels.
    pub focal_px: f32,
}
impl Default for Scene {
    fn default() -> Self {
        Self {
            distance_cm: 80.0,
            tilt_cm_per_row: 0.0,
            drift_cm_per_frame: 0.0,
            invalid_ratio: 0.05,
            background: None,
            focal_px: 700.0,
        }
    }
}

pub struct SyntheticCamera {
    scene: Scene,
    config: Option<CameraConfig>,
    frame: Frame,
    grabbed: u64,
    failing_grabs: u32,
}
impl SyntheticCamera {
    pub fn new(scene: Scene) -> Self {
        Self {
            scene,
            config: None,
            frame: Frame::new(Resolution::new(0, 0)),
            grabbed: 0,
            failing_grabs: 0,
        }
    }

    /// The next `count` grabs fail, like a camera that has no new frame ready.
    pub fn fail_next_grabs(&mut self, count: u32) {
        self.failing_grabs = count;
    }

    /// Number of successful grabs so far.
    pub fn grabbed(&self) -> u64 {
        self.grabbed
    }

    // private functions_______________________________________________________

    fn config(&self) -> Result<&CameraConfig> {
        self.config.as_ref().ok_or(Error::CameraNotOpened)
    }

    fn render(&mut self) -> Result<()> {
        let config = self.config()?.clone();
        let resolution = config.resolution;
        let (w, h) = resolution.to_tuple();
        let (cx, cy) = (w as f32 / 2.0, h as f32 / 2.0);
        let distance = self.scene.distance_cm + self.scene.drift_cm_per_frame * self.grabbed as f32;

        let mut cloud = PointCloud::new(resolution);
        for (i, p) in cloud.points_mut().iter_mut().enumerate() {
            let (x, y) = ((i % w as usize) as u32, (i / w as usize) as u32);
            if is_hole(x, y, self.grabbed, self.scene.invalid_ratio) {
                *p = INVALID_POINT;
                continue;
            }
            let z = match self.scene.background {
                Some((from_x, background_cm)) if x >= from_x => background_cm,
                _ => distance + self.scene.tilt_cm_per_row * (y as f32 - cy),
            };
            let point_cm = Point3::new(
                (x as f32 - cx) * z / self.scene.focal_px,
                (y as f32 - cy) * z / self.scene.focal_px,
                z,
            );
            *p = Point3::from(point_cm.coords * config.unit.per_cm());
        }

        // gray image: near is bright
        let mut depth = vec![0u8; resolution.to_pixel_count()];
        let far = config.unit.from_cm(2.0 * distance.max(1.0));
        get_normalized_depth(&cloud, 0.0, far, &mut depth);
        let mut image = vec![0u8; 3 * depth.len()];
        for (px, d) in image.chunks_exact_mut(3).zip(depth) {
            px.fill(if d == 0 { 0 } else { 255 - d });
        }

        self.frame = Frame {
            index: self.grabbed,
            image,
            point_cloud: cloud,
        };
        Ok(())
    }
}

impl DepthCamera for SyntheticCamera {
    fn open(&mut self, config: &CameraConfig) -> Result<CameraInfo> {
        let (w, h) = config.resolution.to_tuple();
        if w == 0 || h == 0 {
            return Err(Error::Camera(format!("invalid resolution {w}x{h}")));
        }
        if !super::BRIGHTNESS_RANGE.contains(&config.brightness) {
            return Err(Error::Camera(format!(
                "brightness {} outside of {:?}",
                config.brightness,
                super::BRIGHTNESS_RANGE
            )));
        }
        self.config = Some(config.clone());
        self.frame = Frame::new(config.resolution);
        self.grabbed = 0;

        let info = CameraInfo {
            model: "synthetic".to_string(),
            serial_number: 0,
            firmware: 0,
            resolution: config.resolution,
            fps: config.fps,
        };
        info!("Resolution: {}, {}.", w, h);
        info!("Camera FPS: {}.", info.fps);
        info!("Firmware: {}.", info.firmware);
        info!("Serial number: {}.", info.serial_number);
        debug!("camera config: {:?}", config);
        Ok(info)
    }

    fn grab(&mut self) -> Result<()> {
        self.config()?;
        if self.failing_grabs > 0 {
            self.failing_grabs -= 1;
            return Err(Error::Grab {
                code: NOT_A_NEW_FRAME,
                message: status_message(NOT_A_NEW_FRAME),
            });
        }
        self.render()?;
        self.grabbed += 1;
        Ok(())
    }

    fn retrieve_image(&self, frame: &mut Frame) -> Result<()> {
        self.config()?;
        frame.index = self.frame.index;
        frame.image.clone_from(&self.frame.image);
        Ok(())
    }

    fn retrieve_point_cloud(&self, frame: &mut Frame) -> Result<()> {
        self.config()?;
        frame.index = self.frame.index;
        frame.point_cloud.clone_from(&self.frame.point_cloud);
        Ok(())
    }

    fn retrieve_depth_point(&self, x: i64, y: i64) -> Result<Point3> {
        self.config()?;
        self.frame.point_cloud.get_value(x, y)
    }

    fn resolution(&self) -> Resolution {
        self.config
            .as_ref()
            .map(|c| c.resolution)
            .unwrap_or(Resolution::new(0, 0))
    }

    fn unit(&self) -> Unit {
        self.config.as_ref().map(|c| c.unit).unwrap_or_default()
    }

    fn close(&mut self) {
        if self.config.take().is_some() {
            info!("Closed camera");
        }
    }
}

/// Deterministic pseudo random hole pattern, different for every frame.
fn is_hole(x: u32, y: u32, frame: u64, ratio: f32) -> bool {
    if ratio <= 0.0 {
        return false;
    }
    let mut v = (x as u64) << 32 ^ (y as u64) ^ frame.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    v ^= v >> 33;
    v = v.wrapping_mul(0xff51_afd7_ed55_8ccd);
    v ^= v >> 33;
    v = v.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    v ^= v >> 33;
    ((v % 10_000) as f32) < ratio * 10_000.0
}

/// Distance of the plane at the image center for the frame that was grabbed last, mostly useful in tests.
pub fn center_distance(camera: &SyntheticCamera) -> Option<f32> {
    let (w, h) = camera.resolution().to_tuple();
    let p = camera.retrieve_depth_point(w as i64 / 2, h as i64 / 2).ok()?;
    let d = magnitude(&p);
    d.is_finite().then(|| camera.unit().to_cm(d))
}
