//! Frame data handed out by a camera: the color image and the point cloud.

use std::iter::zip;

use crate::error::{Error, Result};
use crate::estimator::{Point3, magnitude};
use crate::util::{Resolution, new_fixed_vec};

/// Point position of a pixel without depth data.
pub const INVALID_POINT: Point3 = Point3::new(f32::NAN, f32::NAN, f32::NAN);

/// Mapping from pixel coordinate to 3D position, row major.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloud {
    resolution: Resolution,
    points: Vec<Point3>,
}
impl PointCloud {
    /// A cloud of `resolution` where every pixel is invalid.
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            points: new_fixed_vec(resolution.to_pixel_count(), INVALID_POINT),
        }
    }

    /// Wraps `points` (row major). Fails if the number of points does not match the resolution.
    pub fn from_points(resolution: Resolution, points: Vec<Point3>) -> Result<Self> {
        if points.len() != resolution.to_pixel_count() {
            return Err(Error::PointCountMismatch {
                expected: resolution.to_pixel_count(),
                got: points.len(),
            });
        }
        Ok(Self { resolution, points })
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    pub fn points_mut(&mut self) -> &mut [Point3] {
        &mut self.points
    }

    /// The point at pixel `(x, y)`. Pixels outside of the frame are an error, pixels without depth return NaN coordinates.
    pub fn get_value(&self, x: i64, y: i64) -> Result<Point3> {
        self.index(x, y).map(|i| self.points[i])
    }

    fn index(&self, x: i64, y: i64) -> Result<usize> {
        if !self.resolution.contains(x, y) {
            return Err(Error::PixelOutOfBounds {
                x,
                y,
                width: self.resolution.width(),
                height: self.resolution.height(),
            });
        }
        Ok(y as usize * self.resolution.width() as usize + x as usize)
    }
}

/// One grabbed frame. `image` holds 3 bytes per pixel in the camera's color format.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    pub image: Vec<u8>,
    pub point_cloud: PointCloud,
}
impl Frame {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            index: 0,
            image: new_fixed_vec(3 * resolution.to_pixel_count(), 0u8),
            point_cloud: PointCloud::new(resolution),
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.point_cloud.resolution()
    }

    /// Checks if the image holds 3 bytes for each pixel of the point cloud.
    pub fn check_pixel_count(&self) -> bool {
        self.image.len() == 3 * self.point_cloud.resolution().to_pixel_count()
    }
}

/// Creates `normalized_depth` data array from `cloud`: distances are clamped to `[min_depth, max_depth]` and scaled to `0..=255`. Pixels without depth become 0.
pub fn get_normalized_depth(
    cloud: &PointCloud,
    min_depth: f32,
    max_depth: f32,
    normalized_depth: &mut [u8],
) {
    let range = (max_depth - min_depth).max(f32::EPSILON);
    for (ndi, p) in zip(normalized_depth, cloud.points()) {
        let d = magnitude(p);
        *ndi = if d.is_finite() {
            ((d.clamp(min_depth, max_depth) - min_depth) * 255.0 / range).floor() as u8
        } else {
            0
        };
    }
}

/// Creates `bgr` data array from `frame`.
pub fn get_bgr(frame: &Frame, bgr: &mut [u8]) {
    for (bgri, pi) in zip(bgr, &frame.image) {
        *bgri = *pi;
    }
}
