//! The rectangular region of interest and the grid of pixels sampled from it.

use serde::Deserialize;

use crate::camera::frame::{INVALID_POINT, PointCloud};
use crate::error::{Error, Result};
use crate::estimator::Point3;
use crate::util::{Resolution, frame_center};

/// Half width and half height of the default region in pixels.
pub const DEFAULT_DIAG: u32 = 40;
/// Default spacing of the sample grid in pixels.
pub const DEFAULT_STRIDE: u32 = 10;

/// Pixel coordinate `(x, y)`, may lie outside of the frame.
pub type Pixel = (i64, i64);

/// A square window of `2 * diag + 1` pixels around `center`, sampled every `stride` pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    center: Pixel,
    diag: u32,
    stride: u32,
}
impl Region {
    pub fn new(center: Pixel, diag: u32, stride: u32) -> Result<Self> {
        if stride == 0 {
            return Err(Error::InvalidStride);
        }
        Ok(Self {
            center,
            diag,
            stride,
        })
    }

    /// Region around the center of a frame of `resolution`.
    pub fn centered(resolution: Resolution, diag: u32, stride: u32) -> Result<Self> {
        let (w, h) = resolution.to_tuple();
        Self::new(frame_center(w, h), diag, stride)
    }

    /// The same region moved by `(dx, dy)` pixels.
    pub fn offset(&self, dx: i64, dy: i64) -> Self {
        Self {
            center: (self.center.0 + dx, self.center.1 + dy),
            ..*self
        }
    }

    pub fn center(&self) -> Pixel {
        self.center
    }

    pub fn diag(&self) -> u32 {
        self.diag
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// `(top_left, bottom_right)`, both inside the region.
    pub fn corners(&self) -> (Pixel, Pixel) {
        let d = self.diag as i64;
        let (cx, cy) = self.center;
        ((cx - d, cy - d), (cx + d, cy + d))
    }

    /// Top right corner, where the distance label is placed.
    pub fn top_right(&self) -> Pixel {
        let (tl, br) = self.corners();
        (br.0, tl.1)
    }

    /// Sample positions, column by column. Both edges are included when `2 * diag` is a multiple of `stride`.
    pub fn grid(&self) -> impl Iterator<Item = Pixel> + '_ {
        let (tl, br) = self.corners();
        let step = self.stride as usize;
        (tl.0..=br.0)
            .step_by(step)
            .flat_map(move |col| (tl.1..=br.1).step_by(step).map(move |row| (col, row)))
    }

    /// Number of positions returned by `grid()`.
    pub fn sample_count(&self) -> usize {
        let per_axis = 2 * u64::from(self.diag) / u64::from(self.stride) + 1;
        per_axis
            .checked_mul(per_axis)
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(usize::MAX)
    }

    /// Looks up every grid position in `cloud`. Positions outside of the frame become invalid points, so they are filtered like any other pixel without depth.
    pub fn sample(&self, cloud: &PointCloud) -> Vec<Point3> {
        self.sample_with(|x, y| cloud.get_value(x, y))
    }

    /// Like `sample()` but with an arbitrary per pixel lookup, e.g. `DepthCamera::retrieve_depth_point`.
    pub fn sample_with<F>(&self, mut lookup: F) -> Vec<Point3>
    where
        F: FnMut(i64, i64) -> Result<Point3>,
    {
        self.grid()
            .map(|(x, y)| lookup(x, y).unwrap_or(INVALID_POINT))
            .collect()
    }
}

/// Region geometry as it appears in the config file. The center defaults to the frame center.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    pub diag: u32,
    pub stride: u32,
    /// Offset of the region center from the frame center.
    pub offset: (i64, i64),
}
impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            diag: DEFAULT_DIAG,
            stride: DEFAULT_STRIDE,
            offset: (0, 0),
        }
    }
}
impl RegionConfig {
    /// Fails if the stride is 0 or the region is wider than the longer side of a `resolution` frame.
    pub fn check(&self, resolution: Resolution) -> Result<()> {
        if self.stride == 0 {
            return Err(Error::InvalidStride);
        }
        let span = 2 * u64::from(self.diag) + 1;
        let longest = u64::from(resolution.width().max(resolution.height()));
        if span > longest {
            return Err(Error::InvalidConfig(format!(
                "region of {} pixels does not fit into a {}x{} frame",
                span,
                resolution.width(),
                resolution.height()
            )));
        }
        Ok(())
    }

    pub fn build(&self, resolution: Resolution) -> Result<Region> {
        self.check(resolution)?;
        let (dx, dy) = self.offset;
        Ok(Region::centered(resolution, self.diag, self.stride)?.offset(dx, dy))
    }
}
