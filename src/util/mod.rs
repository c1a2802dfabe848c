//! Small helpers around the frame loop: resolutions, a stop key and an fps counter.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Instant,
};

use log::{debug, info};
use serde::Deserialize;

/// Pixel layout of a color frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorFormat {
    Rgb,
    #[default]
    Bgr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Resolution {
    width: u32,
    height: u32,
}
impl Resolution {
    pub const fn new(w: u32, h: u32) -> Self {
        Self {
            width: w,
            height: h,
        }
    }
    pub const fn width(&self) -> u32 {
        self.width
    }
    pub const fn height(&self) -> u32 {
        self.height
    }
    pub fn to_array(&self) -> [u32; 2] {
        [self.width, self.height]
    }
    pub fn to_tuple(&self) -> (u32, u32) {
        (self.width, self.height)
    }
    pub const fn to_pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
    /// Returns true if the pixel `(x, y)` lies inside the frame.
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64
    }
}
impl Default for Resolution {
    fn default() -> Self {
        DEFAULT_RESOLUTION
    }
}

/// HD720, the resolution the stereo camera delivers by default.
pub const DEFAULT_RESOLUTION: Resolution = Resolution::new(1280, 720);

/// Pixel at the center of a `width` x `height` frame (integer division, like the camera SDK).
pub fn frame_center(width: u32, height: u32) -> (i64, i64) {
    ((width / 2) as i64, (height / 2) as i64)
}

/// Creates a new vector of length `size` with capacity set to `size` and initializes it with `init`.
pub fn new_fixed_vec<T: Clone>(size: usize, init: T) -> Vec<T> {
    let mut v = Vec::<T>::with_capacity(size);
    v.resize(size, init);
    v
}

/// Simple keyboard event handler. A background thread reads lines from stdin and raises the flag once a line equal to `key` was entered.
pub struct KeyboardEvent {
    pressed: Arc<AtomicBool>,
}
impl KeyboardEvent {
    /// Create a new Event for the keystroke `key` (followed by Enter).
    pub fn new(key: &str) -> Self {
        let pressed = Arc::new(AtomicBool::new(false));
        let pressed_cl = pressed.clone();
        let key = String::from(key.trim());
        std::thread::spawn(move || {
            let mut input = String::new();
            loop {
                input.clear();
                match std::io::stdin().read_line(&mut input) {
                    // stdin closed, nobody can press the key anymore
                    Ok(0) | Err(_) => break,
                    Ok(_) if input.trim() == key => {
                        pressed_cl.store(true, Ordering::Relaxed);
                        break;
                    }
                    Ok(_) => debug!("ignoring input {:?}", input.trim()),
                }
            }
        });
        Self { pressed }
    }

    /// The shared flag, to be handed to the frame loop as its stop signal.
    pub fn flag(&self) -> Arc<AtomicBool> {
        self.pressed.clone()
    }
}

/// A counter to be used in the main loop to get fps and frame count info. `tick()` logs every `info_interval`th call.
pub struct Counter {
    count: u64,
    now: Instant,
    info_interval: u64,
}
impl Counter {
    pub fn new(info_interval: u64) -> Self {
        Self {
            count: 0,
            now: Instant::now(),
            info_interval: info_interval.max(1),
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Counts one frame. Returns the fps over the last interval whenever an interval is completed.
    pub fn tick(&mut self) -> Option<f64> {
        self.count += 1;
        if self.count % self.info_interval == 0 {
            let elapsed = self.now.elapsed().as_secs_f64();
            self.now = Instant::now();
            let fps = self.info_interval as f64 / elapsed.max(f64::EPSILON);
            info!("fps: {:.1}  frame: {}", fps, self.count);
            Some(fps)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_uses_integer_division() {
        assert_eq!(frame_center(1280, 720), (640, 360));
        assert_eq!(frame_center(5, 3), (2, 1));
    }

    #[test]
    fn resolution_bounds() {
        let r = Resolution::new(4, 3);
        assert_eq!(r.to_pixel_count(), 12);
        assert!(r.contains(0, 0));
        assert!(r.contains(3, 2));
        assert!(!r.contains(4, 0));
        assert!(!r.contains(-1, 1));
    }

    #[test]
    fn counter_reports_every_interval() {
        let mut c = Counter::new(3);
        assert!(c.tick().is_none());
        assert!(c.tick().is_none());
        assert!(c.tick().is_some());
        assert_eq!(c.count(), 3);
    }

    #[test]
    fn fixed_vec_is_filled() {
        let v = new_fixed_vec(4, 7u8);
        assert_eq!(v, vec![7, 7, 7, 7]);
        assert!(v.capacity() >= 4);
    }
}
