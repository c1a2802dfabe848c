//! Annotations drawn on top of the live image. The estimator only produces numbers, this module turns them into drawing primitives and rasterizes the geometric ones into a 3 channel image.

use log::{info, warn};

use crate::camera::frame::Frame;
use crate::error::Result;
use crate::estimator::Estimate;
use crate::region::{Pixel, Region};
use crate::util::Resolution;

/// Color triple in the channel order of the image (BGR by default).
pub type Color = [u8; 3];

pub const RED: Color = [0, 0, 255];
pub const GREEN: Color = [0, 255, 0];

/// Radius of the dot marking a measured point.
pub const MARKER_RADIUS: u32 = 5;

/// Label shown when a single point has no depth. The camera cannot see closer than about 70 cm.
pub const TOO_CLOSE_LABEL: &str = "< 70 cm";

#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    /// `thickness == None` draws a filled disc.
    Circle {
        center: Pixel,
        radius: u32,
        color: Color,
        thickness: Option<u32>,
    },
    Rectangle {
        top_left: Pixel,
        bottom_right: Pixel,
        color: Color,
        thickness: u32,
    },
    /// Text with its baseline starting at `origin`. Rendering text is left to the display sink.
    Text {
        origin: Pixel,
        text: String,
        color: Color,
    },
}

/// Something that can show a frame together with its annotations, e.g. a window.
pub trait DisplaySink {
    fn show(&mut self, frame: &Frame, annotations: &[Annotation]) -> Result<()>;
}

/// A display for headless runs. Writes the text annotations to the log.
#[derive(Debug, Default)]
pub struct LogDisplay;

impl DisplaySink for LogDisplay {
    fn show(&mut self, frame: &Frame, annotations: &[Annotation]) -> Result<()> {
        for a in annotations {
            if let Annotation::Text { text, .. } = a {
                info!("frame {}: {}", frame.index, text);
            }
        }
        Ok(())
    }
}

/// Formats an average distance the way it is shown next to the region.
pub fn region_label(estimate: &Estimate) -> String {
    match estimate.distance() {
        Some(d) => format!("{:.2} cm", d),
        None => "-- cm".to_string(),
    }
}

/// Red frame around `region` plus the average distance in green at its top right corner.
pub fn annotate_region(region: &Region, estimate: &Estimate) -> Vec<Annotation> {
    let (top_left, bottom_right) = region.corners();
    vec![
        Annotation::Rectangle {
            top_left,
            bottom_right,
            color: RED,
            thickness: 2,
        },
        Annotation::Text {
            origin: region.top_right(),
            text: region_label(estimate),
            color: GREEN,
        },
    ]
}

/// Marker for a single measured point. With a valid `distance` (in cm, already rounded) a ring whose radius shrinks as the object comes closer is drawn around the dot, otherwise the "too close" label.
pub fn annotate_point(center: Pixel, distance: Option<f32>, color: Color) -> Vec<Annotation> {
    let dot = Annotation::Circle {
        center,
        radius: MARKER_RADIUS,
        color,
        thickness: None,
    };
    match distance {
        Some(d) => vec![
            dot,
            Annotation::Circle {
                center,
                radius: (d - 50.0).max(0.0) as u32,
                color,
                thickness: Some(2),
            },
            Annotation::Text {
                origin: (center.0, center.1 - 30),
                text: format!("{} cm", d),
                color: GREEN,
            },
        ],
        None => {
            warn!("cannot estimate distance at {:?}, move the camera", center);
            vec![
                dot,
                Annotation::Text {
                    origin: (center.0, center.1 - 10),
                    text: TOO_CLOSE_LABEL.to_string(),
                    color: RED,
                },
            ]
        }
    }
}

/// Draws all circles and rectangles into `image` (3 bytes per pixel). Shapes are clipped at the image border, text is skipped.
pub fn render(image: &mut [u8], resolution: Resolution, annotations: &[Annotation]) {
    for a in annotations {
        match a {
            Annotation::Circle {
                center,
                radius,
                color,
                thickness,
            } => draw_circle(image, resolution, *center, *radius, *color, *thickness),
            Annotation::Rectangle {
                top_left,
                bottom_right,
                color,
                thickness,
            } => draw_rectangle(image, resolution, *top_left, *bottom_right, *color, *thickness),
            Annotation::Text { .. } => {}
        }
    }
}

// private functions_______________________________________________________

fn put_pixel(image: &mut [u8], resolution: Resolution, x: i64, y: i64, color: Color) {
    if resolution.contains(x, y) {
        let i = 3 * (y as usize * resolution.width() as usize + x as usize);
        if let Some(px) = image.get_mut(i..i + 3) {
            px.copy_from_slice(&color);
        }
    }
}

fn draw_circle(
    image: &mut [u8],
    resolution: Resolution,
    (cx, cy): Pixel,
    radius: u32,
    color: Color,
    thickness: Option<u32>,
) {
    let (w, h) = resolution.to_tuple();
    // a larger circle cannot touch the frame any differently
    let diagonal = f64::from(w).hypot(f64::from(h)).ceil() as i64;
    let r = i64::from(radius).min(diagonal);
    let t = i64::from(thickness.unwrap_or(0)).min(diagonal);
    let half = t as f64 / 2.0;
    // ring of `thickness` pixels centered on the radius
    let (inner, outer) = match thickness {
        None => (-1.0, (r * r) as f64),
        Some(_) => ((r as f64 - half).max(0.0).powi(2), (r as f64 + half).powi(2)),
    };
    let reach = r + t;
    let (x0, x1) = ((cx - reach).max(0), (cx + reach).min(i64::from(w) - 1));
    let (y0, y1) = ((cy - reach).max(0), (cy + reach).min(i64::from(h) - 1));
    for y in y0..=y1 {
        for x in x0..=x1 {
            let d2 = ((x - cx) * (x - cx) + (y - cy) * (y - cy)) as f64;
            if d2 <= outer && d2 >= inner {
                put_pixel(image, resolution, x, y, color);
            }
        }
    }
}

fn draw_rectangle(
    image: &mut [u8],
    resolution: Resolution,
    (x0, y0): Pixel,
    (x1, y1): Pixel,
    color: Color,
    thickness: u32,
) {
    let t = thickness.max(1) as i64;
    for y in y0..=y1 {
        for x in x0..=x1 {
            let on_edge = x < x0 + t || x > x1 - t || y < y0 + t || y > y1 - t;
            if on_edge {
                put_pixel(image, resolution, x, y, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(image: &[u8], res: Resolution, x: usize, y: usize) -> [u8; 3] {
        let i = 3 * (y * res.width() as usize + x);
        [image[i], image[i + 1], image[i + 2]]
    }

    #[test]
    fn region_annotations() {
        let region = Region::new((50, 50), 10, 5).unwrap();
        let estimate = Estimate::Distance {
            mean_cm: 52.5,
            valid: 2,
            total: 2,
        };
        let a = annotate_region(&region, &estimate);
        assert_eq!(
            a[0],
            Annotation::Rectangle {
                top_left: (40, 40),
                bottom_right: (60, 60),
                color: RED,
                thickness: 2
            }
        );
        assert_eq!(
            a[1],
            Annotation::Text {
                origin: (60, 40),
                text: "52.50 cm".to_string(),
                color: GREEN
            }
        );
    }

    #[test]
    fn no_data_label() {
        assert_eq!(region_label(&Estimate::NoData { total: 81 }), "-- cm");
    }

    #[test]
    fn point_annotations() {
        let valid = annotate_point((100, 100), Some(80.25), RED);
        assert_eq!(valid.len(), 3);
        assert!(matches!(valid[1], Annotation::Circle { radius: 30, .. }));
        assert!(
            matches!(&valid[2], Annotation::Text { origin: (100, 70), text, .. } if text == "80.25 cm")
        );

        let invalid = annotate_point((100, 100), None, RED);
        assert_eq!(invalid.len(), 2);
        assert!(
            matches!(&invalid[1], Annotation::Text { origin: (100, 90), text, color } if text == TOO_CLOSE_LABEL && *color == RED)
        );
    }

    #[test]
    fn close_point_gets_empty_ring() {
        let a = annotate_point((0, 0), Some(20.0), GREEN);
        assert!(matches!(a[1], Annotation::Circle { radius: 0, .. }));
    }

    #[test]
    fn rectangle_outline_is_drawn() {
        let res = Resolution::new(20, 20);
        let mut image = vec![0u8; 3 * res.to_pixel_count()];
        let region = Region::new((10, 10), 5, 1).unwrap();
        render(&mut image, res, &annotate_region(&region, &Estimate::NoData { total: 0 }));
        assert_eq!(pixel(&image, res, 5, 5), RED);
        assert_eq!(pixel(&image, res, 6, 10), RED);
        assert_eq!(pixel(&image, res, 15, 12), RED);
        assert_eq!(pixel(&image, res, 10, 10), [0, 0, 0]);
        assert_eq!(pixel(&image, res, 3, 3), [0, 0, 0]);
    }

    #[test]
    fn far_marker_ring_stays_outside_small_frame() {
        let res = Resolution::new(10, 10);
        let mut image = vec![0u8; 3 * res.to_pixel_count()];
        let ring = Annotation::Circle {
            center: (5, 5),
            radius: u32::MAX,
            color: GREEN,
            thickness: Some(u32::MAX),
        };
        render(&mut image, res, &[ring]);
        assert!(image.iter().all(|b| *b == 0));

        let far = annotate_point((5, 5), Some(1.0e9), RED);
        render(&mut image, res, &far);
        assert_eq!(pixel(&image, res, 5, 5), RED);
        assert_eq!(pixel(&image, res, 0, 0), [0, 0, 0]);
    }

    #[test]
    fn filled_circle_is_clipped() {
        let res = Resolution::new(10, 10);
        let mut image = vec![0u8; 3 * res.to_pixel_count()];
        render(&mut image, res, &annotate_point((0, 0), None, GREEN));
        assert_eq!(pixel(&image, res, 0, 0), GREEN);
        assert_eq!(pixel(&image, res, 3, 3), GREEN);
        assert_eq!(pixel(&image, res, 5, 5), [0, 0, 0]);
    }
}
