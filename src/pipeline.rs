//! The frame loop: grab, sample the region, estimate, annotate, log.
//!
//! Estimation never draws or writes anything itself. Each frame produces a `Measurement` which is handed to the display sink and the distance log in capture order, whether frames are captured on the same thread or on a separate capture thread.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::sync_channel,
    },
    thread,
};

use log::{debug, info, warn};

use crate::camera::frame::Frame;
use crate::camera::{DepthCamera, Unit};
use crate::config::{Config, PipelineConfig};
use crate::distance_log::DistanceLog;
use crate::error::{Error, Result};
use crate::estimator::{Estimate, estimate, point_distance};
use crate::overlay::{Annotation, Color, DisplaySink, GREEN, RED, annotate_point, annotate_region};
use crate::region::{Pixel, Region};
use crate::util::{Counter, frame_center};

const MARKER_COLORS: [Color; 4] = [RED, GREEN, [255, 0, 0], [0, 255, 255]];

/// Everything computed for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub frame_index: u64,
    pub estimate: Estimate,
    /// Single point distances in cm, `None` where the point has no depth.
    pub markers: Vec<(Pixel, Option<f32>)>,
    pub annotations: Vec<Annotation>,
}

/// Summary of a finished run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub frames: u64,
    pub failed_grabs: u64,
    pub estimates: Vec<Estimate>,
}

pub struct Pipeline {
    config: Config,
}
impl Pipeline {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Computes the region estimate and the marker distances of `frame`. Point coordinates are in `unit`, results are in cm.
    pub fn measure(&self, frame: &Frame, region: &Region, unit: Unit) -> Result<Measurement> {
        let samples = region.sample(&frame.point_cloud);
        let estimate = match estimate(&samples, unit.from_cm(self.config.threshold_cm))? {
            Estimate::Distance {
                mean_cm,
                valid,
                total,
            } => Estimate::Distance {
                mean_cm: unit.to_cm(mean_cm),
                valid,
                total,
            },
            no_data => no_data,
        };
        debug!("frame {}: {:?}", frame.index, estimate);

        let mut annotations = annotate_region(region, &estimate);

        let (w, h) = frame.resolution().to_tuple();
        let (cx, cy) = frame_center(w, h);
        let mut markers = Vec::with_capacity(self.config.markers.len());
        for (i, (dx, dy)) in self.config.markers.iter().enumerate() {
            let pixel = (cx + dx, cy + dy);
            let distance = frame
                .point_cloud
                .get_value(pixel.0, pixel.1)
                .ok()
                .and_then(|p| point_distance(&(p / unit.per_cm())));
            annotations.extend(annotate_point(
                pixel,
                distance,
                MARKER_COLORS[i % MARKER_COLORS.len()],
            ));
            markers.push((pixel, distance));
        }

        Ok(Measurement {
            frame_index: frame.index,
            estimate,
            markers,
            annotations,
        })
    }

    /// Opens `camera` and processes frames until `stop` is set, `max_frames` frames were processed, or an error occurs. The camera is closed in any case. Failing to open the camera is fatal, failed grabs are retried.
    ///
    /// Captures on a separate thread if `pipelined` is set, which is why the camera has to be `Send`. Use `run_sequential()` for cameras that are not.
    pub fn run<C: DepthCamera + Send>(
        &self,
        camera: &mut C,
        display: &mut dyn DisplaySink,
        log: Option<&DistanceLog>,
        stop: &AtomicBool,
    ) -> Result<RunReport> {
        if self.config.pipeline.pipelined {
            self.session(camera, |camera, region| {
                self.pipelined(camera, region, display, log, stop)
            })
        } else {
            self.run_sequential(camera, display, log, stop)
        }
    }

    /// Like `run()` but always captures on the calling thread, ignoring `pipelined`.
    pub fn run_sequential<C: DepthCamera>(
        &self,
        camera: &mut C,
        display: &mut dyn DisplaySink,
        log: Option<&DistanceLog>,
        stop: &AtomicBool,
    ) -> Result<RunReport> {
        self.session(camera, |camera, region| {
            self.sequential(camera, region, display, log, stop)
        })
    }

    // private functions_______________________________________________________

    fn session<C, F>(&self, camera: &mut C, body: F) -> Result<RunReport>
    where
        C: DepthCamera,
        F: FnOnce(&mut C, &Region) -> Result<RunReport>,
    {
        let info = camera.open(&self.config.camera)?;
        info!("opened {} camera", info.model);

        let result = self
            .config
            .region
            .build(camera.resolution())
            .and_then(|region| body(&mut *camera, &region));

        camera.close();
        if let Ok(report) = &result {
            info!(
                "processed {} frames, {} failed grabs",
                report.frames, report.failed_grabs
            );
        }
        result
    }

    fn sequential<C: DepthCamera>(
        &self,
        camera: &mut C,
        region: &Region,
        display: &mut dyn DisplaySink,
        log: Option<&DistanceLog>,
        stop: &AtomicBool,
    ) -> Result<RunReport> {
        let settings = &self.config.pipeline;
        let unit = camera.unit();
        let mut frame = Frame::new(camera.resolution());
        let mut report = RunReport::default();
        let mut counter = Counter::new(settings.info_interval);
        let mut failed_in_a_row = 0;

        while !stop.load(Ordering::Relaxed) && !reached(settings, report.frames) {
            match capture(camera, &mut frame) {
                Ok(()) => {
                    failed_in_a_row = 0;
                    self.consume(&frame, region, unit, display, log, &mut report)?;
                    counter.tick();
                }
                Err(e @ Error::Grab { .. }) => {
                    report.failed_grabs += 1;
                    failed_in_a_row += 1;
                    check_failed_grabs(settings, failed_in_a_row, e)?;
                }
                Err(e) => return Err(e),
            }
            pause(settings);
        }
        Ok(report)
    }

    fn pipelined<C: DepthCamera + Send>(
        &self,
        camera: &mut C,
        region: &Region,
        display: &mut dyn DisplaySink,
        log: Option<&DistanceLog>,
        stop: &AtomicBool,
    ) -> Result<RunReport> {
        let settings = &self.config.pipeline;
        let unit = camera.unit();
        let resolution = camera.resolution();
        let (tx, rx) = sync_channel::<Frame>(settings.queue_depth);
        // set by the consumer when it bails out early
        let halt = AtomicBool::new(false);

        thread::scope(|s| {
            let halt = &halt;
            let producer = s.spawn(move || -> Result<u64> {
                let mut captured = 0;
                let mut failed = 0;
                let mut failed_in_a_row = 0;
                while !stop.load(Ordering::Relaxed)
                    && !halt.load(Ordering::Relaxed)
                    && !reached(settings, captured)
                {
                    let mut frame = Frame::new(resolution);
                    match capture(camera, &mut frame) {
                        Ok(()) => {
                            failed_in_a_row = 0;
                            captured += 1;
                            if tx.send(frame).is_err() {
                                break;
                            }
                        }
                        Err(e @ Error::Grab { .. }) => {
                            failed += 1;
                            failed_in_a_row += 1;
                            check_failed_grabs(settings, failed_in_a_row, e)?;
                        }
                        Err(e) => return Err(e),
                    }
                    pause(settings);
                }
                Ok(failed)
            });

            let mut report = RunReport::default();
            let mut counter = Counter::new(settings.info_interval);
            let mut consumed = Ok(());
            for frame in rx.iter() {
                if let Err(e) = self.consume(&frame, region, unit, display, log, &mut report) {
                    halt.store(true, Ordering::Relaxed);
                    consumed = Err(e);
                    break;
                }
                counter.tick();
            }
            drop(rx);

            let failed = producer.join().map_err(|_| Error::CaptureThread)??;
            consumed?;
            report.failed_grabs = failed;
            Ok(report)
        })
    }

    fn consume(
        &self,
        frame: &Frame,
        region: &Region,
        unit: Unit,
        display: &mut dyn DisplaySink,
        log: Option<&DistanceLog>,
        report: &mut RunReport,
    ) -> Result<()> {
        let m = self.measure(frame, region, unit)?;
        display.show(frame, &m.annotations)?;
        if let Some(log) = log {
            log.append(&m.estimate)?;
        }
        report.frames += 1;
        report.estimates.push(m.estimate);
        Ok(())
    }
}

fn capture<C: DepthCamera>(camera: &mut C, frame: &mut Frame) -> Result<()> {
    camera.grab()?;
    camera.retrieve_image(frame)?;
    camera.retrieve_point_cloud(frame)?;
    if !frame.check_pixel_count() {
        return Err(Error::Camera(format!(
            "image of {} bytes does not match the {} points of the cloud",
            frame.image.len(),
            frame.point_cloud.points().len()
        )));
    }
    Ok(())
}

fn reached(settings: &PipelineConfig, frames: u64) -> bool {
    settings.max_frames.is_some_and(|max| frames >= max)
}

fn check_failed_grabs(settings: &PipelineConfig, failed_in_a_row: u32, e: Error) -> Result<()> {
    match settings.max_failed_grabs {
        Some(max) if failed_in_a_row >= max => Err(e),
        _ => {
            warn!("{e}, retrying");
            Ok(())
        }
    }
}

fn pause(settings: &PipelineConfig) {
    let delay = settings.frame_delay();
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraConfig;
    use crate::camera::synthetic::{Scene, SyntheticCamera};
    use crate::util::Resolution;
    use approx::assert_relative_eq;

    #[derive(Default)]
    struct Recorder {
        shown: Vec<(u64, Vec<Annotation>)>,
    }
    impl DisplaySink for Recorder {
        fn show(&mut self, frame: &Frame, annotations: &[Annotation]) -> Result<()> {
            self.shown.push((frame.index, annotations.to_vec()));
            Ok(())
        }
    }

    fn config(frames: u64) -> Config {
        let mut c = Config {
            camera: CameraConfig {
                resolution: Resolution::new(160, 120),
                ..Default::default()
            },
            ..Default::default()
        };
        c.pipeline.max_frames = Some(frames);
        c.pipeline.frame_delay_ms = 0;
        c
    }

    fn flat_scene(distance_cm: f32) -> Scene {
        Scene {
            distance_cm,
            invalid_ratio: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn sequential_run_stops_after_max_frames() {
        let pipeline = Pipeline::new(config(5)).unwrap();
        let mut cam = SyntheticCamera::new(flat_scene(60.0));
        let mut display = Recorder::default();
        let report = pipeline
            .run(&mut cam, &mut display, None, &AtomicBool::new(false))
            .unwrap();
        assert_eq!(report.frames, 5);
        assert_eq!(display.shown.len(), 5);
        assert!(report.estimates.iter().all(|e| e.valid() == 81));
        // points off the optical axis are a bit farther than the plane depth
        let d = report.estimates[0].distance().unwrap();
        assert!(d > 60.0 && d < 62.0, "distance {d}");
    }

    #[test]
    fn far_scene_gives_no_data() {
        let pipeline = Pipeline::new(config(2)).unwrap();
        let mut cam = SyntheticCamera::new(flat_scene(300.0));
        let report = pipeline
            .run(&mut cam, &mut Recorder::default(), None, &AtomicBool::new(false))
            .unwrap();
        assert!(report.estimates.iter().all(Estimate::is_no_data));
    }

    #[test]
    fn stop_flag_is_checked_before_each_frame() {
        let pipeline = Pipeline::new(config(100)).unwrap();
        let mut cam = SyntheticCamera::new(flat_scene(60.0));
        let report = pipeline
            .run(&mut cam, &mut Recorder::default(), None, &AtomicBool::new(true))
            .unwrap();
        assert_eq!(report.frames, 0);
    }

    #[test]
    fn failed_grabs_are_retried() {
        let pipeline = Pipeline::new(config(3)).unwrap();
        let mut display = Recorder::default();
        // opening resets the camera, so failures are scheduled after open
        struct Flaky(SyntheticCamera, u32);
        impl DepthCamera for Flaky {
            fn open(&mut self, c: &CameraConfig) -> Result<crate::camera::CameraInfo> {
                let info = self.0.open(c)?;
                self.0.fail_next_grabs(self.1);
                Ok(info)
            }
            fn grab(&mut self) -> Result<()> {
                self.0.grab()
            }
            fn retrieve_image(&self, f: &mut Frame) -> Result<()> {
                self.0.retrieve_image(f)
            }
            fn retrieve_point_cloud(&self, f: &mut Frame) -> Result<()> {
                self.0.retrieve_point_cloud(f)
            }
            fn retrieve_depth_point(&self, x: i64, y: i64) -> Result<crate::estimator::Point3> {
                self.0.retrieve_depth_point(x, y)
            }
            fn resolution(&self) -> Resolution {
                self.0.resolution()
            }
            fn unit(&self) -> Unit {
                self.0.unit()
            }
            fn close(&mut self) {
                self.0.close()
            }
        }
        let mut flaky = Flaky(SyntheticCamera::new(flat_scene(60.0)), 2);
        let report = pipeline
            .run(&mut flaky, &mut display, None, &AtomicBool::new(false))
            .unwrap();
        assert_eq!(report.frames, 3);
        assert_eq!(report.failed_grabs, 2);

        let mut c = config(3);
        c.pipeline.max_failed_grabs = Some(2);
        let strict = Pipeline::new(c).unwrap();
        let mut flaky = Flaky(SyntheticCamera::new(flat_scene(60.0)), 2);
        assert!(matches!(
            strict.run(&mut flaky, &mut display, None, &AtomicBool::new(false)),
            Err(Error::Grab { .. })
        ));
    }

    /// Camera pinned to its thread, like a raw SDK handle. Optionally delivers a truncated image.
    struct ThreadBound {
        inner: SyntheticCamera,
        truncate_image: bool,
        _handle: std::marker::PhantomData<*const ()>,
    }
    impl ThreadBound {
        fn new(scene: Scene) -> Self {
            Self {
                inner: SyntheticCamera::new(scene),
                truncate_image: false,
                _handle: std::marker::PhantomData,
            }
        }
    }
    impl DepthCamera for ThreadBound {
        fn open(&mut self, c: &CameraConfig) -> Result<crate::camera::CameraInfo> {
            self.inner.open(c)
        }
        fn grab(&mut self) -> Result<()> {
            self.inner.grab()
        }
        fn retrieve_image(&self, f: &mut Frame) -> Result<()> {
            self.inner.retrieve_image(f)?;
            if self.truncate_image {
                f.image.truncate(3);
            }
            Ok(())
        }
        fn retrieve_point_cloud(&self, f: &mut Frame) -> Result<()> {
            self.inner.retrieve_point_cloud(f)
        }
        fn retrieve_depth_point(&self, x: i64, y: i64) -> Result<crate::estimator::Point3> {
            self.inner.retrieve_depth_point(x, y)
        }
        fn resolution(&self) -> Resolution {
            self.inner.resolution()
        }
        fn unit(&self) -> Unit {
            self.inner.unit()
        }
        fn close(&mut self) {
            self.inner.close()
        }
    }

    #[test]
    fn thread_bound_camera_runs_sequentially() {
        let mut c = config(4);
        // ignored by run_sequential
        c.pipeline.pipelined = true;
        let pipeline = Pipeline::new(c).unwrap();
        let mut cam = ThreadBound::new(flat_scene(60.0));
        let mut display = Recorder::default();
        let report = pipeline
            .run_sequential(&mut cam, &mut display, None, &AtomicBool::new(false))
            .unwrap();
        assert_eq!(report.frames, 4);
        let indices: Vec<u64> = display.shown.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, (0..4).collect::<Vec<_>>());
    }

    #[test]
    fn image_size_mismatch_is_a_camera_error() {
        let pipeline = Pipeline::new(config(2)).unwrap();
        let mut cam = ThreadBound::new(flat_scene(60.0));
        cam.truncate_image = true;
        let mut display = Recorder::default();
        assert!(matches!(
            pipeline.run_sequential(&mut cam, &mut display, None, &AtomicBool::new(false)),
            Err(Error::Camera(_))
        ));
        assert!(display.shown.is_empty());
    }

    #[test]
    fn pipelined_run_keeps_frame_order() {
        let mut c = config(12);
        c.pipeline.pipelined = true;
        c.pipeline.queue_depth = 2;
        let pipeline = Pipeline::new(c).unwrap();
        let mut cam = SyntheticCamera::new(Scene {
            drift_cm_per_frame: 1.0,
            ..flat_scene(40.0)
        });
        let mut display = Recorder::default();
        let report = pipeline
            .run(&mut cam, &mut display, None, &AtomicBool::new(false))
            .unwrap();
        assert_eq!(report.frames, 12);
        let indices: Vec<u64> = display.shown.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, (0..12).collect::<Vec<_>>());
        let distances: Vec<f32> = report
            .estimates
            .iter()
            .map(|e| e.distance().unwrap())
            .collect();
        assert!(distances.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn millimeter_camera_reports_cm() {
        let mut c = config(1);
        c.camera.unit = Unit::Millimeter;
        c.markers = vec![(0, 0)];
        let pipeline = Pipeline::new(c).unwrap();
        let mut cam = SyntheticCamera::new(flat_scene(50.0));
        cam.open(&pipeline.config().camera).unwrap();
        cam.grab().unwrap();
        let mut frame = Frame::new(cam.resolution());
        cam.retrieve_point_cloud(&mut frame).unwrap();
        let region = pipeline
            .config()
            .region
            .build(cam.resolution())
            .unwrap();
        let m = pipeline.measure(&frame, &region, Unit::Millimeter).unwrap();
        let d = m.estimate.distance().unwrap();
        assert!(d > 50.0 && d < 52.0, "distance {d}");
        assert_eq!(m.markers.len(), 1);
        assert_relative_eq!(m.markers[0].1.unwrap(), 50.0);
        // rectangle + label + dot + ring + label
        assert_eq!(m.annotations.len(), 5);
    }

    #[test]
    fn marker_without_depth() {
        let mut c = config(1);
        c.markers = vec![(1000, 0)];
        let pipeline = Pipeline::new(c).unwrap();
        let frame = Frame::new(Resolution::new(160, 120));
        let region = Region::centered(frame.resolution(), 40, 10).unwrap();
        let m = pipeline.measure(&frame, &region, Unit::Centimeter).unwrap();
        assert_eq!(m.markers[0].1, None);
        assert!(m.estimate.is_no_data());
    }
}
