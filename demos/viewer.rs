/*!
Shows the synthetic camera image in a window, with the region of interest and a center marker drawn on top. Distances are written to the log because the window cannot render text.
*/

use log::info;
use show_image::{ImageInfo, ImageView, WindowOptions, WindowProxy};

use roi_distance::camera::frame::{Frame, get_bgr};
use roi_distance::camera::synthetic::{Scene, SyntheticCamera};
use roi_distance::config::Config;
use roi_distance::overlay::{Annotation, DisplaySink, render};
use roi_distance::pipeline::Pipeline;
use roi_distance::util::KeyboardEvent;
use roi_distance::{ColorFormat, Resolution};

struct Window {
    proxy: WindowProxy,
    format: ColorFormat,
    buffer: Vec<u8>,
}
impl DisplaySink for Window {
    fn show(&mut self, frame: &Frame, annotations: &[Annotation]) -> roi_distance::Result<()> {
        let resolution = frame.resolution();
        self.buffer.resize(frame.image.len(), 0);
        get_bgr(frame, &mut self.buffer);
        render(&mut self.buffer, resolution, annotations);
        for a in annotations {
            if let Annotation::Text { text, .. } = a {
                info!("{}", text);
            }
        }
        update_window(&self.proxy, &resolution, &self.buffer, self.format);
        Ok(())
    }
}

#[show_image::main]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = Config::default();
    config.markers = vec![(0, 0)];
    config.pipeline.frame_delay_ms = 30;
    let resolution = config.camera.resolution;
    let format = config.camera.color_format;

    let pipeline = Pipeline::new(config)?;
    let mut camera = SyntheticCamera::new(Scene {
        tilt_cm_per_row: 0.05,
        background: Some((1000, 250.0)),
        ..Default::default()
    });

    let mut window = Window {
        proxy: create_window("Distance", &resolution, true),
        format,
        buffer: Vec::new(),
    };

    let stop = KeyboardEvent::new("q");
    println!("press q and Enter to quit");

    let report = pipeline.run(&mut camera, &mut window, None, &stop.flag())?;
    println!("{} frames shown", report.frames);

    Ok(())
}

fn update_window(window: &WindowProxy, resolution: &Resolution, data: &[u8], format: ColorFormat) {
    let (w, h) = resolution.to_tuple();
    let info = match format {
        ColorFormat::Rgb => ImageInfo::rgb8(w, h),
        ColorFormat::Bgr => ImageInfo::bgr8(w, h),
    };
    let image = ImageView::new(info, data);
    window.set_image("image", image).unwrap();
}

fn create_window(name: &str, size: &Resolution, allow_drag_and_zoom: bool) -> WindowProxy {
    show_image::create_window(
        name,
        WindowOptions {
            size: Some(size.to_array()),
            default_controls: allow_drag_and_zoom,
            ..Default::default()
        },
    )
    .unwrap()
}
