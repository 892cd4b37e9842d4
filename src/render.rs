use image::{imageops, ImageBuffer, Rgb};
use plotters::prelude::*;

use crate::display::VisibleSlice;
use crate::error::ScopeError;

const BACKGROUND: RGBColor = RGBColor(255, 255, 255);
const TRACE: RGBColor = RGBColor(30, 144, 255);
const AXIS: RGBColor = RGBColor(17, 17, 17);
const GRID: RGBColor = RGBColor(211, 211, 211);

/// Rasterizes visible slices into fixed-size RGB frames.
///
/// The drawing surface uses even dimensions (YUV 4:2:0 encoders reject odd
/// sizes); when that differs from the configured target, the raster is resized
/// to exactly `width x height` before it leaves this module. The translucent
/// trace is composited over the opaque background by the backend blender.
pub struct FrameRenderer {
    width: u32,
    height: u32,
    surface_width: u32,
    surface_height: u32,
    display_seconds: f64,
}

impl FrameRenderer {
    pub fn new(width: u32, height: u32, display_seconds: f64) -> Self {
        Self {
            width,
            height,
            surface_width: sanitize_dimension(width),
            surface_height: sanitize_dimension(height),
            display_seconds,
        }
    }

    pub fn frame_len(&self) -> usize {
        (self.width * self.height * 3) as usize
    }

    /// Background-only frame at the exact target dimensions.
    pub fn blank_frame(&self) -> Vec<u8> {
        vec![255; self.frame_len()]
    }

    /// Draw one frame. The x axis spans `[0, display_seconds]` regardless of
    /// how many points are visible; ticks sit at whole seconds and are labeled
    /// with `elapsed_start + tick` elapsed seconds since session start.
    pub fn draw(
        &self,
        slice: &VisibleSlice,
        y_range: (f32, f32),
        elapsed_start: i64,
    ) -> Result<Vec<u8>, ScopeError> {
        if slice.is_empty() {
            return Ok(self.blank_frame());
        }

        let mut buffer = vec![0u8; (self.surface_width * self.surface_height * 3) as usize];
        {
            let root =
                BitMapBackend::with_buffer(&mut buffer, (self.surface_width, self.surface_height))
                    .into_drawing_area();
            root.fill(&BACKGROUND)?;

            let (y_min, y_max) = y_range;
            let mut chart = ChartBuilder::on(&root)
                .margin(6)
                .set_label_area_size(LabelAreaPosition::Left, 42)
                .set_label_area_size(LabelAreaPosition::Bottom, 26)
                .build_cartesian_2d(0f64..self.display_seconds, y_min as f64..y_max as f64)?;

            chart
                .configure_mesh()
                .light_line_style(&GRID.mix(0.35))
                .bold_line_style(&GRID.mix(0.35))
                .x_labels(self.display_seconds.round() as usize + 1)
                .y_labels(4)
                .x_label_formatter(&|x| format!("{}", elapsed_start + x.round() as i64))
                .axis_style(AXIS.stroke_width(1))
                .label_style(("sans-serif", 12).into_font().color(&AXIS))
                .draw()?;

            let points = slice
                .x
                .iter()
                .zip(&slice.values)
                .map(|(&x, &v)| (x, v as f64));
            chart.draw_series(LineSeries::new(
                points,
                ShapeStyle::from(&TRACE.mix(0.95)).stroke_width(2),
            ))?;

            root.present()?;
        }

        self.finish(buffer)
    }

    fn finish(&self, buffer: Vec<u8>) -> Result<Vec<u8>, ScopeError> {
        if self.surface_width == self.width && self.surface_height == self.height {
            return Ok(buffer);
        }
        let surface =
            ImageBuffer::<Rgb<u8>, _>::from_raw(self.surface_width, self.surface_height, buffer)
                .ok_or_else(|| ScopeError::Render("raster buffer has wrong length".into()))?;
        let resized = imageops::resize(
            &surface,
            self.width,
            self.height,
            imageops::FilterType::Triangle,
        );
        Ok(resized.into_raw())
    }
}

fn sanitize_dimension(dim: u32) -> u32 {
    let dim = dim.max(2);
    dim - dim % 2
}
