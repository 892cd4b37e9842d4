use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use image::{DynamicImage, ImageBuffer, Rgb};
use log::{info, warn};
use plotters::prelude::*;

use crate::error::ScopeError;
use crate::preprocess::Preprocessor;

const SNAPSHOT_WIDTH: u32 = 1400;
const SNAPSHOT_HEIGHT: u32 = 400;
const SNAPSHOT_TRACE: RGBColor = RGBColor(42, 157, 91);
const AXIS: RGBColor = RGBColor(17, 17, 17);
const Y_PAD_FRACTION: f32 = 0.12;

/// Every sample seen during the session, independent of the rolling window.
/// Consumed once at session end to produce the full-measurement image.
#[derive(Default)]
pub struct SessionAccumulator {
    values: Vec<f32>,
    timestamps: Vec<f64>,
}

impl SessionAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f32, timestamp: f64) {
        self.values.push(value);
        self.timestamps.push(timestamp);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }
}

/// Render the whole accumulated series into one wide PNG under
/// `out_dir/images/`. An empty or malformed accumulator produces no file and
/// is reported, not fatal.
pub fn export_session_image(
    accumulator: &SessionAccumulator,
    preprocessor: &Preprocessor,
    out_dir: &Path,
    filename_prefix: &str,
) -> Result<Option<PathBuf>, ScopeError> {
    if accumulator.is_empty() {
        warn!("no accumulated samples; skipping session snapshot");
        return Ok(None);
    }
    if accumulator.values.len() != accumulator.timestamps.len() {
        warn!(
            "accumulator length mismatch ({} values, {} timestamps); skipping session snapshot",
            accumulator.values.len(),
            accumulator.timestamps.len()
        );
        return Ok(None);
    }

    let processed = preprocessor.process(&accumulator.values);
    let t_start = accumulator.timestamps[0];
    let xs: Vec<f64> = accumulator
        .timestamps
        .iter()
        .map(|ts| ts - t_start)
        .collect();
    let total_seconds = xs.last().copied().unwrap_or(0.0).max(1e-3);

    let first = processed.first().copied().unwrap_or(0.0);
    let (mut y_min, mut y_max) = processed
        .iter()
        .fold((first, first), |(min, max), &v| (min.min(v), max.max(v)));
    if y_max == y_min {
        y_min -= 1.0;
        y_max += 1.0;
    }
    let pad = (y_max - y_min) * Y_PAD_FRACTION;

    let mut buffer = vec![0u8; (SNAPSHOT_WIDTH * SNAPSHOT_HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (SNAPSHOT_WIDTH, SNAPSHOT_HEIGHT))
            .into_drawing_area();
        root.fill(&WHITE)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(8)
            .set_label_area_size(LabelAreaPosition::Left, 48)
            .set_label_area_size(LabelAreaPosition::Bottom, 28)
            .build_cartesian_2d(
                0f64..total_seconds,
                (y_min - pad) as f64..(y_max + pad) as f64,
            )?;
        chart
            .configure_mesh()
            .disable_mesh()
            .axis_style(AXIS.stroke_width(1))
            .label_style(("sans-serif", 12).into_font().color(&AXIS))
            .draw()?;
        chart.draw_series(LineSeries::new(
            xs.iter().zip(&processed).map(|(&x, &v)| (x, v as f64)),
            &SNAPSHOT_TRACE,
        ))?;
        root.present()?;
    }

    let images_dir = out_dir.join("images");
    fs::create_dir_all(&images_dir)?;
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    let out_path = images_dir.join(format!("{filename_prefix}_{stamp}.png"));

    let img = ImageBuffer::<Rgb<u8>, _>::from_raw(SNAPSHOT_WIDTH, SNAPSHOT_HEIGHT, buffer)
        .ok_or_else(|| ScopeError::Render("failed to allocate snapshot buffer".into()))?;
    DynamicImage::ImageRgb8(img).save(&out_path)?;
    info!("saved session snapshot to {}", out_path.display());
    Ok(Some(out_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_accumulator(n: usize) -> SessionAccumulator {
        let mut accumulator = SessionAccumulator::new();
        for i in 0..n {
            accumulator.push((i as f32 * 0.4).sin(), 100.0 + i as f64 * 0.04);
        }
        accumulator
    }

    #[test]
    fn empty_accumulator_produces_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let preprocessor = Preprocessor::with_default_band(25.0);
        let result = export_session_image(
            &SessionAccumulator::new(),
            &preprocessor,
            dir.path(),
            "session",
        )
        .unwrap();
        assert!(result.is_none());
        assert!(!dir.path().join("images").exists());
    }

    #[test]
    fn snapshot_is_written_under_images_subdir() {
        let dir = tempfile::tempdir().unwrap();
        let preprocessor = Preprocessor::with_default_band(25.0);
        let accumulator = filled_accumulator(200);
        let path = export_session_image(&accumulator, &preprocessor, dir.path(), "session")
            .unwrap()
            .expect("snapshot path");
        assert!(path.exists());
        assert_eq!(path.parent(), Some(dir.path().join("images").as_path()));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("png"));
    }

    #[test]
    fn single_sample_session_still_exports() {
        let dir = tempfile::tempdir().unwrap();
        let preprocessor = Preprocessor::with_default_band(25.0);
        let accumulator = filled_accumulator(1);
        let path = export_session_image(&accumulator, &preprocessor, dir.path(), "one")
            .unwrap()
            .expect("snapshot path");
        assert!(path.exists());
    }
}
