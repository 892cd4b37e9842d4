use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ScopeError;

/// Per-session recording parameters, fixed at construction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Directory receiving the video file and the `images/` snapshot subdir.
    pub out_dir: PathBuf,
    pub filename_prefix: String,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    /// Samples held for filtering. 250 samples = 10 s at the nominal 25 Hz.
    pub window: usize,
    /// Nominal sample rate; only used for padding extrapolation and filter design.
    pub sample_rate_hz: f64,
    /// When both are set the Y axis is pinned for the session.
    pub y_min: Option<f32>,
    pub y_max: Option<f32>,
    /// Exponential smoothing factor for dynamic Y bounds. 0 freezes the first
    /// observed range, 1 tracks every frame's raw range.
    pub y_smooth: f32,
    /// Visible span per frame, shorter than the filtering window.
    pub display_seconds: f64,
    pub ffmpeg_bin: PathBuf,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("recordings"),
            filename_prefix: "channel".to_owned(),
            fps: 25,
            width: 800,
            height: 240,
            window: 250,
            sample_rate_hz: 25.0,
            y_min: None,
            y_max: None,
            y_smooth: 0.2,
            display_seconds: 6.0,
            ffmpeg_bin: PathBuf::from("ffmpeg"),
        }
    }
}

impl RecorderConfig {
    /// Nominal inter-sample interval in seconds.
    pub fn dt(&self) -> f64 {
        1.0 / self.sample_rate_hz
    }

    pub fn fixed_y_bounds(&self) -> Option<(f32, f32)> {
        match (self.y_min, self.y_max) {
            (Some(min), Some(max)) => Some((min, max)),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), ScopeError> {
        if let (Some(min), Some(max)) = (self.y_min, self.y_max) {
            if min >= max {
                return Err(ScopeError::InvalidYBounds { min, max });
            }
        }
        if !(0.0..=1.0).contains(&self.y_smooth) {
            return Err(ScopeError::InvalidSmoothing(self.y_smooth));
        }
        if self.sample_rate_hz <= 0.0 {
            return Err(ScopeError::InvalidSampleRate);
        }
        if self.fps == 0 {
            return Err(ScopeError::InvalidDimension { field: "fps" });
        }
        if self.width == 0 {
            return Err(ScopeError::InvalidDimension { field: "width" });
        }
        if self.height == 0 {
            return Err(ScopeError::InvalidDimension { field: "height" });
        }
        if self.window == 0 {
            return Err(ScopeError::InvalidDimension { field: "window" });
        }
        if self.display_seconds <= 0.0 {
            return Err(ScopeError::InvalidDimension {
                field: "display_seconds",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(RecorderConfig::default().validate().is_ok());
    }

    #[test]
    fn inverted_y_bounds_rejected() {
        let config = RecorderConfig {
            y_min: Some(5.0),
            y_max: Some(-5.0),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ScopeError::InvalidYBounds { .. })
        ));
    }

    #[test]
    fn equal_y_bounds_rejected() {
        let config = RecorderConfig {
            y_min: Some(1.0),
            y_max: Some(1.0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_smoothing_rejected() {
        let config = RecorderConfig {
            y_smooth: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ScopeError::InvalidSmoothing(_))
        ));
    }

    #[test]
    fn single_fixed_bound_means_dynamic() {
        let config = RecorderConfig {
            y_min: Some(-5.0),
            ..Default::default()
        };
        assert!(config.fixed_y_bounds().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = RecorderConfig {
            y_min: Some(-4.0),
            y_max: Some(4.0),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: RecorderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.fixed_y_bounds(), Some((-4.0, 4.0)));
        assert_eq!(back.window, config.window);
        assert_eq!(back.out_dir, config.out_dir);
    }
}
