use std::path::{Path, PathBuf};

use log::{error, warn};

use crate::config::RecorderConfig;
use crate::display::{VisibleSlice, YRangeSmoother};
use crate::error::ScopeError;
use crate::preprocess::Preprocessor;
use crate::render::FrameRenderer;
use crate::sink::{FfmpegSink, FrameSink};
use crate::snapshot::{export_session_image, SessionAccumulator};
use crate::window::{RollingWindow, Sample};

/// Artifact paths reported after a session closes.
#[derive(Debug, Default)]
pub struct SessionArtifacts {
    pub video: Option<PathBuf>,
    pub snapshot: Option<PathBuf>,
}

/// One recording session: a rolling window in, one video frame out per
/// ingested sample, plus a full-series snapshot at close.
///
/// Single-threaded by design; the caller feeds samples in non-decreasing
/// timestamp order (serialize upstream if producers are concurrent).
pub struct SignalScope {
    config: RecorderConfig,
    window: RollingWindow,
    accumulator: SessionAccumulator,
    preprocessor: Preprocessor,
    smoother: YRangeSmoother,
    renderer: FrameRenderer,
    sink: Box<dyn FrameSink>,
    start_time: Option<f64>,
    sink_failed: bool,
    closed: bool,
}

impl SignalScope {
    /// Session recording to an ffmpeg-encoded video with the built-in
    /// band-pass collaborator.
    pub fn new(config: RecorderConfig) -> Result<Self, ScopeError> {
        config.validate()?;
        let sink = Box::new(FfmpegSink::new(&config));
        let preprocessor = Preprocessor::with_default_band(config.sample_rate_hz);
        Self::with_parts(config, preprocessor, sink)
    }

    /// Session with a caller-supplied sink (in-memory, test, or custom).
    pub fn with_sink(
        config: RecorderConfig,
        sink: Box<dyn FrameSink>,
    ) -> Result<Self, ScopeError> {
        config.validate()?;
        let preprocessor = Preprocessor::with_default_band(config.sample_rate_hz);
        Self::with_parts(config, preprocessor, sink)
    }

    /// Fully explicit construction for custom numeric collaborators.
    pub fn with_parts(
        config: RecorderConfig,
        preprocessor: Preprocessor,
        sink: Box<dyn FrameSink>,
    ) -> Result<Self, ScopeError> {
        config.validate()?;
        let smoother = YRangeSmoother::new(config.fixed_y_bounds(), config.y_smooth)?;
        let renderer = FrameRenderer::new(config.width, config.height, config.display_seconds);
        Ok(Self {
            window: RollingWindow::new(config.window),
            accumulator: SessionAccumulator::new(),
            preprocessor,
            smoother,
            renderer,
            sink,
            start_time: None,
            sink_failed: false,
            closed: false,
            config,
        })
    }

    /// Ingest one sample and emit one frame. Preprocessing and rendering
    /// problems are contained here; only a closed session is an error for the
    /// caller. The first sink failure disables video output for the rest of
    /// the session.
    pub fn push_sample(&mut self, value: f32, timestamp: f64) -> Result<(), ScopeError> {
        if self.closed {
            return Err(ScopeError::SinkClosed);
        }
        let start_time = *self.start_time.get_or_insert(timestamp);
        self.window.push(Sample { value, timestamp });
        self.accumulator.push(value, timestamp);

        let frame = self.window.materialize(self.config.dt());
        let processed = self.preprocessor.process(&frame.values);
        let slice =
            VisibleSlice::from_window(&processed, &frame.timestamps, self.config.display_seconds);

        let pixels = if slice.is_empty() {
            self.renderer.blank_frame()
        } else {
            let (raw_min, raw_max) = slice.raw_y_range().unwrap_or((0.0, 0.0));
            let y_range = self.smoother.compute(raw_min, raw_max);
            let elapsed = elapsed_label_start(slice.t0, start_time);
            match self.renderer.draw(&slice, y_range, elapsed) {
                Ok(pixels) => pixels,
                Err(err) => {
                    warn!("frame render failed ({err}); skipping frame");
                    return Ok(());
                }
            }
        };

        if self.sink_failed {
            return Ok(());
        }
        if let Err(err) = self.sink.write_frame(&pixels) {
            self.sink_failed = true;
            error!("video sink failed ({err}); continuing without video output");
        }
        Ok(())
    }

    /// Finalize the session: close the sink and export the full-series
    /// snapshot. Idempotent; a second call returns empty artifacts.
    pub fn close(&mut self) -> SessionArtifacts {
        if self.closed {
            return SessionArtifacts::default();
        }
        self.closed = true;
        let mut artifacts = SessionArtifacts::default();

        match self.sink.close() {
            Ok(()) => {
                if self.sink.frames_written() > 0 {
                    artifacts.video = self.sink.path().map(Path::to_path_buf);
                }
            }
            Err(err) => error!("closing video sink failed: {err}"),
        }

        match export_session_image(
            &self.accumulator,
            &self.preprocessor,
            &self.config.out_dir,
            &self.config.filename_prefix,
        ) {
            Ok(path) => artifacts.snapshot = path,
            Err(err) => warn!("session snapshot export failed: {err}"),
        }

        artifacts
    }

    pub fn frames_written(&self) -> usize {
        self.sink.frames_written()
    }

    pub fn samples_seen(&self) -> usize {
        self.accumulator.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

fn elapsed_label_start(t0: f64, session_start: f64) -> i64 {
    let elapsed = (t0 - session_start).floor();
    if elapsed < 0.0 {
        0
    } else {
        elapsed as i64
    }
}
