//! Rolling-window signal preprocessing and fixed-rate video rendering for
//! streamed sensor data.
//!
//! A [`SignalScope`] session ingests `(value, epoch-seconds)` samples one at a
//! time, keeps a fixed-length rolling window, band-pass filters and robustly
//! normalizes it, and renders the trailing visible span into one video frame
//! per sample. Closing the session finalizes the video and exports a static
//! image of the entire accumulated series.
//!
//! ```no_run
//! use pulsescope::{RecorderConfig, SignalScope};
//!
//! let mut scope = SignalScope::new(RecorderConfig::default())?;
//! scope.push_sample(0.42, 1_700_000_000.0)?;
//! let artifacts = scope.close();
//! # Ok::<(), pulsescope::ScopeError>(())
//! ```

pub mod config;
pub mod display;
pub mod error;
pub mod pipeline;
pub mod preprocess;
pub mod render;
pub mod sink;
pub mod snapshot;
pub mod window;

pub use config::RecorderConfig;
pub use display::{VisibleSlice, YRangeSmoother};
pub use error::ScopeError;
pub use pipeline::{SessionArtifacts, SignalScope};
pub use preprocess::{robust_normalize, zscore, BiquadBandpass, Preprocessor, SignalFilter};
pub use render::FrameRenderer;
pub use sink::{FfmpegSink, FrameSink, MemorySink};
pub use snapshot::{export_session_image, SessionAccumulator};
pub use window::{RollingWindow, Sample, WindowFrame};
