use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use chrono::Utc;
use log::info;

use crate::config::RecorderConfig;
use crate::error::ScopeError;

/// Destination for rendered frames. One sink per session; `close` finalizes
/// exactly once and later writes fail with [`ScopeError::SinkClosed`].
pub trait FrameSink {
    fn write_frame(&mut self, rgb: &[u8]) -> Result<(), ScopeError>;
    fn close(&mut self) -> Result<(), ScopeError>;
    fn frames_written(&self) -> usize;
    fn path(&self) -> Option<&Path> {
        None
    }
}

/// Streams raw RGB frames into an `ffmpeg` child encoding H.264 mp4.
///
/// The child is spawned lazily on the first frame; construction only fixes the
/// session-unique output path. A spawn failure surfaces as
/// [`ScopeError::Encoder`] and is not retried.
pub struct FfmpegSink {
    path: PathBuf,
    ffmpeg_bin: PathBuf,
    fps: u32,
    width: u32,
    height: u32,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    frame_count: usize,
    closed: bool,
}

impl FfmpegSink {
    pub fn new(config: &RecorderConfig) -> Self {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let path = config
            .out_dir
            .join(format!("{}_{stamp}.mp4", config.filename_prefix));
        Self {
            path,
            ffmpeg_bin: config.ffmpeg_bin.clone(),
            fps: config.fps,
            width: config.width,
            height: config.height,
            child: None,
            stdin: None,
            frame_count: 0,
            closed: false,
        }
    }

    pub fn video_path(&self) -> &Path {
        &self.path
    }

    fn ensure_open(&mut self) -> Result<(), ScopeError> {
        if self.child.is_some() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut child = Command::new(&self.ffmpeg_bin)
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-y")
            .arg("-f")
            .arg("rawvideo")
            .arg("-pix_fmt")
            .arg("rgb24")
            .arg("-s")
            .arg(format!("{}x{}", self.width, self.height))
            .arg("-r")
            .arg(self.fps.to_string())
            .arg("-i")
            .arg("-")
            .arg("-c:v")
            .arg("libx264")
            .arg("-preset")
            .arg("medium")
            .arg("-pix_fmt")
            .arg("yuv420p")
            // Odd frame sizes are rounded down for the YUV 4:2:0 encoder.
            .arg("-vf")
            .arg("scale=trunc(iw/2)*2:trunc(ih/2)*2")
            .arg("-movflags")
            .arg("+faststart")
            .arg(&self.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| {
                ScopeError::Encoder(format!(
                    "could not start {} for {}: {err}",
                    self.ffmpeg_bin.display(),
                    self.path.display()
                ))
            })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ScopeError::Encoder("encoder stdin unavailable".into()))?;
        info!("opened video sink at {}", self.path.display());
        self.child = Some(child);
        self.stdin = Some(stdin);
        Ok(())
    }
}

impl FrameSink for FfmpegSink {
    fn write_frame(&mut self, rgb: &[u8]) -> Result<(), ScopeError> {
        if self.closed {
            return Err(ScopeError::SinkClosed);
        }
        let expected = (self.width * self.height * 3) as usize;
        if rgb.len() != expected {
            return Err(ScopeError::Encoder(format!(
                "frame has {} bytes, expected {expected}",
                rgb.len()
            )));
        }
        self.ensure_open()?;
        if let Some(stdin) = self.stdin.as_mut() {
            stdin.write_all(rgb)?;
        }
        self.frame_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), ScopeError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        // Dropping stdin signals EOF so the encoder can finalize the container.
        self.stdin.take();
        if let Some(mut child) = self.child.take() {
            let status = child.wait()?;
            if !status.success() {
                return Err(ScopeError::Encoder(format!("encoder exited with {status}")));
            }
            info!(
                "finalized {} ({} frames)",
                self.path.display(),
                self.frame_count
            );
        }
        Ok(())
    }

    fn frames_written(&self) -> usize {
        self.frame_count
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// In-memory sink useful for tests and headless runs.
#[derive(Default)]
pub struct MemorySink {
    frames: Vec<Vec<u8>>,
    closed: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[Vec<u8>] {
        &self.frames
    }
}

impl FrameSink for MemorySink {
    fn write_frame(&mut self, rgb: &[u8]) -> Result<(), ScopeError> {
        if self.closed {
            return Err(ScopeError::SinkClosed);
        }
        self.frames.push(rgb.to_vec());
        Ok(())
    }

    fn close(&mut self) -> Result<(), ScopeError> {
        self.closed = true;
        Ok(())
    }

    fn frames_written(&self) -> usize {
        self.frames.len()
    }
}
