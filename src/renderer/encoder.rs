//! Video encoding backend
//!
//! Frames are raw RGB24 buffers. The ffmpeg encoder streams them into an
//! `ffmpeg` child process over stdin.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use crate::error::{Error, Result};

/// Destination for rendered frames
pub trait FrameSink {
    /// Append one RGB24 frame of the configured size
    fn write_frame(&mut self, rgb: &[u8]) -> Result<()>;

    /// Flush and close the output
    fn finish(&mut self) -> Result<()>;

    /// Give up on the output after a failed frame
    fn abort(&mut self) {}
}

/// Pipes frames into `ffmpeg` and encodes H.264
#[derive(Debug)]
pub struct FfmpegEncoder {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    output: PathBuf,
    frame_bytes: usize,
    frames: usize,
}

impl FfmpegEncoder {
    /// Program used to encode; override with `GALTON_FFMPEG`
    pub fn program() -> String {
        std::env::var("GALTON_FFMPEG").unwrap_or_else(|_| "ffmpeg".to_string())
    }

    pub fn spawn(output: &Path, size: (u32, u32), frame_rate: u32, bitrate_kbps: u32) -> Result<Self> {
        Self::spawn_with(&Self::program(), output, size, frame_rate, bitrate_kbps)
    }

    /// Like [`FfmpegEncoder::spawn`] with an explicit encoder program
    pub fn spawn_with(
        program: &str,
        output: &Path,
        size: (u32, u32),
        frame_rate: u32,
        bitrate_kbps: u32,
    ) -> Result<Self> {
        let (width, height) = size;
        let mut child = Command::new(program)
            .args(["-y", "-loglevel", "error"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24"])
            .args(["-s", &format!("{width}x{height}")])
            .args(["-r", &frame_rate.to_string()])
            .args(["-i", "-"])
            .args(["-c:v", "libx264", "-pix_fmt", "yuv420p"])
            .args(["-b:v", &format!("{bitrate_kbps}k")])
            .arg(output)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Encoder(format!("cannot start {program}: {e}")))?;
        let stdin = child.stdin.take();
        log::info!(
            "Encoding {}x{} @ {} fps to {}",
            width,
            height,
            frame_rate,
            output.display()
        );
        Ok(Self {
            child: Some(child),
            stdin,
            output: output.to_path_buf(),
            frame_bytes: width as usize * height as usize * 3,
            frames: 0,
        })
    }

    pub fn frames_written(&self) -> usize {
        self.frames
    }
}

impl FrameSink for FfmpegEncoder {
    fn write_frame(&mut self, rgb: &[u8]) -> Result<()> {
        if rgb.len() != self.frame_bytes {
            return Err(Error::Encoder(format!(
                "frame has {} bytes, expected {}",
                rgb.len(),
                self.frame_bytes
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| Error::Encoder("encoder already finished".to_string()))?;
        stdin
            .write_all(rgb)
            .map_err(|e| Error::Encoder(format!("write to encoder failed: {e}")))?;
        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        // Closing stdin signals end of stream
        drop(self.stdin.take());
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child
            .wait()
            .map_err(|e| Error::Encoder(format!("waiting for encoder failed: {e}")))?;
        if !status.success() {
            return Err(Error::Encoder(format!("encoder exited with {status}")));
        }
        log::info!("Wrote {} frames to {}", self.frames, self.output.display());
        Ok(())
    }

    /// Kill the encoder and delete whatever it wrote
    fn abort(&mut self) {
        drop(self.stdin.take());
        let Some(mut child) = self.child.take() else {
            return;
        };
        // Already exited is fine; wait reaps it either way
        let _ = child.kill();
        let _ = child.wait();
        match std::fs::remove_file(&self.output) {
            Ok(()) => log::warn!("Removed partial video {}", self.output.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Cannot remove partial video {}: {}", self.output.display(), e),
        }
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        // Dropped without finish() means the stream is incomplete
        self.abort();
    }
}
