//! Encoded output streams.

use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use image::RgbImage;
use laprender_common::error::{LaprenderError, LaprenderResult};

/// Destination for rendered frames of one output file.
pub trait FrameSink: Send {
    /// Open `path` for a stream of `width`x`height` frames at `fps`.
    fn begin(&mut self, path: &Path, width: u32, height: u32, fps: f64) -> LaprenderResult<()>;

    /// Append frame `index`. Indices must start at 0 and increase by one.
    fn push_frame(&mut self, index: u64, frame: &RgbImage) -> LaprenderResult<()>;

    /// Finish the file and return the number of frames written.
    fn end(&mut self) -> LaprenderResult<u64>;
}

struct Encoder {
    path: PathBuf,
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<String>>,
    width: u32,
    height: u32,
    next_index: u64,
}

/// Sink piping raw `rgb24` frames into `ffmpeg`, producing a video-only
/// H.264 file.
#[derive(Default)]
pub struct FfmpegSink {
    encoder: Option<Encoder>,
}

impl FfmpegSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, path: &Path, width: u32, height: u32, fps: f64) -> LaprenderResult<()> {
        if self.encoder.is_some() {
            return Err(LaprenderError::render("Sink already has an open output"));
        }
        let mut child = Command::new("ffmpeg")
            .args(["-y", "-v", "error", "-f", "rawvideo", "-pix_fmt", "rgb24", "-s"])
            .arg(format!("{width}x{height}"))
            .arg("-r")
            .arg(format!("{fps}"))
            .args(["-i", "-", "-an", "-c:v", "libx264", "-preset", "veryfast"])
            .args(["-crf", "18", "-pix_fmt", "yuv420p"])
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| LaprenderError::render(format!("Failed to start ffmpeg encoder: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| LaprenderError::render("Failed to capture ffmpeg stdin"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| LaprenderError::render("Failed to capture ffmpeg stderr"))?;

        // Drain stderr so the encoder never blocks on a full pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        tracing::debug!(pid = child.id(), path = %path.display(), width, height, fps, "Encoder started");
        self.encoder = Some(Encoder {
            path: path.to_path_buf(),
            child,
            stdin: Some(stdin),
            stderr: Some(stderr_task),
            width,
            height,
            next_index: 0,
        });
        Ok(())
    }

    fn push_frame(&mut self, index: u64, frame: &RgbImage) -> LaprenderResult<()> {
        let encoder = self
            .encoder
            .as_mut()
            .ok_or_else(|| LaprenderError::render("push_frame called before begin"))?;
        if index != encoder.next_index {
            return Err(LaprenderError::render(format!(
                "Frame {index} out of order (expected {})",
                encoder.next_index
            )));
        }
        if frame.dimensions() != (encoder.width, encoder.height) {
            return Err(LaprenderError::render(format!(
                "Frame is {}x{}, stream is {}x{}",
                frame.width(),
                frame.height(),
                encoder.width,
                encoder.height
            )));
        }
        let stdin = encoder
            .stdin
            .as_mut()
            .ok_or_else(|| LaprenderError::render("Encoder input already closed"))?;
        stdin.write_all(frame.as_raw())?;
        encoder.next_index += 1;
        Ok(())
    }

    fn end(&mut self) -> LaprenderResult<u64> {
        let mut encoder = self
            .encoder
            .take()
            .ok_or_else(|| LaprenderError::render("end called before begin"))?;
        drop(encoder.stdin.take());
        let status = encoder
            .child
            .wait()
            .map_err(|e| LaprenderError::render(format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr_output = encoder
            .stderr
            .take()
            .map(|task| {
                task.join()
                    .unwrap_or_else(|_| "<failed to join stderr reader>".to_string())
            })
            .unwrap_or_default();

        if !status.success() {
            return Err(LaprenderError::encode(format!(
                "ffmpeg encode of {} failed (status {}): {}",
                encoder.path.display(),
                status,
                stderr_output.trim()
            )));
        }
        tracing::debug!(path = %encoder.path.display(), frames = encoder.next_index, "Encoder finished");
        Ok(encoder.next_index)
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if let Some(mut encoder) = self.encoder.take() {
            drop(encoder.stdin.take());
            let _ = encoder.child.kill();
            let _ = encoder.child.wait();
        }
    }
}
