//! Audio extraction and muxing.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

use laprender_common::error::{LaprenderError, LaprenderResult};

/// External encode/mux service.
pub trait MediaTool: Send + Sync {
    /// Cut `duration_secs` of audio from `source` starting at `start_secs`.
    fn extract_audio(&self, source: &Path, start_secs: f64, duration_secs: f64, output: &Path) -> LaprenderResult<()>;

    /// Join audio files end to end, in order.
    fn concat(&self, parts: &[PathBuf], output: &Path) -> LaprenderResult<()>;

    /// Mix two audio files; the result is as long as the longer input.
    fn overlay_mix(&self, first: &Path, second: &Path, output: &Path) -> LaprenderResult<()>;

    /// Combine a video-only file and an audio file.
    fn mux(&self, video: &Path, audio: &Path, output: &Path) -> LaprenderResult<()>;
}

fn os(arg: impl AsRef<OsStr>) -> OsString {
    arg.as_ref().to_os_string()
}

/// [`MediaTool`] backed by the `ffmpeg` binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegMedia;

impl FfmpegMedia {
    fn run(&self, what: &str, args: &[OsString]) -> LaprenderResult<()> {
        tracing::debug!(step = what, args = ?args, "Running ffmpeg");
        let output = Command::new("ffmpeg")
            .args(["-y", "-v", "error", "-nostdin"])
            .args(args)
            .output()
            .map_err(|e| LaprenderError::render(format!("Failed to start ffmpeg: {e}")))?;
        if !output.status.success() {
            return Err(LaprenderError::encode(format!(
                "ffmpeg {what} failed (status {}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

impl MediaTool for FfmpegMedia {
    fn extract_audio(&self, source: &Path, start_secs: f64, duration_secs: f64, output: &Path) -> LaprenderResult<()> {
        let start = format!("{start_secs:.3}");
        let duration = format!("{duration_secs:.3}");
        self.run(
            "audio extract",
            &[
                os("-ss"),
                os(&start),
                os("-i"),
                os(source),
                os("-t"),
                os(&duration),
                os("-vn"),
                os("-acodec"),
                os("pcm_s16le"),
                os(output),
            ],
        )
    }

    fn concat(&self, parts: &[PathBuf], output: &Path) -> LaprenderResult<()> {
        let mut args = Vec::with_capacity(parts.len() * 2 + 7);
        let mut filter = String::new();
        for (i, part) in parts.iter().enumerate() {
            args.extend([os("-i"), os(part)]);
            filter.push_str(&format!("[{i}:a]"));
        }
        filter.push_str(&format!("concat=n={}:v=0:a=1[a]", parts.len()));
        args.extend([
            os("-filter_complex"),
            os(&filter),
            os("-map"),
            os("[a]"),
            os("-acodec"),
            os("pcm_s16le"),
            os(output),
        ]);
        self.run("audio concat", &args)
    }

    fn overlay_mix(&self, first: &Path, second: &Path, output: &Path) -> LaprenderResult<()> {
        self.run(
            "audio mix",
            &[
                os("-i"),
                os(first),
                os("-i"),
                os(second),
                os("-filter_complex"),
                os("amix=inputs=2:duration=longest"),
                os(output),
            ],
        )
    }

    fn mux(&self, video: &Path, audio: &Path, output: &Path) -> LaprenderResult<()> {
        self.run(
            "mux",
            &[
                os("-i"),
                os(video),
                os("-i"),
                os(audio),
                os("-map"),
                os("0:v:0"),
                os("-map"),
                os("1:a:0"),
                os("-c:v"),
                os("copy"),
                os("-c:a"),
                os("aac"),
                os("-shortest"),
                os(output),
            ],
        )
    }
}
