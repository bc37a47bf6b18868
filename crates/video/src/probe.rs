//! Container probing.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use std::time::SystemTime;

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Metadata of one video file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeInfo {
    /// Probed file.
    pub path: PathBuf,

    /// Average frame rate.
    pub fps: f64,

    /// Number of frames in the file.
    pub frame_count: u64,

    pub width: u32,
    pub height: u32,

    /// Container duration (seconds).
    pub duration_secs: f64,

    /// Local wall-clock time the recording started.
    pub creation_time: NaiveDateTime,

    /// Whether the file has an audio stream.
    pub has_audio: bool,
}

/// Source of per-file video metadata.
pub trait VideoProber: Send + Sync {
    /// Probe `path`. `None` means the file is not a usable video.
    fn probe(&self, path: &Path) -> Option<ProbeInfo>;
}

/// Prober backed by the system `ffprobe`.
#[derive(Debug, Default)]
pub struct FfprobeProber {
    available: OnceLock<bool>,
}

impl FfprobeProber {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_available(&self) -> bool {
        *self.available.get_or_init(|| {
            let found = command_exists("ffprobe");
            if !found {
                tracing::warn!("ffprobe not found on PATH; no files will be recognized as video");
            }
            found
        })
    }
}

impl VideoProber for FfprobeProber {
    fn probe(&self, path: &Path) -> Option<ProbeInfo> {
        if !self.is_available() {
            return None;
        }
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
            ])
            .arg(path)
            .output()
            .map_err(|e| tracing::debug!(path = %path.display(), error = %e, "ffprobe failed to run"))
            .ok()?;
        if !output.status.success() {
            tracing::debug!(
                path = %path.display(),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "ffprobe rejected file"
            );
            return None;
        }
        parse_ffprobe_json(path, &output.stdout, file_modified_local(path))
    }
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
    #[serde(default)]
    tags: ProbeTags,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeTags {
    creation_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
    #[serde(default)]
    tags: ProbeTags,
}

#[derive(Debug, Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: ProbeFormat,
}

/// Build a [`ProbeInfo`] from `ffprobe -print_format json` output.
///
/// `fallback_time` is used when the container carries no creation tag.
pub fn parse_ffprobe_json(
    path: &Path,
    json: &[u8],
    fallback_time: Option<NaiveDateTime>,
) -> Option<ProbeInfo> {
    let parsed: ProbeOut = serde_json::from_slice(json).ok()?;
    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))?;
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    let width = video.width.filter(|w| *w > 0)?;
    let height = video.height.filter(|h| *h > 0)?;
    let fps = video
        .avg_frame_rate
        .as_deref()
        .and_then(parse_rational)
        .or_else(|| video.r_frame_rate.as_deref().and_then(parse_rational))?;

    let duration_secs = video
        .duration
        .as_deref()
        .or(parsed.format.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| *d > 0.0)?;
    let frame_count = video
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse::<u64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or_else(|| (duration_secs * fps).round() as u64);

    let creation_time = video
        .tags
        .creation_time
        .as_deref()
        .or(parsed.format.tags.creation_time.as_deref())
        .and_then(parse_creation_time)
        .or(fallback_time)?;

    Some(ProbeInfo {
        path: path.to_path_buf(),
        fps,
        frame_count,
        width,
        height,
        duration_secs,
        creation_time,
        has_audio,
    })
}

/// Parse `num/den` (or a plain number). Zero rates are rejected.
fn parse_rational(value: &str) -> Option<f64> {
    let rate = match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => value.trim().parse().ok()?,
    };
    (rate > 0.0).then_some(rate)
}

/// Creation tags are camera wall-clock time; any zone suffix is ignored.
fn parse_creation_time(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim().trim_end_matches('Z');
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

/// File modification time as local wall-clock time.
pub fn file_modified_local(path: &Path) -> Option<NaiveDateTime> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    Some(DateTime::<Local>::from(modified).naive_local())
}

/// File modification time as seconds since the Unix epoch.
pub fn file_modified_unix(path: &Path) -> Option<i64> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    modified
        .duration_since(SystemTime::UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs() as i64)
}

/// Whether `binary` can be found on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
