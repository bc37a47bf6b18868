//! Render parameter resolution.
//!
//! Turns lap bindings plus the calibrated offset and bookend padding into
//! absolute frame windows, and groups them into output files.

use std::ops::Range;
use std::sync::Arc;

use laprender_common::clock::{frames_to_secs, secs_to_frames};
use laprender_telemetry::Lap;
use laprender_video::{LapBinding, Video};
use serde::{Deserialize, Serialize};

/// How selected laps map to output files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// One output per lap.
    #[default]
    PerLap,
    /// All selected laps of a video back to back in one output.
    Session,
}

/// Absolute playback window of one lap.
#[derive(Debug, Clone)]
pub struct LapWindow {
    pub lap: Arc<Lap>,
    pub fps: f64,

    /// Lap bounds after applying the frame offset.
    pub lap_start_frame: i64,
    pub lap_end_frame: i64,

    /// Bounds including bookends, clamped to the video.
    pub start_frame: i64,
    pub end_frame: i64,

    /// Audio window in video seconds. Uses the un-offset lap start.
    pub audio_start_secs: f64,
    pub audio_duration_secs: f64,
}

impl LapWindow {
    /// Resolve `binding` against `video` with `lead_secs` before and
    /// `trail_secs` after the lap.
    pub fn resolve(video: &Video, binding: &LapBinding, lead_secs: f64, trail_secs: f64) -> Self {
        let fps = video.fps();
        let lap_start_frame = binding.start_frame + video.frame_offset;
        let lap_end_frame = binding.end_frame + video.frame_offset;

        let clamp = |frame: i64| frame.clamp(0, video.frame_count());
        let start_frame = clamp(lap_start_frame - secs_to_frames(lead_secs, fps));
        let end_frame = clamp(lap_end_frame + secs_to_frames(trail_secs, fps)).max(start_frame);

        let lead_used = frames_to_secs(lap_start_frame - start_frame, fps);
        Self {
            lap: Arc::clone(&binding.lap),
            fps,
            lap_start_frame,
            lap_end_frame,
            start_frame,
            end_frame,
            audio_start_secs: (binding.start_seconds - lead_used).max(0.0),
            audio_duration_secs: frames_to_secs(end_frame - start_frame, fps),
        }
    }

    /// Frames in this window.
    pub fn total_frames(&self) -> i64 {
        self.end_frame - self.start_frame
    }

    pub fn frames(&self) -> Range<i64> {
        self.start_frame..self.end_frame
    }

    /// Whether `frame` lies inside the strict (un-padded) lap.
    pub fn is_mid_lap(&self, frame: i64) -> bool {
        self.lap_start_frame <= frame && frame < self.lap_end_frame
    }

    /// Lap-relative seconds at `frame`, clamped to `[0, lap_time]`.
    pub fn elapsed_secs(&self, frame: i64) -> f64 {
        frames_to_secs(frame - self.lap_start_frame, self.fps).clamp(0.0, self.lap.lap_time())
    }
}

/// Windows rendered into one output file from one video.
#[derive(Debug, Clone)]
pub struct RenderParams<'v> {
    pub video: &'v Video,
    pub mode: RenderMode,
    pub windows: Vec<LapWindow>,
    fastest: Option<Arc<Lap>>,
}

impl<'v> RenderParams<'v> {
    /// Resolve `bindings` for a single output.
    ///
    /// In session mode only the first window gets the leading bookend and
    /// only the last gets the trailing one, so interior laps play back to
    /// back.
    pub fn new(video: &'v Video, bindings: &[&LapBinding], bookend_secs: f64, mode: RenderMode) -> Self {
        let last = bindings.len().saturating_sub(1);
        let windows = bindings
            .iter()
            .enumerate()
            .map(|(i, binding)| {
                let (lead, trail) = match mode {
                    RenderMode::PerLap => (bookend_secs, bookend_secs),
                    RenderMode::Session => (
                        if i == 0 { bookend_secs } else { 0.0 },
                        if i == last { bookend_secs } else { 0.0 },
                    ),
                };
                LapWindow::resolve(video, binding, lead, trail)
            })
            .collect();
        Self {
            video,
            mode,
            windows,
            fastest: fastest_lap(video.bindings()).cloned(),
        }
    }

    /// Group `video`'s renderable laps into outputs.
    pub fn plan(video: &'v Video, bookend_secs: f64, mode: RenderMode) -> Vec<Self> {
        let selected: Vec<&LapBinding> = video.renderable_bindings().collect();
        if selected.is_empty() {
            return Vec::new();
        }
        let plan: Vec<Self> = match mode {
            RenderMode::PerLap => selected
                .iter()
                .map(|b| Self::new(video, &[*b], bookend_secs, mode))
                .collect(),
            RenderMode::Session => vec![Self::new(video, &selected, bookend_secs, mode)],
        };
        tracing::debug!(
            video = %video.stem(),
            outputs = plan.len(),
            frames = plan.iter().map(|p| p.total_frames()).sum::<i64>(),
            "Planned render"
        );
        plan
    }

    /// Sum of window widths; drives progress reporting.
    pub fn total_frames(&self) -> i64 {
        self.windows.iter().map(LapWindow::total_frames).sum()
    }

    /// Fastest lap bound to the video.
    pub fn fastest_lap(&self) -> Option<&Arc<Lap>> {
        self.fastest.as_ref()
    }

    /// Segment and segment-local frame for a virtual frame.
    pub fn locate(&self, frame: i64) -> Option<(usize, i64)> {
        self.video.segment_local_frame(frame)
    }

    /// Audio to play under each window, `(start, duration)` in video seconds.
    ///
    /// One span per window: deselected laps between two windows are skipped
    /// in the audio just as they are in the picture.
    pub fn audio_spans(&self) -> Vec<(f64, f64)> {
        self.windows
            .iter()
            .map(|w| (w.audio_start_secs, w.audio_duration_secs))
            .collect()
    }
}

/// Bound lap with the shortest lap time.
pub fn fastest_lap(bindings: &[LapBinding]) -> Option<&Arc<Lap>> {
    bindings
        .iter()
        .map(|b| &b.lap)
        .min_by(|a, b| a.lap_time().total_cmp(&b.lap_time()))
}
