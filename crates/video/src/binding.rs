//! Lap-to-video bindings.

use std::sync::Arc;

use laprender_telemetry::Lap;

/// Association of a lap with a frame range of one video.
///
/// Frames are un-offset: calibration's `frame_offset` is applied later when
/// playback windows are resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct LapBinding {
    pub lap: Arc<Lap>,

    /// Whether this lap is selected for rendering.
    pub render: bool,

    /// Seconds from the video start to the lap start.
    pub start_seconds: f64,

    /// First frame of the lap.
    pub start_frame: i64,

    /// Frame one past the end of the lap.
    pub end_frame: i64,
}

impl LapBinding {
    /// Frames covered by the lap.
    pub fn frame_len(&self) -> i64 {
        self.end_frame - self.start_frame
    }
}

impl std::fmt::Display for LapBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} frames {}..{}{}",
            self.lap,
            self.start_frame,
            self.end_frame,
            if self.render { "" } else { " (skipped)" }
        )
    }
}
