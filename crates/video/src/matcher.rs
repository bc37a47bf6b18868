//! Lap matching by wall-clock window.

use std::sync::Arc;

use chrono::NaiveDateTime;
use laprender_common::clock::seconds_between;
use laprender_telemetry::Lap;

use crate::binding::LapBinding;

/// Time span and frame rate of a recording.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoWindow {
    pub fps: f64,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

/// Bind every lap whose start falls inside `window`.
///
/// `start_frame = round(fps * (lap.start - video.start))` and
/// `end_frame = round(start_frame + fps * lap_time)`. A lap starting before
/// the video or after it ends produces no binding; an empty result is not
/// an error.
pub fn match_laps(window: &VideoWindow, laps: &[Arc<Lap>]) -> Vec<LapBinding> {
    laps.iter()
        .filter(|lap| window.start_time <= lap.start_time() && lap.start_time() <= window.end_time)
        .map(|lap| {
            let start_seconds = seconds_between(window.start_time, lap.start_time());
            let start_frame = (window.fps * start_seconds).round() as i64;
            let end_frame = (start_frame as f64 + window.fps * lap.lap_time()).round() as i64;
            LapBinding {
                lap: Arc::clone(lap),
                render: true,
                start_seconds,
                start_frame,
                end_frame,
            }
        })
        .collect()
}
