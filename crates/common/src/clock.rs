//! Wall-clock and frame-time utilities.
//!
//! Telemetry loggers stamp fixes in UTC or in local time depending on the
//! device; cameras stamp files in local time. Everything is compared as
//! naive local wall-clock time, so this module provides:
//! - Normalizing a stamp from its source zone to local time
//! - Signed differences and offsets in fractional seconds
//! - Conversions between seconds and whole frames
//! - A rolling frames-per-second meter for progress reporting

use std::time::Instant;

use chrono::{Duration, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// The zone a source device stamped its wall-clock times in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockZone {
    Utc,
    #[default]
    Local,
}

impl ClockZone {
    /// Convert a naive stamp in this zone into naive local time.
    pub fn to_local(self, stamp: NaiveDateTime) -> NaiveDateTime {
        match self {
            ClockZone::Local => stamp,
            ClockZone::Utc => Utc
                .from_utc_datetime(&stamp)
                .with_timezone(&Local)
                .naive_local(),
        }
    }
}

/// Signed seconds from `from` to `to`.
pub fn seconds_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    let delta = to - from;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1000.0,
    }
}

/// `stamp` shifted by fractional seconds (microsecond resolution).
pub fn add_seconds(stamp: NaiveDateTime, secs: f64) -> NaiveDateTime {
    stamp + Duration::microseconds((secs * 1_000_000.0).round() as i64)
}

/// Whether two stamps are strictly closer than `secs`.
pub fn within_secs(a: NaiveDateTime, b: NaiveDateTime, secs: f64) -> bool {
    seconds_between(a, b).abs() < secs
}

/// Seconds to the nearest whole frame.
pub fn secs_to_frames(secs: f64, fps: f64) -> i64 {
    (secs * fps).round() as i64
}

/// Frame count to seconds. A zero fps yields zero.
pub fn frames_to_secs(frames: i64, fps: f64) -> f64 {
    if fps <= 0.0 {
        return 0.0;
    }
    frames as f64 / fps
}

/// Rolling frames-per-second estimate, reported every N frames.
#[derive(Debug)]
pub struct FpsMeter {
    every: u64,
    frames: u64,
    window_start: Option<Instant>,
}

impl FpsMeter {
    /// Create a meter reporting once every `every` frames.
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            frames: 0,
            window_start: None,
        }
    }

    /// Count one frame at `now`.
    ///
    /// Returns the fps over the last window when a report is due. The
    /// first call only starts the clock.
    pub fn tick(&mut self, now: Instant) -> Option<f64> {
        self.frames += 1;
        let start = *self.window_start.get_or_insert(now);
        if self.frames % self.every != 0 {
            return None;
        }
        let elapsed = now.saturating_duration_since(start).as_secs_f64();
        self.window_start = Some(now);
        if elapsed <= 0.0 {
            return Some(0.0);
        }
        Some(self.every as f64 / elapsed)
    }

    /// Frames counted so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}
