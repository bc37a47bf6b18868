//! Lap aggregate: an ordered run of fixes with metrics derived at construction.

use chrono::NaiveDateTime;
use laprender_common::clock::add_seconds;
use serde::{Deserialize, Serialize};

use crate::error::{TelemetryError, TelemetryResult};
use crate::fix::{Fix, Metric};
use crate::geo::{haversine_km, GeoPoint, GpsBounds};

/// Direction a metric was moving before it turned around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// Increasing into the marker: the marker is a local peak.
    Rising,
    /// Decreasing into the marker: the marker is a local trough.
    Falling,
}

impl Trend {
    /// `+1` for rising, `-1` for falling.
    pub fn sign(self) -> i8 {
        match self {
            Trend::Rising => 1,
            Trend::Falling => -1,
        }
    }
}

/// A local extremum of a metric within a lap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionChange {
    /// Metric value at the extremum.
    pub value: f64,
    /// Trend leading into the extremum.
    pub direction: Trend,
    /// Index of the extremum fix within the lap.
    pub fix_index: usize,
    /// Lap-relative time of the extremum fix.
    pub seconds: f64,
}

/// An ordered, non-empty sequence of fixes sharing a lap index.
///
/// Everything derived from the fixes is computed once in [`Lap::new`] and
/// never recomputed.
#[derive(Debug, Clone, PartialEq)]
pub struct Lap {
    index: u32,
    fixes: Vec<Fix>,
    start_time: NaiveDateTime,
    end_time: NaiveDateTime,
    lap_time: f64,
    distances: Vec<f64>,
    total_distance: f64,
    speed_changes: Vec<DirectionChange>,
    lat_g_changes: Vec<DirectionChange>,
    lin_g_changes: Vec<DirectionChange>,
    bounds: GpsBounds,
}

impl Lap {
    /// Build a lap from fixes ordered by `lap_time`.
    pub fn new(index: u32, fixes: Vec<Fix>) -> TelemetryResult<Self> {
        let first = fixes.first().ok_or(TelemetryError::EmptyLap { index })?;
        debug_assert!(
            fixes.windows(2).all(|w| w[0].lap_time <= w[1].lap_time),
            "fixes must be ordered by lap_time"
        );

        let start_time = first.local_wall_clock();
        let lap_time = fixes
            .iter()
            .map(|f| f.lap_time)
            .fold(f64::NEG_INFINITY, f64::max);
        let end_time = add_seconds(start_time, lap_time);

        let mut distances = Vec::with_capacity(fixes.len());
        let mut total = 0.0;
        distances.push(0.0);
        for pair in fixes.windows(2) {
            total += haversine_km(
                GeoPoint::new(pair[0].lat, pair[0].long),
                GeoPoint::new(pair[1].lat, pair[1].long),
            );
            distances.push(total);
        }

        let bounds = GpsBounds::from_points(fixes.iter().map(|f| GeoPoint::new(f.lat, f.long)))
            .ok_or(TelemetryError::EmptyLap { index })?;

        let speed_changes = direction_changes(&fixes, Metric::SpeedMph);
        let lat_g_changes = direction_changes(&fixes, Metric::LatG);
        let lin_g_changes = direction_changes(&fixes, Metric::LinG);

        Ok(Self {
            index,
            fixes,
            start_time,
            end_time,
            lap_time,
            distances,
            total_distance: total,
            speed_changes,
            lat_g_changes,
            lin_g_changes,
            bounds,
        })
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn fixes(&self) -> &[Fix] {
        &self.fixes
    }

    /// Local wall-clock time of the first fix.
    pub fn start_time(&self) -> NaiveDateTime {
        self.start_time
    }

    /// `start_time` plus the lap time.
    pub fn end_time(&self) -> NaiveDateTime {
        self.end_time
    }

    /// Largest lap-relative timestamp (seconds).
    pub fn lap_time(&self) -> f64 {
        self.lap_time
    }

    /// Great-circle length of the lap (km).
    pub fn total_distance(&self) -> f64 {
        self.total_distance
    }

    /// Cumulative distance at each fix (km); starts at zero, never decreases.
    pub fn cumulative_distances(&self) -> &[f64] {
        &self.distances
    }

    pub fn speed_changes(&self) -> &[DirectionChange] {
        &self.speed_changes
    }

    pub fn lat_g_changes(&self) -> &[DirectionChange] {
        &self.lat_g_changes
    }

    pub fn lin_g_changes(&self) -> &[DirectionChange] {
        &self.lin_g_changes
    }

    pub fn gps_bounds(&self) -> &GpsBounds {
        &self.bounds
    }

    /// Linearly interpolated value of `metric` at `seconds` into the lap.
    pub fn metric_at_time(&self, metric: Metric, seconds: f64) -> f64 {
        self.interpolate(seconds, |i| self.fixes[i].metric(metric))
    }

    pub fn speed_at(&self, seconds: f64) -> f64 {
        self.metric_at_time(Metric::SpeedMph, seconds)
    }

    pub fn lat_g_at(&self, seconds: f64) -> f64 {
        self.metric_at_time(Metric::LatG, seconds)
    }

    pub fn lin_g_at(&self, seconds: f64) -> f64 {
        self.metric_at_time(Metric::LinG, seconds)
    }

    /// Interpolated GPS position at `seconds`.
    pub fn gps_at_time(&self, seconds: f64) -> GeoPoint {
        GeoPoint::new(
            self.metric_at_time(Metric::Lat, seconds),
            self.metric_at_time(Metric::Long, seconds),
        )
    }

    /// Interpolated cumulative distance at `seconds` (km).
    pub fn distance_at_time(&self, seconds: f64) -> f64 {
        self.interpolate(seconds, |i| self.distances[i])
    }

    /// Share of the lap distance covered at `seconds`, in `[0, 1]`.
    pub fn distance_fraction_at(&self, seconds: f64) -> f64 {
        if self.total_distance <= 0.0 {
            return 0.0;
        }
        (self.distance_at_time(seconds) / self.total_distance).clamp(0.0, 1.0)
    }

    /// Most recent speed extremum at or before `seconds`.
    pub fn nearest_speed_change(&self, seconds: f64) -> Option<&DirectionChange> {
        nearest_direction_change(&self.speed_changes, seconds, false)
    }

    /// Most recent lateral-g extremum at or before `seconds`.
    pub fn nearest_lat_g_change(&self, seconds: f64) -> Option<&DirectionChange> {
        nearest_direction_change(&self.lat_g_changes, seconds, false)
    }

    /// Most recent longitudinal-g extremum at or before `seconds`.
    pub fn nearest_lin_g_change(&self, seconds: f64) -> Option<&DirectionChange> {
        nearest_direction_change(&self.lin_g_changes, seconds, false)
    }

    /// Lap time as `M:SS.mmm`.
    pub fn formatted_lap_time(&self) -> String {
        format_lap_time(self.lap_time)
    }

    /// Multi-line summary for reports.
    pub fn details(&self) -> String {
        let speeds = self.fixes.iter().map(|f| f.speed_mph);
        let max_speed = speeds.clone().fold(f64::NEG_INFINITY, f64::max);
        let min_speed = speeds.fold(f64::INFINITY, f64::min);
        let peak_lat_g = self
            .fixes
            .iter()
            .map(|f| f.lat_g.abs())
            .fold(0.0, f64::max);
        let peak_brake_g = self.fixes.iter().map(|f| f.lin_g).fold(0.0, f64::min);
        format!(
            "  Fixes: {}\n  Distance: {:.3} km\n  Speed: {:.1}-{:.1} mph\n  Peak lateral: {:.2} g\n  Peak braking: {:.2} g\n  Apexes: {}",
            self.fixes.len(),
            self.total_distance,
            min_speed,
            max_speed,
            peak_lat_g,
            peak_brake_g,
            self.speed_changes
                .iter()
                .filter(|c| c.direction == Trend::Falling)
                .count(),
        )
    }

    /// Interpolate a per-fix value over lap time.
    ///
    /// Clamps to the first fix before the lap starts, interpolates within
    /// the first bracketing pair, and falls back to the last fix otherwise.
    /// Pairs with equal timestamps are skipped.
    fn interpolate(&self, seconds: f64, value: impl Fn(usize) -> f64) -> f64 {
        let first = &self.fixes[0];
        if seconds < first.lap_time {
            return value(0);
        }
        for i in 1..self.fixes.len() {
            let (a, b) = (&self.fixes[i - 1], &self.fixes[i]);
            if a.lap_time <= seconds && seconds <= b.lap_time {
                let span = b.lap_time - a.lap_time;
                if span <= 0.0 {
                    continue;
                }
                let t = (seconds - a.lap_time) / span;
                let (va, vb) = (value(i - 1), value(i));
                return va + (vb - va) * t;
            }
        }
        value(self.fixes.len() - 1)
    }
}

impl std::fmt::Display for Lap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Lap {} ({}) @ {}",
            self.index,
            self.formatted_lap_time(),
            self.start_time.format("%Y-%m-%d %H:%M:%S%.3f")
        )
    }
}

/// Format seconds as `M:SS.mmm`.
pub fn format_lap_time(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let minutes = total_ms / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let ms = total_ms % 1000;
    format!("{minutes}:{secs:02}.{ms:03}")
}

/// First marker at or after (`look_forward`) or at or before `seconds`.
///
/// Markers are in time order; a backward search scans them in reverse.
pub fn nearest_direction_change(
    markers: &[DirectionChange],
    seconds: f64,
    look_forward: bool,
) -> Option<&DirectionChange> {
    if look_forward {
        markers.iter().find(|m| m.seconds >= seconds)
    } else {
        markers.iter().rev().find(|m| m.seconds <= seconds)
    }
}

/// Local extrema of `metric` across `fixes`.
///
/// Each step is rising, falling, or flat; a flat step keeps the previous
/// trend. When the trend flips between step `i-1 -> i` and `i -> i+1`, fix
/// `i` is recorded with the trend that led into it.
pub fn direction_changes(fixes: &[Fix], metric: Metric) -> Vec<DirectionChange> {
    let mut markers = Vec::new();
    let mut trend: Option<Trend> = None;
    for i in 1..fixes.len() {
        let delta = fixes[i].metric(metric) - fixes[i - 1].metric(metric);
        let step = if delta > 0.0 {
            Some(Trend::Rising)
        } else if delta < 0.0 {
            Some(Trend::Falling)
        } else {
            trend
        };
        if let (Some(prev), Some(next)) = (trend, step) {
            if prev != next {
                let at = &fixes[i - 1];
                markers.push(DirectionChange {
                    value: at.metric(metric),
                    direction: prev,
                    fix_index: i - 1,
                    seconds: at.lap_time,
                });
            }
        }
        trend = step;
    }
    markers
}
