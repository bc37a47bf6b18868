//! A single GPS/telemetry sample.

use chrono::NaiveDateTime;
use laprender_common::ClockZone;
use serde::{Deserialize, Serialize};

/// One GPS/telemetry reading.
///
/// The set of channels is fixed; parsers map their columns onto these fields
/// and reject anything else. Optional channels default to `None` when the
/// logger does not record them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fix {
    /// Sequence number within the source log.
    pub fix_id: u64,

    /// Lap this fix belongs to.
    pub lap_index: u32,

    /// Seconds since the lap started.
    pub lap_time: f64,

    /// Wall-clock time as stamped by the logger.
    pub wall_clock: NaiveDateTime,

    /// Zone `wall_clock` was stamped in.
    #[serde(default)]
    pub clock: ClockZone,

    /// Latitude (degrees).
    pub lat: f64,

    /// Longitude (degrees).
    pub long: f64,

    /// Ground speed (mph).
    pub speed_mph: f64,

    /// Lateral acceleration (g, positive to the right).
    pub lat_g: f64,

    /// Longitudinal acceleration (g, negative under braking).
    pub lin_g: f64,

    #[serde(default)]
    pub alt_m: Option<f64>,
    #[serde(default)]
    pub heading_deg: Option<f64>,
    #[serde(default)]
    pub accuracy_m: Option<f64>,
    #[serde(default)]
    pub rpm: Option<f64>,
    #[serde(default)]
    pub throttle: Option<f64>,
    #[serde(default)]
    pub gear: Option<f64>,
    #[serde(default)]
    pub fuel: Option<f64>,
    #[serde(default)]
    pub coolant_c: Option<f64>,
    #[serde(default)]
    pub oil_c: Option<f64>,
    #[serde(default)]
    pub iat_c: Option<f64>,
    #[serde(default)]
    pub map_kpa: Option<f64>,
    #[serde(default)]
    pub maf: Option<f64>,
}

/// Scalar channels that can be interpolated over lap time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Lat,
    Long,
    SpeedMph,
    LatG,
    LinG,
    AltM,
    HeadingDeg,
    Rpm,
    Throttle,
    Gear,
    CoolantC,
    OilC,
}

impl Fix {
    /// A fix with the required channels set and every optional channel empty.
    pub fn new(lap_index: u32, lap_time: f64, wall_clock: NaiveDateTime, clock: ClockZone) -> Self {
        Self {
            fix_id: 0,
            lap_index,
            lap_time,
            wall_clock,
            clock,
            lat: 0.0,
            long: 0.0,
            speed_mph: 0.0,
            lat_g: 0.0,
            lin_g: 0.0,
            alt_m: None,
            heading_deg: None,
            accuracy_m: None,
            rpm: None,
            throttle: None,
            gear: None,
            fuel: None,
            coolant_c: None,
            oil_c: None,
            iat_c: None,
            map_kpa: None,
            maf: None,
        }
    }

    /// Value of `metric`. Absent optional channels read as `0.0`.
    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Lat => self.lat,
            Metric::Long => self.long,
            Metric::SpeedMph => self.speed_mph,
            Metric::LatG => self.lat_g,
            Metric::LinG => self.lin_g,
            Metric::AltM => self.alt_m.unwrap_or(0.0),
            Metric::HeadingDeg => self.heading_deg.unwrap_or(0.0),
            Metric::Rpm => self.rpm.unwrap_or(0.0),
            Metric::Throttle => self.throttle.unwrap_or(0.0),
            Metric::Gear => self.gear.unwrap_or(0.0),
            Metric::CoolantC => self.coolant_c.unwrap_or(0.0),
            Metric::OilC => self.oil_c.unwrap_or(0.0),
        }
    }

    /// Wall-clock time normalized to local time.
    pub fn local_wall_clock(&self) -> NaiveDateTime {
        self.clock.to_local(self.wall_clock)
    }
}

impl std::fmt::Display for Fix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Fix {} Lap {} @{:.3} {:.6}:{:.6}",
            self.fix_id, self.lap_index, self.lap_time, self.lat, self.long
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2016, 8, 14)
            .unwrap()
            .and_hms_milli_opt(16, 57, 2, 650)
            .unwrap()
    }

    #[test]
    fn test_missing_channels_read_zero() {
        let fix = Fix::new(1, 0.5, stamp(), ClockZone::Local);
        assert_eq!(fix.metric(Metric::Rpm), 0.0);
        assert_eq!(fix.metric(Metric::SpeedMph), 0.0);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let json = serde_json::json!({
            "fix_id": 1,
            "lap_index": 1,
            "lap_time": 0.0,
            "wall_clock": "2016-08-14T16:57:02.650",
            "lat": 34.87,
            "long": -118.26,
            "speed_mph": 80.0,
            "lat_g": 0.1,
            "lin_g": -0.2,
            "lean_angle": 12.0
        });
        let parsed: Result<Fix, _> = serde_json::from_value(json);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_known_fields_accepted() {
        let json = serde_json::json!({
            "fix_id": 1,
            "lap_index": 1,
            "lap_time": 0.0,
            "wall_clock": "2016-08-14T16:57:02.650",
            "clock": "utc",
            "lat": 34.87,
            "long": -118.26,
            "speed_mph": 80.0,
            "lat_g": 0.1,
            "lin_g": -0.2,
            "rpm": 6500.0
        });
        let fix: Fix = serde_json::from_value(json).unwrap();
        assert_eq!(fix.clock, ClockZone::Utc);
        assert_eq!(fix.wall_clock, stamp());
        assert_eq!(fix.metric(Metric::Rpm), 6500.0);
    }
}
