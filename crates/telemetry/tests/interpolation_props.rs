//! Property tests for lap interpolation.

use chrono::NaiveDate;
use laprender_common::clock::add_seconds;
use laprender_common::ClockZone;
use laprender_telemetry::{Fix, Lap, Metric};
use proptest::prelude::*;

fn build_lap(steps: &[(f64, f64)]) -> Lap {
    let start = NaiveDate::from_ymd_opt(2016, 1, 1)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap();
    let mut t = 0.0;
    let fixes = steps
        .iter()
        .enumerate()
        .map(|(i, &(dt, speed))| {
            if i > 0 {
                t += dt;
            }
            let mut fix = Fix::new(1, t, add_seconds(start, t), ClockZone::Local);
            fix.speed_mph = speed;
            fix.lat = 34.0 + t * 1e-4;
            fix.long = -118.0;
            fix
        })
        .collect();
    Lap::new(1, fixes).unwrap()
}

proptest! {
    #[test]
    fn interpolated_value_lies_within_bracket(
        steps in prop::collection::vec((0.05f64..5.0, 0.0f64..200.0), 2..40),
        frac in 0.0f64..=1.0,
    ) {
        let lap = build_lap(&steps);
        let fixes = lap.fixes();
        let first = fixes[0].lap_time;
        let last = fixes[fixes.len() - 1].lap_time;
        let seconds = first + (last - first) * frac;

        let value = lap.metric_at_time(Metric::SpeedMph, seconds);

        let i = fixes
            .windows(2)
            .position(|w| w[0].lap_time <= seconds && seconds <= w[1].lap_time)
            .unwrap();
        let (a, b) = (fixes[i].speed_mph, fixes[i + 1].speed_mph);
        let (lo, hi) = (a.min(b), a.max(b));
        prop_assert!(value >= lo - 1e-9 && value <= hi + 1e-9,
            "{value} not within [{lo}, {hi}] at t={seconds}");
    }

    #[test]
    fn endpoints_return_sample_values(
        steps in prop::collection::vec((0.05f64..5.0, 0.0f64..200.0), 2..40),
    ) {
        let lap = build_lap(&steps);
        let fixes = lap.fixes();
        let first = &fixes[0];
        let last = &fixes[fixes.len() - 1];
        prop_assert_eq!(lap.metric_at_time(Metric::SpeedMph, first.lap_time), first.speed_mph);
        prop_assert!((lap.metric_at_time(Metric::SpeedMph, last.lap_time) - last.speed_mph).abs() < 1e-9);
    }

    #[test]
    fn distance_fraction_is_monotonic(
        steps in prop::collection::vec((0.05f64..5.0, 0.0f64..200.0), 2..40),
    ) {
        let lap = build_lap(&steps);
        let mut prev = 0.0;
        let n = 50;
        for k in 0..=n {
            let t = lap.lap_time() * k as f64 / n as f64;
            let f = lap.distance_fraction_at(t);
            prop_assert!(f + 1e-12 >= prev);
            prop_assert!((0.0..=1.0).contains(&f));
            prev = f;
        }
    }
}
