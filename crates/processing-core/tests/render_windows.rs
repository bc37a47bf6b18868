use std::path::PathBuf;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use laprender_common::clock::add_seconds;
use laprender_common::ClockZone;
use laprender_processing_core::{CalibrationCommand, Calibrator, RenderMode, RenderParams, Step};
use laprender_telemetry::{Fix, Lap};
use laprender_video::{ProbeInfo, Video};
use proptest::prelude::*;

fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2016, 1, 1)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

fn video(seconds: f64) -> Video {
    Video::from_probes(vec![ProbeInfo {
        path: PathBuf::from("GOPR0042.MP4"),
        fps: 30.0,
        frame_count: (seconds * 30.0) as u64,
        width: 1920,
        height: 1080,
        duration_secs: seconds,
        creation_time: t0(),
        has_audio: true,
    }])
    .unwrap()
}

fn lap(offset_secs: f64, lap_time: f64) -> Arc<Lap> {
    let start = add_seconds(t0(), offset_secs);
    Arc::new(
        Lap::new(
            1,
            vec![
                Fix::new(1, 0.0, start, ClockZone::Local),
                Fix::new(1, lap_time, add_seconds(start, lap_time), ClockZone::Local),
            ],
        )
        .unwrap(),
    )
}

#[test]
fn end_to_end_binding_without_bookend() {
    let mut v = video(120.0);
    v.match_laps(&[lap(20.0, 55.0)]);
    assert_eq!(v.bindings().len(), 1);
    assert_eq!(v.bindings()[0].start_frame, 600);
    assert_eq!(v.bindings()[0].end_frame, 2250);

    let plans = RenderParams::plan(&v, 0.0, RenderMode::PerLap);
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].total_frames(), 1650);
}

#[test]
fn committed_offset_moves_render_window() {
    let mut v = video(120.0);
    v.match_laps(&[lap(20.0, 55.0)]);

    let mut calibrator = Calibrator::for_video(&v).unwrap();
    calibrator.start();
    for command in [
        CalibrationCommand::AdjustOffset(1),
        CalibrationCommand::AdjustOffset(1),
        CalibrationCommand::StepFrame(-1),
    ] {
        assert!(matches!(calibrator.apply(Some(command)), Step::Render(_)));
    }
    let Step::Done(offset) = calibrator.apply(Some(CalibrationCommand::Commit)) else {
        panic!("commit must finish calibration");
    };
    v.frame_offset = offset;

    let plans = RenderParams::plan(&v, 0.0, RenderMode::PerLap);
    assert_eq!(plans[0].windows[0].start_frame, 602);
    assert_eq!(plans[0].total_frames(), 1650);
}

#[test]
fn calibration_without_selected_lap_is_noop() {
    let mut v = video(120.0);
    v.frame_offset = 9;
    assert!(Calibrator::for_video(&v).is_none());

    v.match_laps(&[lap(20.0, 55.0)]);
    v.bindings_mut()[0].render = false;
    assert!(Calibrator::for_video(&v).is_none());
    assert_eq!(v.frame_offset, 9);
}

proptest! {
    #[test]
    fn windows_stay_inside_video(
        lap_start in 0.0f64..110.0,
        lap_time in 1.0f64..90.0,
        offset in -400i64..400,
        bookend in 0.0f64..20.0,
    ) {
        let mut v = video(120.0);
        v.match_laps(&[lap(lap_start, lap_time)]);
        v.frame_offset = offset;
        for params in RenderParams::plan(&v, bookend, RenderMode::PerLap) {
            for w in &params.windows {
                prop_assert!(w.start_frame >= 0);
                prop_assert!(w.end_frame <= v.frame_count());
                prop_assert!(w.start_frame <= w.end_frame);
                prop_assert!(w.audio_start_secs >= 0.0);
            }
        }
    }
}
