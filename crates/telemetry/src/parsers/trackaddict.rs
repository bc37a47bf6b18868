//! TrackAddict / RaceRender CSV export.
//!
//! ```text
//! # RaceRender Data: TrackAddict 3.4.2 on iOS 10.1.1 [iPhone8,4] (Mode: 0)
//! # End Point: 34.871512, -118.263719  @ -1.00 deg
//! "Time","Lap","Predicted Lap Time",...,"Accel X","Accel Y","Accel Z"
//! 0.000,0,0,0,1,0.000,34.8708676,-118.2630034,735.5,2413,13.2,303.4,5.0,0.00,0.00,0.00
//! # Lap 1: 00:01:48.516
//! ```
//!
//! `Time` counts seconds since the session started; the session start is
//! only recorded in the file name (`Log-YYYYMMDD-HHMMSS ...`). Times are
//! local. A `# Lap N: HH:MM:SS.mmm` row closes the running lap.

use std::io::BufRead;
use std::path::Path;

use chrono::NaiveDateTime;
use laprender_common::clock::add_seconds;
use laprender_common::ClockZone;

use super::{group_laps, parse_number, split_row, TelemetryParser};
use crate::error::{TelemetryError, TelemetryResult};
use crate::fix::Fix;
use crate::lap::Lap;

/// Columns present in TrackAddict exports that carry no mapped channel.
const IGNORED_COLUMNS: &[&str] = &[
    "Predicted Lap Time",
    "Predicted vs Best Lap",
    "GPS_Update",
    "GPS_Delay",
    "Altitude (ft)",
    "Accel Z",
];

/// Parser for TrackAddict CSV logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrackAddictCsvParser;

#[derive(Debug, Clone, Copy)]
enum Column {
    Time,
    Lap,
    Latitude,
    Longitude,
    AltitudeM,
    SpeedMph,
    Heading,
    AccuracyM,
    AccelX,
    AccelY,
    Ignored,
}

impl Column {
    fn from_header(name: &str) -> Option<Self> {
        Some(match name {
            "Time" => Column::Time,
            "Lap" => Column::Lap,
            "Latitude" => Column::Latitude,
            "Longitude" => Column::Longitude,
            "Altitude (m)" => Column::AltitudeM,
            "Speed (MPH)" => Column::SpeedMph,
            "Heading" => Column::Heading,
            "Accuracy (m)" => Column::AccuracyM,
            "Accel X" => Column::AccelX,
            "Accel Y" => Column::AccelY,
            other if IGNORED_COLUMNS.contains(&other) => Column::Ignored,
            _ => return None,
        })
    }
}

impl TelemetryParser for TrackAddictCsvParser {
    fn name(&self) -> &str {
        "TrackAddict CSV"
    }

    fn accepts(&self, _path: &Path, first_line: &str) -> bool {
        first_line.contains("TrackAddict")
    }

    fn parse(&self, reader: &mut dyn BufRead, path: &Path) -> TelemetryResult<Vec<Lap>> {
        let session_start = session_start_from_name(path)?;
        let io_err = |source| TelemetryError::IoError {
            path: path.to_path_buf(),
            source,
        };

        let mut lines = reader.lines().enumerate();
        // Two comment lines, then the header.
        let mut header = None;
        for (_, line) in lines.by_ref() {
            let line = line.map_err(io_err)?;
            if !line.starts_with('#') {
                header = Some(line);
                break;
            }
        }
        let header = header.ok_or_else(|| TelemetryError::ParseError {
            path: path.to_path_buf(),
            line: 0,
            message: "missing header row".to_string(),
        })?;
        let columns = split_row(&header)
            .into_iter()
            .map(|name| {
                Column::from_header(&name).ok_or_else(|| TelemetryError::UnknownColumn {
                    path: path.to_path_buf(),
                    column: name.clone(),
                })
            })
            .collect::<TelemetryResult<Vec<_>>>()?;

        let mut state = SessionState::default();
        for (idx, line) in lines {
            let line = line.map_err(io_err)?;
            let line_no = idx + 1;
            if line.trim().is_empty() {
                continue;
            }
            let cells = split_row(&line);
            let first = cells.first().map(String::as_str).unwrap_or("");
            if first.contains("End") {
                continue;
            }
            if first.starts_with('#') {
                let lap_len = parse_lap_marker(first).ok_or_else(|| TelemetryError::ParseError {
                    path: path.to_path_buf(),
                    line: line_no,
                    message: format!("bad lap marker '{first}'"),
                })?;
                state.close_lap(lap_len);
                continue;
            }

            let mut session_time = 0.0;
            let mut fix = Fix::new(0, 0.0, session_start, ClockZone::Local);
            for (column, cell) in columns.iter().zip(cells.iter()) {
                let name = format!("{column:?}");
                let value = || parse_number(cell, &name, path, line_no);
                match column {
                    Column::Time => session_time = value()?,
                    Column::Lap => fix.lap_index = value()? as u32,
                    Column::Latitude => fix.lat = value()?,
                    Column::Longitude => fix.long = value()?,
                    Column::AltitudeM => fix.alt_m = Some(value()?),
                    Column::SpeedMph => fix.speed_mph = value()?,
                    Column::Heading => fix.heading_deg = Some(value()?),
                    Column::AccuracyM => fix.accuracy_m = Some(value()?),
                    Column::AccelX => fix.lat_g = value()?,
                    Column::AccelY => fix.lin_g = value()?,
                    Column::Ignored => {}
                }
            }
            fix.wall_clock = add_seconds(session_start, session_time);
            fix.lap_time = session_time - state.completed;
            state.push(fix);
        }

        group_laps(state.fixes)
    }
}

#[derive(Debug, Default)]
struct SessionState {
    fixes: Vec<Fix>,
    next_id: u64,
    /// Session seconds covered by completed laps.
    completed: f64,
}

impl SessionState {
    fn push(&mut self, mut fix: Fix) {
        fix.fix_id = self.next_id;
        self.next_id += 1;
        self.fixes.push(fix);
    }

    /// Close the lap of the most recent fix at `lap_len` seconds.
    ///
    /// Fixes logged past the lap length belong to the next lap and are
    /// re-based; a copy of the last remaining fix marks the exact lap end.
    fn close_lap(&mut self, lap_len: f64) {
        let Some(ending) = self.fixes.last().map(|f| f.lap_index) else {
            return;
        };
        self.completed += lap_len;
        for fix in self.fixes.iter_mut().filter(|f| f.lap_index == ending) {
            if fix.lap_time > lap_len {
                fix.lap_index += 1;
                fix.lap_time -= lap_len;
            }
        }
        if let Some(last) = self
            .fixes
            .iter()
            .filter(|f| f.lap_index == ending)
            .last()
            .cloned()
        {
            let mut end = last;
            end.wall_clock = add_seconds(end.wall_clock, lap_len - end.lap_time);
            end.lap_time = lap_len;
            self.push(end);
        }
    }
}

/// Session start from `Log-YYYYMMDD-HHMMSS ...`.
fn session_start_from_name(path: &Path) -> TelemetryResult<NaiveDateTime> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    name.get(4..19)
        .and_then(|stamp| NaiveDateTime::parse_from_str(stamp, "%Y%m%d-%H%M%S").ok())
        .ok_or_else(|| TelemetryError::ParseError {
            path: path.to_path_buf(),
            line: 0,
            message: "file name does not carry a Log-YYYYMMDD-HHMMSS session start".to_string(),
        })
}

/// Lap length in seconds from `# Lap N: HH:MM:SS.mmm`.
///
/// Summed in whole milliseconds so the result is the nearest `f64` to the
/// written time.
fn parse_lap_marker(cell: &str) -> Option<f64> {
    let (_, clock) = cell.split_once(": ")?;
    let mut parts = clock.trim().split(':');
    let h: i64 = parts.next()?.parse().ok()?;
    let m: i64 = parts.next()?.parse().ok()?;
    let s: f64 = parts.next()?.parse().ok()?;
    let millis = (h * 3600 + m * 60) * 1000 + (s * 1000.0).round() as i64;
    Some(millis as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE: &str = "\
# RaceRender Data: TrackAddict 3.4.2 on iOS 10.1.1 [iPhone8,4] (Mode: 0)
# End Point: 34.871512, -118.263719  @ -1.00 deg
\"Time\",\"Lap\",\"Predicted Lap Time\",\"Predicted vs Best Lap\",\"GPS_Update\",\"GPS_Delay\",\"Latitude\",\"Longitude\",\"Altitude (m)\",\"Altitude (ft)\",\"Speed (MPH)\",\"Heading\",\"Accuracy (m)\",\"Accel X\",\"Accel Y\",\"Accel Z\"
0.000,0,0,0,1,0.000,34.8708676,-118.2630034,735.5,2413,13.2,303.4,5.0,0.00,0.00,0.00
1.000,0,0,0,1,0.000,34.8709676,-118.2630034,735.5,2413,20.0,303.4,5.0,0.10,0.20,0.00
2.000,0,0,0,1,0.000,34.8710676,-118.2630034,735.5,2413,30.0,303.4,5.0,0.20,-0.40,0.00
2.500,0,0,0,1,0.000,34.8711676,-118.2630034,735.5,2413,32.0,303.4,5.0,0.20,-0.40,0.00
# Lap 1: 00:00:02.250
3.500,1,0,0,1,0.000,34.8712676,-118.2630034,735.5,2413,35.0,303.4,5.0,0.30,0.10,0.00
End
";

    fn path() -> &'static Path {
        Path::new("Log-20161120-101406 Big Willow - 1.48.516.csv")
    }

    #[test]
    fn test_accepts_banner() {
        let parser = TrackAddictCsvParser;
        assert!(parser.accepts(path(), SAMPLE.lines().next().unwrap()));
        assert!(!parser.accepts(path(), "Harry's GPS LapTimer"));
    }

    #[test]
    fn test_parse_splits_laps_at_marker() {
        let laps = TrackAddictCsvParser
            .parse(&mut Cursor::new(SAMPLE), path())
            .unwrap();
        assert_eq!(laps.len(), 2);

        let lap0 = &laps[0];
        assert_eq!(lap0.index(), 0);
        let times: Vec<f64> = lap0.fixes().iter().map(|f| f.lap_time).collect();
        assert_eq!(times, vec![0.0, 1.0, 2.0, 2.25]);
        assert_eq!(lap0.lap_time(), 2.25);

        let lap1 = &laps[1];
        let times: Vec<f64> = lap1.fixes().iter().map(|f| f.lap_time).collect();
        assert_eq!(times.len(), 2);
        assert!((times[0] - 0.25).abs() < 1e-9);
        assert!((times[1] - 1.25).abs() < 1e-9);
    }

    #[test]
    fn test_wall_clock_from_file_name() {
        let laps = TrackAddictCsvParser
            .parse(&mut Cursor::new(SAMPLE), path())
            .unwrap();
        let start = NaiveDateTime::parse_from_str("20161120-101406", "%Y%m%d-%H%M%S").unwrap();
        assert_eq!(laps[0].start_time(), start);
        assert_eq!(laps[0].fixes()[1].speed_mph, 20.0);
        assert_eq!(laps[0].fixes()[1].alt_m, Some(735.5));
        assert_eq!(laps[0].fixes()[2].lin_g, -0.4);
    }

    #[test]
    fn test_unknown_column_rejected() {
        let data = "# a TrackAddict\n# b\n\"Time\",\"Lap\",\"Boost\"\n0.0,0,1.0\n";
        let err = TrackAddictCsvParser
            .parse(&mut Cursor::new(data), path())
            .unwrap_err();
        assert!(matches!(err, TelemetryError::UnknownColumn { column, .. } if column == "Boost"));
    }

    #[test]
    fn test_file_name_without_date_rejected() {
        let err = TrackAddictCsvParser
            .parse(&mut Cursor::new(SAMPLE), Path::new("session.csv"))
            .unwrap_err();
        assert!(matches!(err, TelemetryError::ParseError { .. }));
    }

    #[test]
    fn test_parse_lap_marker() {
        assert_eq!(parse_lap_marker("# Lap 1: 00:01:48.516"), Some(108.516));
        assert_eq!(parse_lap_marker("# Lap 7: 01:02:03.004"), Some(3723.004));
        assert_eq!(parse_lap_marker("# Lap 1: 00:00:02.250"), Some(2.25));
        assert_eq!(parse_lap_marker("# Lap 1"), None);
        assert_eq!(parse_lap_marker("# Lap 1: 00:xx:02.250"), None);
    }
}
