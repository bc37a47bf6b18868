//! Harry's GPS LapTimer CSV export.
//!
//! One banner line, then a header row. Each row carries its own UTC date
//! (`14-AUG-16`) and time (`16:57:02.65`) plus the lap-relative `TIME_LAP`.

use std::io::BufRead;
use std::path::Path;

use chrono::NaiveDateTime;
use laprender_common::ClockZone;

use super::{group_laps, parse_number, split_row, TelemetryParser};
use crate::error::{TelemetryError, TelemetryResult};
use crate::fix::Fix;
use crate::lap::Lap;

/// Parser for Harry's LapTimer CSV logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct HarrysCsvParser;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Column {
    Index,
    LapIndex,
    Date,
    Time,
    TimeLap,
    Latitude,
    Longitude,
    SpeedMph,
    HeightM,
    HeadingDeg,
    AccuracyM,
    LateralG,
    LinealG,
    Rpm,
    Maf,
    Throttle,
    Gear,
    Fuel,
    CoolantC,
    OilC,
    IatC,
    Map,
    Ignored,
}

impl Column {
    fn from_header(name: &str) -> Option<Self> {
        Some(match name {
            "INDEX" => Column::Index,
            "LAPINDEX" => Column::LapIndex,
            "DATE" => Column::Date,
            "TIME" => Column::Time,
            "TIME_LAP" => Column::TimeLap,
            "LATITUDE" => Column::Latitude,
            "LONGITUDE" => Column::Longitude,
            "SPEED_MPH" => Column::SpeedMph,
            "HEIGHT_M" => Column::HeightM,
            "HEADING_DEG" => Column::HeadingDeg,
            "ACCURACY_M" => Column::AccuracyM,
            "LATERALG" => Column::LateralG,
            "LINEALG" => Column::LinealG,
            "RPM" => Column::Rpm,
            "MAF" => Column::Maf,
            "THROTTLE" => Column::Throttle,
            "GEAR" => Column::Gear,
            "FUEL" => Column::Fuel,
            "COOLANT_CELSIUS" => Column::CoolantC,
            "OIL_CELSIUS" => Column::OilC,
            "IAT_CELSIUS" => Column::IatC,
            "MAP" => Column::Map,
            "SPEED_KPH"
            | "HEIGHT_FT"
            | "GPSDIFFERENTIAL[UNKNOWN/2D3D/DGPS/INVALID]"
            | "GPSFIX[NOFIX/2D/3D/UNKNOWN]"
            | "SATELLITES"
            | "HDOP"
            | "DISTANCE_KM"
            | "DISTANCE_MILE"
            | "ACCELERATIONSOURCE[CALCULATED/MEASURED/UNDEFINED]"
            | "LEAN"
            | "WHEEL_SPEED_KPH"
            | "WHEEL_SPEED_MPH" => Column::Ignored,
            _ => return None,
        })
    }
}

impl TelemetryParser for HarrysCsvParser {
    fn name(&self) -> &str {
        "Harry's LapTimer CSV"
    }

    fn accepts(&self, path: &Path, first_line: &str) -> bool {
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        is_csv && first_line.contains("Harry")
    }

    fn parse(&self, reader: &mut dyn BufRead, path: &Path) -> TelemetryResult<Vec<Lap>> {
        let io_err = |source| TelemetryError::IoError {
            path: path.to_path_buf(),
            source,
        };
        let missing_header = || TelemetryError::ParseError {
            path: path.to_path_buf(),
            line: 1,
            message: "missing header row".to_string(),
        };

        let mut lines = reader.lines().enumerate().skip(1);
        let (_, header) = lines.next().ok_or_else(missing_header)?;
        let header = header.map_err(io_err)?;
        let columns = split_row(&header)
            .into_iter()
            .map(|name| {
                let name = name.trim().to_string();
                Column::from_header(&name).ok_or_else(|| TelemetryError::UnknownColumn {
                    path: path.to_path_buf(),
                    column: name.clone(),
                })
            })
            .collect::<TelemetryResult<Vec<_>>>()?;
        if !columns.contains(&Column::Date) || !columns.contains(&Column::Time) {
            return Err(missing_header());
        }

        let mut fixes = Vec::new();
        for (idx, line) in lines {
            let line = line.map_err(io_err)?;
            let line_no = idx + 1;
            if line.trim().is_empty() {
                continue;
            }
            let cells = split_row(&line);
            let mut date = "";
            let mut time = "";
            let mut fix = Fix::new(0, 0.0, NaiveDateTime::default(), ClockZone::Utc);
            for (column, cell) in columns.iter().zip(cells.iter()) {
                let name = format!("{column:?}");
                let value = || parse_number(cell, &name, path, line_no);
                match column {
                    Column::Index => fix.fix_id = value()? as u64,
                    Column::LapIndex => fix.lap_index = value()? as u32,
                    Column::Date => date = cell.trim(),
                    Column::Time => time = cell.trim(),
                    Column::TimeLap => fix.lap_time = value()?,
                    Column::Latitude => fix.lat = value()?,
                    Column::Longitude => fix.long = value()?,
                    Column::SpeedMph => fix.speed_mph = value()?,
                    Column::HeightM => fix.alt_m = Some(value()?),
                    Column::HeadingDeg => fix.heading_deg = Some(value()?),
                    Column::AccuracyM => fix.accuracy_m = Some(value()?),
                    Column::LateralG => fix.lat_g = value()?,
                    Column::LinealG => fix.lin_g = value()?,
                    Column::Rpm => fix.rpm = Some(value()?),
                    Column::Maf => fix.maf = Some(value()?),
                    Column::Throttle => fix.throttle = Some(value()?),
                    Column::Gear => fix.gear = Some(value()?),
                    Column::Fuel => fix.fuel = Some(value()?),
                    Column::CoolantC => fix.coolant_c = Some(value()?),
                    Column::OilC => fix.oil_c = Some(value()?),
                    Column::IatC => fix.iat_c = Some(value()?),
                    Column::Map => fix.map_kpa = Some(value()?),
                    Column::Ignored => {}
                }
            }
            fix.wall_clock = NaiveDateTime::parse_from_str(
                &format!("{date} {time}"),
                "%d-%b-%y %H:%M:%S%.f",
            )
            .map_err(|e| TelemetryError::ParseError {
                path: path.to_path_buf(),
                line: line_no,
                message: format!("bad date/time '{date} {time}': {e}"),
            })?;
            fixes.push(fix);
        }

        group_laps(fixes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Cursor;

    const SAMPLE: &str = "\
Harry's GPS LapTimer
INDEX,LAPINDEX,DATE,TIME,TIME_LAP,LATITUDE,LONGITUDE,SPEED_KPH,SPEED_MPH,HEIGHT_M,LATERALG,LINEALG,RPM
57358,381,14-AUG-16,16:57:02.65,0.000000,34.874742,-118.258734,102.6,63.752684,740.0,0.15,0.34,0
57359,381,14-AUG-16,16:57:03.65,1.000000,34.874842,-118.258734,104.6,65.0,740.0,0.25,0.14,5200
57360,382,14-AUG-16,16:58:50.00,0.000000,34.874742,-118.258734,100.0,62.1,740.0,-0.30,-0.50,5100
";

    #[test]
    fn test_accepts_banner_and_extension() {
        let parser = HarrysCsvParser;
        assert!(parser.accepts(Path::new("run.CSV"), "Harry's GPS LapTimer"));
        assert!(!parser.accepts(Path::new("run.txt"), "Harry's GPS LapTimer"));
        assert!(!parser.accepts(Path::new("run.csv"), "# TrackAddict"));
    }

    #[test]
    fn test_parse_groups_by_lap_index() {
        let laps = HarrysCsvParser
            .parse(&mut Cursor::new(SAMPLE), Path::new("run.csv"))
            .unwrap();
        assert_eq!(laps.len(), 2);
        assert_eq!(laps[0].index(), 381);
        assert_eq!(laps[0].fixes().len(), 2);
        assert_eq!(laps[0].lap_time(), 1.0);
        assert_eq!(laps[0].fixes()[1].rpm, Some(5200.0));
        assert_eq!(laps[1].index(), 382);
    }

    #[test]
    fn test_times_are_utc() {
        let laps = HarrysCsvParser
            .parse(&mut Cursor::new(SAMPLE), Path::new("run.csv"))
            .unwrap();
        let fix = &laps[0].fixes()[0];
        assert_eq!(fix.clock, ClockZone::Utc);
        let expected = NaiveDate::from_ymd_opt(2016, 8, 14)
            .unwrap()
            .and_hms_milli_opt(16, 57, 2, 650)
            .unwrap();
        assert_eq!(fix.wall_clock, expected);
        assert_eq!(laps[0].start_time(), ClockZone::Utc.to_local(expected));
    }

    #[test]
    fn test_unknown_column_rejected() {
        let data = "Harry's GPS LapTimer\nINDEX,DATE,TIME,BOOST_PSI\n";
        let err = HarrysCsvParser
            .parse(&mut Cursor::new(data), Path::new("run.csv"))
            .unwrap_err();
        assert!(matches!(err, TelemetryError::UnknownColumn { column, .. } if column == "BOOST_PSI"));
    }
}
