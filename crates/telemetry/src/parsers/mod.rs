//! Telemetry log parsers.
//!
//! Each parser maps one logger's CSV export onto [`Fix`] records and groups
//! them into [`Lap`]s. Columns are matched by name; a column that is neither
//! mapped nor on the parser's list of known-but-unused columns is rejected.

mod harrys;
mod trackaddict;

use std::io::{BufRead, BufReader, Read};
use std::path::Path;

pub use harrys::HarrysCsvParser;
pub use trackaddict::TrackAddictCsvParser;

use crate::error::{TelemetryError, TelemetryResult};
use crate::fix::Fix;
use crate::lap::Lap;

/// A reader for one telemetry log format.
pub trait TelemetryParser: Send + Sync {
    /// Human-readable format name.
    fn name(&self) -> &str;

    /// Whether this parser understands a file whose first line is `first_line`.
    fn accepts(&self, path: &Path, first_line: &str) -> bool;

    /// Parse a full log into laps, ordered by lap index.
    fn parse(&self, reader: &mut dyn BufRead, path: &Path) -> TelemetryResult<Vec<Lap>>;
}

/// All built-in parsers, most specific first.
pub fn parsers() -> Vec<Box<dyn TelemetryParser>> {
    vec![
        Box::new(TrackAddictCsvParser),
        Box::new(HarrysCsvParser),
    ]
}

/// First parser that accepts `path`.
pub fn find_parser(path: &Path) -> TelemetryResult<Option<Box<dyn TelemetryParser>>> {
    let first_line = read_first_line(path)?;
    Ok(parsers()
        .into_iter()
        .find(|p| p.accepts(path, &first_line)))
}

/// Parse `path` with the first parser that accepts it.
pub fn parse_file(path: &Path) -> TelemetryResult<Vec<Lap>> {
    let parser = find_parser(path)?.ok_or_else(|| TelemetryError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;
    let file = std::fs::File::open(path).map_err(|source| TelemetryError::IoError {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);
    let laps = parser.parse(&mut reader, path)?;
    tracing::info!(
        path = %path.display(),
        parser = parser.name(),
        laps = laps.len(),
        fixes = laps.iter().map(|l| l.fixes().len()).sum::<usize>(),
        "Parsed telemetry"
    );
    Ok(laps)
}

fn read_first_line(path: &Path) -> TelemetryResult<String> {
    let io_err = |source| TelemetryError::IoError {
        path: path.to_path_buf(),
        source,
    };
    let file = std::fs::File::open(path).map_err(io_err)?;
    let mut line = String::new();
    BufReader::new(file.take(4096))
        .read_line(&mut line)
        .map_err(io_err)?;
    Ok(line)
}

/// Split one CSV row, honoring double quotes and `""` escapes.
pub(crate) fn split_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.trim_end_matches(['\r', '\n']).chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

/// Parse a numeric cell, reporting the column on failure.
pub(crate) fn parse_number(
    cell: &str,
    column: &str,
    path: &Path,
    line: usize,
) -> TelemetryResult<f64> {
    cell.trim()
        .parse::<f64>()
        .map_err(|e| TelemetryError::ParseError {
            path: path.to_path_buf(),
            line,
            message: format!("column '{column}': '{cell}': {e}"),
        })
}

/// Group fixes by lap index into laps, ordered by index.
pub(crate) fn group_laps(
    fixes: impl IntoIterator<Item = Fix>,
) -> TelemetryResult<Vec<Lap>> {
    let mut by_lap: std::collections::BTreeMap<u32, Vec<Fix>> = Default::default();
    for fix in fixes {
        by_lap.entry(fix.lap_index).or_default().push(fix);
    }
    by_lap
        .into_iter()
        .map(|(index, mut fixes)| {
            fixes.sort_by(|a, b| a.lap_time.total_cmp(&b.lap_time));
            Lap::new(index, fixes)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_row_plain() {
        assert_eq!(split_row("1,2,,3\n"), vec!["1", "2", "", "3"]);
    }

    #[test]
    fn test_split_row_quoted() {
        assert_eq!(
            split_row(r#""Time","Speed (MPH)","a,b","say ""hi""""#),
            vec!["Time", "Speed (MPH)", "a,b", r#"say "hi""#]
        );
    }

    #[test]
    fn test_parse_number_reports_column() {
        let err = parse_number("abc", "Latitude", Path::new("x.csv"), 7).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("line 7"));
        assert!(msg.contains("Latitude"));
    }

    #[test]
    fn test_find_parser_unknown_file() {
        let dir = std::env::temp_dir().join("laprender_find_parser_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("notes.txt");
        std::fs::write(&path, "hello\n").unwrap();

        assert!(find_parser(&path).unwrap().is_none());
        assert!(matches!(
            parse_file(&path),
            Err(TelemetryError::UnsupportedFormat { .. })
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
