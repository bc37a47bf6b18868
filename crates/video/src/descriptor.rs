//! Logical video recordings made of one or more time-split segments.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDateTime;
use laprender_common::cache::{file_set_key, Cache};
use laprender_common::clock::{add_seconds, within_secs};
use laprender_telemetry::Lap;
use serde::{Deserialize, Serialize};

use crate::binding::LapBinding;
use crate::matcher::{match_laps, VideoWindow};
use crate::probe::{file_modified_unix, ProbeInfo, VideoProber};

/// One file of a recording.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub path: PathBuf,
    pub fps: f64,
    pub frame_count: u64,
    pub duration_secs: f64,
    pub has_audio: bool,
}

/// A camera recording, possibly split across several files.
///
/// Segment frame counts are concatenated into one virtual frame index.
/// All derived fields come from the segment list; merging rebuilds them
/// from scratch.
#[derive(Debug, Clone)]
pub struct Video {
    segments: Vec<Segment>,
    /// Cumulative frame count at the end of each segment.
    boundaries: Vec<i64>,
    fps: f64,
    width: u32,
    height: u32,
    frame_count: i64,
    duration_secs: f64,
    start_time: NaiveDateTime,
    end_time: NaiveDateTime,
    bindings: Vec<LapBinding>,

    /// Camera/logger clock skew in frames, set by calibration.
    pub frame_offset: i64,

    /// Track name shown by overlays.
    pub track_name: Option<String>,
}

/// Slivers shorter than this (seconds) come from float rounding at
/// segment boundaries and are ignored.
const MIN_PIECE_SECS: f64 = 1e-3;

/// Stretch of audio inside one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioPiece {
    pub segment: usize,
    /// Seconds from the start of the segment file.
    pub start_secs: f64,
    pub duration_secs: f64,
}

/// Cache payload for a file set.
#[derive(Debug, Serialize, Deserialize)]
struct CachedProbes {
    /// Newest modification time across the files when probed.
    modified: Option<i64>,
    probes: Vec<ProbeInfo>,
}

impl Video {
    /// Build a video from already-probed segments.
    ///
    /// Segments are ordered by start time, then file name. Returns `None`
    /// for an empty list.
    pub fn from_probes(mut probes: Vec<ProbeInfo>) -> Option<Self> {
        probes.sort_by(|a, b| {
            a.creation_time
                .cmp(&b.creation_time)
                .then_with(|| a.path.cmp(&b.path))
        });
        let first = probes.first()?;
        let (fps, width, height, start_time) =
            (first.fps, first.width, first.height, first.creation_time);

        let mut boundaries = Vec::with_capacity(probes.len());
        let mut total_frames = 0i64;
        let mut duration_secs = 0.0;
        let segments: Vec<Segment> = probes
            .into_iter()
            .map(|p| {
                total_frames += p.frame_count as i64;
                duration_secs += p.duration_secs;
                boundaries.push(total_frames);
                Segment {
                    path: p.path,
                    fps: p.fps,
                    frame_count: p.frame_count,
                    duration_secs: p.duration_secs,
                    has_audio: p.has_audio,
                }
            })
            .collect();

        Some(Self {
            segments,
            boundaries,
            fps,
            width,
            height,
            frame_count: total_frames,
            duration_secs,
            start_time,
            end_time: add_seconds(start_time, duration_secs),
            bindings: Vec::new(),
            frame_offset: 0,
            track_name: None,
        })
    }

    /// Probe `files` as one recording, consulting `cache` first.
    ///
    /// A cache entry is used only when the files' newest modification time
    /// matches the one stored with it. Returns `None` if any file fails to
    /// probe.
    pub fn open(files: &[PathBuf], prober: &dyn VideoProber, cache: &mut Cache) -> Option<Self> {
        let key = file_set_key(files);
        let modified = files.iter().filter_map(|f| file_modified_unix(f)).max();

        if let Some(entry) = cache.video_entry(&key) {
            match serde_json::from_value::<CachedProbes>(entry.clone()) {
                Ok(cached) if cached.modified == modified => {
                    tracing::debug!(key = %key, "Video metadata from cache");
                    return Self::from_probes(cached.probes);
                }
                Ok(_) => tracing::debug!(key = %key, "Cached video metadata is stale"),
                Err(e) => tracing::debug!(key = %key, error = %e, "Ignoring malformed cache entry"),
            }
        }

        let probes = files
            .iter()
            .map(|f| prober.probe(f))
            .collect::<Option<Vec<_>>>()?;

        match serde_json::to_value(CachedProbes {
            modified,
            probes: probes.clone(),
        }) {
            Ok(value) => cache.set_video_entry(key, value),
            Err(e) => tracing::warn!(error = %e, "Cannot cache video metadata"),
        }
        Self::from_probes(probes)
    }

    /// Segment files in playback order.
    pub fn filenames(&self) -> Vec<&Path> {
        self.segments.iter().map(|s| s.path.as_path()).collect()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    /// First file; keys the persisted frame offset.
    pub fn primary_filename(&self) -> String {
        self.segments[0].path.display().to_string()
    }

    /// File stem of the first segment, for output naming.
    pub fn stem(&self) -> String {
        self.segments[0]
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string())
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Total frames across all segments.
    pub fn frame_count(&self) -> i64 {
        self.frame_count
    }

    /// Sum of per-segment durations (seconds).
    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn start_time(&self) -> NaiveDateTime {
        self.start_time
    }

    pub fn end_time(&self) -> NaiveDateTime {
        self.end_time
    }

    pub fn window(&self) -> VideoWindow {
        VideoWindow {
            fps: self.fps,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }

    /// Segment owning virtual frame `frame`: the first whose boundary exceeds it.
    pub fn filename_number(&self, frame: i64) -> usize {
        self.boundaries
            .iter()
            .position(|&b| frame < b)
            .unwrap_or(self.boundaries.len() - 1)
    }

    /// Translate a virtual frame into `(segment, frame within segment)`.
    ///
    /// `None` when the frame lies outside the recording.
    pub fn segment_local_frame(&self, frame: i64) -> Option<(usize, i64)> {
        if frame < 0 || frame >= self.frame_count {
            return None;
        }
        let segment = self.filename_number(frame);
        let base = if segment == 0 {
            0
        } else {
            self.boundaries[segment - 1]
        };
        Some((segment, frame - base))
    }

    /// Split spans of video seconds into per-segment audio pieces.
    ///
    /// Each `(start, duration)` span is cut at segment boundaries using the
    /// segments' own durations. Pieces that continue the previous one in the
    /// same segment are joined, so back-to-back spans cost one extraction.
    /// Audio past the last segment does not exist and is dropped.
    pub fn audio_pieces(&self, spans: &[(f64, f64)]) -> Vec<AudioPiece> {
        let mut pieces: Vec<AudioPiece> = Vec::new();
        for &(start, duration) in spans {
            let end = start + duration.max(0.0);
            let start = start.max(0.0);
            let mut base = 0.0;
            for (segment, info) in self.segments.iter().enumerate() {
                let segment_start = base;
                base += info.duration_secs;
                let lo = start.max(segment_start);
                let hi = end.min(base);
                if hi - lo < MIN_PIECE_SECS {
                    continue;
                }
                let local_start = lo - segment_start;
                match pieces.last_mut() {
                    Some(last)
                        if last.segment == segment
                            && (last.start_secs + last.duration_secs - local_start).abs() < MIN_PIECE_SECS =>
                    {
                        last.duration_secs += hi - lo;
                    }
                    _ => pieces.push(AudioPiece {
                        segment,
                        start_secs: local_start,
                        duration_secs: hi - lo,
                    }),
                }
            }
        }
        pieces
    }

    /// Replace all lap bindings with those overlapping this recording.
    pub fn match_laps(&mut self, laps: &[Arc<Lap>]) {
        self.bindings = match_laps(&self.window(), laps);
    }

    pub fn bindings(&self) -> &[LapBinding] {
        &self.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut [LapBinding] {
        &mut self.bindings
    }

    pub fn renderable_bindings(&self) -> impl Iterator<Item = &LapBinding> {
        self.bindings.iter().filter(|b| b.render)
    }

    pub fn has_renderable_laps(&self) -> bool {
        self.bindings.iter().any(|b| b.render)
    }

    /// Apply the persisted offset for this recording, if one exists.
    pub fn restore_offset(&mut self, cache: &Cache) -> bool {
        match cache.offset(&self.primary_filename()) {
            Some(offset) => {
                self.frame_offset = offset;
                true
            }
            None => false,
        }
    }

    /// Record this recording's offset in `cache`.
    pub fn remember_offset(&self, cache: &mut Cache) {
        cache.set_offset(self.primary_filename(), self.frame_offset);
    }

    /// Index of a candidate this video continues or is continued by.
    ///
    /// Two recordings belong together when their wall-clock windows touch
    /// within `merge_window_secs`, or when their file names follow the
    /// camera's chapter naming for the same recording.
    pub fn find_video_predecessor(&self, candidates: &[Video], merge_window_secs: f64) -> Option<usize> {
        candidates.iter().position(|other| {
            if other.filenames() == self.filenames() {
                return false;
            }
            within_secs(other.end_time, self.start_time, merge_window_secs)
                || within_secs(self.end_time, other.start_time, merge_window_secs)
                || chapters_of_same_recording(self, other)
        })
    }

    /// Combine two recordings and re-derive everything from the merged file list.
    ///
    /// The earlier recording's offset and track name are kept; bindings are
    /// cleared and must be re-matched. `None` if any segment fails to probe,
    /// leaving both inputs untouched.
    pub fn merge(&self, other: &Video, prober: &dyn VideoProber, cache: &mut Cache) -> Option<Video> {
        let (older, _) = if self.start_time <= other.start_time {
            (self, other)
        } else {
            (other, self)
        };
        let mut files: Vec<PathBuf> = self
            .segments
            .iter()
            .chain(other.segments.iter())
            .map(|s| s.path.clone())
            .collect();
        files.sort();
        files.dedup();

        let mut merged = Video::open(&files, prober, cache)?;
        merged.frame_offset = older.frame_offset;
        merged.track_name = older.track_name.clone();
        Some(merged)
    }
}

impl std::fmt::Display for Video {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self
            .segments
            .iter()
            .map(|s| {
                s.path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            })
            .collect();
        write!(
            f,
            "{} {}x{} @ {:.2}fps, {:.1}s from {} (offset {} frames)",
            names.join("+"),
            self.width,
            self.height,
            self.fps,
            self.duration_secs,
            self.start_time.format("%Y-%m-%d %H:%M:%S"),
            self.frame_offset
        )
    }
}

/// `(recording number, chapter)` from a GoPro file name.
///
/// `GOPRnnnn` is the first chapter; `GPccnnnn`, `GHccnnnn` and `GXccnnnn`
/// are chapter `cc` of recording `nnnn`.
pub fn gopro_chapter(path: &Path) -> Option<(u32, u32)> {
    let stem = path.file_stem()?.to_str()?.to_ascii_uppercase();
    if stem.len() != 8 || !stem.is_ascii() {
        return None;
    }
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if let Some(number) = stem.strip_prefix("GOPR") {
        if !digits(number) {
            return None;
        }
        return Some((number.parse().ok()?, 0));
    }
    if !matches!(&stem[..2], "GP" | "GH" | "GX") {
        return None;
    }
    let (chapter, number) = (&stem[2..4], &stem[4..]);
    if !(digits(chapter) && digits(number)) {
        return None;
    }
    Some((number.parse().ok()?, chapter.parse().ok()?))
}

fn chapters_of_same_recording(a: &Video, b: &Video) -> bool {
    a.segments.iter().any(|sa| {
        gopro_chapter(&sa.path).is_some_and(|(num_a, ch_a)| {
            b.segments.iter().any(|sb| {
                gopro_chapter(&sb.path)
                    .is_some_and(|(num_b, ch_b)| num_a == num_b && ch_a != ch_b)
            })
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2016, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn probe(name: &str, start_offset: f64, frames: u64, fps: f64) -> ProbeInfo {
        ProbeInfo {
            path: PathBuf::from(name),
            fps,
            frame_count: frames,
            width: 1920,
            height: 1080,
            duration_secs: frames as f64 / fps,
            creation_time: add_seconds(t0(), start_offset),
            has_audio: true,
        }
    }

    #[test]
    fn test_multi_segment_frame_addressing() {
        let video = Video::from_probes(vec![
            probe("GOPR0001.MP4", 0.0, 1000, 30.0),
            probe("GP010001.MP4", 1000.0 / 30.0, 500, 30.0),
        ])
        .unwrap();
        assert_eq!(video.frame_count(), 1500);
        assert_eq!(video.filename_number(999), 0);
        assert_eq!(video.filename_number(1000), 1);
        assert_eq!(video.filename_number(1499), 1);
        assert_eq!(video.segment_local_frame(1000), Some((1, 0)));
        assert_eq!(video.segment_local_frame(1499), Some((1, 499)));
        assert_eq!(video.segment_local_frame(1500), None);
        assert_eq!(video.segment_local_frame(-1), None);
    }

    #[test]
    fn test_audio_piece_straddles_segments() {
        let video = Video::from_probes(vec![
            probe("GOPR0001.MP4", 0.0, 900, 30.0),
            probe("GP010001.MP4", 30.0, 2700, 30.0),
        ])
        .unwrap();
        assert_eq!(
            video.audio_pieces(&[(20.0, 55.0)]),
            vec![
                AudioPiece {
                    segment: 0,
                    start_secs: 20.0,
                    duration_secs: 10.0
                },
                AudioPiece {
                    segment: 1,
                    start_secs: 0.0,
                    duration_secs: 45.0
                },
            ]
        );
    }

    #[test]
    fn test_audio_pieces_keep_gaps_between_spans() {
        let video = Video::from_probes(vec![probe("a.mp4", 0.0, 6000, 30.0)]).unwrap();
        let pieces = video.audio_pieces(&[(10.0, 60.0), (130.0, 60.0)]);
        assert_eq!(pieces.len(), 2);
        assert_eq!((pieces[0].start_secs, pieces[0].duration_secs), (10.0, 60.0));
        assert_eq!((pieces[1].start_secs, pieces[1].duration_secs), (130.0, 60.0));
    }

    #[test]
    fn test_adjacent_spans_join() {
        let video = Video::from_probes(vec![probe("a.mp4", 0.0, 6000, 30.0)]).unwrap();
        let pieces = video.audio_pieces(&[(10.0, 60.0), (70.0, 60.0)]);
        assert_eq!(
            pieces,
            vec![AudioPiece {
                segment: 0,
                start_secs: 10.0,
                duration_secs: 120.0
            }]
        );
    }

    #[test]
    fn test_audio_past_the_end_is_dropped() {
        let video = Video::from_probes(vec![
            probe("a.mp4", 0.0, 300, 30.0),
            probe("b.mp4", 10.0, 300, 30.0),
        ])
        .unwrap();
        let pieces = video.audio_pieces(&[(-2.0, 30.0)]);
        assert_eq!(pieces.len(), 2);
        assert_eq!((pieces[0].start_secs, pieces[0].duration_secs), (0.0, 10.0));
        assert_eq!((pieces[1].segment, pieces[1].start_secs), (1, 0.0));
        assert!((pieces[1].duration_secs - 8.0).abs() < 1e-9);
        assert!(video.audio_pieces(&[(25.0, 5.0)]).is_empty());
    }

    #[test]
    fn test_duration_sums_per_segment() {
        let video = Video::from_probes(vec![
            probe("a.mp4", 0.0, 300, 30.0),
            probe("b.mp4", 10.0, 299, 29.9),
        ])
        .unwrap();
        assert!((video.duration_secs() - 20.0).abs() < 1e-9);
        assert_eq!(video.end_time(), add_seconds(t0(), 20.0));
        assert_eq!(video.fps(), 30.0);
    }

    #[test]
    fn test_segments_ordered_by_start_then_name() {
        let video = Video::from_probes(vec![
            probe("b.mp4", 0.0, 10, 30.0),
            probe("c.mp4", -100.0, 10, 30.0),
            probe("a.mp4", 0.0, 10, 30.0),
        ])
        .unwrap();
        let names: Vec<_> = video.filenames().iter().map(|p| p.display().to_string()).collect();
        assert_eq!(names, vec!["c.mp4", "a.mp4", "b.mp4"]);
        assert_eq!(video.start_time(), add_seconds(t0(), -100.0));
    }

    #[test]
    fn test_empty_probe_list() {
        assert!(Video::from_probes(Vec::new()).is_none());
    }

    #[test]
    fn test_gopro_chapter_names() {
        assert_eq!(gopro_chapter(Path::new("GOPR0123.MP4")), Some((123, 0)));
        assert_eq!(gopro_chapter(Path::new("/x/GP020123.MP4")), Some((123, 2)));
        assert_eq!(gopro_chapter(Path::new("gx010042.mp4")), Some((42, 1)));
        assert_eq!(gopro_chapter(Path::new("DCIM0001.MP4")), None);
        assert_eq!(gopro_chapter(Path::new("GOPRABCD.MP4")), None);
    }

    #[test]
    fn test_predecessor_by_adjacent_window() {
        let first = Video::from_probes(vec![probe("a.mp4", 0.0, 300, 30.0)]).unwrap();
        let second = Video::from_probes(vec![probe("b.mp4", 12.0, 300, 30.0)]).unwrap();
        let far = Video::from_probes(vec![probe("c.mp4", 60.0, 300, 30.0)]).unwrap();

        let candidates = vec![first.clone()];
        assert_eq!(second.find_video_predecessor(&candidates, 3.0), Some(0));
        assert_eq!(far.find_video_predecessor(&candidates, 3.0), None);
        assert_eq!(first.find_video_predecessor(&candidates, 3.0), None);
    }

    #[test]
    fn test_predecessor_by_chapter_name() {
        let first = Video::from_probes(vec![probe("GOPR0007.MP4", 0.0, 300, 30.0)]).unwrap();
        let chapter = Video::from_probes(vec![probe("GP010007.MP4", 900.0, 300, 30.0)]).unwrap();
        let other = Video::from_probes(vec![probe("GP010008.MP4", 900.0, 300, 30.0)]).unwrap();
        assert_eq!(chapter.find_video_predecessor(&[first.clone()], 3.0), Some(0));
        assert_eq!(other.find_video_predecessor(&[first], 3.0), None);
    }
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProber {
        calls: AtomicUsize,
        fail_on: Option<&'static str>,
    }

    impl CountingProber {
        fn new(fail_on: Option<&'static str>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on,
            }
        }
    }

    impl VideoProber for CountingProber {
        fn probe(&self, path: &Path) -> Option<ProbeInfo> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let name = path.file_name()?.to_str()?;
            if Some(name) == self.fail_on {
                return None;
            }
            let offset = if name.starts_with("GOPR") { 0.0 } else { 10.0 };
            let mut info = probe(name, offset, 300, 30.0);
            info.path = path.to_path_buf();
            Some(info)
        }
    }

    fn scratch(name: &str) -> (PathBuf, Cache) {
        let dir = std::env::temp_dir().join(format!("laprender-video-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let cache = Cache::load(dir.join("cache.json"));
        (dir, cache)
    }

    #[test]
    fn test_cache_hit_skips_probing() {
        let (dir, mut cache) = scratch("hit");
        let file = dir.join("GOPR0001.MP4");
        std::fs::write(&file, b"").unwrap();
        let prober = CountingProber::new(None);

        let first = Video::open(&[file.clone()], &prober, &mut cache).unwrap();
        let second = Video::open(&[file.clone()], &prober, &mut cache).unwrap();
        assert_eq!(prober.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.frame_count(), second.frame_count());
        assert_eq!(first.start_time(), second.start_time());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_stale_cache_entry_is_reprobed() {
        let (dir, mut cache) = scratch("stale");
        let file = dir.join("GOPR0001.MP4");
        std::fs::write(&file, b"").unwrap();
        let prober = CountingProber::new(None);

        Video::open(&[file.clone()], &prober, &mut cache).unwrap();
        let key = file_set_key(&[file.clone()]);
        let mut entry = cache.video_entry(&key).unwrap().clone();
        entry["modified"] = serde_json::json!(0);
        cache.set_video_entry(key, entry);

        Video::open(&[file.clone()], &prober, &mut cache).unwrap();
        assert_eq!(prober.calls.load(Ordering::SeqCst), 2);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_idempotent_rematch() {
        let mut video = Video::from_probes(vec![probe("a.mp4", 0.0, 3600, 30.0)]).unwrap();
        let start = add_seconds(t0(), 10.0);
        let lap = Arc::new(
            Lap::new(
                1,
                vec![
                    laprender_telemetry::Fix::new(1, 0.0, start, laprender_common::ClockZone::Local),
                    laprender_telemetry::Fix::new(
                        1,
                        60.0,
                        add_seconds(start, 60.0),
                        laprender_common::ClockZone::Local,
                    ),
                ],
            )
            .unwrap(),
        );
        video.match_laps(&[Arc::clone(&lap)]);
        let once = video.bindings().to_vec();
        video.match_laps(&[lap]);
        assert_eq!(video.bindings(), once.as_slice());
        assert_eq!(once.len(), 1);
        assert_eq!((once[0].start_frame, once[0].end_frame), (300, 2100));
    }

    #[test]
    fn test_merge_rebuilds_from_union() {
        let (dir, mut cache) = scratch("merge");
        let prober = CountingProber::new(None);
        let mut older = Video::from_probes(vec![probe("GOPR0001.MP4", 0.0, 300, 30.0)]).unwrap();
        older.frame_offset = 7;
        older.track_name = Some("Laguna Seca".into());
        let newer = Video::from_probes(vec![probe("GP010001.MP4", 10.0, 300, 30.0)]).unwrap();

        let merged = newer.merge(&older, &prober, &mut cache).unwrap();
        assert_eq!(merged.segments().len(), 2);
        assert_eq!(merged.frame_count(), 600);
        assert_eq!(merged.frame_offset, 7);
        assert_eq!(merged.track_name.as_deref(), Some("Laguna Seca"));
        assert_eq!(merged.filename_number(300), 1);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_merge_abandoned_on_probe_failure() {
        let (dir, mut cache) = scratch("abandon");
        let prober = CountingProber::new(Some("GP010001.MP4"));
        let older = Video::from_probes(vec![probe("GOPR0001.MP4", 0.0, 300, 30.0)]).unwrap();
        let newer = Video::from_probes(vec![probe("GP010001.MP4", 10.0, 300, 30.0)]).unwrap();

        assert!(older.merge(&newer, &prober, &mut cache).is_none());
        assert_eq!(older.frame_count(), 300);
        assert_eq!(newer.segments().len(), 1);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_offsets_round_trip_through_cache() {
        let (dir, mut cache) = scratch("offset");
        let mut video = Video::from_probes(vec![probe("GOPR0001.MP4", 0.0, 300, 30.0)]).unwrap();
        assert!(!video.restore_offset(&cache));
        video.frame_offset = -4;
        video.remember_offset(&mut cache);

        let mut again = Video::from_probes(vec![probe("GOPR0001.MP4", 0.0, 300, 30.0)]).unwrap();
        assert!(again.restore_offset(&cache));
        assert_eq!(again.frame_offset, -4);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
