//! Directory discovery of camera footage.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use laprender_common::cache::Cache;
use laprender_common::error::{LaprenderError, LaprenderResult};
use laprender_telemetry::Lap;

use crate::descriptor::Video;
use crate::probe::VideoProber;

/// Collect the recordings under `dir` and bind `laps` to them.
///
/// Files are visited in name order. Anything the prober rejects is skipped.
/// A file that continues an already collected recording is merged into it;
/// if the merge cannot be probed the two stay separate.
pub fn collect_videos(
    dir: &Path,
    recursive: bool,
    laps: &[Arc<Lap>],
    prober: &dyn VideoProber,
    cache: &mut Cache,
    merge_window_secs: f64,
) -> LaprenderResult<Vec<Video>> {
    if !dir.is_dir() {
        return Err(LaprenderError::FileNotFound {
            path: dir.to_path_buf(),
        });
    }
    let mut files = Vec::new();
    list_files(dir, recursive, &mut files)?;
    files.sort();

    let mut videos: Vec<Video> = Vec::new();
    for file in files {
        let Some(mut video) = Video::open(std::slice::from_ref(&file), prober, cache) else {
            tracing::debug!(path = %file.display(), "Not a video");
            continue;
        };

        if let Some(index) = video.find_video_predecessor(&videos, merge_window_secs) {
            match videos[index].merge(&video, prober, cache) {
                Some(mut merged) => {
                    tracing::debug!(video = %merged, "Merged split recording");
                    merged.match_laps(laps);
                    videos[index] = merged;
                    continue;
                }
                None => tracing::warn!(
                    path = %file.display(),
                    "Could not probe merged recording; keeping segments separate"
                ),
            }
        }

        video.match_laps(laps);
        videos.push(video);
    }

    tracing::info!(
        dir = %dir.display(),
        videos = videos.len(),
        with_laps = videos.iter().filter(|v| !v.bindings().is_empty()).count(),
        "Collected videos"
    );
    Ok(videos)
}

fn list_files(dir: &Path, recursive: bool, out: &mut Vec<PathBuf>) -> LaprenderResult<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'));
        if hidden {
            continue;
        }
        if path.is_dir() {
            if recursive {
                list_files(&path, recursive, out)?;
            }
        } else {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeInfo;
    use chrono::{NaiveDate, NaiveDateTime};
    use laprender_common::clock::add_seconds;
    use laprender_common::ClockZone;
    use laprender_telemetry::Fix;
    use std::collections::HashMap;

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2016, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    /// Prober answering from a table of file name -> (start offset, frames).
    struct TableProber(HashMap<String, (f64, u64)>);

    impl VideoProber for TableProber {
        fn probe(&self, path: &Path) -> Option<ProbeInfo> {
            let name = path.file_name()?.to_str()?;
            let &(offset, frames) = self.0.get(name)?;
            Some(ProbeInfo {
                path: path.to_path_buf(),
                fps: 30.0,
                frame_count: frames,
                width: 1280,
                height: 720,
                duration_secs: frames as f64 / 30.0,
                creation_time: add_seconds(t0(), offset),
                has_audio: false,
            })
        }
    }

    fn scratch_dir(name: &str, files: &[&str]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("laprender-scan-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        for file in files {
            std::fs::write(dir.join(file), b"").unwrap();
        }
        dir
    }

    fn lap_at(offset: f64) -> Arc<Lap> {
        let start = add_seconds(t0(), offset);
        Arc::new(
            Lap::new(
                1,
                vec![
                    Fix::new(1, 0.0, start, ClockZone::Local),
                    Fix::new(1, 30.0, add_seconds(start, 30.0), ClockZone::Local),
                ],
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_collect_merges_split_recording() {
        let dir = scratch_dir(
            "merge",
            &["GOPR0001.MP4", "GP010001.MP4", "notes.txt", "nested/GOPR0009.MP4"],
        );
        let prober = TableProber(HashMap::from([
            ("GOPR0001.MP4".to_string(), (0.0, 1000)),
            ("GP010001.MP4".to_string(), (1000.0 / 30.0, 500)),
            ("GOPR0009.MP4".to_string(), (3600.0, 300)),
        ]));
        let mut cache = Cache::load(dir.join("cache.json"));

        let laps = vec![lap_at(40.0)];
        let videos = collect_videos(&dir, false, &laps, &prober, &mut cache, 3.0).unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].segments().len(), 2);
        assert_eq!(videos[0].frame_count(), 1500);
        assert_eq!(videos[0].bindings().len(), 1);
        assert_eq!(videos[0].bindings()[0].start_frame, 1200);

        let all = collect_videos(&dir, true, &laps, &prober, &mut cache, 3.0).unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[1].bindings().is_empty());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_directory_is_error() {
        let prober = TableProber(HashMap::new());
        let mut cache = Cache::load(std::env::temp_dir().join("laprender-missing-cache.json"));
        let result = collect_videos(
            Path::new("/nonexistent/laprender"),
            false,
            &[],
            &prober,
            &mut cache,
            3.0,
        );
        assert!(matches!(result, Err(LaprenderError::FileNotFound { .. })));
    }
}
