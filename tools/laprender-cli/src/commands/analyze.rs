//! Print what the inputs contain.

use laprender_common::cache::Cache;
use laprender_common::config::AppConfig;
use laprender_processing_core::windows::fastest_lap;

use super::{load_laps, load_videos, save_config, DataArgs, VideoArgs};

pub fn run_data(data: DataArgs) -> anyhow::Result<()> {
    let mut config = AppConfig::load();
    let laps = load_laps(&mut config, &data)?;
    save_config(&config);

    let fastest = laps
        .iter()
        .min_by(|a, b| a.lap_time().total_cmp(&b.lap_time()))
        .map(|lap| lap.index());

    println!("Laps: {}", laps.len());
    println!("{}", "=".repeat(50));
    for lap in &laps {
        let marker = if Some(lap.index()) == fastest { " (fastest)" } else { "" };
        println!("{lap}{marker}");
        for line in lap.details().lines() {
            println!("    {line}");
        }
    }
    Ok(())
}

pub fn run_videos(data: DataArgs, videos: VideoArgs) -> anyhow::Result<()> {
    let mut config = AppConfig::load();
    let laps = load_laps(&mut config, &data)?;
    let mut cache = Cache::open_default();
    let found = load_videos(&mut config, &videos, &laps, &mut cache)?;
    save_config(&config);
    cache.save()?;

    println!("Videos: {}", found.len());
    println!("{}", "=".repeat(50));
    for video in &found {
        println!("{video}");
        println!(
            "  {}x{} @ {:.2}fps, {} frames, offset {}",
            video.width(),
            video.height(),
            video.fps(),
            video.frame_count(),
            video.frame_offset
        );
        if video.bindings().is_empty() {
            println!("  [--] no laps");
            continue;
        }
        let best = fastest_lap(video.bindings()).map(|lap| lap.index());
        for binding in video.bindings() {
            let marker = if Some(binding.lap.index()) == best { " *" } else { "" };
            println!("  [OK] {binding}{marker}");
        }
    }

    let matched = found.iter().map(|v| v.bindings().len()).sum::<usize>();
    if matched == 0 {
        println!();
        println!("No lap overlaps any video. Check the camera clock and time zone.");
    }
    Ok(())
}
