//! Interactive frame-offset calibration.

use laprender_common::cache::Cache;
use laprender_common::config::AppConfig;
use laprender_render_engine::{PreviewSurface, RenderEngine};
use laprender_video::Video;

use super::keys::{print_help, StdinCommands};
use super::{build_engine, load_laps, load_videos, png_preview, save_config, DataArgs, VideoArgs};

/// Which videos get calibrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPolicy {
    /// Only videos without a stored offset.
    WhenMissing,
    /// Every video with a lap to render.
    Always,
}

/// Whether `video` should be calibrated under `policy`.
pub fn needs_calibration(video: &Video, cache: &Cache, policy: CalibrationPolicy) -> bool {
    video.has_renderable_laps()
        && (policy == CalibrationPolicy::Always || cache.offset(&video.primary_filename()).is_none())
}

/// Calibrate the videos selected by `policy`, saving each committed offset.
pub fn calibrate_videos(
    engine: &RenderEngine,
    videos: &mut [Video],
    cache: &mut Cache,
    preview: &mut dyn PreviewSurface,
    coarse_step: i64,
    policy: CalibrationPolicy,
) -> anyhow::Result<usize> {
    let mut input: Option<StdinCommands> = None;
    let mut calibrated = 0;
    for video in videos.iter_mut() {
        if !needs_calibration(video, cache, policy) {
            continue;
        }
        let input = input.get_or_insert_with(|| {
            print_help(coarse_step);
            StdinCommands::spawn(coarse_step)
        });
        println!("Calibrating {video}");
        let offset = engine.calibrate(video, preview, input, cache)?;
        cache.save()?;
        println!("  offset {offset} frames saved");
        calibrated += 1;
    }
    Ok(calibrated)
}

pub fn run(data: DataArgs, videos: VideoArgs) -> anyhow::Result<()> {
    let mut config = AppConfig::load();
    let laps = load_laps(&mut config, &data)?;
    let mut cache = Cache::open_default();
    let mut found = load_videos(&mut config, &videos, &laps, &mut cache)?;
    save_config(&config);

    let engine = build_engine(&config)?;
    let mut preview = png_preview(&config)?;
    println!("Preview: {}", preview.path().display());
    let calibrated = calibrate_videos(
        &engine,
        &mut found,
        &mut cache,
        &mut preview,
        config.render.coarse_step_frames,
        CalibrationPolicy::Always,
    )?;
    if calibrated == 0 {
        println!("No video covers a lap; nothing to calibrate.");
    }
    cache.save()?;
    Ok(())
}
