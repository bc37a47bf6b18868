pub mod analyze;
pub mod calibrate;
pub mod keys;
pub mod render;
pub mod select;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use laprender_common::cache::Cache;
use laprender_common::config::{AppConfig, RememberedArgs};
use laprender_render_engine::{
    load_font, overlay_for, FfmpegMedia, FfmpegReaderFactory, PngPreview, RenderEngine, RenderOptions,
};
use laprender_telemetry::parsers::parse_file;
use laprender_telemetry::Lap;
use laprender_video::{collect_videos, FfprobeProber, Video};

pub use render::RenderArgs;

/// Telemetry input.
#[derive(Args, Debug, Clone, Default)]
pub struct DataArgs {
    /// Telemetry log (TrackAddict or Harry's LapTimer CSV)
    #[arg(long)]
    pub data_file: Option<PathBuf>,
}

/// Footage input.
#[derive(Args, Debug, Clone, Default)]
pub struct VideoArgs {
    /// Directory containing the camera footage
    #[arg(long)]
    pub video_dir: Option<PathBuf>,

    /// Search the video directory recursively
    #[arg(long, conflicts_with = "no_recursive")]
    pub recursive: bool,

    /// Only search the top level of the video directory
    #[arg(long)]
    pub no_recursive: bool,

    /// Track name drawn on the overlay
    #[arg(long)]
    pub track_name: Option<String>,
}

impl VideoArgs {
    fn recursive_flag(&self) -> Option<bool> {
        match (self.recursive, self.no_recursive) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

/// Persist remembered arguments; a failure only costs the convenience.
pub fn save_config(config: &AppConfig) {
    if let Err(e) = config.save() {
        tracing::warn!(error = %e, "Could not save configuration");
    }
}

/// Parse the telemetry log named on the command line or remembered.
pub fn load_laps(config: &mut AppConfig, args: &DataArgs) -> anyhow::Result<Vec<Arc<Lap>>> {
    let path = RememberedArgs::recall(&mut config.remembered.data_file, args.data_file.clone())
        .ok_or_else(|| anyhow::anyhow!("No telemetry log given; pass --data-file"))?;
    let laps = parse_file(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    if laps.is_empty() {
        anyhow::bail!("{} contains no laps", path.display());
    }
    Ok(laps.into_iter().map(Arc::new).collect())
}

/// Scan the video directory, bind `laps` and restore stored offsets.
pub fn load_videos(
    config: &mut AppConfig,
    args: &VideoArgs,
    laps: &[Arc<Lap>],
    cache: &mut Cache,
) -> anyhow::Result<Vec<Video>> {
    let dir = RememberedArgs::recall(&mut config.remembered.video_dir, args.video_dir.clone())
        .ok_or_else(|| anyhow::anyhow!("No video directory given; pass --video-dir"))?;
    let recursive =
        RememberedArgs::recall(&mut config.remembered.recursive, args.recursive_flag()).unwrap_or(false);
    let track_name = RememberedArgs::recall(&mut config.remembered.track_name, args.track_name.clone());

    let prober = FfprobeProber::new();
    let mut videos = collect_videos(
        &dir,
        recursive,
        laps,
        &prober,
        cache,
        config.render.merge_window_secs,
    )?;
    for video in &mut videos {
        video.track_name = track_name.clone();
        if video.restore_offset(cache) {
            tracing::debug!(video = %video.primary_filename(), offset = video.frame_offset, "Restored offset");
        }
    }
    Ok(videos)
}

/// Engine wired to the ffmpeg collaborators and the configured overlay.
pub fn build_engine(config: &AppConfig) -> anyhow::Result<RenderEngine> {
    let font = match &config.overlay.font_path {
        Some(path) => Some(Arc::new(load_font(path)?)),
        None => None,
    };
    Ok(RenderEngine::new(
        Arc::new(FfmpegReaderFactory),
        overlay_for(&config.overlay),
        Arc::new(FfmpegMedia),
        RenderOptions::from_config(&config.render),
    )
    .with_font(font))
}

/// PNG preview next to the rendered output.
pub fn png_preview(config: &AppConfig) -> anyhow::Result<PngPreview> {
    std::fs::create_dir_all(&config.render.output_dir)?;
    Ok(PngPreview::new(
        config.render.output_dir.join("laprender-preview.png"),
        Duration::from_millis(100),
    ))
}
