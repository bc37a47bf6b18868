//! Render lap, session and comparison videos.

use std::path::PathBuf;

use clap::Args;
use laprender_common::cache::Cache;
use laprender_common::config::{AppConfig, RememberedArgs};
use laprender_processing_core::{RenderMode, RenderParams};
use laprender_render_engine::{
    dual_stem, DualSide, FfmpegSink, NullPreview, OutputPaths, PreviewSurface, RenderOutcome,
};
use laprender_video::Video;

use super::calibrate::{calibrate_videos, needs_calibration, CalibrationPolicy};
use super::select::{apply_lap_selection, apply_session_selection, lap_refs, pick_laps, pick_sessions, LapRef};
use super::{build_engine, load_laps, load_videos, png_preview, save_config, DataArgs, VideoArgs};

#[derive(Args, Debug, Clone, Default)]
pub struct RenderArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub videos: VideoArgs,

    /// Directory for rendered files
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Never calibrate; use stored offsets (or zero)
    #[arg(long, conflicts_with = "force_manual_offset")]
    pub no_manual_offset: bool,

    /// Calibrate even videos that already have a stored offset
    #[arg(long)]
    pub force_manual_offset: bool,

    /// Render every matched lap without asking
    #[arg(long)]
    pub all_laps: bool,

    /// One output per video instead of one per lap
    #[arg(long, conflicts_with = "lap_comparison")]
    pub render_sessions: bool,

    /// Stack two laps in one comparison video
    #[arg(long)]
    pub lap_comparison: bool,

    /// Mirror rendered frames to a preview image
    #[arg(long)]
    pub show_video: bool,

    /// Seconds of footage kept before and after each lap
    #[arg(long)]
    pub bookend_time: Option<u32>,
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    let mut config = AppConfig::load();
    let laps = load_laps(&mut config, &args.data)?;
    let mut cache = Cache::open_default();
    let mut videos = load_videos(&mut config, &args.videos, &laps, &mut cache)?;
    if let Some(dir) = RememberedArgs::recall(&mut config.remembered.output_dir, args.output_dir.clone()) {
        config.render.output_dir = dir;
    }
    let bookend = RememberedArgs::recall(&mut config.remembered.bookend_secs, args.bookend_time)
        .unwrap_or(config.render.bookend_secs);
    save_config(&config);

    if lap_refs(&videos).is_empty() {
        anyhow::bail!("No lap overlaps any video; check --video-dir and the camera clock");
    }

    let mut stdin = std::io::stdin().lock();
    let pair = if args.lap_comparison {
        let picks = if args.all_laps {
            renderable_refs(&videos)
        } else {
            pick_laps(&videos, &mut stdin)?
        };
        let pair: Vec<LapRef> = picks.into_iter().take(2).collect();
        if pair.len() < 2 {
            anyhow::bail!("A comparison needs two laps");
        }
        apply_lap_selection(&mut videos, &pair);
        Some((pair[0], pair[1]))
    } else {
        if !args.all_laps {
            if args.render_sessions {
                let picks = pick_sessions(&videos, &mut stdin)?;
                apply_session_selection(&mut videos, &picks);
            } else {
                let picks = pick_laps(&videos, &mut stdin)?;
                apply_lap_selection(&mut videos, &picks);
            }
        }
        None
    };
    drop(stdin);

    let engine = build_engine(&config)?;
    let mut preview: Box<dyn PreviewSurface> = if args.show_video {
        let preview = png_preview(&config)?;
        println!("Preview: {}", preview.path().display());
        Box::new(preview)
    } else {
        Box::new(NullPreview)
    };

    if !args.no_manual_offset {
        let policy = if args.force_manual_offset {
            CalibrationPolicy::Always
        } else {
            CalibrationPolicy::WhenMissing
        };
        let mut calibration_preview = png_preview(&config)?;
        if videos.iter().any(|v| needs_calibration(v, &cache, policy)) {
            println!("Calibration preview: {}", calibration_preview.path().display());
        }
        calibrate_videos(
            &engine,
            &mut videos,
            &mut cache,
            &mut calibration_preview,
            config.render.coarse_step_frames,
            policy,
        )?;
    }
    cache.save()?;

    let mut sink = FfmpegSink::new();
    let outcomes = match pair {
        Some(((tv, tb), (bv, bb))) => {
            let bookend = bookend as f64;
            let top = DualSide::new(&videos[tv], &videos[tv].bindings()[tb], bookend);
            let bottom = DualSide::new(&videos[bv], &videos[bv].bindings()[bb], bookend);
            let paths = OutputPaths::new(
                &engine.options().output_dir,
                &dual_stem(&top.window.lap, &bottom.window.lap),
            );
            vec![engine.render_dual(&top, &bottom, &paths, &mut sink, preview.as_mut())?]
        }
        None => {
            let mode = if args.render_sessions {
                RenderMode::Session
            } else {
                RenderMode::PerLap
            };
            let plans: Vec<RenderParams<'_>> = videos
                .iter()
                .flat_map(|video| RenderParams::plan(video, bookend as f64, mode))
                .collect();
            if plans.is_empty() {
                println!("Nothing selected to render.");
                return Ok(());
            }
            engine.render_all(&plans, &mut sink, preview.as_mut())?
        }
    };

    report(&outcomes);
    Ok(())
}

/// Renderable bindings in listing order.
fn renderable_refs(videos: &[Video]) -> Vec<LapRef> {
    lap_refs(videos)
        .into_iter()
        .filter(|&(v, b)| videos[v].bindings()[b].render)
        .collect()
}

fn report(outcomes: &[RenderOutcome]) {
    println!();
    for outcome in outcomes {
        match &outcome.error {
            None => println!("[OK] {} ({} frames)", outcome.output.display(), outcome.frames_written),
            Some(error) => println!(
                "[WARN] {} ({} frames): {error}",
                outcome.output.display(),
                outcome.frames_written
            ),
        }
    }
    let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
    if failed > 0 {
        println!("{failed} of {} outputs had problems; see above.", outcomes.len());
    }
}
