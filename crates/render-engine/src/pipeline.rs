//! Single-video render pipeline.
//!
//! A producer thread decodes frames and draws overlays; the calling thread
//! writes them out in order. The two are joined by a bounded channel, so a
//! slow encoder backs up into the decoder instead of growing memory.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{sync_channel, SyncSender};
use std::sync::Arc;
use std::time::Instant;

use image::RgbImage;
use laprender_common::clock::FpsMeter;
use laprender_common::config::RenderDefaults;
use laprender_common::error::LaprenderResult;
use laprender_processing_core::{RenderMode, RenderParams, Side};
use laprender_telemetry::{format_lap_time, Lap};
use laprender_video::Video;
use rusttype::Font;

use crate::media::MediaTool;
use crate::overlay::{compose, OverlayContext, OverlayRenderer};
use crate::preview::PreviewSurface;
use crate::sink::FrameSink;
use crate::source::{CaptureCache, FrameReaderFactory};

/// Pipeline tuning.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Frames buffered between producer and consumer.
    pub queue_capacity: usize,
    pub progress_every_frames: u64,
    pub output_dir: PathBuf,
}

impl RenderOptions {
    pub fn from_config(render: &RenderDefaults) -> Self {
        Self {
            queue_capacity: render.queue_capacity,
            progress_every_frames: render.progress_every_frames,
            output_dir: render.output_dir.clone(),
        }
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::from_config(&RenderDefaults::default())
    }
}

/// Final and intermediate files of one output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub output: PathBuf,
    /// Encoded frames without audio.
    pub video_only: PathBuf,
    pub audio: PathBuf,
}

impl OutputPaths {
    pub fn new(dir: &Path, stem: &str) -> Self {
        Self {
            output: dir.join(format!("{stem}.mp4")),
            video_only: dir.join(format!("{stem}.video.mp4")),
            audio: dir.join(format!("{stem}.audio.wav")),
        }
    }

    /// Per-side audio intermediate of a dual render.
    pub fn side_audio(&self, side: Side) -> PathBuf {
        let suffix = match side {
            Side::Top => "top.wav",
            Side::Bottom => "bottom.wav",
        };
        self.audio.with_extension(suffix)
    }
}

/// File stem for a single-video output.
///
/// `<video>-lap<NN>-<M.SS.mmm>` per lap, `<video>-session` for sessions.
pub fn output_stem(params: &RenderParams<'_>) -> String {
    let stem = params.video.stem();
    match (params.mode, params.windows.first()) {
        (RenderMode::PerLap, Some(window)) => format!(
            "{stem}-lap{:02}-{}",
            window.lap.index(),
            format_lap_time(window.lap.lap_time()).replace(':', ".")
        ),
        _ => format!("{stem}-session"),
    }
}

/// File stem for a dual render.
pub fn dual_stem(top: &Lap, bottom: &Lap) -> String {
    format!("dual-lap{:02}-vs-lap{:02}", top.index(), bottom.index())
}

/// Result of rendering one output file.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutcome {
    /// Final file, or the video-only intermediate when muxing failed.
    pub output: PathBuf,
    pub frames_written: u64,
    pub muxed: bool,
    pub error: Option<String>,
}

/// Renders lap windows into output files.
pub struct RenderEngine {
    readers: Arc<dyn FrameReaderFactory>,
    overlay: Arc<dyn OverlayRenderer>,
    media: Arc<dyn MediaTool>,
    font: Option<Arc<Font<'static>>>,
    options: RenderOptions,
}

impl RenderEngine {
    pub fn new(
        readers: Arc<dyn FrameReaderFactory>,
        overlay: Arc<dyn OverlayRenderer>,
        media: Arc<dyn MediaTool>,
        options: RenderOptions,
    ) -> Self {
        Self {
            readers,
            overlay,
            media,
            font: None,
            options,
        }
    }

    pub fn with_font(mut self, font: Option<Arc<Font<'static>>>) -> Self {
        self.font = font;
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub(crate) fn readers(&self) -> &Arc<dyn FrameReaderFactory> {
        &self.readers
    }

    pub(crate) fn overlay(&self) -> &dyn OverlayRenderer {
        self.overlay.as_ref()
    }

    pub(crate) fn font(&self) -> Option<Arc<Font<'static>>> {
        self.font.clone()
    }

    pub(crate) fn media(&self) -> &dyn MediaTool {
        self.media.as_ref()
    }

    /// Render every planned output, continuing past per-file failures.
    pub fn render_all(
        &self,
        plans: &[RenderParams<'_>],
        sink: &mut dyn FrameSink,
        preview: &mut dyn PreviewSurface,
    ) -> LaprenderResult<Vec<RenderOutcome>> {
        let mut outcomes = Vec::with_capacity(plans.len());
        for params in plans {
            let paths = OutputPaths::new(&self.options.output_dir, &output_stem(params));
            match self.render(params, &paths, sink, preview) {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) if e.is_per_file() => {
                    tracing::warn!(output = %paths.output.display(), error = %e, "Render failed; continuing");
                    outcomes.push(RenderOutcome {
                        output: paths.output,
                        frames_written: 0,
                        muxed: false,
                        error: Some(e.to_string()),
                    });
                }
                Err(e) => return Err(e),
            }
        }
        Ok(outcomes)
    }

    /// Render one output: frames first, then audio.
    pub fn render(
        &self,
        params: &RenderParams<'_>,
        paths: &OutputPaths,
        sink: &mut dyn FrameSink,
        preview: &mut dyn PreviewSurface,
    ) -> LaprenderResult<RenderOutcome> {
        let video = params.video;
        let total = params.total_frames();
        tracing::info!(
            output = %paths.output.display(),
            laps = params.windows.len(),
            frames = total,
            "Starting render"
        );
        std::fs::create_dir_all(&self.options.output_dir)?;
        sink.begin(&paths.video_only, video.width(), video.height(), video.fps())?;

        let consumed = std::thread::scope(|scope| -> LaprenderResult<u64> {
            let (tx, rx) = sync_channel(self.options.queue_capacity.max(1));
            scope.spawn(move || self.produce(params, tx));

            let mut meter = FpsMeter::new(self.options.progress_every_frames);
            let mut index = 0u64;
            for item in rx {
                let frame = item?;
                sink.push_frame(index, &frame)?;
                if let Err(e) = preview.show(&frame) {
                    tracing::debug!(error = %e, "Preview update failed");
                }
                index += 1;
                if let Some(fps) = meter.tick(Instant::now()) {
                    tracing::info!(frames = index, total, fps = %format!("{fps:.1}"), "Rendering");
                }
            }
            Ok(index)
        });
        if let Err(e) = consumed {
            let _ = sink.end();
            return Err(e);
        }
        let frames_written = sink.end()?;
        tracing::info!(frames = frames_written, path = %paths.video_only.display(), "Video frames written");

        Ok(self.attach_audio(video, &params.audio_spans(), paths, frames_written))
    }

    fn produce(&self, params: &RenderParams<'_>, tx: SyncSender<LaprenderResult<RgbImage>>) {
        let mut captures = CaptureCache::new(Arc::clone(&self.readers));
        let fastest = params.fastest_lap().map(|lap| lap.as_ref());
        for window in &params.windows {
            for frame in window.frames() {
                let image = match captures.read_frame(params.video, frame, 0) {
                    Ok(Some(image)) => image,
                    Ok(None) => {
                        tracing::warn!(frame, lap = window.lap.index(), "Source ended before the lap window");
                        break;
                    }
                    Err(e) => {
                        let _ = tx.send(Err(e));
                        return;
                    }
                };
                let ctx = OverlayContext {
                    lap: &window.lap,
                    elapsed_secs: window.elapsed_secs(frame),
                    mid_lap: window.is_mid_lap(frame),
                    fastest,
                    track_name: params.video.track_name.as_deref(),
                };
                let composed = compose(self.overlay.as_ref(), &image, &ctx, self.font.clone());
                if tx.send(Ok(composed)).is_err() {
                    return;
                }
            }
        }
        tracing::debug!(seeks = captures.seeks(), "Producer finished");
    }

    /// Extract the un-offset audio windows and mux them in.
    ///
    /// Failures are recorded in the outcome; the video-only file stays on disk.
    fn attach_audio(
        &self,
        video: &Video,
        spans: &[(f64, f64)],
        paths: &OutputPaths,
        frames_written: u64,
    ) -> RenderOutcome {
        let mut outcome = RenderOutcome {
            output: paths.output.clone(),
            frames_written,
            muxed: false,
            error: None,
        };
        let result = match self.extract_spans(video, spans, &paths.audio) {
            Ok(false) => {
                if let Err(e) = std::fs::rename(&paths.video_only, &paths.output) {
                    outcome.output = paths.video_only.clone();
                    outcome.error = Some(e.to_string());
                }
                return outcome;
            }
            Ok(true) => self.media.mux(&paths.video_only, &paths.audio, &paths.output),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                outcome.muxed = true;
                for intermediate in [&paths.video_only, &paths.audio] {
                    if let Err(e) = std::fs::remove_file(intermediate) {
                        tracing::debug!(path = %intermediate.display(), error = %e, "Intermediate not removed");
                    }
                }
                tracing::info!(output = %paths.output.display(), "Render complete");
            }
            Err(e) => {
                tracing::warn!(
                    video = %paths.video_only.display(),
                    error = %e,
                    "Muxing failed; keeping video-only output"
                );
                outcome.output = paths.video_only.clone();
                outcome.error = Some(e.to_string());
            }
        }
        outcome
    }

    /// Write the audio under `spans` to `output`.
    ///
    /// Spans crossing segment boundaries are cut per segment and joined
    /// back together. `Ok(false)` when there is no audio to write: the
    /// spans cover no footage, or a segment they touch has no audio track.
    pub(crate) fn extract_spans(&self, video: &Video, spans: &[(f64, f64)], output: &Path) -> LaprenderResult<bool> {
        let pieces = video.audio_pieces(spans);
        let mut sources = Vec::with_capacity(pieces.len());
        for piece in &pieces {
            match video.segment(piece.segment).filter(|s| s.has_audio) {
                Some(segment) => sources.push(segment.path.as_path()),
                None => {
                    tracing::debug!(segment = piece.segment, "Segment has no audio; output stays silent");
                    return Ok(false);
                }
            }
        }

        match pieces.as_slice() {
            [] => Ok(false),
            [only] => {
                self.media
                    .extract_audio(sources[0], only.start_secs, only.duration_secs, output)?;
                Ok(true)
            }
            _ => {
                let parts: Vec<PathBuf> = (0..pieces.len())
                    .map(|i| output.with_extension(format!("part{i}.wav")))
                    .collect();
                let result = pieces
                    .iter()
                    .zip(&sources)
                    .zip(&parts)
                    .try_for_each(|((piece, source), part)| {
                        self.media
                            .extract_audio(source, piece.start_secs, piece.duration_secs, part)
                    })
                    .and_then(|()| self.media.concat(&parts, output));
                for part in &parts {
                    let _ = std::fs::remove_file(part);
                }
                result?;
                tracing::debug!(pieces = parts.len(), output = %output.display(), "Audio joined");
                Ok(true)
            }
        }
    }
}
