//! Dual-lap comparison renders.
//!
//! Two lap windows advance together. Each step decodes and draws both sides
//! on two scoped worker threads, stacks them top over bottom, and adds the
//! comparison panel. A side whose window ends first keeps showing its last
//! frame until the other side is done.

use std::sync::Arc;
use std::time::Instant;

use image::imageops::{self, FilterType};
use image::RgbImage;
use laprender_common::clock::FpsMeter;
use laprender_common::error::{LaprenderError, LaprenderResult};
use laprender_processing_core::{LapWindow, Side};
use laprender_video::{LapBinding, Video};

use crate::canvas::RasterCanvas;
use crate::overlay::{compose, DualPanel, OverlayContext};
use crate::pipeline::{OutputPaths, RenderEngine, RenderOutcome};
use crate::preview::PreviewSurface;
use crate::sink::FrameSink;
use crate::source::CaptureCache;

/// One lap of a dual render.
#[derive(Debug, Clone)]
pub struct DualSide<'v> {
    pub video: &'v Video,
    pub window: LapWindow,
}

impl<'v> DualSide<'v> {
    pub fn new(video: &'v Video, binding: &LapBinding, bookend_secs: f64) -> Self {
        Self {
            video,
            window: LapWindow::resolve(video, binding, bookend_secs, bookend_secs),
        }
    }

    /// Source frame shown at output step `step`; holds on the last frame.
    fn frame_at(&self, step: i64) -> i64 {
        let last = (self.window.total_frames() - 1).max(0);
        self.window.start_frame + step.min(last)
    }

    fn context(&self, step: i64) -> OverlayContext<'_> {
        let frame = self.frame_at(step);
        OverlayContext {
            lap: &self.window.lap,
            elapsed_secs: self.window.elapsed_secs(frame),
            mid_lap: self.window.is_mid_lap(frame),
            fastest: None,
            track_name: self.video.track_name.as_deref(),
        }
    }
}

/// Stack `top` over `bottom`, each scaled to full width and half height.
pub fn merge_frames(top: &RgbImage, bottom: &RgbImage, width: u32, height: u32) -> RgbImage {
    let half = height / 2;
    let upper = imageops::resize(top, width, half, FilterType::CatmullRom);
    let lower = imageops::resize(bottom, width, height - half, FilterType::CatmullRom);
    let mut out = RgbImage::new(width, height);
    imageops::replace(&mut out, &upper, 0, 0);
    imageops::replace(&mut out, &lower, 0, half as i64);
    out
}

impl RenderEngine {
    /// Render `top` and `bottom` into one stacked output.
    pub fn render_dual(
        &self,
        top: &DualSide<'_>,
        bottom: &DualSide<'_>,
        paths: &OutputPaths,
        sink: &mut dyn FrameSink,
        preview: &mut dyn PreviewSurface,
    ) -> LaprenderResult<RenderOutcome> {
        let (width, height) = (top.video.width(), top.video.height());
        let total = top.window.total_frames().max(bottom.window.total_frames());
        tracing::info!(
            output = %paths.output.display(),
            top_lap = top.window.lap.index(),
            bottom_lap = bottom.window.lap.index(),
            frames = total,
            "Starting dual render"
        );
        std::fs::create_dir_all(&self.options().output_dir)?;
        sink.begin(&paths.video_only, width, height, top.video.fps())?;

        if let Err(e) = self.write_dual_frames(top, bottom, total, sink, preview) {
            let _ = sink.end();
            return Err(e);
        }
        let frames_written = sink.end()?;
        Ok(self.attach_dual_audio(top, bottom, paths, frames_written))
    }

    fn write_dual_frames(
        &self,
        top: &DualSide<'_>,
        bottom: &DualSide<'_>,
        total: i64,
        sink: &mut dyn FrameSink,
        preview: &mut dyn PreviewSurface,
    ) -> LaprenderResult<()> {
        let (width, height) = (top.video.width(), top.video.height());
        let mut top_cache = CaptureCache::new(Arc::clone(self.readers()));
        let mut bottom_cache = CaptureCache::new(Arc::clone(self.readers()));
        let mut held: [Option<RgbImage>; 2] = [None, None];
        let mut meter = FpsMeter::new(self.options().progress_every_frames);

        for step in 0..total {
            let (top_cache, bottom_cache) = (&mut top_cache, &mut bottom_cache);
            let (upper, lower) = std::thread::scope(|scope| {
                let upper = scope.spawn(move || self.render_side(top, step, top_cache, 0));
                let lower = scope.spawn(move || self.render_side(bottom, step, bottom_cache, 1));
                (join_worker(upper), join_worker(lower))
            });
            for (slot, fresh) in [upper?, lower?].into_iter().enumerate() {
                if fresh.is_some() {
                    held[slot] = fresh;
                }
            }

            let blank = RgbImage::new(width, height);
            let merged = merge_frames(
                held[0].as_ref().unwrap_or(&blank),
                held[1].as_ref().unwrap_or(&blank),
                width,
                height,
            );
            let mut canvas = RasterCanvas::new(&merged, self.font());
            DualPanel.render(&mut canvas, &top.context(step), &bottom.context(step));
            let frame = canvas.finish();

            sink.push_frame(step as u64, &frame)?;
            if let Err(e) = preview.show(&frame) {
                tracing::debug!(error = %e, "Preview update failed");
            }
            if let Some(fps) = meter.tick(Instant::now()) {
                tracing::info!(frames = step + 1, total, fps = %format!("{fps:.1}"), "Rendering");
            }
        }
        Ok(())
    }

    /// Decode and draw one side. `None` once the side's window is exhausted.
    fn render_side(
        &self,
        side: &DualSide<'_>,
        step: i64,
        captures: &mut CaptureCache,
        slot: usize,
    ) -> LaprenderResult<Option<RgbImage>> {
        if step >= side.window.total_frames() {
            return Ok(None);
        }
        let frame = side.window.start_frame + step;
        let Some(image) = captures.read_frame(side.video, frame, slot)? else {
            return Ok(None);
        };
        Ok(Some(compose(self.overlay(), &image, &side.context(step), self.font())))
    }

    /// Mix both sides' audio and mux it in; failures leave the video-only file.
    fn attach_dual_audio(
        &self,
        top: &DualSide<'_>,
        bottom: &DualSide<'_>,
        paths: &OutputPaths,
        frames_written: u64,
    ) -> RenderOutcome {
        let mut outcome = RenderOutcome {
            output: paths.output.clone(),
            frames_written,
            muxed: false,
            error: None,
        };

        let mut extracted = Vec::new();
        for (side, dual) in [(Side::Top, top), (Side::Bottom, bottom)] {
            let span = (dual.window.audio_start_secs, dual.window.audio_duration_secs);
            let target = paths.side_audio(side);
            match self.extract_spans(dual.video, &[span], &target) {
                Ok(true) => extracted.push(target),
                Ok(false) => {}
                Err(e) => tracing::warn!(side = ?side, error = %e, "Audio extraction failed"),
            }
        }

        let audio = match extracted.as_slice() {
            [] => {
                if let Err(e) = std::fs::rename(&paths.video_only, &paths.output) {
                    outcome.output = paths.video_only.clone();
                    outcome.error = Some(e.to_string());
                }
                return outcome;
            }
            [only] => Ok(only.clone()),
            [first, second, ..] => self
                .media()
                .overlay_mix(first, second, &paths.audio)
                .map(|()| paths.audio.clone()),
        };

        match audio.and_then(|audio| self.media().mux(&paths.video_only, &audio, &paths.output)) {
            Ok(()) => {
                outcome.muxed = true;
                tracing::info!(output = %paths.output.display(), "Dual render complete");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Muxing failed; keeping video-only output");
                outcome.output = paths.video_only.clone();
                outcome.error = Some(e.to_string());
            }
        }
        outcome
    }
}

fn join_worker<T>(handle: std::thread::ScopedJoinHandle<'_, LaprenderResult<T>>) -> LaprenderResult<T> {
    handle
        .join()
        .unwrap_or_else(|_| Err(LaprenderError::render("Dual render worker panicked")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_merge_stacks_halves() {
        let top = RgbImage::from_pixel(8, 6, Rgb([255, 0, 0]));
        let bottom = RgbImage::from_pixel(8, 6, Rgb([0, 0, 255]));
        let merged = merge_frames(&top, &bottom, 8, 6);
        assert_eq!(merged.dimensions(), (8, 6));
        assert_eq!(merged.get_pixel(4, 0), &Rgb([255, 0, 0]));
        assert_eq!(merged.get_pixel(4, 2), &Rgb([255, 0, 0]));
        assert_eq!(merged.get_pixel(4, 3), &Rgb([0, 0, 255]));
        assert_eq!(merged.get_pixel(4, 5), &Rgb([0, 0, 255]));
    }
}
