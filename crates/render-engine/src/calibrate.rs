//! Interactive calibration driver.
//!
//! Connects the [`Calibrator`] state machine to real frames: it decodes the
//! requested frame, draws the overlay the way the final render would, shows
//! it on a preview surface and feeds operator input back into the machine.

use std::sync::Arc;

use image::RgbImage;
use laprender_common::cache::Cache;
use laprender_common::clock::frames_to_secs;
use laprender_common::error::LaprenderResult;
use laprender_processing_core::calibration::reference_binding;
use laprender_processing_core::{CalibrationCommand, Calibrator, FrameRequest, Step};
use laprender_video::Video;

use crate::overlay::{compose, OverlayContext};
use crate::pipeline::RenderEngine;
use crate::preview::PreviewSurface;
use crate::source::CaptureCache;

/// One input observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Command(CalibrationCommand),
    /// Input that maps to no command; ignored.
    Unrecognized,
    /// The input stream ended. Treated as a commit.
    Closed,
}

/// Source of operator commands.
pub trait CommandSource {
    /// Block until the next event.
    fn wait(&mut self) -> InputEvent;

    /// Return an event if one is pending, without blocking.
    fn poll(&mut self) -> Option<InputEvent>;
}

impl RenderEngine {
    /// Let the operator align `video`'s reference lap and store the result.
    ///
    /// Returns the committed offset, which is also written to
    /// `video.frame_offset` and `cache`. Videos without a selected lap are
    /// left alone.
    pub fn calibrate(
        &self,
        video: &mut Video,
        preview: &mut dyn PreviewSurface,
        input: &mut dyn CommandSource,
        cache: &mut Cache,
    ) -> LaprenderResult<i64> {
        let Some(mut calibrator) = Calibrator::for_video(video) else {
            tracing::info!(video = %video.primary_filename(), "No lap selected; skipping calibration");
            return Ok(video.frame_offset);
        };
        let Some(binding) = reference_binding(video).cloned() else {
            return Ok(video.frame_offset);
        };
        tracing::info!(
            video = %video.primary_filename(),
            lap = binding.lap.index(),
            offset = calibrator.offset(),
            "Calibrating"
        );

        let mut captures = CaptureCache::new(Arc::clone(self.readers()));
        let mut shown: Option<RgbImage> = None;
        let mut request = calibrator.start();

        let offset = loop {
            let reuse = matches!(request, FrameRequest::Hold(_)) && shown.is_some();
            if !reuse {
                match captures.read_frame(video, request.frame(), 0)? {
                    Some(image) => shown = Some(image),
                    None => tracing::warn!(frame = request.frame(), "Preview frame unavailable"),
                }
            }

            if let Some(raw) = &shown {
                let elapsed = calibrator.elapsed_frames();
                let ctx = OverlayContext {
                    lap: &binding.lap,
                    elapsed_secs: frames_to_secs(elapsed, video.fps()).clamp(0.0, binding.lap.lap_time()),
                    mid_lap: (0..binding.frame_len()).contains(&elapsed),
                    fastest: None,
                    track_name: video.track_name.as_deref(),
                };
                preview.show(&compose(self.overlay(), raw, &ctx, self.font()))?;
            }

            let event = if calibrator.is_playing() {
                input.poll()
            } else {
                Some(input.wait())
            };
            let command = match event {
                Some(InputEvent::Command(command)) => Some(command),
                Some(InputEvent::Closed) => Some(CalibrationCommand::Commit),
                Some(InputEvent::Unrecognized) | None => None,
            };
            match calibrator.apply(command) {
                Step::Render(next) => request = next,
                Step::Done(offset) => break offset,
            }
        };

        video.frame_offset = offset;
        video.remember_offset(cache);
        tracing::info!(video = %video.primary_filename(), offset, seeks = captures.seeks(), "Offset committed");
        Ok(offset)
    }
}
