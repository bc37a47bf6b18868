//! Frame-offset calibration state machine.
//!
//! The camera and the data logger keep separate clocks, so after coarse
//! wall-clock matching a lap is usually off by a constant number of frames.
//! [`Calibrator`] lets an operator scrub around a reference lap, nudge the
//! offset until the overlay lines up with the footage, and commit it.
//!
//! The machine knows nothing about keys or windows. It consumes
//! [`CalibrationCommand`]s and answers with the frame the driver should show
//! next.

use laprender_video::{LapBinding, Video};
use serde::{Deserialize, Serialize};

/// Operator command, decoupled from any input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationCommand {
    /// Move the preview position by a few frames. The offset is unchanged.
    StepFrame(i64),
    /// Move the preview position by a large jump.
    StepCoarse(i64),
    /// Change the frame offset and jump back to the lap start.
    AdjustOffset(i64),
    TogglePlay,
    Commit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationState {
    Idle,
    Previewing,
    Committed,
}

/// How the driver should obtain the next preview frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRequest {
    /// Jump to a frame; requires a seek.
    Seek(i64),
    /// Read the frame directly after the previous one.
    Sequential(i64),
    /// Show the current frame again.
    Hold(i64),
}

impl FrameRequest {
    pub fn frame(&self) -> i64 {
        match *self {
            FrameRequest::Seek(f) | FrameRequest::Sequential(f) | FrameRequest::Hold(f) => f,
        }
    }
}

/// Outcome of one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Render(FrameRequest),
    Done(i64),
}

/// Interactive offset search over one reference lap.
#[derive(Debug, Clone)]
pub struct Calibrator {
    /// Un-offset first frame of the reference lap.
    anchor: i64,
    offset: i64,
    position: i64,
    frame_count: i64,
    playing: bool,
    state: CalibrationState,
}

impl Calibrator {
    /// Create a calibrator for a lap starting at `anchor` in a video of
    /// `frame_count` frames, starting from `offset`.
    pub fn new(anchor: i64, offset: i64, frame_count: i64) -> Self {
        let mut calibrator = Self {
            anchor,
            offset,
            position: 0,
            frame_count: frame_count.max(1),
            playing: false,
            state: CalibrationState::Idle,
        };
        calibrator.position = calibrator.clamp(anchor + offset);
        calibrator
    }

    /// Calibrator for `video`'s reference lap.
    ///
    /// `None` when no lap is selected for rendering: there is nothing to
    /// calibrate against and the offset stays as it is.
    pub fn for_video(video: &Video) -> Option<Self> {
        let binding = reference_binding(video)?;
        Some(Self::new(
            binding.start_frame,
            video.frame_offset,
            video.frame_count(),
        ))
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Frame at which the lap starts under the current offset.
    pub fn lap_start_frame(&self) -> i64 {
        self.anchor + self.offset
    }

    /// Frames between the offset lap start and the preview position.
    ///
    /// Negative while the preview sits before the lap.
    pub fn elapsed_frames(&self) -> i64 {
        self.position - self.lap_start_frame()
    }

    /// Enter the preview loop and return the first frame to show.
    pub fn start(&mut self) -> FrameRequest {
        self.state = CalibrationState::Previewing;
        FrameRequest::Seek(self.position)
    }

    /// Advance the machine by one input event (`None` when no input arrived).
    ///
    /// An idle calibrator starts previewing first; a command that arrives
    /// with the start is still applied.
    pub fn apply(&mut self, command: Option<CalibrationCommand>) -> Step {
        match self.state {
            CalibrationState::Committed => return Step::Done(self.offset),
            CalibrationState::Idle => {
                let first = self.start();
                if command.is_none() {
                    return Step::Render(first);
                }
            }
            CalibrationState::Previewing => {}
        }

        let request = match command {
            Some(CalibrationCommand::StepFrame(delta))
            | Some(CalibrationCommand::StepCoarse(delta)) => {
                self.position = self.clamp(self.position + delta);
                FrameRequest::Seek(self.position)
            }
            Some(CalibrationCommand::AdjustOffset(delta)) => {
                self.offset += delta;
                self.position = self.clamp(self.lap_start_frame());
                tracing::debug!(offset = self.offset, "Frame offset adjusted");
                FrameRequest::Seek(self.position)
            }
            Some(CalibrationCommand::TogglePlay) => {
                self.playing = !self.playing;
                FrameRequest::Hold(self.position)
            }
            Some(CalibrationCommand::Commit) => {
                self.state = CalibrationState::Committed;
                self.playing = false;
                return Step::Done(self.offset);
            }
            None if self.playing => {
                if self.position + 1 < self.frame_count {
                    self.position += 1;
                    FrameRequest::Sequential(self.position)
                } else {
                    self.playing = false;
                    FrameRequest::Hold(self.position)
                }
            }
            None => FrameRequest::Hold(self.position),
        };
        Step::Render(request)
    }

    fn clamp(&self, frame: i64) -> i64 {
        frame.clamp(0, self.frame_count - 1)
    }
}

/// First lap of `video` selected for rendering.
pub fn reference_binding(video: &Video) -> Option<&LapBinding> {
    video.renderable_bindings().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use CalibrationCommand::*;

    fn started(anchor: i64, offset: i64) -> Calibrator {
        let mut c = Calibrator::new(anchor, offset, 3600);
        assert_eq!(c.start(), FrameRequest::Seek(anchor + offset));
        c
    }

    #[test]
    fn test_scrubbing_leaves_offset_alone() {
        let mut c = started(600, 0);
        assert_eq!(c.apply(Some(StepFrame(1))), Step::Render(FrameRequest::Seek(601)));
        assert_eq!(c.apply(Some(StepFrame(-1))), Step::Render(FrameRequest::Seek(600)));
        assert_eq!(c.apply(Some(StepCoarse(300))), Step::Render(FrameRequest::Seek(900)));
        assert_eq!(c.offset(), 0);
        assert_eq!(c.elapsed_frames(), 300);
    }

    #[test]
    fn test_offset_adjust_reseeks_to_lap_start() {
        let mut c = started(600, 0);
        c.apply(Some(StepCoarse(300)));
        assert_eq!(c.apply(Some(AdjustOffset(1))), Step::Render(FrameRequest::Seek(601)));
        assert_eq!(c.apply(Some(AdjustOffset(-3))), Step::Render(FrameRequest::Seek(598)));
        assert_eq!(c.offset(), -2);
        assert_eq!(c.elapsed_frames(), 0);
    }

    #[test]
    fn test_play_advances_sequentially() {
        let mut c = started(10, 0);
        assert_eq!(c.apply(Some(TogglePlay)), Step::Render(FrameRequest::Hold(10)));
        assert_eq!(c.apply(None), Step::Render(FrameRequest::Sequential(11)));
        assert_eq!(c.apply(None), Step::Render(FrameRequest::Sequential(12)));
        c.apply(Some(TogglePlay));
        assert_eq!(c.apply(None), Step::Render(FrameRequest::Hold(12)));
    }

    #[test]
    fn test_play_stops_at_last_frame() {
        let mut c = Calibrator::new(3598, 0, 3600);
        c.start();
        c.apply(Some(TogglePlay));
        assert_eq!(c.apply(None), Step::Render(FrameRequest::Sequential(3599)));
        assert_eq!(c.apply(None), Step::Render(FrameRequest::Hold(3599)));
        assert!(!c.is_playing());
    }

    #[test]
    fn test_positions_clamp_to_video() {
        let mut c = started(100, 0);
        assert_eq!(c.apply(Some(StepCoarse(-300))), Step::Render(FrameRequest::Seek(0)));
        assert_eq!(c.apply(Some(StepCoarse(10_000))), Step::Render(FrameRequest::Seek(3599)));
    }

    #[test]
    fn test_commit_is_terminal() {
        let mut c = started(600, 5);
        c.apply(Some(AdjustOffset(2)));
        assert_eq!(c.apply(Some(Commit)), Step::Done(7));
        assert_eq!(c.state(), CalibrationState::Committed);
        assert_eq!(c.apply(Some(AdjustOffset(1))), Step::Done(7));
    }

    #[test]
    fn test_apply_before_start_begins_preview() {
        let mut c = Calibrator::new(600, 0, 3600);
        assert_eq!(c.state(), CalibrationState::Idle);
        assert_eq!(c.apply(None), Step::Render(FrameRequest::Seek(600)));
        assert_eq!(c.state(), CalibrationState::Previewing);
    }

    #[test]
    fn test_command_before_start_is_not_dropped() {
        let mut c = Calibrator::new(600, 3, 3600);
        assert_eq!(c.apply(Some(StepFrame(2))), Step::Render(FrameRequest::Seek(605)));
        assert_eq!(c.state(), CalibrationState::Previewing);

        let mut c = Calibrator::new(600, 3, 3600);
        assert_eq!(c.apply(Some(Commit)), Step::Done(3));
        assert_eq!(c.state(), CalibrationState::Committed);
    }
}
