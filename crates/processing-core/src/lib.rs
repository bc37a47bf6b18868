//! Laprender Processing Core
//!
//! Decisions about what to render, separated from how it is rendered:
//! - **Calibration:** command-driven state machine finding the camera/logger
//!   frame offset
//! - **Windows:** lap bindings resolved into clamped, offset frame windows
//!   grouped per output file
//! - **Progress:** distance-based comparison of two laps for dual renders
//!
//! This crate is pure computation with no I/O and no subprocesses.
//! All inputs are data; all outputs are data.

pub mod calibration;
pub mod progress;
pub mod windows;

pub use calibration::{CalibrationCommand, CalibrationState, Calibrator, FrameRequest, Step};
pub use progress::{ProgressComparison, Side};
pub use windows::{LapWindow, RenderMode, RenderParams};
