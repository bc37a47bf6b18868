//! Laprender Render Engine
//!
//! Turns lap windows into finished videos. Frames are decoded from the
//! source segments, annotated with telemetry overlays and streamed into an
//! encoder. The audio of the matching span is then cut and muxed back in.
//!
//! # Pipeline Architecture
//!
//! ```text
//! segments ── FrameReader ──┐
//!                           ├── Overlay (per lap window)
//! lap telemetry ────────────┘         │
//!                               bounded queue
//!                                     │
//!                                 FrameSink (H.264, video only)
//!                                     │
//! source audio ── extract ──────── mux ──▶ output.mp4
//! ```
//!
//! Dual renders decode two laps on two workers and stack them; calibration
//! reuses the same readers and overlays to preview a single lap.

pub mod calibrate;
pub mod canvas;
pub mod dual;
pub mod media;
pub mod overlay;
pub mod pipeline;
pub mod preview;
pub mod sink;
pub mod source;

pub use calibrate::{CommandSource, InputEvent};
pub use canvas::{load_font, Canvas, RasterCanvas};
pub use dual::{merge_frames, DualSide};
pub use media::{FfmpegMedia, MediaTool};
pub use overlay::{overlay_for, BasicOverlay, DualPanel, OverlayContext, OverlayRenderer, TrackOverlay};
pub use pipeline::*;
pub use preview::{NullPreview, PngPreview, PreviewSurface};
pub use sink::{FfmpegSink, FrameSink};
pub use source::{CaptureCache, FfmpegReaderFactory, FrameReader, FrameReaderFactory};
