//! Laprender Video Descriptors
//!
//! Everything the core knows about camera footage:
//! - **Probe:** per-file container metadata through an external prober
//! - **Video:** one logical recording made of one or more time-split
//!   segments, addressed by a single virtual frame index
//! - **Matcher:** lap-to-video bindings by wall-clock window
//! - **Scan:** directory discovery, split-recording merge, and caching

pub mod binding;
pub mod descriptor;
pub mod matcher;
pub mod probe;
pub mod scan;

pub use binding::*;
pub use descriptor::*;
pub use matcher::*;
pub use probe::*;
pub use scan::*;
