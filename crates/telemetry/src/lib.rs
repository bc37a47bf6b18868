//! Laprender Telemetry Model
//!
//! Defines the data handed to the core by telemetry loggers:
//! - **Fix:** one typed GPS/telemetry sample
//! - **Lap:** an ordered, non-empty run of fixes with metrics derived once at
//!   construction (timing, cumulative distance, direction-change markers,
//!   GPS bounds)
//! - **Geo:** great-circle distance and map projection
//! - **Parsers:** readers for the supported logger formats
//!
//! Wall-clock times are normalized to naive local time when a lap is built so
//! they can be compared directly with camera file timestamps.

pub mod error;
pub mod fix;
pub mod geo;
pub mod lap;
pub mod parsers;

pub use error::*;
pub use fix::*;
pub use geo::*;
pub use lap::*;
