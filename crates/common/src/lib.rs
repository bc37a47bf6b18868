//! Laprender Common Utilities
//!
//! Shared infrastructure for all Laprender crates:
//! - Error types and result aliases
//! - Wall-clock normalization and frame/second conversions
//! - Persisted video/offset cache with an explicit load/save lifecycle
//! - Tracing/logging initialization
//! - Configuration loading

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use cache::*;
pub use clock::*;
pub use config::*;
pub use error::*;
