//! CutFlow Common Utilities
//!
//! Shared infrastructure for all CutFlow crates:
//! - Error taxonomy and result aliases
//! - Refresh clock for coalescing pointer-driven edits
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
