//! CutFlow Project Model
//!
//! Defines the core data contracts for CutFlow projects:
//! - **Timeline:** Tracks, clips, and the invariants that keep them usable
//! - **Text & Effects:** Overlays and visual effects referenced by clips
//! - **Duration:** Derived global duration, recomputed on every read
//! - **Media:** What ingestion hands over for each accepted source
//! - **Project:** On-disk bundle and the export request wire types
//!
//! All times are in seconds.

pub mod duration;
pub mod effect;
pub mod media;
pub mod project;
pub mod text;
pub mod timeline;

pub use duration::*;
pub use effect::*;
pub use media::*;
pub use project::*;
pub use text::*;
pub use timeline::*;
