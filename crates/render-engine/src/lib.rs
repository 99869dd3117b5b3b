//! CutFlow Render Engine
//!
//! Turns an edited timeline into a single ffmpeg invocation and runs it.
//!
//! # Pipeline Architecture
//!
//! ```text
//! Timeline + duration ──┐
//!                       ├── resolve sources ── ValidationError
//! project sources ──────┘         │
//!                                 ▼
//!                         compile (pure) ───── CompilationError
//!                                 │
//!                                 ▼
//!                 InvocationPlan { inputs, FilterGraph, maps, encode }
//!                                 │
//!                                 ▼
//!                   ffmpeg -filter_complex ... ── ExternalToolError
//!                                 │
//!                                 ▼
//!                          output-<ms>.mp4 ────── OutputMissingError
//! ```

pub mod compiler;
pub mod effects;
pub mod export;
pub mod graph;
pub mod plan;
pub mod probe;

pub use compiler::{compile, CompileOptions, GraphCompiler, ResolvedSources, SourceResolver};
pub use effects::EffectSelection;
pub use export::*;
pub use graph::{ChainRole, FilterGraph, Label};
pub use plan::{EncodeSettings, InvocationPlan, SideFile};
