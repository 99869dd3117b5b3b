//! CutFlow Edit Engine
//!
//! Interactive timeline manipulation:
//! - **Snapping:** pull dragged and resized boundaries onto neighbors
//! - **Clamping:** keep clips inside the timeline and above the minimum span
//! - **Sessions:** a drag/resize state machine that coalesces pointer
//!   moves into at most one timeline mutation per refresh tick
//!
//! Pure computation over [`cutflow_project_model::Timeline`]. No I/O.

pub mod session;
pub mod snap;

pub use session::{EditError, EditSession, EditState, HitTarget};
pub use snap::{snap_points, snap_to, ClipEdit, Edge, SnapConfig, SnapEngine};
