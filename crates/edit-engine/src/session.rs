//! Interactive drag/resize state machine.
//!
//! ```text
//!            pointer_down(body)            pointer_up / cancel
//!   Idle ─────────────────────▶ Dragging ─────────────────────▶ Idle
//!     │
//!     │      pointer_down(edge)            pointer_up / cancel
//!     └───────────────────────▶ Resizing ─────────────────────▶ Idle
//! ```
//!
//! `pointer_move` only records the latest pointer time. The timeline is
//! mutated from [`EditSession::frame`], at most once per refresh tick, and
//! once more on release.

use cutflow_common::clock::RefreshClock;
use cutflow_project_model::timeline::{ClipId, ModelError, Timeline};

use crate::snap::{ClipEdit, Edge, SnapConfig, SnapEngine};

/// Part of a clip the pointer went down on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Body,
    LeftEdge,
    RightEdge,
}

/// Current interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditState {
    Idle,
    Dragging {
        clip: ClipId,
        /// Pointer time minus clip start at pointer-down.
        grab_offset: f64,
    },
    Resizing {
        clip: ClipId,
        edge: Edge,
    },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    #[error("an edit on clip {0} is already in progress")]
    Busy(ClipId),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// One interactive editing session over a timeline.
#[derive(Debug, Clone)]
pub struct EditSession {
    engine: SnapEngine,
    state: EditState,
    pending: Option<f64>,
    origin: Option<ClipEdit>,
    clock: RefreshClock,
}

impl EditSession {
    pub fn new(config: SnapConfig, refresh_hz: u32) -> Self {
        Self {
            engine: SnapEngine::new(config),
            state: EditState::Idle,
            pending: None,
            origin: None,
            clock: RefreshClock::new(refresh_hz),
        }
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == EditState::Idle
    }

    /// Begin a drag (body) or resize (edge) on `clip` at pointer time `t`.
    pub fn pointer_down(
        &mut self,
        timeline: &Timeline,
        clip_id: ClipId,
        target: HitTarget,
        t: f64,
    ) -> Result<(), EditError> {
        if let Some(active) = self.active_clip() {
            return Err(EditError::Busy(active));
        }
        let clip = timeline
            .clip(clip_id)
            .ok_or(ModelError::UnknownClip(clip_id))?;

        self.state = match target {
            HitTarget::Body => EditState::Dragging {
                clip: clip_id,
                grab_offset: t - clip.start_time,
            },
            HitTarget::LeftEdge => EditState::Resizing {
                clip: clip_id,
                edge: Edge::Left,
            },
            HitTarget::RightEdge => EditState::Resizing {
                clip: clip_id,
                edge: Edge::Right,
            },
        };
        self.origin = Some(ClipEdit {
            clip: clip_id,
            start_time: clip.start_time,
            end_time: clip.end_time,
        });
        self.pending = None;
        self.clock.reset();

        tracing::debug!(clip = clip_id.0, state = ?self.state, "Edit started");
        Ok(())
    }

    /// Record the latest pointer time. Earlier unapplied moves are dropped.
    pub fn pointer_move(&mut self, t: f64) {
        if !self.is_idle() {
            self.pending = Some(t);
        }
    }

    /// Apply the pending move if a refresh tick has elapsed.
    pub fn frame(
        &mut self,
        now_ns: u64,
        timeline: &mut Timeline,
    ) -> Result<Option<ClipEdit>, EditError> {
        if self.pending.is_none() || !self.clock.should_tick(now_ns) {
            return Ok(None);
        }
        self.flush(timeline)
    }

    /// Apply any pending move and return to idle.
    pub fn pointer_up(&mut self, timeline: &mut Timeline) -> Result<Option<ClipEdit>, EditError> {
        let applied = self.flush(timeline);
        self.finish();
        applied
    }

    /// Restore the clip's window from before the interaction and return to
    /// idle.
    pub fn cancel(&mut self, timeline: &mut Timeline) -> Result<(), EditError> {
        let origin = self.origin;
        self.finish();
        if let Some(origin) = origin {
            origin.apply(timeline)?;
        }
        Ok(())
    }

    /// Run a whole press-move-release interaction in one call: grab `target`
    /// on `clip_id`, move it to `t`, release.
    ///
    /// For [`HitTarget::Body`] `t` is the new start time; for edges it is the
    /// new edge time.
    pub fn commit(
        &mut self,
        timeline: &mut Timeline,
        clip_id: ClipId,
        target: HitTarget,
        t: f64,
    ) -> Result<ClipEdit, EditError> {
        let clip = timeline
            .clip(clip_id)
            .ok_or(ModelError::UnknownClip(clip_id))?;
        let grab = match target {
            HitTarget::Body | HitTarget::LeftEdge => clip.start_time,
            HitTarget::RightEdge => clip.end_time,
        };
        let unchanged = ClipEdit {
            clip: clip_id,
            start_time: clip.start_time,
            end_time: clip.end_time,
        };

        self.pointer_down(timeline, clip_id, target, grab)?;
        self.pointer_move(t);
        Ok(self.pointer_up(timeline)?.unwrap_or(unchanged))
    }

    fn active_clip(&self) -> Option<ClipId> {
        match self.state {
            EditState::Idle => None,
            EditState::Dragging { clip, .. } | EditState::Resizing { clip, .. } => Some(clip),
        }
    }

    fn flush(&mut self, timeline: &mut Timeline) -> Result<Option<ClipEdit>, EditError> {
        let Some(t) = self.pending.take() else {
            return Ok(None);
        };
        let edit = match self.state {
            EditState::Idle => return Ok(None),
            EditState::Dragging { clip, grab_offset } => {
                self.engine.propose_move(timeline, clip, t - grab_offset)?
            }
            EditState::Resizing { clip, edge } => {
                self.engine.propose_resize(timeline, clip, edge, t)?
            }
        };
        edit.apply(timeline)?;
        Ok(Some(edit))
    }

    fn finish(&mut self) {
        if let Some(clip) = self.active_clip() {
            tracing::debug!(clip = clip.0, "Edit finished");
        }
        self.state = EditState::Idle;
        self.pending = None;
        self.origin = None;
    }
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new(SnapConfig::default(), 60)
    }
}
