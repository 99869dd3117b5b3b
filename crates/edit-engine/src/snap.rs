//! Boundary snapping and clamped move/resize proposals.
//!
//! The engine never mutates the timeline itself. It reads the current
//! clip set and duration, and returns a [`ClipEdit`] for the caller to
//! apply.

use cutflow_common::config::EditingDefaults;
use cutflow_project_model::timeline::{ClipId, ModelError, Timeline, MIN_CLIP_SPAN};

/// Snap and clamp parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapConfig {
    /// Maximum distance (seconds) at which a boundary is pulled onto an
    /// existing one.
    pub threshold: f64,

    /// Smallest span a resize may leave.
    pub min_span: f64,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            min_span: MIN_CLIP_SPAN,
        }
    }
}

impl From<&EditingDefaults> for SnapConfig {
    fn from(editing: &EditingDefaults) -> Self {
        Self {
            threshold: editing.snap_threshold,
            min_span: editing.min_clip_span,
        }
    }
}

/// Which edge of a clip is being resized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Left,
    Right,
}

/// A proposed clip window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipEdit {
    pub clip: ClipId,
    pub start_time: f64,
    pub end_time: f64,
}

impl ClipEdit {
    /// Write the window back into the timeline. Duration grows by
    /// derivation when the new end passes it.
    pub fn apply(&self, timeline: &mut Timeline) -> Result<(), ModelError> {
        timeline.set_clip_window(self.clip, self.start_time, self.end_time)
    }
}

/// Start and end times of every clip except `exclude`, across all tracks.
pub fn snap_points(timeline: &Timeline, exclude: ClipId) -> Vec<f64> {
    timeline
        .clips()
        .iter()
        .filter(|c| c.id != exclude)
        .flat_map(|c| [c.start_time, c.end_time])
        .collect()
}

/// Nearest point within `threshold` of `t`. On equal distance the earlier
/// point in `points` wins.
pub fn snap_to(t: f64, points: &[f64], threshold: f64) -> Option<f64> {
    let mut best: Option<(f64, f64)> = None; // (point, distance)
    for &point in points {
        let dist = (point - t).abs();
        if dist > threshold || dist.is_nan() {
            continue;
        }
        match best {
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((point, dist)),
        }
    }
    best.map(|(point, _)| point)
}

/// Stateless snap engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapEngine {
    config: SnapConfig,
}

impl SnapEngine {
    pub fn new(config: SnapConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SnapConfig {
        &self.config
    }

    /// Propose moving a clip so it starts at `candidate_start`.
    ///
    /// The start edge snaps first; when it finds nothing the end edge is
    /// tried and the start follows. The result is clamped to
    /// `[0, duration - span]` using the current duration snapshot.
    pub fn propose_move(
        &self,
        timeline: &Timeline,
        clip_id: ClipId,
        candidate_start: f64,
    ) -> Result<ClipEdit, ModelError> {
        let clip = timeline
            .clip(clip_id)
            .ok_or(ModelError::UnknownClip(clip_id))?;
        let span = clip.span();
        let duration = timeline.duration();
        let points = snap_points(timeline, clip_id);

        let mut start = candidate_start;
        if let Some(snapped) = snap_to(start, &points, self.config.threshold) {
            start = snapped;
        } else if let Some(snapped_end) = snap_to(start + span, &points, self.config.threshold) {
            start = snapped_end - span;
        }

        let max_start = (duration - span).max(0.0);
        let start = start.clamp(0.0, max_start);

        tracing::trace!(clip = clip_id.0, candidate_start, start, "Proposed move");
        Ok(ClipEdit {
            clip: clip_id,
            start_time: start,
            end_time: start + span,
        })
    }

    /// Propose moving one edge of a clip to `candidate`.
    ///
    /// Left edges clamp to `[0, end - min_span]`; a clip ending before
    /// `min_span` becomes `[0, min_span]`. Right edges clamp to at
    /// least `start + min_span` with no upper bound, so a clip may extend
    /// the timeline.
    pub fn propose_resize(
        &self,
        timeline: &Timeline,
        clip_id: ClipId,
        edge: Edge,
        candidate: f64,
    ) -> Result<ClipEdit, ModelError> {
        let clip = timeline
            .clip(clip_id)
            .ok_or(ModelError::UnknownClip(clip_id))?;
        let points = snap_points(timeline, clip_id);
        let target = snap_to(candidate, &points, self.config.threshold).unwrap_or(candidate);

        let edit = match edge {
            // A clip ending before `min_span` cannot keep its end; it is
            // pinned to zero and widened instead.
            Edge::Left if clip.end_time - self.config.min_span < 0.0 => ClipEdit {
                clip: clip_id,
                start_time: 0.0,
                end_time: clip.end_time.max(self.config.min_span),
            },
            Edge::Left => ClipEdit {
                clip: clip_id,
                start_time: target.min(clip.end_time - self.config.min_span).max(0.0),
                end_time: clip.end_time,
            },
            Edge::Right => ClipEdit {
                clip: clip_id,
                start_time: clip.start_time,
                end_time: target.max(clip.start_time + self.config.min_span),
            },
        };

        tracing::trace!(
            clip = clip_id.0,
            ?edge,
            candidate,
            start = edit.start_time,
            end = edit.end_time,
            "Proposed resize"
        );
        Ok(edit)
    }
}
