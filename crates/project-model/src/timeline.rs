//! Timeline data model.
//!
//! The timeline exclusively owns clips, text overlays, and effects. Other
//! components read it and hand back proposed mutations; they never keep
//! their own copies.
//!
//! Invariant enforcement is advisory: mutations reject only what would make
//! a clip meaningless (`end_time <= start_time`, wrong track, missing
//! reference). Everything else is reported by [`Timeline::validate`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::duration::reconcile_duration;
use crate::effect::{Effect, EffectKind};
use crate::media::MediaSource;
use crate::text::TextOverlay;

/// Smallest span an interactive resize may leave on a clip.
pub const MIN_CLIP_SPAN: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectId(pub u64);

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "clip#{}", self.0)
    }
}

impl fmt::Display for TextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "text#{}", self.0)
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "effect#{}", self.0)
    }
}

/// Kind of a track, and of every clip placed on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
    Image,
    Text,
    Effect,
}

impl TrackKind {
    /// Fixed track order created for every session.
    pub const ALL: [TrackKind; 5] = [
        TrackKind::Video,
        TrackKind::Audio,
        TrackKind::Image,
        TrackKind::Text,
        TrackKind::Effect,
    ];

    /// Video and image clips make up the visual stream.
    pub fn is_visual(self) -> bool {
        matches!(self, Self::Video | Self::Image)
    }

    pub fn requires_source(self) -> bool {
        matches!(self, Self::Video | Self::Audio | Self::Image)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Image => "image",
            Self::Text => "text",
            Self::Effect => "effect",
        }
    }
}

/// A typed lane holding clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub kind: TrackKind,
}

/// A time-bounded placement on a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    pub id: ClipId,
    pub track_id: TrackId,
    #[serde(rename = "type")]
    pub kind: TrackKind,
    pub start_time: f64,
    pub end_time: f64,

    /// Media path for video, audio, and image clips.
    #[serde(default, alias = "path", skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, alias = "effectId", skip_serializing_if = "Option::is_none")]
    pub effect_ref: Option<EffectId>,

    #[serde(default, alias = "textId", skip_serializing_if = "Option::is_none")]
    pub text_ref: Option<TextId>,
}

impl Clip {
    pub fn span(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Whether the clip covers a non-empty window.
    pub fn is_non_empty(&self) -> bool {
        self.end_time > self.start_time
    }

    /// Whether the open windows of two clips intersect.
    pub fn overlaps(&self, other: &Clip) -> bool {
        self.start_time < other.end_time && other.start_time < self.end_time
    }
}

/// Parameters for placing a new clip. The track is chosen by `kind`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewClip {
    pub kind: TrackKind,
    pub start_time: f64,
    pub end_time: f64,
    pub source: Option<String>,
    pub effect_ref: Option<EffectId>,
    pub text_ref: Option<TextId>,
}

impl NewClip {
    /// A source-bearing clip (video, audio, or image).
    pub fn media(kind: TrackKind, source: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self {
            kind,
            start_time,
            end_time,
            source: Some(source.into()),
            effect_ref: None,
            text_ref: None,
        }
    }
}

/// Errors raised by timeline mutations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("unknown clip {0}")]
    UnknownClip(ClipId),

    #[error("unknown text overlay {0}")]
    UnknownText(TextId),

    #[error("unknown effect {0}")]
    UnknownEffect(EffectId),

    #[error("clip window [{start}, {end}] is empty")]
    EmptyWindow { start: f64, end: f64 },

    #[error("{kind} clip is missing its {what}")]
    MissingReference { kind: &'static str, what: &'static str },

    #[error("clip kind {clip} does not match {track} track")]
    TrackKindMismatch {
        clip: &'static str,
        track: &'static str,
    },
}

/// An advisory consistency finding.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelIssue {
    /// Span shorter than [`MIN_CLIP_SPAN`].
    ShortSpan { clip: ClipId, span: f64 },
    /// Source-bearing clip without a source.
    MissingSource { clip: ClipId },
    /// Text clip referencing an overlay that no longer exists.
    DanglingText { clip: ClipId, text: TextId },
    /// Effect clip referencing an effect that no longer exists.
    DanglingEffect { clip: ClipId, effect: EffectId },
    /// Two clips on the same track cover intersecting windows. Tracks are
    /// not prevented from layering clips; this is informational.
    Overlap {
        track: TrackKind,
        first: ClipId,
        second: ClipId,
    },
}

impl ModelIssue {
    /// Whether the issue would make compilation produce something other
    /// than what the user sees.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::MissingSource { .. })
    }
}

impl fmt::Display for ModelIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShortSpan { clip, span } => {
                write!(f, "{clip} spans {span:.2}s, below the {MIN_CLIP_SPAN}s minimum")
            }
            Self::MissingSource { clip } => write!(f, "{clip} has no source"),
            Self::DanglingText { clip, text } => write!(f, "{clip} references missing {text}"),
            Self::DanglingEffect { clip, effect } => {
                write!(f, "{clip} references missing {effect}")
            }
            Self::Overlap {
                track,
                first,
                second,
            } => write!(
                f,
                "{first} and {second} overlap on the {} track",
                track.as_str()
            ),
        }
    }
}

/// The full edit: fixed tracks, clips in insertion order, overlays, and
/// effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// Schema version.
    pub version: String,

    #[serde(default = "default_tracks")]
    tracks: Vec<Track>,

    #[serde(default)]
    clips: Vec<Clip>,

    #[serde(default)]
    texts: Vec<TextOverlay>,

    #[serde(default)]
    effects: Vec<Effect>,

    #[serde(default = "first_id")]
    next_id: u64,
}

fn default_tracks() -> Vec<Track> {
    TrackKind::ALL
        .iter()
        .enumerate()
        .map(|(i, kind)| Track {
            id: TrackId(i as u64 + 1),
            kind: *kind,
        })
        .collect()
}

fn first_id() -> u64 {
    TrackKind::ALL.len() as u64 + 1
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Timeline {
    /// Empty timeline with the fixed track set.
    pub fn new() -> Self {
        Self {
            version: "1.0".to_string(),
            tracks: default_tracks(),
            clips: Vec::new(),
            texts: Vec::new(),
            effects: Vec::new(),
            next_id: first_id(),
        }
    }

    /// Rebuild a timeline from loose parts, e.g. an export request.
    ///
    /// Clip track ids are reassigned from their kinds and the id counter
    /// resumes past the largest id seen.
    pub fn from_parts(clips: Vec<Clip>, texts: Vec<TextOverlay>, effects: Vec<Effect>) -> Self {
        let mut timeline = Self::new();
        let mut max_id = timeline.next_id;
        for mut clip in clips {
            clip.track_id = timeline.track(clip.kind).id;
            max_id = max_id.max(clip.id.0 + 1);
            timeline.clips.push(clip);
        }
        for text in &texts {
            max_id = max_id.max(text.id.0 + 1);
        }
        for effect in &effects {
            max_id = max_id.max(effect.id.0 + 1);
        }
        timeline.texts = texts;
        timeline.effects = effects;
        timeline.next_id = max_id;
        timeline
    }

    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// The single track of a kind.
    pub fn track(&self, kind: TrackKind) -> Track {
        self.tracks
            .iter()
            .copied()
            .find(|t| t.kind == kind)
            .unwrap_or_else(|| {
                let index = TrackKind::ALL.iter().position(|k| *k == kind).unwrap_or(0);
                Track {
                    id: TrackId(index as u64 + 1),
                    kind,
                }
            })
    }

    /// All clips in insertion order.
    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn clip(&self, id: ClipId) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == id)
    }

    pub fn texts(&self) -> &[TextOverlay] {
        &self.texts
    }

    pub fn text(&self, id: TextId) -> Option<&TextOverlay> {
        self.texts.iter().find(|t| t.id == id)
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn effect(&self, id: EffectId) -> Option<&Effect> {
        self.effects.iter().find(|e| e.id == id)
    }

    /// Derived global duration. Recomputed on every call.
    pub fn duration(&self) -> f64 {
        reconcile_duration(&self.clips)
    }

    /// Clips of a kind sorted by start time. The sort is stable, so ties
    /// keep insertion order.
    pub fn clips_on_track(&self, kind: TrackKind) -> Vec<&Clip> {
        let mut clips: Vec<&Clip> = self.clips.iter().filter(|c| c.kind == kind).collect();
        clips.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        clips
    }

    /// End of the last clip on a track, or zero.
    pub fn track_end(&self, kind: TrackKind) -> f64 {
        self.clips
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.end_time)
            .fold(0.0, f64::max)
    }

    pub fn add_clip(&mut self, new: NewClip) -> Result<ClipId, ModelError> {
        if !(new.end_time > new.start_time) {
            return Err(ModelError::EmptyWindow {
                start: new.start_time,
                end: new.end_time,
            });
        }
        match new.kind {
            TrackKind::Video | TrackKind::Audio | TrackKind::Image if new.source.is_none() => {
                return Err(ModelError::MissingReference {
                    kind: new.kind.as_str(),
                    what: "source",
                });
            }
            TrackKind::Text => match new.text_ref {
                None => {
                    return Err(ModelError::MissingReference {
                        kind: "text",
                        what: "text reference",
                    })
                }
                Some(id) if self.text(id).is_none() => return Err(ModelError::UnknownText(id)),
                Some(_) => {}
            },
            TrackKind::Effect => match new.effect_ref {
                None => {
                    return Err(ModelError::MissingReference {
                        kind: "effect",
                        what: "effect reference",
                    })
                }
                Some(id) if self.effect(id).is_none() => {
                    return Err(ModelError::UnknownEffect(id))
                }
                Some(_) => {}
            },
            _ => {}
        }

        let id = ClipId(self.alloc_id());
        let track_id = self.track(new.kind).id;
        self.clips.push(Clip {
            id,
            track_id,
            kind: new.kind,
            start_time: new.start_time,
            end_time: new.end_time,
            source: new.source,
            effect_ref: new.effect_ref,
            text_ref: new.text_ref,
        });
        Ok(id)
    }

    /// Place a clip on a specific track; the clip kind must match it.
    pub fn add_clip_to_track(&mut self, track: TrackId, new: NewClip) -> Result<ClipId, ModelError> {
        let track_kind = self
            .tracks
            .iter()
            .find(|t| t.id == track)
            .map(|t| t.kind)
            .ok_or(ModelError::TrackKindMismatch {
                clip: new.kind.as_str(),
                track: "unknown",
            })?;
        if track_kind != new.kind {
            return Err(ModelError::TrackKindMismatch {
                clip: new.kind.as_str(),
                track: track_kind.as_str(),
            });
        }
        self.add_clip(new)
    }

    pub fn remove_clip(&mut self, id: ClipId) -> Result<Clip, ModelError> {
        let index = self
            .clips
            .iter()
            .position(|c| c.id == id)
            .ok_or(ModelError::UnknownClip(id))?;
        Ok(self.clips.remove(index))
    }

    /// Move or resize a clip. Only empty windows are rejected; clamping is
    /// the caller's job.
    pub fn set_clip_window(&mut self, id: ClipId, start: f64, end: f64) -> Result<(), ModelError> {
        if !(end > start) {
            return Err(ModelError::EmptyWindow { start, end });
        }
        let clip = self
            .clips
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(ModelError::UnknownClip(id))?;
        clip.start_time = start;
        clip.end_time = end;
        Ok(())
    }

    pub fn set_clip_source(&mut self, id: ClipId, source: impl Into<String>) -> Result<(), ModelError> {
        let clip = self
            .clips
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(ModelError::UnknownClip(id))?;
        clip.source = Some(source.into());
        Ok(())
    }

    /// Place an ingested source on its track. Without an explicit start the
    /// clip is appended after the last clip on that track.
    pub fn place_media(&mut self, media: &MediaSource, start: Option<f64>) -> Result<ClipId, ModelError> {
        let kind = media.kind.track_kind();
        let start = start.unwrap_or_else(|| self.track_end(kind)).max(0.0);
        self.add_clip(NewClip::media(
            kind,
            media.path.clone(),
            start,
            start + media.duration,
        ))
    }

    pub fn add_text(&mut self, mut overlay: TextOverlay) -> TextId {
        let id = TextId(self.alloc_id());
        overlay.id = id;
        self.texts.push(overlay);
        id
    }

    /// Add an overlay together with the text-track clip that shows it.
    pub fn add_text_clip(
        &mut self,
        overlay: TextOverlay,
        start: f64,
        end: f64,
    ) -> Result<(TextId, ClipId), ModelError> {
        if !(end > start) {
            return Err(ModelError::EmptyWindow { start, end });
        }
        let text_id = self.add_text(overlay);
        let clip_id = self.add_clip(NewClip {
            kind: TrackKind::Text,
            start_time: start,
            end_time: end,
            source: None,
            effect_ref: None,
            text_ref: Some(text_id),
        })?;
        Ok((text_id, clip_id))
    }

    pub fn text_mut(&mut self, id: TextId) -> Result<&mut TextOverlay, ModelError> {
        self.texts
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(ModelError::UnknownText(id))
    }

    /// Remove an overlay and every clip showing it.
    pub fn remove_text(&mut self, id: TextId) -> Result<TextOverlay, ModelError> {
        let index = self
            .texts
            .iter()
            .position(|t| t.id == id)
            .ok_or(ModelError::UnknownText(id))?;
        self.clips.retain(|c| c.text_ref != Some(id));
        Ok(self.texts.remove(index))
    }

    pub fn add_effect(&mut self, mut effect: Effect) -> EffectId {
        let id = EffectId(self.alloc_id());
        effect.id = id;
        self.effects.push(effect);
        id
    }

    /// Add an effect together with the effect-track clip that places it.
    pub fn add_effect_clip(
        &mut self,
        kind: EffectKind,
        start: f64,
        end: f64,
        intensity: u8,
    ) -> Result<(EffectId, ClipId), ModelError> {
        if !(end > start) {
            return Err(ModelError::EmptyWindow { start, end });
        }
        let effect_id = self.add_effect(Effect::new(kind, start, end, intensity));
        let clip_id = self.add_clip(NewClip {
            kind: TrackKind::Effect,
            start_time: start,
            end_time: end,
            source: None,
            effect_ref: Some(effect_id),
            text_ref: None,
        })?;
        Ok((effect_id, clip_id))
    }

    pub fn effect_mut(&mut self, id: EffectId) -> Result<&mut Effect, ModelError> {
        self.effects
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(ModelError::UnknownEffect(id))
    }

    /// Remove an effect and every clip placing it.
    pub fn remove_effect(&mut self, id: EffectId) -> Result<Effect, ModelError> {
        let index = self
            .effects
            .iter()
            .position(|e| e.id == id)
            .ok_or(ModelError::UnknownEffect(id))?;
        self.clips.retain(|c| c.effect_ref != Some(id));
        Ok(self.effects.remove(index))
    }

    /// First effect-track clip referencing the effect.
    pub fn effect_clip(&self, id: EffectId) -> Option<&Clip> {
        self.clips
            .iter()
            .find(|c| c.kind == TrackKind::Effect && c.effect_ref == Some(id))
    }

    /// First text-track clip referencing the overlay.
    pub fn text_clip(&self, id: TextId) -> Option<&Clip> {
        self.clips
            .iter()
            .find(|c| c.kind == TrackKind::Text && c.text_ref == Some(id))
    }

    /// Effective window of an effect: its linked clip's window, or the
    /// effect's own fields when unlinked.
    pub fn effect_window(&self, id: EffectId) -> Option<(f64, f64)> {
        if let Some(clip) = self.effect_clip(id) {
            return Some((clip.start_time, clip.end_time));
        }
        self.effect(id).map(|e| (e.start_time, e.end_time))
    }

    /// Copy linked clip windows into their effects.
    pub fn sync_effect_windows(&mut self) {
        let windows: Vec<(EffectId, f64, f64)> = self
            .clips
            .iter()
            .filter(|c| c.kind == TrackKind::Effect)
            .filter_map(|c| c.effect_ref.map(|id| (id, c.start_time, c.end_time)))
            .collect();
        for (id, start, end) in windows.into_iter().rev() {
            if let Some(effect) = self.effects.iter_mut().find(|e| e.id == id) {
                effect.start_time = start;
                effect.end_time = end;
            }
        }
    }

    /// Advisory consistency report.
    pub fn validate(&self) -> Vec<ModelIssue> {
        let mut issues = Vec::new();

        for clip in &self.clips {
            if clip.span() < MIN_CLIP_SPAN {
                issues.push(ModelIssue::ShortSpan {
                    clip: clip.id,
                    span: clip.span(),
                });
            }
            if clip.kind.requires_source() && clip.source.as_deref().map_or(true, str::is_empty) {
                issues.push(ModelIssue::MissingSource { clip: clip.id });
            }
            if let Some(text) = clip.text_ref {
                if self.text(text).is_none() {
                    issues.push(ModelIssue::DanglingText {
                        clip: clip.id,
                        text,
                    });
                }
            }
            if let Some(effect) = clip.effect_ref {
                if self.effect(effect).is_none() {
                    issues.push(ModelIssue::DanglingEffect {
                        clip: clip.id,
                        effect,
                    });
                }
            }
        }

        for kind in TrackKind::ALL {
            let clips = self.clips_on_track(kind);
            for (i, first) in clips.iter().enumerate() {
                for second in &clips[i + 1..] {
                    if second.start_time >= first.end_time {
                        break;
                    }
                    if first.overlaps(second) {
                        issues.push(ModelIssue::Overlap {
                            track: kind,
                            first: first.id,
                            second: second.id,
                        });
                    }
                }
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MediaId, MediaKind};

    #[test]
    fn test_new_timeline_has_fixed_tracks() {
        let timeline = Timeline::new();
        let kinds: Vec<TrackKind> = timeline.tracks().iter().map(|t| t.kind).collect();
        assert_eq!(kinds, TrackKind::ALL.to_vec());
        assert_eq!(timeline.duration(), 150.0);
    }

    #[test]
    fn test_add_clip_rejects_empty_window_and_missing_source() {
        let mut timeline = Timeline::new();
        let err = timeline
            .add_clip(NewClip::media(TrackKind::Video, "a.mp4", 3.0, 3.0))
            .unwrap_err();
        assert!(matches!(err, ModelError::EmptyWindow { .. }));

        let mut no_source = NewClip::media(TrackKind::Audio, "a.mp3", 0.0, 2.0);
        no_source.source = None;
        assert!(matches!(
            timeline.add_clip(no_source).unwrap_err(),
            ModelError::MissingReference { .. }
        ));
    }

    #[test]
    fn test_add_clip_to_wrong_track_is_rejected() {
        let mut timeline = Timeline::new();
        let audio_track = timeline.track(TrackKind::Audio).id;
        let err = timeline
            .add_clip_to_track(audio_track, NewClip::media(TrackKind::Video, "a.mp4", 0.0, 1.0))
            .unwrap_err();
        assert!(matches!(err, ModelError::TrackKindMismatch { .. }));
    }

    #[test]
    fn test_clips_on_track_sorted_with_stable_ties() {
        let mut timeline = Timeline::new();
        let late = timeline
            .add_clip(NewClip::media(TrackKind::Video, "late.mp4", 5.0, 8.0))
            .unwrap();
        let tie_a = timeline
            .add_clip(NewClip::media(TrackKind::Video, "a.mp4", 0.0, 2.0))
            .unwrap();
        let tie_b = timeline
            .add_clip(NewClip::media(TrackKind::Video, "b.mp4", 0.0, 3.0))
            .unwrap();

        let order: Vec<ClipId> = timeline
            .clips_on_track(TrackKind::Video)
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(order, vec![tie_a, tie_b, late]);
    }

    #[test]
    fn test_duration_follows_mutations() {
        let mut timeline = Timeline::new();
        let id = timeline
            .add_clip(NewClip::media(TrackKind::Video, "a.mp4", 0.0, 12.0))
            .unwrap();
        assert_eq!(timeline.duration(), 12.0);

        timeline.set_clip_window(id, 0.0, 20.04).unwrap();
        assert_eq!(timeline.duration(), 20.0);

        timeline.remove_clip(id).unwrap();
        assert_eq!(timeline.duration(), 150.0);
    }

    #[test]
    fn test_effect_window_comes_from_linked_clip() {
        let mut timeline = Timeline::new();
        let (effect, clip) = timeline
            .add_effect_clip(EffectKind::Fade, 1.0, 3.0, 40)
            .unwrap();
        timeline.set_clip_window(clip, 4.0, 6.0).unwrap();

        assert_eq!(timeline.effect_window(effect), Some((4.0, 6.0)));
        assert_eq!(timeline.effect(effect).unwrap().start_time, 1.0);

        timeline.sync_effect_windows();
        assert_eq!(timeline.effect(effect).unwrap().start_time, 4.0);
    }

    #[test]
    fn test_removing_text_removes_its_clips() {
        let mut timeline = Timeline::new();
        let (text, clip) = timeline
            .add_text_clip(TextOverlay::new("Hi"), 0.0, 2.0)
            .unwrap();
        assert_eq!(timeline.text_clip(text).map(|c| c.id), Some(clip));

        timeline.remove_text(text).unwrap();
        assert!(timeline.clip(clip).is_none());
        assert!(timeline.texts().is_empty());
    }

    #[test]
    fn test_place_media_appends_after_track_end() {
        let mut timeline = Timeline::new();
        let first = MediaSource::new(MediaId(1), "a.mp4", MediaKind::Video, Some(10.0));
        let second = MediaSource::new(MediaId(2), "b.png", MediaKind::Image, None);

        let a = timeline.place_media(&first, None).unwrap();
        let b = timeline.place_media(&first, None).unwrap();
        let c = timeline.place_media(&second, None).unwrap();

        assert_eq!(timeline.clip(a).unwrap().start_time, 0.0);
        assert_eq!(timeline.clip(b).unwrap().start_time, 10.0);
        let image = timeline.clip(c).unwrap();
        assert_eq!(image.kind, TrackKind::Image);
        assert_eq!((image.start_time, image.end_time), (0.0, 5.0));
    }

    #[test]
    fn test_validate_reports_overlap_and_short_span() {
        let mut timeline = Timeline::new();
        let a = timeline
            .add_clip(NewClip::media(TrackKind::Video, "a.mp4", 0.0, 5.0))
            .unwrap();
        let b = timeline
            .add_clip(NewClip::media(TrackKind::Video, "b.mp4", 4.0, 4.3))
            .unwrap();

        let issues = timeline.validate();
        assert!(issues.contains(&ModelIssue::Overlap {
            track: TrackKind::Video,
            first: a,
            second: b,
        }));
        assert!(issues
            .iter()
            .any(|i| matches!(i, ModelIssue::ShortSpan { clip, .. } if *clip == b)));
        assert!(issues.iter().all(|i| !i.is_blocking()));
    }

    #[test]
    fn test_from_parts_resumes_id_allocation() {
        let mut source = Timeline::new();
        source
            .add_clip(NewClip::media(TrackKind::Audio, "a.mp3", 0.0, 4.0))
            .unwrap();
        let clips = source.clips().to_vec();
        let max = clips.iter().map(|c| c.id.0).max().unwrap();

        let mut rebuilt = Timeline::from_parts(clips, vec![], vec![]);
        let next = rebuilt
            .add_clip(NewClip::media(TrackKind::Audio, "b.mp3", 4.0, 6.0))
            .unwrap();
        assert!(next.0 > max);
    }

    #[test]
    fn test_clip_wire_format_uses_editor_names() {
        let json = r#"{"id":9,"trackId":2,"type":"audio","startTime":0,"endTime":10,"path":"/uploads/a.mp3"}"#;
        let clip: Clip = serde_json::from_str(json).unwrap();
        assert_eq!(clip.kind, TrackKind::Audio);
        assert_eq!(clip.source.as_deref(), Some("/uploads/a.mp3"));

        let value = serde_json::to_value(&clip).unwrap();
        assert_eq!(value["startTime"], 0.0);
        assert_eq!(value["source"], "/uploads/a.mp3");
    }

    #[test]
    fn test_updates_edit_in_place() {
        let mut timeline = Timeline::new();
        let video = timeline
            .add_clip(NewClip::media(TrackKind::Video, "a.mp4", 0.0, 5.0))
            .unwrap();
        timeline.set_clip_source(video, "b.mp4").unwrap();
        assert_eq!(timeline.clip(video).unwrap().source.as_deref(), Some("b.mp4"));

        let (text, _) = timeline
            .add_text_clip(TextOverlay::new("Hi"), 0.0, 2.0)
            .unwrap();
        timeline.text_mut(text).unwrap().content = "Hello".to_string();
        assert_eq!(timeline.text(text).unwrap().content, "Hello");

        let (effect, _) = timeline
            .add_effect_clip(EffectKind::Soften, 1.0, 2.0, 50)
            .unwrap();
        timeline.effect_mut(effect).unwrap().intensity = 90;
        assert_eq!(timeline.effect(effect).unwrap().intensity, 90);
    }

    #[test]
    fn test_effect_and_its_clip_removal() {
        let mut timeline = Timeline::new();
        let (kept, kept_clip) = timeline
            .add_effect_clip(EffectKind::Amplify, 0.0, 2.0, 50)
            .unwrap();
        let (gone, gone_clip) = timeline
            .add_effect_clip(EffectKind::Fade, 3.0, 4.0, 50)
            .unwrap();

        // Removing the clip leaves the effect unplaced.
        timeline.remove_clip(kept_clip).unwrap();
        assert!(timeline.effect(kept).is_some());
        assert!(timeline.effect_clip(kept).is_none());

        timeline.remove_effect(gone).unwrap();
        assert!(timeline.clip(gone_clip).is_none());
        assert_eq!(
            timeline.remove_effect(gone).unwrap_err(),
            ModelError::UnknownEffect(gone)
        );
    }
}
