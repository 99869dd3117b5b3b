//! Ingested media sources.
//!
//! Ingestion itself (uploads, probing) lives outside the model; this
//! module fixes the shape of what ingestion hands over.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::timeline::TrackKind;

/// Identifier of an ingested media source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(pub u64);

/// Kind of an ingested media source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
    Image,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif", "webp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "aac", "ogg"];

impl MediaKind {
    /// Classify by file extension (case-insensitive, without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Video)
        } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Audio)
        } else {
            None
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Duration assumed when probing is unavailable or fails.
    pub fn default_duration(self) -> f64 {
        match self {
            Self::Image => 5.0,
            Self::Video | Self::Audio => 30.0,
        }
    }

    /// Whether the probe should be consulted for this kind at all.
    pub fn is_probed(self) -> bool {
        !matches!(self, Self::Image)
    }

    pub fn track_kind(self) -> TrackKind {
        match self {
            Self::Video => TrackKind::Video,
            Self::Audio => TrackKind::Audio,
            Self::Image => TrackKind::Image,
        }
    }
}

/// A source accepted by ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaSource {
    pub id: MediaId,

    /// Path used as the clip source reference.
    pub path: String,

    #[serde(rename = "type")]
    pub kind: MediaKind,

    /// Duration in whole seconds.
    pub duration: f64,
}

impl MediaSource {
    /// Build a source from an optional probed duration.
    ///
    /// Probed values are floored to whole seconds; a missing, zero, or
    /// non-finite probe falls back to the kind's default. Images never use
    /// the probe.
    pub fn new(id: MediaId, path: impl Into<String>, kind: MediaKind, probed: Option<f64>) -> Self {
        let duration = match probed {
            Some(secs) if kind.is_probed() && secs.is_finite() && secs.floor() > 0.0 => {
                secs.floor()
            }
            _ => kind.default_duration(),
        };
        Self {
            id,
            path: path.into(),
            kind,
            duration,
        }
    }
}
