//! Project bundle and export request types.
//!
//! A project is the top-level container that ties together ingested
//! media and the timeline. On disk it is a directory:
//!
//! ```text
//! <root>/
//!   sources/   ingested media
//!   exports/   rendered output
//!   meta/      project.json
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::effect::Effect;
use crate::media::{MediaId, MediaKind, MediaSource};
use crate::text::TextOverlay;
use crate::timeline::{Clip, Timeline};

/// Top-level project file (`meta/project.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Schema version.
    pub version: String,

    /// Human-readable project name.
    pub name: String,

    /// Unique project identifier (UUID).
    pub id: String,

    /// Creation timestamp (ISO 8601).
    pub created_at: String,

    /// Last modified timestamp (ISO 8601).
    pub modified_at: String,

    /// Ingested media library.
    #[serde(default)]
    pub media: Vec<MediaSource>,

    /// Editing timeline.
    #[serde(default)]
    pub timeline: Timeline,
}

/// Body of an export request: the edit plus the duration snapshot it must
/// render against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub clips: Vec<Clip>,
    #[serde(default)]
    pub texts: Vec<TextOverlay>,
    #[serde(default)]
    pub effects: Vec<Effect>,
    pub duration: f64,
}

/// Successful export response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOutcome {
    pub filename: String,
    pub path: PathBuf,
    pub size: u64,
}

impl Timeline {
    /// Snapshot the timeline as an export request, with effect windows
    /// synced from their clips and the current derived duration.
    pub fn to_export_request(&self) -> ExportRequest {
        let mut synced = self.clone();
        synced.sync_effect_windows();
        ExportRequest {
            clips: synced.clips().to_vec(),
            texts: synced.texts().to_vec(),
            effects: synced.effects().to_vec(),
            duration: self.duration(),
        }
    }

    pub fn from_export_request(request: ExportRequest) -> (Timeline, f64) {
        let duration = request.duration;
        (
            Timeline::from_parts(request.clips, request.texts, request.effects),
            duration,
        )
    }
}

/// The complete in-memory representation of a loaded project.
#[derive(Debug, Clone)]
pub struct LoadedProject {
    /// Filesystem path to the project directory.
    pub root: PathBuf,

    /// Project metadata, media, and timeline.
    pub project: Project,
}

impl Project {
    /// Create a new empty project.
    pub fn new(name: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            version: "1.0".to_string(),
            name: name.into(),
            id: project_id(),
            created_at: now.clone(),
            modified_at: now,
            media: Vec::new(),
            timeline: Timeline::new(),
        }
    }

    /// Register a media source and return it.
    pub fn add_media(&mut self, path: impl Into<String>, kind: MediaKind, probed: Option<f64>) -> MediaSource {
        let next = self.media.iter().map(|m| m.id.0).max().unwrap_or(0) + 1;
        let source = MediaSource::new(MediaId(next), path, kind, probed);
        self.media.push(source.clone());
        source
    }

    pub fn touch(&mut self) {
        self.modified_at = chrono::Utc::now().to_rfc3339();
    }
}

impl LoadedProject {
    /// Load a project from a directory.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let root = root.as_ref().to_path_buf();
        let project_path = root.join("meta").join("project.json");

        let project_json =
            std::fs::read_to_string(&project_path).map_err(|e| ProjectError::IoError {
                path: project_path.clone(),
                source: e,
            })?;

        let project: Project =
            serde_json::from_str(&project_json).map_err(|e| ProjectError::ParseError {
                path: project_path,
                source: e,
            })?;

        Ok(Self { root, project })
    }

    /// Save the project to disk.
    pub fn save(&self) -> Result<(), ProjectError> {
        let meta_dir = self.root.join("meta");
        std::fs::create_dir_all(&meta_dir).map_err(|e| ProjectError::IoError {
            path: meta_dir.clone(),
            source: e,
        })?;

        let project_path = meta_dir.join("project.json");
        let mut project = self.project.clone();
        project.timeline.sync_effect_windows();
        let project_json =
            serde_json::to_string_pretty(&project).map_err(|e| ProjectError::ParseError {
                path: project_path.clone(),
                source: e,
            })?;
        std::fs::write(&project_path, project_json).map_err(|e| ProjectError::IoError {
            path: project_path,
            source: e,
        })?;

        Ok(())
    }

    /// Create a new project on disk with the standard directory structure.
    pub fn create(root: impl AsRef<Path>, name: impl Into<String>) -> Result<Self, ProjectError> {
        let root = root.as_ref().to_path_buf();

        for subdir in &["sources", "meta", "exports"] {
            std::fs::create_dir_all(root.join(subdir)).map_err(|e| ProjectError::IoError {
                path: root.join(subdir),
                source: e,
            })?;
        }

        let loaded = Self {
            root,
            project: Project::new(name),
        };
        loaded.save()?;
        Ok(loaded)
    }

    /// Resolve a clip source reference against the project root.
    ///
    /// Absolute paths are kept; relative ones (with or without a leading
    /// `/uploads/`-style slash) are joined to the root.
    pub fn source_path(&self, source: &str) -> PathBuf {
        let path = Path::new(source);
        if path.is_absolute() && path.exists() {
            return path.to_path_buf();
        }
        self.root.join(source.trim_start_matches('/'))
    }

    /// Directory rendered files go to.
    pub fn exports_dir(&self) -> PathBuf {
        self.root.join("exports")
    }

    /// Validate that all referenced source files exist.
    pub fn validate_sources(&self) -> Vec<String> {
        let mut errors = vec![];

        for clip in self.project.timeline.clips() {
            if let Some(source) = &clip.source {
                if !self.source_path(source).exists() {
                    errors.push(format!(
                        "{} source missing for {}: {source}",
                        clip.kind.as_str(),
                        clip.id
                    ));
                }
            }
        }

        for media in &self.project.media {
            if !self.source_path(&media.path).exists() {
                errors.push(format!("Media library entry missing: {}", media.path));
            }
        }

        errors
    }
}

/// Errors that can occur when working with projects.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid project: {message}")]
    ValidationError { message: String },
}

/// Project ids created by this process so far.
static PROJECT_SEQ: AtomicU64 = AtomicU64::new(0);

/// SplitMix64 finalizer.
fn mix(mut x: u64) -> u64 {
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

/// A random-looking, UUID-shaped (version 4) project id.
///
/// Seeded from the wall clock, the process id and a per-process sequence,
/// so two bundles created in the same nanosecond still get distinct ids.
fn project_id() -> String {
    let nanos = chrono::Utc::now()
        .timestamp_nanos_opt()
        .map(|n| n as u64)
        .unwrap_or_default();
    let seq = PROJECT_SEQ.fetch_add(1, Ordering::Relaxed);
    let hi = mix(nanos ^ u64::from(std::process::id()).rotate_left(32));
    let lo = mix(hi ^ seq.wrapping_add(0x9e37_79b9_7f4a_7c15));

    format!(
        "{:08x}-{:04x}-4{:03x}-{:04x}-{:012x}",
        hi >> 32,
        (hi >> 16) & 0xffff,
        hi & 0x0fff,
        ((lo >> 48) & 0x3fff) | 0x8000,
        lo & 0xffff_ffff_ffff,
    )
}
