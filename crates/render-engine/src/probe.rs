//! Media probing through ffprobe.

use std::path::Path;
use std::process::Command;

use cutflow_common::config::RenderDefaults;
use cutflow_common::error::{CutflowError, CutflowResult};
use cutflow_project_model::MediaKind;

/// Classification and probed duration of a file about to be ingested.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbedMedia {
    pub kind: MediaKind,
    /// Raw container duration, if probing succeeded.
    pub duration: Option<f64>,
}

/// Classify `path` by extension and probe its duration when the kind is
/// time-based. Probe failures are not errors; the caller falls back to
/// the kind's default duration.
pub fn probe_media(path: &Path, render: &RenderDefaults) -> CutflowResult<ProbedMedia> {
    if !path.exists() {
        return Err(CutflowError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let kind = MediaKind::from_path(path).ok_or_else(|| {
        CutflowError::unsupported(format!("Unsupported media type: {}", path.display()))
    })?;

    let duration = if kind.is_probed() {
        probe_duration(path, &render.ffprobe_binary)
    } else {
        None
    };
    if kind.is_probed() && duration.is_none() {
        tracing::warn!(path = %path.display(), "Duration probe failed, using default");
    }

    Ok(ProbedMedia { kind, duration })
}

/// Container duration in seconds.
pub fn probe_duration(path: &Path, ffprobe: &str) -> Option<f64> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let raw = String::from_utf8(output.stdout).ok()?;
    parse_duration(&raw)
}

fn parse_duration(raw: &str) -> Option<f64> {
    let secs = raw.lines().next()?.trim().parse::<f64>().ok()?;
    (secs.is_finite() && secs > 0.0).then_some(secs)
}

/// Whether `binary` can be found on `PATH`, or is an executable path.
///
/// The name is passed to the shell as a positional argument, never spliced
/// into the script.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .args(["-c", "command -v \"$1\" >/dev/null 2>&1", "sh", binary])
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
