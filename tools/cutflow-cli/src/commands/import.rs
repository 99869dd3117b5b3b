//! Ingest media files into a project.

use std::path::PathBuf;

use cutflow_common::config::AppConfig;
use cutflow_render_engine::probe::probe_media;

use super::{load_project, save_project};

pub fn run(path: PathBuf, files: Vec<PathBuf>, at: Option<f64>, config: &AppConfig) -> anyhow::Result<()> {
    let mut project = load_project(&path)?;
    let sources_dir = project.root.join("sources");
    std::fs::create_dir_all(&sources_dir)?;

    for file in &files {
        let probed = probe_media(file, &config.render)
            .map_err(|e| anyhow::anyhow!("Cannot import {}: {e}", file.display()))?;

        let file_name = file
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("Not a file: {}", file.display()))?;
        let stored = sources_dir.join(file_name);
        if stored != *file {
            std::fs::copy(file, &stored)?;
        }

        let reference = format!("sources/{}", file_name.to_string_lossy());
        let media = project
            .project
            .add_media(reference, probed.kind, probed.duration);
        let clip = project.project.timeline.place_media(&media, at)?;

        let placed = project
            .project
            .timeline
            .clip(clip)
            .ok_or_else(|| anyhow::anyhow!("Placed clip {clip} vanished"))?;
        println!(
            "  {} -> {} [{:.2}s, {:.2}s] on {}",
            file.display(),
            clip,
            placed.start_time,
            placed.end_time,
            placed.kind.as_str()
        );
        tracing::debug!(media = media.id.0, duration = media.duration, "Imported media");
    }

    save_project(&mut project)?;
    println!(
        "Imported {} file(s). Timeline duration: {:.1}s",
        files.len(),
        project.project.timeline.duration()
    );
    Ok(())
}
