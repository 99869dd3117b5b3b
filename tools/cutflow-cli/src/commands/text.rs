//! Add a text overlay.

use std::path::PathBuf;

use cutflow_project_model::TextOverlay;

use super::{load_project, save_project};

pub fn run(path: PathBuf, overlay: TextOverlay, start: f64, end: f64) -> anyhow::Result<()> {
    let mut project = load_project(&path)?;
    let (text, clip) = project
        .project
        .timeline
        .add_text_clip(overlay, start, end)?;
    save_project(&mut project)?;

    println!("Added {text} shown by {clip} [{start:.2}s, {end:.2}s]");
    Ok(())
}
