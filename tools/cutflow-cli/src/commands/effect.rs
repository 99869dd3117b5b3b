//! Add an effect.

use std::path::PathBuf;

use cutflow_project_model::EffectKind;
use cutflow_render_engine::effects::EXPORTABLE_EFFECTS;

use super::{load_project, save_project};

pub fn run(path: PathBuf, kind: EffectKind, start: f64, end: f64, intensity: u8) -> anyhow::Result<()> {
    let mut project = load_project(&path)?;
    let (effect, clip) = project
        .project
        .timeline
        .add_effect_clip(kind, start, end, intensity.min(100))?;
    save_project(&mut project)?;

    println!(
        "Added {effect} ({}) placed by {clip} [{start:.2}s, {end:.2}s]",
        kind.as_str()
    );
    if !EXPORTABLE_EFFECTS.contains(&kind) {
        println!("  Note: {} is preview-only and is not rendered on export.", kind.as_str());
    }
    Ok(())
}
