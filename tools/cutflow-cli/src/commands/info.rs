//! Show project information.

use std::path::PathBuf;

use cutflow_project_model::{EffectKind, TrackKind};
use cutflow_render_engine::effects::preview_blur_px;
use cutflow_render_engine::EffectSelection;

use super::load_project;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let project = load_project(&path)?;
    let p = &project.project;
    let timeline = &p.timeline;

    println!("Project: {}", p.name);
    println!("  ID: {}", p.id);
    println!("  Created: {}", p.created_at);
    println!("  Modified: {}", p.modified_at);
    println!();

    println!("Media:");
    for media in &p.media {
        println!(
            "  #{} {:?} {} ({:.0}s)",
            media.id.0, media.kind, media.path, media.duration
        );
    }
    println!();

    println!("Timeline ({:.1}s):", timeline.duration());
    for kind in TrackKind::ALL {
        let clips = timeline.clips_on_track(kind);
        if clips.is_empty() {
            continue;
        }
        println!("  {}:", kind.as_str());
        for clip in clips {
            let label = clip
                .source
                .clone()
                .or_else(|| {
                    clip.text_ref
                        .and_then(|id| timeline.text(id))
                        .map(|t| format!("\"{}\"", t.content))
                })
                .or_else(|| {
                    clip.effect_ref
                        .and_then(|id| timeline.effect(id))
                        .map(|e| e.kind.as_str().to_string())
                })
                .unwrap_or_default();
            println!(
                "    {} [{:.2}s, {:.2}s] {}",
                clip.id, clip.start_time, clip.end_time, label
            );
        }
    }
    println!();

    if !timeline.effects().is_empty() {
        println!("Effects:");
        for effect in timeline.effects() {
            let detail = match effect.kind {
                EffectKind::Soften => format!(
                    " (preview blur {:.0}px)",
                    preview_blur_px(effect.normalized_intensity())
                ),
                _ => String::new(),
            };
            println!(
                "  {} {} intensity {}{}",
                effect.id,
                effect.kind.as_str(),
                effect.intensity,
                detail
            );
        }
        let rendered = EffectSelection::default().select(timeline);
        match rendered.first() {
            Some(selected) => println!(
                "  Export renders {} ({}) only",
                selected.id,
                selected.kind.as_str()
            ),
            None => println!("  Export renders no effect"),
        }
    }

    Ok(())
}
