//! Resize one edge of a clip.

use std::path::PathBuf;

use cutflow_common::config::AppConfig;
use cutflow_edit_engine::{Edge, EditSession, HitTarget, SnapConfig};
use cutflow_project_model::ClipId;

use super::{load_project, save_project};

pub fn run(path: PathBuf, clip: u64, edge: Edge, time: f64, config: &AppConfig) -> anyhow::Result<()> {
    let mut project = load_project(&path)?;
    let timeline = &mut project.project.timeline;
    let mut session = EditSession::new(
        SnapConfig::from(&config.editing),
        config.editing.refresh_hz,
    );

    let target = match edge {
        Edge::Left => HitTarget::LeftEdge,
        Edge::Right => HitTarget::RightEdge,
    };
    let edit = session.commit(timeline, ClipId(clip), target, time)?;
    let duration = timeline.duration();
    save_project(&mut project)?;

    println!(
        "Resized {} ({edge:?} edge) to [{:.2}s, {:.2}s]",
        edit.clip, edit.start_time, edit.end_time
    );
    println!("  Timeline duration: {duration:.1}s");
    Ok(())
}
