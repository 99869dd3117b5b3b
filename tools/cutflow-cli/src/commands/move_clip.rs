//! Move a clip with snapping.

use std::path::PathBuf;

use cutflow_common::config::AppConfig;
use cutflow_edit_engine::{EditSession, HitTarget, SnapConfig};
use cutflow_project_model::ClipId;

use super::{load_project, save_project};

pub fn run(path: PathBuf, clip: u64, start: f64, config: &AppConfig) -> anyhow::Result<()> {
    let mut project = load_project(&path)?;
    let timeline = &mut project.project.timeline;
    let mut session = EditSession::new(
        SnapConfig::from(&config.editing),
        config.editing.refresh_hz,
    );

    let edit = session.commit(timeline, ClipId(clip), HitTarget::Body, start)?;
    let duration = timeline.duration();
    save_project(&mut project)?;

    println!(
        "Moved {} to [{:.2}s, {:.2}s]",
        edit.clip, edit.start_time, edit.end_time
    );
    if edit.start_time != start {
        println!("  Requested start {start:.2}s was snapped or clamped");
    }
    println!("  Timeline duration: {duration:.1}s");
    Ok(())
}
