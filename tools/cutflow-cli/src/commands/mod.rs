//! CLI command implementations.

pub mod check;
pub mod config;
pub mod effect;
pub mod export;
pub mod import;
pub mod info;
pub mod init;
pub mod move_clip;
pub mod plan;
pub mod resize;
pub mod text;
pub mod validate;

use std::path::Path;

use cutflow_project_model::LoadedProject;

pub(crate) fn load_project(path: &Path) -> anyhow::Result<LoadedProject> {
    LoadedProject::load(path).map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))
}

pub(crate) fn save_project(project: &mut LoadedProject) -> anyhow::Result<()> {
    project.project.touch();
    project
        .save()
        .map_err(|e| anyhow::anyhow!("Failed to save project: {e}"))
}
