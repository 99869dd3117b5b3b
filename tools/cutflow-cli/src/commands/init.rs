//! Initialize a new CutFlow project.

use std::path::PathBuf;

use cutflow_project_model::LoadedProject;

pub fn run(name: String, output: PathBuf) -> anyhow::Result<()> {
    let project_dir = output.join(&name);
    println!("Creating project '{}' at {}", name, project_dir.display());

    let project = LoadedProject::create(&project_dir, &name)
        .map_err(|e| anyhow::anyhow!("Failed to create project: {e}"))?;

    println!("Project created successfully:");
    println!("  Directory: {}", project.root.display());
    println!("  ID: {}", project.project.id);
    println!();
    println!("Directory structure:");
    println!("  {}/", name);
    println!("  ├── sources/     (ingested media)");
    println!("  ├── meta/        (project.json)");
    println!("  └── exports/     (rendered output)");

    Ok(())
}
