//! Validate a CutFlow project bundle.

use std::path::PathBuf;

use super::load_project;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating project at: {}", path.display());

    let project = load_project(&path)?;
    let timeline = &project.project.timeline;

    println!("  Name: {}", project.project.name);
    println!("  Version: {}", project.project.version);
    println!("  Clips: {}", timeline.clips().len());
    println!("  Duration: {:.1}s", timeline.duration());

    let issues = timeline.validate();
    let missing = project.validate_sources();
    let blocking = issues.iter().filter(|i| i.is_blocking()).count() + missing.len();

    if issues.is_empty() && missing.is_empty() {
        println!("  Sources: All present");
        println!("\nProject is valid.");
        return Ok(());
    }

    println!("\nValidation issues:");
    for issue in &issues {
        let tag = if issue.is_blocking() { "error" } else { "note" };
        println!("  - [{tag}] {issue}");
    }
    for error in &missing {
        println!("  - [error] {error}");
    }

    if blocking > 0 {
        println!("\n{blocking} blocking issue(s) found. Export will fail.");
    } else {
        println!("\nNo blocking issues.");
    }

    Ok(())
}
