//! Print the render invocation without running it.

use std::path::PathBuf;

use cutflow_common::config::AppConfig;
use cutflow_render_engine::export::{prepare_export, ExportJob};

pub fn run(path: PathBuf, output: Option<PathBuf>, config: &AppConfig) -> anyhow::Result<()> {
    let mut job = ExportJob::load(&path, config.render.clone())?;
    if let Some(output) = output {
        job = job.with_output(output);
    }

    let prepared = prepare_export(&job)?;
    let plan = &prepared.plan;

    println!("Inputs:");
    for (index, input) in plan.inputs.iter().enumerate() {
        println!("  {index}: {}", input.display());
    }
    println!(
        "Graph: {} chain(s), {} concat, {} mix, {} overlay",
        plan.graph.chains().len(),
        plan.concat_nodes(),
        plan.mix_nodes(),
        plan.overlay_nodes()
    );
    for file in &plan.side_files {
        println!("Side file {}: {:?}", file.path.display(), file.contents);
    }
    println!();
    println!("{}", plan.command_line(&config.render.ffmpeg_binary));

    Ok(())
}
