//! Export a project to video.

use std::io::Write;
use std::path::PathBuf;

use cutflow_common::config::AppConfig;
use cutflow_common::error::ErrorPayload;
use cutflow_project_model::ExportOutcome;
use cutflow_render_engine::export::{export_timeline, ExportJob, ExportProgress, ExportStage};
use serde::Serialize;

/// Machine-readable export result.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum ExportReport {
    Success(ExportOutcome),
    Error(ErrorPayload),
}

pub async fn run(
    path: PathBuf,
    output: Option<PathBuf>,
    json: bool,
    config: &AppConfig,
) -> anyhow::Result<()> {
    if !json {
        println!("Exporting project at: {}", path.display());
    }

    let progress_cb: Box<dyn Fn(ExportProgress) + Send> = Box::new(move |p| {
        if json {
            return;
        }
        match p.stage {
            ExportStage::Rendering => {
                print!(
                    "\r  Progress: {:.1}% (ETA: {:.0}s)  ",
                    p.progress * 100.0,
                    p.eta_secs
                );
                std::io::stdout().flush().ok();
            }
            stage => tracing::debug!(?stage, "Export stage"),
        }
    });

    let result = match ExportJob::load(&path, config.render.clone()) {
        Ok(mut job) => {
            if let Some(output) = output {
                job = job.with_output(output);
            }
            if !json {
                println!("  Duration: {:.1}s", job.request.duration);
            }
            export_timeline(job, Some(progress_cb)).await
        }
        Err(e) => Err(e),
    };

    if json {
        let report = match &result {
            Ok(outcome) => ExportReport::Success(outcome.clone()),
            Err(e) => ExportReport::Error(e.payload()),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        match &result {
            Ok(outcome) => {
                println!("\nExport complete: {}", outcome.path.display());
                println!("  File: {} ({} bytes)", outcome.filename, outcome.size);
            }
            Err(e) => {
                println!("\nExport failed ({}): {e}", e.kind());
            }
        }
    }

    result.map(|_| ()).map_err(Into::into)
}
