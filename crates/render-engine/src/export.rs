//! Export jobs and the ffmpeg process runner.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};

use cutflow_common::config::RenderDefaults;
use cutflow_common::error::{CutflowError, CutflowResult};
use cutflow_project_model::{ExportOutcome, ExportRequest, LoadedProject, Timeline};

use crate::compiler::{compile, CompileOptions, ResolvedSources};
use crate::plan::{InvocationPlan, SideFile};
use crate::probe::command_exists;

/// Markers that identify useful lines in the renderer's diagnostics.
const ERROR_MARKERS: [&str; 4] = ["error", "invalid", "no such file", "failed"];

/// Stderr lines kept when no marker line is found.
const FALLBACK_STDERR_LINES: usize = 5;

static WORK_DIR_SEQ: AtomicU64 = AtomicU64::new(0);

/// An export request bound to the project it renders from.
#[derive(Debug, Clone)]
pub struct ExportJob {
    /// Project the clip sources are resolved against.
    pub project: LoadedProject,

    /// Edit and the duration snapshot to render.
    pub request: ExportRequest,

    /// Output file path. Defaults to `exports/output-<unix millis>.mp4`.
    pub output_path: Option<PathBuf>,

    pub render: RenderDefaults,
}

impl ExportJob {
    /// Export the project's current timeline.
    pub fn for_project(project: LoadedProject, render: RenderDefaults) -> Self {
        let request = project.project.timeline.to_export_request();
        Self {
            project,
            request,
            output_path: None,
            render,
        }
    }

    /// Load the project bundle at `root` and export its current timeline.
    pub fn load(root: impl AsRef<Path>, render: RenderDefaults) -> CutflowResult<Self> {
        let project = LoadedProject::load(root).map_err(|e| CutflowError::model(e.to_string()))?;
        Ok(Self::for_project(project, render))
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }
}

/// Progress callback for export rendering.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send>;

/// Export progress report.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    pub stage: ExportStage,
}

impl ExportProgress {
    fn at(stage: ExportStage, progress: f64) -> Self {
        Self {
            progress,
            eta_secs: 0.0,
            stage,
        }
    }
}

/// Stages of the export process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Preparing,
    Rendering,
    Finalizing,
    Complete,
    Failed,
}

/// Something that can execute an invocation plan.
pub trait RenderBackend: Send {
    /// Run the plan to completion. Side files already exist.
    fn render(&mut self, plan: &InvocationPlan, progress: Option<&ProgressCallback>) -> CutflowResult<()>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Per-export scratch directory. Removed when dropped, on every path.
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
}

impl WorkDir {
    pub fn create(base: &Path) -> CutflowResult<Self> {
        let path = base.join(format!(
            "cutflow-export-{}-{}-{}",
            std::process::id(),
            chrono::Utc::now().timestamp_millis(),
            WORK_DIR_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_side_files(&self, files: &[SideFile]) -> CutflowResult<()> {
        for file in files {
            if !file.path.starts_with(&self.path) {
                return Err(CutflowError::compilation(format!(
                    "side file {} is outside the work directory",
                    file.path.display()
                )));
            }
            std::fs::write(&file.path, &file.contents)?;
        }
        Ok(())
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_dir_all(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    error = %err,
                    path = %self.path.display(),
                    "Failed to remove export work directory"
                );
            }
        }
    }
}

/// A compiled export whose sources all resolved.
#[derive(Debug)]
pub struct PreparedExport {
    pub plan: InvocationPlan,
    pub work_dir: WorkDir,
}

/// Validate and compile an export job. Fails before any process is
/// started when there is nothing to render or a source is missing.
pub fn prepare_export(job: &ExportJob) -> CutflowResult<PreparedExport> {
    let (timeline, duration) = Timeline::from_export_request(job.request.clone());
    let sources = ResolvedSources::resolve(&timeline, &job.project)?;

    let destination = match &job.output_path {
        Some(path) => path.clone(),
        None => job.project.exports_dir().join(format!(
            "output-{}.mp4",
            chrono::Utc::now().timestamp_millis()
        )),
    };

    let work_dir = WorkDir::create(&std::env::temp_dir())?;
    let options = CompileOptions::new(&job.render, work_dir.path(), destination);
    let plan = compile(&timeline, duration, &sources, &options)?;

    Ok(PreparedExport { plan, work_dir })
}

/// Render an export job with the ffmpeg backend.
pub async fn export_timeline(
    job: ExportJob,
    progress: Option<ProgressCallback>,
) -> CutflowResult<ExportOutcome> {
    let backend = FfmpegBackend::new(&job.render);
    export_with_backend(Box::new(backend), job, progress).await
}

/// Render an export job with the given backend.
///
/// There is no timeout on the external process and no lock on the output
/// path; concurrent exports to the same destination race.
pub async fn export_with_backend(
    mut backend: Box<dyn RenderBackend>,
    job: ExportJob,
    progress: Option<ProgressCallback>,
) -> CutflowResult<ExportOutcome> {
    tracing::info!(
        project = %job.project.root.display(),
        clips = job.request.clips.len(),
        duration = job.request.duration,
        "Starting export"
    );

    if let Some(cb) = &progress {
        cb(ExportProgress::at(ExportStage::Preparing, 0.0));
    }

    let prepared = prepare_export(&job)?;
    if !backend.is_available() {
        return Err(CutflowError::unsupported(format!(
            "Render backend {} is not available",
            backend.name()
        )));
    }
    tracing::info!(backend = backend.name(), "Using render backend");

    if let Some(parent) = prepared.plan.destination.parent() {
        std::fs::create_dir_all(parent)?;
    }
    prepared.work_dir.write_side_files(&prepared.plan.side_files)?;

    let PreparedExport { plan, work_dir } = prepared;
    let destination = plan.destination.clone();
    let result = tokio::task::spawn_blocking(move || {
        let result = backend.render(&plan, progress.as_ref());
        if let (Err(_), Some(cb)) = (&result, &progress) {
            cb(ExportProgress::at(ExportStage::Failed, 0.0));
        }
        result
    })
    .await
    .map_err(|e| anyhow::anyhow!("Export task panicked or was cancelled: {e}"))?;
    drop(work_dir);
    result?;

    let outcome = collect_outcome(&destination)?;
    tracing::info!(
        output = %outcome.path.display(),
        size = outcome.size,
        "Export finished"
    );
    Ok(outcome)
}

/// Build the success response, or report that the renderer produced
/// nothing.
fn collect_outcome(destination: &Path) -> CutflowResult<ExportOutcome> {
    let size = match std::fs::metadata(destination) {
        Ok(meta) if meta.is_file() => meta.len(),
        _ => {
            return Err(CutflowError::OutputMissing {
                path: destination.to_path_buf(),
            })
        }
    };
    let filename = destination
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(ExportOutcome {
        filename,
        path: destination.to_path_buf(),
        size,
    })
}

/// Runs plans through an ffmpeg executable.
pub struct FfmpegBackend {
    binary: String,
}

impl FfmpegBackend {
    pub fn new(render: &RenderDefaults) -> Self {
        Self {
            binary: render.ffmpeg_binary.clone(),
        }
    }

    fn run_ffmpeg(&self, plan: &InvocationPlan, progress: Option<&ProgressCallback>) -> CutflowResult<()> {
        let args = plan.to_args();
        tracing::debug!(args = ?args, "Running ffmpeg");
        let mut cmd = Command::new(&self.binary);
        cmd.args(&args).stdout(Stdio::piped()).stderr(Stdio::piped());

        let start = std::time::Instant::now();
        let mut child = cmd.spawn().map_err(|e| {
            CutflowError::external_tool("not started", format!("Failed to start {}: {e}", self.binary))
        })?;

        tracing::info!(
            pid = child.id(),
            inputs = plan.inputs.len(),
            duration = plan.duration,
            "ffmpeg process started"
        );

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow::anyhow!("Failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow::anyhow!("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently so a full pipe cannot block ffmpeg.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let mut reader = BufReader::new(stdout);
        let mut line = String::new();
        let mut latest = ProgressState::default();
        let mut last_progress_secs = 0.0f64;
        let mut last_progress_wall = std::time::Instant::now();
        loop {
            line.clear();
            let bytes = reader.read_line(&mut line)?;
            if bytes == 0 {
                break;
            }

            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            latest.update(key, value);
            if key != "progress" {
                continue;
            }

            if latest.out_time_secs > last_progress_secs + 0.001 {
                last_progress_secs = latest.out_time_secs;
                last_progress_wall = std::time::Instant::now();
            }
            if let Some(cb) = progress {
                cb(progress_report(&latest, plan.duration, start.elapsed().as_secs_f64()));
            }
            if last_progress_wall.elapsed().as_secs() >= 10 {
                tracing::warn!(
                    out_time_secs = latest.out_time_secs,
                    elapsed_secs = start.elapsed().as_secs_f64(),
                    "No ffmpeg progress advancement for 10s"
                );
                last_progress_wall = std::time::Instant::now();
            }
        }

        let status = child.wait()?;
        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            let message = extract_tool_error(&stderr_output);
            tracing::error!(%status, message = %message, "ffmpeg export failed");
            return Err(CutflowError::external_tool(status.to_string(), message));
        }

        if let Some(cb) = progress {
            cb(ExportProgress::at(ExportStage::Complete, 1.0));
        }
        tracing::info!(
            elapsed_secs = start.elapsed().as_secs_f64(),
            "ffmpeg process finished"
        );
        Ok(())
    }
}

impl RenderBackend for FfmpegBackend {
    fn render(&mut self, plan: &InvocationPlan, progress: Option<&ProgressCallback>) -> CutflowResult<()> {
        if let Some(cb) = progress {
            cb(ExportProgress::at(ExportStage::Rendering, 0.0));
        }
        self.run_ffmpeg(plan, progress)
    }

    fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Best-effort failure message from the renderer's stderr: the lines with
/// a recognizable error marker, else the last few lines.
pub fn extract_tool_error(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let marked: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|l| {
            let lower = l.to_ascii_lowercase();
            ERROR_MARKERS.iter().any(|m| lower.contains(m))
        })
        .collect();

    if !marked.is_empty() {
        return marked.join("\n");
    }
    if lines.is_empty() {
        return "renderer exited without diagnostics".to_string();
    }
    lines[lines.len().saturating_sub(FALLBACK_STDERR_LINES)..].join("\n")
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg reports microseconds under both names.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}

fn progress_report(state: &ProgressState, expected_duration_secs: f64, elapsed_secs: f64) -> ExportProgress {
    let progress = if expected_duration_secs <= 0.0 {
        0.0
    } else {
        (state.out_time_secs / expected_duration_secs).clamp(0.0, 1.0)
    };

    let eta_secs = if progress > 0.0 {
        (elapsed_secs / progress) - elapsed_secs
    } else {
        0.0
    }
    .max(0.0);

    ExportProgress {
        progress: if state.complete { 1.0 } else { progress },
        eta_secs,
        stage: if state.complete {
            ExportStage::Finalizing
        } else {
            ExportStage::Rendering
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutflow_project_model::{NewClip, TextOverlay, TrackKind};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_extract_tool_error_prefers_marked_lines() {
        let stderr = "\
            Input #0, mov,mp4\n\
            [AVFilterGraph @ 0x1] No such filter: 'bogus'\n\
            Error initializing complex filters.\n\
            Invalid argument\n";
        assert_eq!(
            extract_tool_error(stderr),
            "Error initializing complex filters.\nInvalid argument"
        );
    }

    #[test]
    fn test_extract_tool_error_falls_back_to_tail() {
        let stderr = (1..=8).map(|i| format!("line {i}\n")).collect::<String>();
        assert_eq!(
            extract_tool_error(&stderr),
            "line 4\nline 5\nline 6\nline 7\nline 8"
        );
        assert_eq!(extract_tool_error(""), "renderer exited without diagnostics");
    }

    #[test]
    fn test_extract_tool_error_is_case_insensitive() {
        assert_eq!(
            extract_tool_error("a.mp4: NO SUCH FILE or directory\nok\n"),
            "a.mp4: NO SUCH FILE or directory"
        );
    }

    #[test]
    fn test_progress_report_uses_duration_snapshot() {
        let mut state = ProgressState::default();
        state.update("out_time_us", "3000000");
        let report = progress_report(&state, 12.0, 1.0);
        assert!((report.progress - 0.25).abs() < 1e-9);
        assert!((report.eta_secs - 3.0).abs() < 1e-9);
        assert_eq!(report.stage, ExportStage::Rendering);

        state.update("progress", "end");
        let report = progress_report(&state, 12.0, 4.0);
        assert_eq!(report.progress, 1.0);
        assert_eq!(report.stage, ExportStage::Finalizing);
    }

    #[test]
    fn test_work_dir_is_removed_on_drop() {
        let work_dir = WorkDir::create(&std::env::temp_dir()).unwrap();
        let path = work_dir.path().to_path_buf();
        work_dir
            .write_side_files(&[SideFile {
                path: path.join("text-0.txt"),
                contents: "Title".to_string(),
            }])
            .unwrap();
        assert!(path.join("text-0.txt").exists());
        drop(work_dir);
        assert!(!path.exists());
    }

    #[test]
    fn test_side_files_outside_work_dir_are_rejected() {
        let work_dir = WorkDir::create(&std::env::temp_dir()).unwrap();
        let err = work_dir
            .write_side_files(&[SideFile {
                path: PathBuf::from("/tmp/elsewhere.txt"),
                contents: String::new(),
            }])
            .unwrap_err();
        assert_eq!(err.kind(), "compilation_error");
    }

    #[test]
    fn test_collect_outcome_reports_missing_output() {
        let missing = std::env::temp_dir().join("cutflow_never_rendered.mp4");
        let err = collect_outcome(&missing).unwrap_err();
        assert!(matches!(err, CutflowError::OutputMissing { .. }));
        assert!(!err.is_synchronous());
    }

    /// Pretends to render by writing (or not writing) the destination.
    struct FakeBackend {
        write_output: bool,
        fail: bool,
        seen_side_files: Arc<Mutex<Vec<bool>>>,
    }

    impl RenderBackend for FakeBackend {
        fn render(&mut self, plan: &InvocationPlan, _progress: Option<&ProgressCallback>) -> CutflowResult<()> {
            let present = plan.side_files.iter().map(|f| f.path.exists()).collect();
            *self.seen_side_files.lock().unwrap() = present;
            if self.fail {
                return Err(CutflowError::external_tool("exit status: 1", "Invalid argument"));
            }
            if self.write_output {
                std::fs::write(&plan.destination, b"mp4")?;
            }
            Ok(())
        }

        fn is_available(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    fn project_with_clip(dir_name: &str) -> LoadedProject {
        let dir = std::env::temp_dir().join(dir_name);
        let _ = std::fs::remove_dir_all(&dir);
        let mut project = LoadedProject::create(&dir, "Export").unwrap();
        std::fs::write(dir.join("sources/a.mp4"), b"video").unwrap();
        project
            .project
            .timeline
            .add_clip(NewClip::media(TrackKind::Video, "sources/a.mp4", 0.0, 5.0))
            .unwrap();
        project
            .project
            .timeline
            .add_text_clip(TextOverlay::new("Hi"), 0.0, 1.0)
            .unwrap();
        project
    }

    fn run_fake(job: ExportJob, write_output: bool, fail: bool) -> (CutflowResult<ExportOutcome>, Vec<bool>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let backend = FakeBackend {
            write_output,
            fail,
            seen_side_files: seen.clone(),
        };
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let result = runtime.block_on(export_with_backend(Box::new(backend), job, None));
        let seen = seen.lock().unwrap().clone();
        (result, seen)
    }

    #[test]
    fn test_export_with_backend_reports_outcome() {
        let project = project_with_clip("cutflow_test_export_ok");
        let root = project.root.clone();
        let job = ExportJob::for_project(project, RenderDefaults::default());

        let (result, seen) = run_fake(job, true, false);
        let outcome = result.unwrap();
        assert!(outcome.filename.starts_with("output-"));
        assert!(outcome.path.starts_with(root.join("exports")));
        assert_eq!(outcome.size, 3);
        assert_eq!(seen, vec![true]);

        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_export_with_backend_reports_missing_output() {
        let project = project_with_clip("cutflow_test_export_missing");
        let root = project.root.clone();
        let job = ExportJob::for_project(project, RenderDefaults::default());

        let (result, _) = run_fake(job, false, false);
        assert!(matches!(result, Err(CutflowError::OutputMissing { .. })));

        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_export_failure_surfaces_external_tool_error() {
        let project = project_with_clip("cutflow_test_export_fail");
        let root = project.root.clone();
        let job = ExportJob::for_project(project, RenderDefaults::default());

        let (result, _) = run_fake(job, false, true);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), "external_tool_error");

        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_missing_source_fails_before_backend_runs() {
        let project = project_with_clip("cutflow_test_export_unresolved");
        let root = project.root.clone();
        std::fs::remove_file(root.join("sources/a.mp4")).unwrap();
        let job = ExportJob::for_project(project, RenderDefaults::default());

        let (result, seen) = run_fake(job, true, false);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), "validation_error");
        assert!(err.is_synchronous());
        assert!(seen.is_empty());

        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_unreadable_project_is_a_model_error() {
        let err = ExportJob::load("/definitely/not/a/project", RenderDefaults::default()).unwrap_err();
        assert_eq!(err.kind(), "model_error");
        assert!(err.to_string().contains("project.json"));
    }
}
