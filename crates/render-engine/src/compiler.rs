//! Timeline to invocation plan compiler.
//!
//! `compile` is pure: it reads the timeline, a duration snapshot and a map
//! of already-resolved source paths, and returns a plan. Nothing touches
//! the filesystem here; side files are described, not written.
//!
//! ```text
//! visual clips ─ normalize ─┬─ concat (n>1) ─ drawtext × texts ─ effect ─▶ video out
//!                           └─ (n=1: passthrough)
//! audio clips ── trim ──────┬─ amix (n>1, longest) ───────────────────────▶ audio out
//!                           └─ (n=1: passthrough)
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use cutflow_common::config::RenderDefaults;
use cutflow_common::error::{CutflowError, CutflowResult};
use cutflow_project_model::{Clip, LoadedProject, TextAlign, TextOverlay, Timeline, TrackKind};

use crate::effects::{effect_filters, EffectSelection};
use crate::graph::{num, ChainRole, Filter, FilterChain, FilterGraph, Label, PadRef};
use crate::plan::{EncodeSettings, InvocationPlan, SideFile};

/// Maps a clip source reference to a file the renderer can open.
pub trait SourceResolver {
    fn resolve(&self, source: &str) -> Option<PathBuf>;
}

impl SourceResolver for LoadedProject {
    fn resolve(&self, source: &str) -> Option<PathBuf> {
        let path = self.source_path(source);
        path.exists().then_some(path)
    }
}

impl SourceResolver for HashMap<String, PathBuf> {
    fn resolve(&self, source: &str) -> Option<PathBuf> {
        self.get(source).cloned()
    }
}

/// Source references of a timeline, resolved ahead of compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSources {
    paths: HashMap<String, PathBuf>,
}

impl ResolvedSources {
    /// Resolve every source a compile would read. The first reference that
    /// cannot be resolved aborts with a validation error.
    pub fn resolve(timeline: &Timeline, resolver: &impl SourceResolver) -> CutflowResult<Self> {
        let mut paths = HashMap::new();
        for clip in compiled_clips(timeline) {
            let Some(source) = clip.source.as_deref() else {
                continue;
            };
            if paths.contains_key(source) {
                continue;
            }
            let path = resolver.resolve(source).ok_or_else(|| {
                CutflowError::validation(format!(
                    "Source for {} clip {} cannot be resolved: {source}",
                    clip.kind.as_str(),
                    clip.id
                ))
            })?;
            paths.insert(source.to_string(), path);
        }
        Ok(Self { paths })
    }

    pub fn insert(&mut self, source: impl Into<String>, path: impl Into<PathBuf>) {
        self.paths.insert(source.into(), path.into());
    }

    pub fn get(&self, source: &str) -> Option<&Path> {
        self.paths.get(source).map(PathBuf::as_path)
    }
}

impl<S: Into<String>, P: Into<PathBuf>> FromIterator<(S, P)> for ResolvedSources {
    fn from_iter<I: IntoIterator<Item = (S, P)>>(iter: I) -> Self {
        Self {
            paths: iter
                .into_iter()
                .map(|(s, p)| (s.into(), p.into()))
                .collect(),
        }
    }
}

/// Everything a compile needs besides the timeline itself.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub encode: EncodeSettings,
    pub effects: EffectSelection,
    /// Directory side files are placed in.
    pub work_dir: PathBuf,
    pub destination: PathBuf,
}

impl CompileOptions {
    pub fn new(render: &RenderDefaults, work_dir: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            canvas_width: render.canvas_width,
            canvas_height: render.canvas_height,
            encode: EncodeSettings::from(render),
            effects: EffectSelection::default(),
            work_dir: work_dir.into(),
            destination: destination.into(),
        }
    }
}

/// Visual and audio clips that carry a source, each sorted by start time.
fn partition(timeline: &Timeline) -> (Vec<&Clip>, Vec<&Clip>) {
    let with_source = |clip: &&Clip| clip.source.as_deref().is_some_and(|s| !s.is_empty());

    let mut visual: Vec<&Clip> = timeline
        .clips()
        .iter()
        .filter(|c| c.kind.is_visual())
        .filter(with_source)
        .collect();
    visual.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    let audio: Vec<&Clip> = timeline
        .clips_on_track(TrackKind::Audio)
        .into_iter()
        .filter(with_source)
        .collect();

    (visual, audio)
}

fn compiled_clips(timeline: &Timeline) -> impl Iterator<Item = &Clip> {
    let (visual, audio) = partition(timeline);
    visual.into_iter().chain(audio)
}

/// Input list deduplicated by resolved path, in first-use order.
#[derive(Default)]
struct InputTable {
    paths: Vec<PathBuf>,
}

impl InputTable {
    fn index_of(&mut self, path: &Path) -> usize {
        if let Some(i) = self.paths.iter().position(|p| p == path) {
            return i;
        }
        self.paths.push(path.to_path_buf());
        self.paths.len() - 1
    }
}

/// Compile `timeline` against the `duration` snapshot.
pub fn compile(
    timeline: &Timeline,
    duration: f64,
    sources: &ResolvedSources,
    options: &CompileOptions,
) -> CutflowResult<InvocationPlan> {
    GraphCompiler::new(options).compile(timeline, duration, sources)
}

/// Stateful builder behind [`compile`].
pub struct GraphCompiler<'a> {
    options: &'a CompileOptions,
    graph: FilterGraph,
    inputs: InputTable,
    side_files: Vec<SideFile>,
}

impl<'a> GraphCompiler<'a> {
    pub fn new(options: &'a CompileOptions) -> Self {
        Self {
            options,
            graph: FilterGraph::new(),
            inputs: InputTable::default(),
            side_files: Vec::new(),
        }
    }

    pub fn compile(
        mut self,
        timeline: &Timeline,
        duration: f64,
        sources: &ResolvedSources,
    ) -> CutflowResult<InvocationPlan> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(CutflowError::validation(format!(
                "Export duration must be positive, got {duration}"
            )));
        }

        let (visual, audio) = partition(timeline);
        if visual.is_empty() && audio.is_empty() {
            return Err(CutflowError::validation("No clips to export"));
        }

        // Every source is resolved before any node is built.
        let visual_inputs = self.register_inputs(&visual, sources)?;
        let audio_inputs = self.register_inputs(&audio, sources)?;

        let mut video_out = self.build_visual(&visual, &visual_inputs);
        let mut overlays = 0;
        let mut applied_effects = Vec::new();
        if let Some(mut current) = video_out.take() {
            for overlay in timeline.texts() {
                let Some(clip) = timeline.text_clip(overlay.id) else {
                    continue;
                };
                if !clip.is_non_empty() {
                    continue;
                }
                current = self.push_text_overlay(current, overlay, clip, overlays);
                overlays += 1;
            }

            for effect in self.options.effects.select(timeline) {
                let filters = effect_filters(&effect, self.options.canvas_width, self.options.canvas_height);
                if filters.is_empty() {
                    continue;
                }
                let label = Label::new(format!("vfx{}", applied_effects.len()));
                let mut chain = FilterChain::new(ChainRole::Effect { kind: effect.kind }).input(current);
                for filter in filters {
                    chain = chain.filter(filter);
                }
                self.graph.push(chain.output(label.clone()));
                applied_effects.push(effect.kind.as_str());
                current = label;
            }
            video_out = Some(current);
        } else if !timeline.texts().is_empty() {
            tracing::debug!("No visual stream; text overlays and effects skipped");
        }

        let audio_out = self.build_audio(&audio, &audio_inputs, duration);

        self.graph
            .validate(self.inputs.paths.len())
            .map_err(|e| CutflowError::compilation(e.to_string()))?;
        for label in video_out.iter().chain(audio_out.iter()) {
            if !self.graph.is_terminal(label) {
                return Err(CutflowError::compilation(format!(
                    "output {label} is not a terminal stream"
                )));
            }
        }

        tracing::debug!(
            visual = visual.len(),
            audio = audio.len(),
            inputs = self.inputs.paths.len(),
            overlays,
            effects = ?applied_effects,
            duration,
            "Compiled timeline"
        );

        Ok(InvocationPlan {
            inputs: self.inputs.paths,
            graph: self.graph,
            video_out,
            audio_out,
            duration,
            encode: self.options.encode.clone(),
            destination: self.options.destination.clone(),
            work_dir: self.options.work_dir.clone(),
            side_files: self.side_files,
        })
    }

    fn register_inputs(&mut self, clips: &[&Clip], sources: &ResolvedSources) -> CutflowResult<Vec<usize>> {
        clips
            .iter()
            .map(|clip| {
                let source = clip.source.as_deref().unwrap_or_default();
                let path = sources.get(source).ok_or_else(|| {
                    CutflowError::validation(format!(
                        "Source for {} clip {} cannot be resolved: {source}",
                        clip.kind.as_str(),
                        clip.id
                    ))
                })?;
                Ok(self.inputs.index_of(path))
            })
            .collect()
    }

    fn build_visual(&mut self, clips: &[&Clip], inputs: &[usize]) -> Option<Label> {
        let mut labels = Vec::with_capacity(clips.len());
        for (i, (clip, &input)) in clips.iter().zip(inputs).enumerate() {
            let label = Label::new(format!("v{i}"));
            let chain = self.normalize(clip, input, label.clone());
            self.graph.push(chain);
            labels.push(label);
        }

        match labels.len() {
            0 => None,
            1 => labels.pop(),
            n => {
                let out = Label::new("vcat");
                let mut chain = FilterChain::new(ChainRole::Concat { inputs: n });
                for label in labels {
                    chain = chain.input(label);
                }
                self.graph.push(
                    chain
                        .filter(Filter::new("concat").arg("n", n).arg("v", 1).arg("a", 0))
                        .output(out.clone()),
                );
                Some(out)
            }
        }
    }

    fn normalize(&self, clip: &Clip, input: usize, out: Label) -> FilterChain {
        let (w, h) = (self.options.canvas_width, self.options.canvas_height);
        let span = num(clip.span());
        let role = if clip.kind == TrackKind::Image {
            ChainRole::NormalizeImage { clip: clip.id }
        } else {
            ChainRole::NormalizeVideo { clip: clip.id }
        };

        let mut chain = FilterChain::new(role)
            .input(PadRef::video(input))
            .filter(
                Filter::new("scale")
                    .positional(w)
                    .positional(h)
                    .arg("force_original_aspect_ratio", "decrease"),
            )
            .filter(
                Filter::new("pad")
                    .positional(w)
                    .positional(h)
                    .positional("(ow-iw)/2")
                    .positional("(oh-ih)/2"),
            )
            .filter(Filter::new("setsar").positional(1));

        if clip.kind == TrackKind::Image {
            chain = chain
                .filter(Filter::new("setpts").positional("PTS-STARTPTS"))
                .filter(
                    Filter::new("loop")
                        .arg("loop", -1)
                        .arg("size", 1)
                        .arg("start", 0),
                );
        }

        chain
            .filter(Filter::new("trim").arg("duration", span))
            .filter(Filter::new("setpts").positional("PTS-STARTPTS"))
            .output(out)
    }

    fn push_text_overlay(&mut self, input: Label, overlay: &TextOverlay, clip: &Clip, index: usize) -> Label {
        let text_path = self.options.work_dir.join(format!("text-{index}.txt"));
        self.side_files.push(SideFile {
            path: text_path.clone(),
            contents: overlay.content.clone(),
        });

        let x = match overlay.align {
            TextAlign::Left => num(overlay.x),
            TextAlign::Center => format!("{}-text_w/2", num(overlay.x)),
            TextAlign::Right => format!("{}-text_w", num(overlay.x)),
        };

        let out = Label::new(format!("vt{index}"));
        self.graph.push(
            FilterChain::new(ChainRole::TextOverlay { text: overlay.id })
                .input(input)
                .filter(
                    Filter::new("drawtext")
                        .arg("textfile", text_path.display())
                        .arg("fontsize", overlay.font_size)
                        .arg("fontcolor", ffmpeg_color(&overlay.color))
                        .arg("x", x)
                        .arg("y", num(overlay.y))
                        .arg("box", 1)
                        .arg("boxcolor", "black@0.5")
                        .arg("boxborderw", 5)
                        .expr(
                            "enable",
                            format!("between(t,{},{})", num(clip.start_time), num(clip.end_time)),
                        ),
                )
                .output(out.clone()),
        );
        out
    }

    fn build_audio(&mut self, clips: &[&Clip], inputs: &[usize], duration: f64) -> Option<Label> {
        let mut labels = Vec::with_capacity(clips.len());
        for (i, (clip, &input)) in clips.iter().zip(inputs).enumerate() {
            let label = Label::new(format!("a{i}"));
            let keep = clip.span().min(duration);
            self.graph.push(
                FilterChain::new(ChainRole::TrimAudio { clip: clip.id })
                    .input(PadRef::audio(input))
                    .filter(Filter::new("asetpts").positional("PTS-STARTPTS"))
                    .filter(Filter::new("atrim").positional(0).positional(num(keep)))
                    .output(label.clone()),
            );
            labels.push(label);
        }

        match labels.len() {
            0 => None,
            1 => labels.pop(),
            n => {
                let out = Label::new("amix");
                let mut chain = FilterChain::new(ChainRole::Mix { inputs: n });
                for label in labels {
                    chain = chain.input(label);
                }
                self.graph.push(
                    chain
                        .filter(
                            Filter::new("amix")
                                .arg("inputs", n)
                                .arg("duration", "longest")
                                .arg("dropout_transition", 0),
                        )
                        .output(out.clone()),
                );
                Some(out)
            }
        }
    }
}

/// Convert an editor color to drawtext syntax.
pub fn ffmpeg_color(color: &str) -> String {
    let trimmed = color.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "white" => return "0xFFFFFF".to_string(),
        "black" => return "0x000000".to_string(),
        _ => {}
    }
    match trimmed.strip_prefix('#') {
        Some(hex) => format!("0x{hex}"),
        None => trimmed.to_string(),
    }
}
