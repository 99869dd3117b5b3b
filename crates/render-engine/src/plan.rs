//! Invocation plan: everything the external renderer needs, in order.

use std::path::PathBuf;

use cutflow_common::config::RenderDefaults;

use crate::graph::{num, ChainRole, FilterGraph, Label};

/// Fixed encode parameters appended after the stream maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeSettings {
    pub video_codec: String,
    pub preset: String,
    pub crf: u32,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self::from(&RenderDefaults::default())
    }
}

impl From<&RenderDefaults> for EncodeSettings {
    fn from(render: &RenderDefaults) -> Self {
        Self {
            video_codec: render.video_codec.clone(),
            preset: render.preset.clone(),
            crf: render.crf,
            audio_codec: render.audio_codec.clone(),
            audio_bitrate: render.audio_bitrate.clone(),
        }
    }
}

impl EncodeSettings {
    pub fn to_args(&self) -> Vec<String> {
        vec![
            "-c:v".to_string(),
            self.video_codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ]
    }
}

/// A temporary file the renderer reads (drawtext text files). Written
/// before the process starts and removed with the work directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideFile {
    pub path: PathBuf,
    pub contents: String,
}

/// Compiled, ordered description of one render.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationPlan {
    /// Process inputs. Graph input pads index into this list.
    pub inputs: Vec<PathBuf>,
    pub graph: FilterGraph,
    pub video_out: Option<Label>,
    pub audio_out: Option<Label>,
    /// Output is trimmed to this many seconds.
    pub duration: f64,
    pub encode: EncodeSettings,
    pub destination: PathBuf,
    pub work_dir: PathBuf,
    pub side_files: Vec<SideFile>,
}

impl InvocationPlan {
    pub fn has_audio(&self) -> bool {
        self.audio_out.is_some()
    }

    /// "Stop at shortest stream" is only requested when audio is mapped.
    pub fn shortest(&self) -> bool {
        self.has_audio()
    }

    pub fn concat_nodes(&self) -> usize {
        self.graph
            .count(|role| matches!(role, ChainRole::Concat { .. }))
    }

    pub fn mix_nodes(&self) -> usize {
        self.graph.count(|role| matches!(role, ChainRole::Mix { .. }))
    }

    pub fn overlay_nodes(&self) -> usize {
        self.graph
            .count(|role| matches!(role, ChainRole::TextOverlay { .. }))
    }

    /// Full argument vector, excluding the program name.
    pub fn to_args(&self) -> Vec<String> {
        let mut args: Vec<String> = [
            "-y",
            "-hide_banner",
            "-loglevel",
            "error",
            "-nostats",
            "-progress",
            "pipe:1",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        for input in &self.inputs {
            args.push("-i".to_string());
            args.push(input.display().to_string());
        }

        if !self.graph.is_empty() {
            args.push("-filter_complex".to_string());
            args.push(self.graph.render());
        }

        for label in self.video_out.iter().chain(self.audio_out.iter()) {
            args.push("-map".to_string());
            args.push(label.to_string());
        }

        args.push("-t".to_string());
        args.push(num(self.duration));
        if self.shortest() {
            args.push("-shortest".to_string());
        }

        args.extend(self.encode.to_args());
        args.push(self.destination.display().to_string());
        args
    }

    /// Shell-style rendering for display. Not used to spawn the process.
    pub fn command_line(&self, program: &str) -> String {
        std::iter::once(program.to_string())
            .chain(self.to_args())
            .map(|arg| shell_quote(&arg))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+*@%".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Filter, FilterChain, PadRef};
    use cutflow_project_model::ClipId;

    fn single_clip_plan(with_audio: bool) -> InvocationPlan {
        let mut graph = FilterGraph::new();
        graph.push(
            FilterChain::new(ChainRole::NormalizeVideo { clip: ClipId(1) })
                .input(PadRef::video(0))
                .filter(Filter::new("trim").arg("duration", 5))
                .output(Label::new("v0")),
        );
        let mut inputs = vec![PathBuf::from("/p/a.mp4")];
        let audio_out = if with_audio {
            inputs.push(PathBuf::from("/p/b.mp3"));
            graph.push(
                FilterChain::new(ChainRole::TrimAudio { clip: ClipId(2) })
                    .input(PadRef::audio(1))
                    .filter(Filter::new("atrim").positional(0).positional(5))
                    .output(Label::new("a0")),
            );
            Some(Label::new("a0"))
        } else {
            None
        };
        InvocationPlan {
            inputs,
            graph,
            video_out: Some(Label::new("v0")),
            audio_out,
            duration: 5.0,
            encode: EncodeSettings::default(),
            destination: PathBuf::from("/p/exports/out.mp4"),
            work_dir: PathBuf::from("/tmp/w"),
            side_files: Vec::new(),
        }
    }

    #[test]
    fn test_args_order() {
        let args = single_clip_plan(true).to_args();
        let pos = |needle: &str| args.iter().position(|a| a == needle).unwrap();

        assert_eq!(&args[..7], &["-y", "-hide_banner", "-loglevel", "error", "-nostats", "-progress", "pipe:1"]);
        assert!(pos("-i") < pos("-filter_complex"));
        assert!(pos("-filter_complex") < pos("-map"));
        assert!(pos("-map") < pos("-t"));
        assert!(pos("-t") < pos("-shortest"));
        assert!(pos("-shortest") < pos("-c:v"));
        assert_eq!(args.last().unwrap(), "/p/exports/out.mp4");
        assert_eq!(args[pos("-t") + 1], "5");
    }

    #[test]
    fn test_shortest_only_with_audio() {
        let args = single_clip_plan(false).to_args();
        assert!(!args.iter().any(|a| a == "-shortest"));
        assert_eq!(args.iter().filter(|a| *a == "-map").count(), 1);
    }

    #[test]
    fn test_command_line_quotes_graph() {
        let line = single_clip_plan(false).command_line("ffmpeg");
        assert!(line.starts_with("ffmpeg -y"));
        assert!(line.contains("'[0:v]trim=duration=5[v0]'"));
    }
}
