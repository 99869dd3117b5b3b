//! CutFlow CLI: command-line interface for editing and exporting timelines.
//!
//! Usage:
//!   cutflow init <NAME>                      Create an empty project
//!   cutflow import <PATH> <FILES>...         Ingest media and place it
//!   cutflow text <PATH> <CONTENT> <S> <E>    Add a text overlay
//!   cutflow effect <PATH> <KIND> <S> <E>     Add an effect
//!   cutflow move <PATH> <CLIP> <START>       Move a clip with snapping
//!   cutflow resize <PATH> <CLIP> <EDGE> <T>  Resize a clip edge
//!   cutflow info <PATH>                      Show project information
//!   cutflow validate <PATH>                  Validate a project bundle
//!   cutflow plan <PATH>                      Print the render invocation
//!   cutflow export <PATH>                    Render the timeline
//!   cutflow check                            Check for ffmpeg and ffprobe
//!   cutflow config                           Show the effective configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use cutflow_common::config::AppConfig;
use cutflow_project_model::TextOverlay;

mod commands;

#[derive(Parser)]
#[command(
    name = "cutflow",
    about = "Multi-track timeline editing with ffmpeg export",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Clip edge for `resize`.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum EdgeArg {
    Left,
    Right,
}

/// Effect kinds accepted by `effect`.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum EffectArg {
    Zoom,
    Fade,
    Blur,
    Sparkle,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new empty project
    Init {
        /// Project name
        name: String,

        /// Parent directory (defaults to the configured projects directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Copy media into the project and append it to its track
    Import {
        /// Path to the project directory
        path: PathBuf,

        /// Media files to ingest
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Place every file at this time instead of the track end
        #[arg(long)]
        at: Option<f64>,
    },

    /// Add a text overlay shown between START and END
    Text {
        /// Path to the project directory
        path: PathBuf,

        content: String,
        start: f64,
        end: f64,

        /// Font size in pixels
        #[arg(long, default_value = "48")]
        size: u32,

        /// Color as #RRGGBB or a named color
        #[arg(long, default_value = "#FFFFFF")]
        color: String,

        /// Position in output pixels
        #[arg(long, default_value = "100")]
        x: f64,
        #[arg(long, default_value = "100")]
        y: f64,
    },

    /// Add an effect active between START and END
    Effect {
        /// Path to the project directory
        path: PathBuf,

        #[arg(value_enum)]
        kind: EffectArg,
        start: f64,
        end: f64,

        /// Intensity [0, 100]
        #[arg(long, default_value = "50")]
        intensity: u8,
    },

    /// Move a clip so it starts near START, snapping to other clips
    Move {
        /// Path to the project directory
        path: PathBuf,

        /// Clip id (see `cutflow info`)
        clip: u64,

        start: f64,
    },

    /// Move one edge of a clip, snapping and keeping the minimum span
    Resize {
        /// Path to the project directory
        path: PathBuf,

        /// Clip id (see `cutflow info`)
        clip: u64,

        #[arg(value_enum)]
        edge: EdgeArg,

        time: f64,
    },

    /// Show project information
    Info {
        /// Path to the project directory
        path: PathBuf,
    },

    /// Validate a project bundle
    Validate {
        /// Path to the project directory
        path: PathBuf,
    },

    /// Compile the timeline and print the ffmpeg invocation without running it
    Plan {
        /// Path to the project directory
        path: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export the timeline to video
    Export {
        /// Path to the project directory
        path: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the outcome or error as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that the external media tools are installed
    Check,

    /// Show the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load();

    // Initialize logging
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    cutflow_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Init { name, output } => {
            commands::init::run(name, output.unwrap_or_else(|| config.projects_dir.clone()))
        }
        Commands::Import { path, files, at } => commands::import::run(path, files, at, &config),
        Commands::Text {
            path,
            content,
            start,
            end,
            size,
            color,
            x,
            y,
        } => {
            let overlay = TextOverlay::new(content)
                .at(x, y)
                .with_font_size(size)
                .with_color(color);
            commands::text::run(path, overlay, start, end)
        }
        Commands::Effect {
            path,
            kind,
            start,
            end,
            intensity,
        } => commands::effect::run(path, kind.into(), start, end, intensity),
        Commands::Move { path, clip, start } => commands::move_clip::run(path, clip, start, &config),
        Commands::Resize {
            path,
            clip,
            edge,
            time,
        } => commands::resize::run(path, clip, edge.into(), time, &config),
        Commands::Info { path } => commands::info::run(path),
        Commands::Validate { path } => commands::validate::run(path),
        Commands::Plan { path, output } => commands::plan::run(path, output, &config),
        Commands::Export { path, output, json } => {
            commands::export::run(path, output, json, &config).await
        }
        Commands::Check => commands::check::run(&config),
        Commands::Config { write } => commands::config::run(&config, write),
    }
}

impl From<EdgeArg> for cutflow_edit_engine::Edge {
    fn from(edge: EdgeArg) -> Self {
        match edge {
            EdgeArg::Left => Self::Left,
            EdgeArg::Right => Self::Right,
        }
    }
}

impl From<EffectArg> for cutflow_project_model::EffectKind {
    fn from(kind: EffectArg) -> Self {
        match kind {
            EffectArg::Zoom => Self::Amplify,
            EffectArg::Fade => Self::Fade,
            EffectArg::Blur => Self::Soften,
            EffectArg::Sparkle => Self::Sparkle,
        }
    }
}
