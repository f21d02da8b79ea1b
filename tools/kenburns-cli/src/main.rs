//! Kenburns CLI: command-line interface for timelines and export.
//!
//! Usage:
//!   kenburns export <SOURCE> --timeline <FILE>   Render and encode a video
//!   kenburns preview <TIMELINE>                 Show interpolated states
//!   kenburns frames --duration <SECS>           Print the export frame clock
//!   kenburns validate <TIMELINE>                Report timeline issues
//!   kenburns demo                               Export a synthetic test pattern
//!   kenburns check                              Check system capabilities

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use kenburns_common::config::AppConfig;
use kenburns_processing_core::interpolate::InterpolationMode;

mod commands;

#[derive(Parser)]
#[command(
    name = "kenburns",
    about = "Pan/zoom and text-overlay effects with deterministic video export",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use the longer quintic ease-out transition policy for every command
    #[arg(long, global = true)]
    long_transitions: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Preview,
    Export,
}

impl From<ModeArg> for InterpolationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Preview => InterpolationMode::Preview,
            ModeArg::Export => InterpolationMode::Export,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Render a source video through a timeline and encode the result
    Export {
        /// Source video file
        source: PathBuf,

        /// Timeline JSON file
        #[arg(short, long)]
        timeline: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Target FPS
        #[arg(long)]
        fps: Option<u32>,

        /// Output width (defaults to the source width)
        #[arg(long, requires = "height")]
        width: Option<u32>,

        /// Output height (defaults to the source height)
        #[arg(long, requires = "width")]
        height: Option<u32>,

        /// Font used for text overlays
        #[arg(long)]
        font: Option<PathBuf>,

        /// Export only the first SECS seconds
        #[arg(long)]
        duration: Option<f64>,
    },

    /// Print interpolated zoom states as JSON
    Preview {
        /// Timeline JSON file
        timeline: PathBuf,

        /// Single query time in seconds; omit to sample the whole timeline
        #[arg(long)]
        at: Option<f64>,

        /// Interpolation mode
        #[arg(long, value_enum, default_value = "export")]
        mode: ModeArg,

        /// Sample rate when sampling the whole timeline
        #[arg(long, default_value = "10")]
        fps: f64,
    },

    /// Print the deterministic export frame clock
    Frames {
        /// Duration in seconds
        #[arg(long)]
        duration: f64,

        /// Target FPS
        #[arg(long, default_value = "30")]
        fps: u32,
    },

    /// Validate a timeline file
    Validate {
        /// Timeline JSON file
        timeline: PathBuf,
    },

    /// Export a synthetic test pattern with a built-in timeline
    Demo {
        /// Output file path
        #[arg(short, long, default_value = "kenburns-demo.mp4")]
        output: PathBuf,

        /// Also write the demo timeline JSON here
        #[arg(long)]
        timeline_out: Option<PathBuf>,

        /// Duration in seconds
        #[arg(long, default_value = "4.0")]
        duration: f64,

        /// Frame width
        #[arg(long, default_value = "640")]
        width: u32,

        /// Frame height
        #[arg(long, default_value = "360")]
        height: u32,
    },

    /// Check system capabilities
    Check,
}

/// Fold global flags into the configuration every command reads.
fn apply_global_flags(cli: &Cli, config: &mut AppConfig) {
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if cli.long_transitions {
        config.interpolation = config.interpolation.with_long_transitions();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load();
    apply_global_flags(&cli, &mut config);
    kenburns_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Export {
            source,
            timeline,
            output,
            fps,
            width,
            height,
            font,
            duration,
        } => {
            commands::export::run(
                commands::export::ExportArgs {
                    source,
                    timeline,
                    output,
                    fps,
                    size: width.zip(height),
                    font,
                    duration,
                },
                config,
            )
            .await
        }
        Commands::Preview {
            timeline,
            at,
            mode,
            fps,
        } => commands::preview::run(timeline, at, mode.into(), fps, &config),
        Commands::Frames { duration, fps } => commands::frames::run(duration, fps),
        Commands::Validate { timeline } => commands::validate::run(timeline, &config),
        Commands::Demo {
            output,
            timeline_out,
            duration,
            width,
            height,
        } => commands::demo::run(output, timeline_out, duration, width, height, config).await,
        Commands::Check => commands::check::run(&config),
    }
}
