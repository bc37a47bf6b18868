//! Laprender CLI: line up lap telemetry with camera footage and render it.
//!
//! Usage:
//!   laprender analyze-data [OPTIONS]     Print the laps of a telemetry log
//!   laprender analyze-videos [OPTIONS]   Print videos and the laps they cover
//!   laprender calibrate [OPTIONS]        Find the camera/logger frame offset
//!   laprender render [OPTIONS]           Render lap, session or comparison videos
//!
//! Arguments that locate inputs and outputs are remembered between runs.

use clap::{ArgAction, Parser, Subcommand};

mod commands;

use commands::{DataArgs, RenderArgs, VideoArgs};

#[derive(Parser)]
#[command(
    name = "laprender",
    about = "Telemetry overlays for track-day video",
    version,
    author
)]
struct Cli {
    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print lap times and statistics of a telemetry log
    AnalyzeData {
        #[command(flatten)]
        data: DataArgs,
    },

    /// Print the videos found and the laps bound to each
    AnalyzeVideos {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        videos: VideoArgs,
    },

    /// Interactively calibrate the frame offset of every matched video
    Calibrate {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        videos: VideoArgs,
    },

    /// Render lap videos with overlays
    Render(RenderArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut logging = laprender_common::config::AppConfig::load().logging;
    if cli.verbose > 0 {
        logging.level = laprender_common::logging::level_for_verbosity(cli.verbose).to_string();
    }
    laprender_common::logging::init_logging(&logging);

    match cli.command {
        Commands::AnalyzeData { data } => commands::analyze::run_data(data),
        Commands::AnalyzeVideos { data, videos } => commands::analyze::run_videos(data, videos),
        Commands::Calibrate { data, videos } => commands::calibrate::run(data, videos),
        Commands::Render(args) => commands::render::run(args),
    }
}
