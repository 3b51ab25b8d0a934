//! demorec CLI: encoder checks, command previews and synthetic captures.
//!
//! Usage:
//!   demorec check                  Check the encoder and configuration
//!   demorec resolutions            List the supported output resolutions
//!   demorec command [OPTIONS]      Print the encoder command for each pass
//!   demorec simulate [OPTIONS]     Run a capture against a synthetic renderer
//!   demorec config <ACTION>        Show or edit the persisted configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use demorec_capture_model::{OutputFormat, VideoCodec};

mod commands;
mod synthetic;

#[derive(Parser)]
#[command(
    name = "demorec",
    about = "Frame-accurate capture of rendered demos to ffmpeg",
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

#[derive(Subcommand)]
enum Commands {
    /// Check that the encoder can be found
    Check,

    /// List the output resolutions supported for a native size
    Resolutions {
        /// Native render width
        #[arg(long, default_value = "1920")]
        width: i32,

        /// Native render height
        #[arg(long, default_value = "1080")]
        height: i32,
    },

    /// Print the encoder command line for each pass without running it
    Command {
        /// Capture settings JSON file
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Native render width
        #[arg(long, default_value = "1920")]
        width: i32,

        /// Native render height
        #[arg(long, default_value = "1080")]
        height: i32,

        /// Output directory (defaults to the configured one)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Capture a synthetic scene through the full session and encoder path
    Simulate {
        /// First captured tick (seeded from the timeline length when unset)
        #[arg(long)]
        start_tick: Option<i32>,

        /// Last captured tick (seeded from the timeline length when unset)
        #[arg(long)]
        end_tick: Option<i32>,

        /// Length of the synthetic timeline in ticks
        #[arg(long, default_value = "500")]
        timeline_ticks: i32,

        /// Capture framerate
        #[arg(long, default_value = "25")]
        fps: i32,

        /// Output format
        #[arg(long, value_enum, default_value = "video")]
        format: FormatArg,

        /// ProRes variant for video output
        #[arg(long, value_enum, default_value = "prores4444")]
        codec: CodecArg,

        /// Number of capture passes (0 for a single stream)
        #[arg(long, default_value = "0")]
        passes: usize,

        /// Render the last pass as a depth visualization
        #[arg(long)]
        depth: bool,

        /// Synthetic render width
        #[arg(long, default_value = "320")]
        width: u32,

        /// Synthetic render height
        #[arg(long, default_value = "180")]
        height: u32,

        /// Index into the supported resolutions for the encoded output
        #[arg(long, default_value = "0")]
        resolution_index: usize,

        /// Output directory (defaults to the configured one)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show or edit the persisted configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the configuration and where it is stored
    Show,

    /// Set the capture output directory
    SetOutputDir { path: PathBuf },

    /// Set the ffmpeg executable path
    SetFfmpeg { path: PathBuf },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Video,
    ImageSequence,
    CameraData,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Video => OutputFormat::Video,
            FormatArg::ImageSequence => OutputFormat::ImageSequence,
            FormatArg::CameraData => OutputFormat::CameraData,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CodecArg {
    Prores4444xq,
    Prores4444,
    Prores422hq,
    Prores422,
    Prores422lt,
}

impl From<CodecArg> for VideoCodec {
    fn from(arg: CodecArg) -> Self {
        match arg {
            CodecArg::Prores4444xq => VideoCodec::Prores4444XQ,
            CodecArg::Prores4444 => VideoCodec::Prores4444,
            CodecArg::Prores422hq => VideoCodec::Prores422HQ,
            CodecArg::Prores422 => VideoCodec::Prores422,
            CodecArg::Prores422lt => VideoCodec::Prores422LT,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let mut logging = demorec_common::config::AppConfig::load().logging;
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    demorec_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Check => commands::check::run(),
        Commands::Resolutions { width, height } => commands::resolutions::run(width, height),
        Commands::Command {
            settings,
            width,
            height,
            output,
        } => commands::command::run(settings, width, height, output),
        Commands::Simulate {
            start_tick,
            end_tick,
            timeline_ticks,
            fps,
            format,
            codec,
            passes,
            depth,
            width,
            height,
            resolution_index,
            output,
        } => commands::simulate::run(commands::simulate::SimulateOptions {
            start_tick,
            end_tick,
            timeline_ticks,
            fps,
            format: format.into(),
            codec: codec.into(),
            passes,
            depth,
            width,
            height,
            resolution_index,
            output,
        }),
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(),
            ConfigAction::SetOutputDir { path } => commands::config::set_output_dir(path),
            ConfigAction::SetFfmpeg { path } => commands::config::set_ffmpeg(path),
        },
    }
}
