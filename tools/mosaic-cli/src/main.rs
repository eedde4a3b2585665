//! Mosaic CLI: create, inspect, validate, and export compositions.
//!
//! Usage:
//!   mosaic init <NAME>                       Create an empty project file
//!   mosaic info <PATH>                       Show project information
//!   mosaic validate <PATH>                   Validate a project file
//!   mosaic export <PATH> -o <OUT>            Export to PNG, JPG, MP4 or WebM
//!   mosaic render-frame <PATH> -o <PNG>      Render the scene at one moment

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use mosaic_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "mosaic",
    about = "Layered visual compositions: images, video, text and shapes",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Font file for text layers (repeatable)
    #[arg(long = "font", global = true)]
    fonts: Vec<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new empty project
    Init {
        /// Project name; the file is written as <NAME>.mosaic.json
        name: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Canvas width (defaults to the configured canvas)
        #[arg(long)]
        width: Option<u32>,

        /// Canvas height (defaults to the configured canvas)
        #[arg(long)]
        height: Option<u32>,

        /// Background color, e.g. "#ffffff"
        #[arg(long)]
        background: Option<String>,
    },

    /// Show project information
    Info {
        /// Path to the project file
        path: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a project file and the media it references
    Validate {
        /// Path to the project file
        path: PathBuf,
    },

    /// Export a project to an image or video
    Export {
        /// Path to the project file
        path: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Output format: png, jpg, mp4, webm (defaults to the output extension)
        #[arg(long)]
        format: Option<String>,

        /// Frame rate for video formats
        #[arg(long)]
        fps: Option<u32>,

        /// Leave the background transparent (PNG only)
        #[arg(long)]
        transparent: bool,
    },

    /// Render the scene at a point in time to a PNG
    RenderFrame {
        /// Path to the project file
        path: PathBuf,

        /// Composition time in seconds
        #[arg(long, default_value = "0")]
        time: f64,

        /// Output PNG path
        #[arg(short, long)]
        output: PathBuf,

        /// Leave the background transparent
        #[arg(long)]
        transparent: bool,
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
    mosaic_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Init {
            name,
            output,
            width,
            height,
            background,
        } => commands::init::run(&config, name, output, width, height, background),
        Commands::Info { path, json } => commands::info::run(path, json).await,
        Commands::Validate { path } => commands::validate::run(path),
        Commands::Export {
            path,
            output,
            format,
            fps,
            transparent,
        } => {
            commands::export::run(&config, &cli.fonts, path, output, format, fps, transparent).await
        }
        Commands::RenderFrame {
            path,
            time,
            output,
            transparent,
        } => commands::render_frame::run(&config, &cli.fonts, path, time, output, transparent).await,
    }
}
