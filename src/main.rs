// SPDX-License-Identifier: GPL-3.0-only

use camera_access::{CameraBackendType, Config};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "camera-access")]
#[command(about = "Capture frames from local cameras")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    /// Device backend (v4l2 or synthetic)
    #[arg(short, long, global = true)]
    backend: Option<CameraBackendType>,

    /// Configuration file (default: ~/.config/camera-access/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    List,

    /// Capture a single frame and save it
    Snapshot {
        /// Camera index to use (from 'camera-access list')
        #[arg(short, long, default_value = "0")]
        camera: usize,

        /// Output file path (default: ~/Pictures/camera-access/snapshot_TIMESTAMP.png)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Digital zoom level
        #[arg(short, long, default_value = "1.0")]
        zoom: f32,

        /// Filter name (grayscale, sepia, inverted)
        #[arg(short, long)]
        filter: Option<String>,

        /// White balance (auto, daylight, cloudy, fluorescent, incandescent)
        #[arg(short, long)]
        white_balance: Option<String>,

        /// Restart the session and take its first frame
        #[arg(long)]
        alternative: bool,
    },

    /// Stream frames and report throughput
    Stream {
        /// Camera index to use (from 'camera-access list')
        #[arg(short, long, default_value = "0")]
        camera: usize,

        /// Streaming duration in seconds (0 runs until Ctrl+C)
        #[arg(short, long, default_value = "10")]
        duration: u64,
    },

    /// Print the effective configuration
    Config {
        /// Write the effective configuration back to the file
        #[arg(long)]
        save: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=camera_access=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(Config::default_path);
    let mut config = match &config_path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }

    match cli.command {
        Commands::List => cli::list_cameras(config),
        Commands::Snapshot {
            camera,
            output,
            zoom,
            filter,
            white_balance,
            alternative,
        } => cli::take_snapshot(
            config,
            cli::SnapshotOptions {
                camera,
                output,
                zoom,
                filter,
                white_balance,
                alternative,
            },
        ),
        Commands::Stream { camera, duration } => cli::stream(config, camera, duration),
        Commands::Config { save } => cli::show_config(&config, config_path.as_deref(), save),
    }
}
