//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Rig Replay - multi-camera depth recording playback and export
#[derive(Parser, Debug)]
#[command(
    name = "rig-replay",
    author,
    version,
    about = "Multi-camera depth recording replay and point cloud export",
    long_about = "Replays synchronized depth+color sensor recordings, reconstructs \n\
                  colored 3D point clouds frame by frame, and exports them through \n\
                  configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "RIG_REPLAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "RIG_REPLAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect a recorded stream's header
    Info(InfoArgs),

    /// Validate a rig calibration file without running
    Validate(ValidateArgs),

    /// Export one reconstructed frame as PLY
    Export(ExportArgs),

    /// Play a frame range through the configured sinks
    Play(PlayArgs),
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to a recorded stream file (.rcs)
    pub stream: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to the rig calibration file to validate
    #[arg(short, long, default_value = "rig.toml")]
    pub rig: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `export` command
#[derive(Parser, Debug, Clone)]
pub struct ExportArgs {
    /// Path to the rig calibration file (TOML or JSON)
    #[arg(short, long, default_value = "rig.toml", env = "RIG_REPLAY_RIG")]
    pub rig: PathBuf,

    /// Frame index to export (reference-device frame numbering)
    #[arg(long, conflicts_with = "timestamp_ms")]
    pub frame: Option<u64>,

    /// Absolute target timestamp in milliseconds
    #[arg(long)]
    pub timestamp_ms: Option<f64>,

    /// Output directory for the PLY file and manifest
    #[arg(short, long, default_value = "./output")]
    pub output: PathBuf,

    /// Also export points whose color projection missed the color image
    #[arg(long)]
    pub include_transparent: bool,
}

/// Arguments for the `play` command
#[derive(Parser, Debug, Clone)]
pub struct PlayArgs {
    /// Path to the rig calibration file (TOML or JSON)
    #[arg(short, long, default_value = "rig.toml", env = "RIG_REPLAY_RIG")]
    pub rig: PathBuf,

    /// First frame to play (reference-device frame numbering)
    #[arg(long, default_value = "0")]
    pub start_frame: u64,

    /// Number of frames to play (0 = until the recording ends)
    #[arg(long, default_value = "0", env = "RIG_REPLAY_MAX_FRAMES")]
    pub frames: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "RIG_REPLAY_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
