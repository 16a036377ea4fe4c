//! `play` command implementation.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::PlayArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `play` command
pub async fn run_play(args: &PlayArgs) -> Result<()> {
    info!(rig = %args.rig.display(), "Loading rig calibration");

    if !args.rig.exists() {
        anyhow::bail!("Rig calibration file not found: {}", args.rig.display());
    }

    let blueprint = calibration::RigCalibration::load_from_path(&args.rig)
        .with_context(|| format!("Failed to load rig from {}", args.rig.display()))?;

    info!(
        devices = blueprint.devices.len(),
        sinks = blueprint.sinks.len(),
        "Rig loaded"
    );

    let pipeline_config = PipelineConfig {
        blueprint,
        start_frame: args.start_frame,
        max_frames: if args.frames == 0 {
            None
        } else {
            Some(args.frames)
        },
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    let pipeline = Pipeline::new(pipeline_config);

    // Setup graceful shutdown handler
    let shutdown_signal = setup_shutdown_signal();

    info!("Starting playback...");

    tokio::select! {
        result = pipeline.run() => {
            let stats = result.context("Playback failed")?;
            info!(
                frames = stats.frames_played,
                points = stats.total_points,
                duration_secs = stats.duration.as_secs_f64(),
                fps = format!("{:.2}", stats.fps()),
                "Playback completed"
            );
            stats.print_summary();
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping playback...");
        }
    }

    info!("Rig Replay finished");
    Ok(())
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
