//! `export` command implementation.

use std::collections::HashMap;

use aggregator::MultiStreamAggregator;
use anyhow::{Context, Result};
use contracts::{DeviceOutcome, PointSink};
use dispatcher::PlyFileSink;
use tracing::info;

use crate::cli::ExportArgs;

/// Execute the `export` command
pub async fn run_export(args: &ExportArgs) -> Result<()> {
    info!(rig = %args.rig.display(), "Loading rig calibration");

    if !args.rig.exists() {
        anyhow::bail!("Rig calibration file not found: {}", args.rig.display());
    }

    let blueprint = calibration::RigCalibration::load_from_path(&args.rig)
        .with_context(|| format!("Failed to load rig from {}", args.rig.display()))?;

    let aggregator =
        MultiStreamAggregator::open(&blueprint).context("Failed to open rig devices")?;

    let target_ns = resolve_target(args, &aggregator)?;
    info!(target_ns, "Processing frame");

    let frame = aggregator
        .process_frame(target_ns)
        .context("Frame reconstruction failed")?;

    let mut params = HashMap::new();
    params.insert(
        "base_path".to_string(),
        args.output.display().to_string(),
    );
    params.insert(
        "include_transparent".to_string(),
        args.include_transparent.to_string(),
    );
    let mut sink =
        PlyFileSink::from_params("export", &params).context("Failed to create PLY sink")?;

    sink.write(&frame).await.context("PLY write failed")?;
    sink.close().await.ok();

    println!(
        "Exported frame {} ({} points) to {}",
        frame.frame_id,
        frame.points.len(),
        args.output.display()
    );
    for report in &frame.reports {
        match &report.outcome {
            DeviceOutcome::Reconstructed {
                actual_ts_ns,
                point_count,
            } => println!(
                "  {}: {} points at {:.1}ms",
                report.device,
                point_count,
                *actual_ts_ns as f64 / 1e6
            ),
            DeviceOutcome::Failed { message } => {
                println!("  {}: FAILED - {}", report.device, message)
            }
        }
    }

    Ok(())
}

/// Resolve the export target: explicit timestamp, frame index, or frame 0.
fn resolve_target(args: &ExportArgs, aggregator: &MultiStreamAggregator) -> Result<u64> {
    if let Some(ms) = args.timestamp_ms {
        if ms < 0.0 {
            anyhow::bail!("timestamp must be non-negative");
        }
        return Ok((ms * 1e6).round() as u64);
    }
    let frame = args.frame.unwrap_or(0);
    aggregator
        .timestamp_for_frame(frame)
        .with_context(|| format!("Failed to resolve frame {frame}"))
}
