//! Playback pipeline orchestration.
//!
//! Builds the explicit object graph - aggregator over device pipelines,
//! dispatcher over sinks - and drives frame requests through it. All
//! construction is plain dependency injection; nothing global.

mod stats;

pub use stats::PlayStats;

use std::sync::Arc;
use std::time::Instant;

use aggregator::MultiStreamAggregator;
use anyhow::{Context, Result};
use contracts::{MergedFrame, ReplayError, RigBlueprint};
use dispatcher::create_dispatcher;
use observability::metrics::record_frame_metrics;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Pipeline configuration
pub struct PipelineConfig {
    /// Loaded rig blueprint
    pub blueprint: RigBlueprint,

    /// First frame to play
    pub start_frame: u64,

    /// Frame budget (None = until the recording ends)
    pub max_frames: Option<u64>,

    /// Prometheus port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Queue capacity between the replay loop and the dispatcher.
const DISPATCH_QUEUE: usize = 16;

/// The playback pipeline
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline from configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run playback to completion.
    pub async fn run(self) -> Result<PlayStats> {
        let PipelineConfig {
            blueprint,
            start_frame,
            max_frames,
            metrics_port,
        } = self.config;

        if let Some(port) = metrics_port {
            observability::init_metrics_only(port).context("Failed to start metrics endpoint")?;
        }

        let aggregator =
            MultiStreamAggregator::open(&blueprint).context("Failed to open rig devices")?;
        for line in aggregator.status_lines() {
            info!(status = %line, "device");
        }

        let (frame_tx, frame_rx) = mpsc::channel::<Arc<MergedFrame>>(DISPATCH_QUEUE);
        let dispatcher = create_dispatcher(blueprint.sinks.clone(), frame_rx)
            .context("Failed to create dispatcher")?;
        let dispatcher_handle = dispatcher.spawn();

        let mut target_ns = aggregator
            .timestamp_for_frame(start_frame)
            .context("Failed to resolve the start frame")?;
        let period_ns = nominal_period_ns(&aggregator, &blueprint)?;

        let mut stats = PlayStats::new();
        let started = Instant::now();

        loop {
            if let Some(budget) = max_frames {
                if stats.frames_played >= budget {
                    info!(frames = stats.frames_played, "Frame budget reached");
                    break;
                }
            }

            match aggregator.process_frame(target_ns) {
                Ok(frame) => {
                    record_frame_metrics(&frame);
                    stats.record_frame(&frame);

                    if frame_tx.send(Arc::new(frame)).await.is_err() {
                        warn!("Dispatcher went away, stopping playback");
                        break;
                    }
                }
                Err(ReplayError::SyncExhausted { .. }) => {
                    info!(frames = stats.frames_played, "Recording exhausted");
                    break;
                }
                Err(ReplayError::RequestInFlight) => {
                    // Single-threaded driver; a dropped request here means
                    // something else holds the rig. Retry the same target.
                    warn!(target_ns, "Request dropped, retrying");
                    continue;
                }
                Err(e) => {
                    return Err(e).context("Frame processing failed");
                }
            }

            target_ns += period_ns;
        }

        stats.duration = started.elapsed();

        // Closing the channel drains and shuts down the sinks
        drop(frame_tx);
        dispatcher_handle
            .await
            .map_err(|e| anyhow::anyhow!("Dispatcher task panicked: {e}"))?;

        Ok(stats)
    }
}

/// Frame step for the playback loop, from headers or the explicit fallback.
fn nominal_period_ns(aggregator: &MultiStreamAggregator, blueprint: &RigBlueprint) -> Result<u64> {
    if let Some(period) = aggregator.nominal_period_ns() {
        return Ok(period);
    }
    if let Some(fps) = blueprint.playback.fallback_fps {
        return Ok((1_000_000_000.0 / fps).round() as u64);
    }
    Err(ReplayError::missing_frame_rate("reference device"))
        .context("Cannot derive a frame step for playback")
}
