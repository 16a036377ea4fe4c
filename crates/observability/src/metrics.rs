//! Replay pipeline metric collection
//!
//! Records Prometheus metrics from merged frames and aggregates in-memory
//! summary statistics for end-of-run reports.

use contracts::{DeviceOutcome, MergedFrame};
use metrics::{counter, gauge, histogram};

/// Record metrics for one merged frame
///
/// Call once per `MergedFrame` the aggregator produces.
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_frame_metrics;
///
/// let frame = aggregator.process_frame(target_ns)?;
/// record_frame_metrics(&frame);
/// ```
pub fn record_frame_metrics(frame: &MergedFrame) {
    counter!("rig_replay_frames_total").increment(1);
    gauge!("rig_replay_last_frame_id").set(frame.frame_id as f64);

    histogram!("rig_replay_points_per_frame").record(frame.points.len() as f64);

    let colored = frame.points.iter().filter(|p| p.has_color()).count();
    if !frame.points.is_empty() {
        histogram!("rig_replay_colored_ratio").record(colored as f64 / frame.points.len() as f64);
    }

    let failed = frame.failed_devices();
    gauge!("rig_replay_devices_failed").set(failed as f64);
    if failed > 0 {
        counter!("rig_replay_frames_with_failures_total").increment(1);
    }

    for report in &frame.reports {
        match &report.outcome {
            DeviceOutcome::Reconstructed {
                actual_ts_ns,
                point_count,
            } => {
                histogram!(
                    "rig_replay_device_points",
                    "device" => report.device.to_string()
                )
                .record(*point_count as f64);

                // Seek accuracy: how far the located pair was from the target
                let offset_ms =
                    (*actual_ts_ns as f64 - frame.target_ts_ns as f64).abs() / 1_000_000.0;
                histogram!(
                    "rig_replay_device_seek_offset_ms",
                    "device" => report.device.to_string()
                )
                .record(offset_ms);
            }
            DeviceOutcome::Failed { .. } => {
                counter!(
                    "rig_replay_device_failures_total",
                    "device" => report.device.to_string()
                )
                .increment(1);
            }
        }
    }
}

/// Record a dropped frame request (in-flight gate or full queue)
pub fn record_request_dropped(source: &str) {
    counter!(
        "rig_replay_requests_dropped_total",
        "source" => source.to_string()
    )
    .increment(1);
}

/// Record seek latency (request to synchronized pair located)
pub fn record_seek_latency_ms(latency_ms: f64) {
    histogram!("rig_replay_seek_latency_ms").record(latency_ms);
}

/// Record a sink write outcome
pub fn record_sink_write(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "rig_replay_frames_dispatched_total",
        "sink" => sink_name.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Replay metrics aggregator
///
/// Aggregates per-frame statistics in memory for an end-of-run summary.
#[derive(Debug, Clone, Default)]
pub struct ReplayMetricsAggregator {
    /// Total frames merged
    pub total_frames: u64,

    /// Total points across all frames
    pub total_points: u64,

    /// Frames where at least one device failed
    pub frames_with_failures: u64,

    /// Per-frame point count statistics
    pub point_stats: RunningStats,

    /// Per-frame colored-point ratio statistics
    pub colored_stats: RunningStats,

    /// Per-device seek offset statistics (ms)
    pub seek_offset_stats: std::collections::HashMap<String, RunningStats>,

    /// Per-device failure counts
    pub failure_counts: std::collections::HashMap<String, u64>,
}

impl ReplayMetricsAggregator {
    /// Create a new aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one merged frame into the running statistics
    pub fn update(&mut self, frame: &MergedFrame) {
        self.total_frames += 1;
        self.total_points += frame.points.len() as u64;
        self.point_stats.push(frame.points.len() as f64);

        if !frame.points.is_empty() {
            let colored = frame.points.iter().filter(|p| p.has_color()).count();
            self.colored_stats
                .push(colored as f64 / frame.points.len() as f64);
        }

        if frame.failed_devices() > 0 {
            self.frames_with_failures += 1;
        }

        for report in &frame.reports {
            match &report.outcome {
                DeviceOutcome::Reconstructed { actual_ts_ns, .. } => {
                    let offset_ms =
                        (*actual_ts_ns as f64 - frame.target_ts_ns as f64).abs() / 1_000_000.0;
                    self.seek_offset_stats
                        .entry(report.device.to_string())
                        .or_default()
                        .push(offset_ms);
                }
                DeviceOutcome::Failed { .. } => {
                    *self
                        .failure_counts
                        .entry(report.device.to_string())
                        .or_insert(0) += 1;
                }
            }
        }
    }

    /// Produce a summary report
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_frames: self.total_frames,
            total_points: self.total_points,
            frames_with_failures: self.frames_with_failures,
            failure_rate: if self.total_frames > 0 {
                self.frames_with_failures as f64 / self.total_frames as f64 * 100.0
            } else {
                0.0
            },
            points_per_frame: StatsSummary::from(&self.point_stats),
            colored_ratio: StatsSummary::from(&self.colored_stats),
            device_failure_counts: self.failure_counts.clone(),
        }
    }

    /// Reset all statistics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub total_points: u64,
    pub frames_with_failures: u64,
    pub failure_rate: f64,
    pub points_per_frame: StatsSummary,
    pub colored_ratio: StatsSummary,
    pub device_failure_counts: std::collections::HashMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Replay Metrics Summary ===")?;
        writeln!(f, "Total frames: {}", self.total_frames)?;
        writeln!(f, "Total points: {}", self.total_points)?;
        writeln!(
            f,
            "Frames with device failures: {} ({:.2}%)",
            self.frames_with_failures, self.failure_rate
        )?;
        writeln!(f, "Points per frame: {}", self.points_per_frame)?;
        writeln!(f, "Colored ratio: {}", self.colored_ratio)?;

        if !self.device_failure_counts.is_empty() {
            writeln!(f, "Device failure counts:")?;
            for (device, count) in &self.device_failure_counts {
                writeln!(f, "  {}: {}", device, count)?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a value
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// Sample count
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// Standard deviation
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Minimum
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Maximum
    pub fn max(&self) -> f64 {
        self.max
    }
}
