//! MultiStreamAggregator - global frame requests across the whole rig

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use contracts::{DeviceOutcome, DeviceReport, MergedFrame, ReplayError, RigBlueprint};
use tracing::{info, instrument, warn};

use crate::pipeline::DevicePipeline;
use crate::Result;

/// Drives every device pipeline to one target timestamp and merges the
/// reconstructed points in the shared world frame.
///
/// Shareable behind an `Arc`: the pipelines live in a mutex and a boolean
/// in-flight gate - not a queue - drops requests that arrive while one is
/// processing. Callers needing guaranteed delivery retry on
/// [`ReplayError::RequestInFlight`].
pub struct MultiStreamAggregator {
    pipelines: Mutex<Vec<DevicePipeline>>,
    world_space: bool,
    in_flight: AtomicBool,
    frame_counter: AtomicU64,
}

impl MultiStreamAggregator {
    /// Open every device pipeline in the blueprint.
    ///
    /// Any device failing to open (bad stream, bad calibration, missing
    /// frame rate) fails the whole rig: these are configuration problems,
    /// not per-frame conditions.
    #[instrument(name = "aggregator_open", skip_all, fields(devices = blueprint.devices.len()))]
    pub fn open(blueprint: &RigBlueprint) -> Result<Self> {
        let mut pipelines = Vec::with_capacity(blueprint.devices.len());
        for device in &blueprint.devices {
            pipelines.push(DevicePipeline::open(device, &blueprint.playback)?);
        }

        info!(devices = pipelines.len(), "aggregator ready");

        Ok(Self {
            pipelines: Mutex::new(pipelines),
            world_space: blueprint.playback.world_space,
            in_flight: AtomicBool::new(false),
            frame_counter: AtomicU64::new(0),
        })
    }

    /// Build from already-opened pipelines (for tests and custom graphs).
    pub fn with_pipelines(pipelines: Vec<DevicePipeline>, world_space: bool) -> Self {
        Self {
            pipelines: Mutex::new(pipelines),
            world_space,
            in_flight: AtomicBool::new(false),
            frame_counter: AtomicU64::new(0),
        }
    }

    /// Number of configured devices.
    pub fn device_count(&self) -> usize {
        self.pipelines.lock().unwrap().len()
    }

    /// Resolve a frame index to a target timestamp.
    ///
    /// The first configured device is the rig's reference clock; its
    /// synchronized pair sequence defines the frame numbering. The result
    /// feeds [`process_frame`] like any other target timestamp.
    ///
    /// [`process_frame`]: MultiStreamAggregator::process_frame
    pub fn timestamp_for_frame(&self, frame_index: u64) -> Result<u64> {
        let mut pipelines = self.pipelines.lock().unwrap();
        let reference = pipelines
            .first_mut()
            .ok_or_else(|| ReplayError::Other("rig has no devices".into()))?;
        reference.timestamp_for_frame(frame_index)
    }

    /// Nominal frame period of the reference device, nanoseconds.
    pub fn nominal_period_ns(&self) -> Option<u64> {
        self.pipelines
            .lock()
            .unwrap()
            .first()
            .and_then(|p| p.nominal_period_ns())
    }

    /// Opaque per-device status strings for UI display.
    pub fn status_lines(&self) -> Vec<String> {
        self.pipelines
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.status_line())
            .collect()
    }

    /// Seek every camera to `target_ns`, reconstruct, and merge.
    ///
    /// Completes fully (seek, decode, reconstruct, merge) before returning;
    /// there is no partial-frame rollback and no mid-frame cancellation.
    ///
    /// Per-device failures are isolated: the other cameras' points are
    /// still returned and the failure rides along in the frame's reports.
    /// Only when every device fails does the first error propagate.
    #[instrument(name = "aggregator_process_frame", skip(self), fields(target_ns))]
    pub fn process_frame(&self, target_ns: u64) -> Result<MergedFrame> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            warn!(target_ns, "frame request dropped: aggregator busy");
            metrics::counter!("replay_requests_dropped_total").increment(1);
            return Err(ReplayError::RequestInFlight);
        }

        let result = self.process_frame_locked(target_ns);
        self.in_flight.store(false, Ordering::Release);
        result
    }

    fn process_frame_locked(&self, target_ns: u64) -> Result<MergedFrame> {
        let mut pipelines = self.pipelines.lock().unwrap();

        let frame_id = self.frame_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let mut frame = MergedFrame {
            target_ts_ns: target_ns,
            frame_id,
            points: Vec::new(),
            reports: Vec::with_capacity(pipelines.len()),
        };
        let mut first_error: Option<ReplayError> = None;
        let mut successes = 0usize;

        for pipeline in pipelines.iter_mut() {
            let device = pipeline.device_id().clone();
            match pipeline.seek_and_reconstruct(target_ns) {
                Ok(mut device_frame) => {
                    if self.world_space {
                        if let Some(pose) = pipeline.world_pose() {
                            for point in &mut device_frame.points {
                                point.position = pose.apply_f32(&point.position);
                            }
                        }
                    }

                    frame.reports.push(DeviceReport {
                        device,
                        outcome: DeviceOutcome::Reconstructed {
                            actual_ts_ns: device_frame.actual_ts_ns,
                            point_count: device_frame.points.len(),
                        },
                    });
                    frame.points.append(&mut device_frame.points);
                    successes += 1;
                }
                Err(e) => {
                    warn!(device = %device, error = %e, "device failed for this frame");
                    metrics::counter!(
                        "replay_device_failures_total",
                        "device" => device.to_string()
                    )
                    .increment(1);
                    frame.reports.push(DeviceReport {
                        device,
                        outcome: DeviceOutcome::Failed {
                            message: e.to_string(),
                        },
                    });
                    first_error.get_or_insert(e);
                }
            }
        }

        if successes == 0 {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        metrics::counter!("replay_frames_merged_total").increment(1);
        metrics::histogram!("replay_merged_points_per_frame").record(frame.points.len() as f64);

        Ok(frame)
    }
}

impl std::fmt::Debug for MultiStreamAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiStreamAggregator")
            .field("devices", &self.device_count())
            .field("world_space", &self.world_space)
            .finish()
    }
}

#[cfg(test)]
impl MultiStreamAggregator {
    /// Force the in-flight gate for deterministic drop tests.
    fn force_in_flight(&self, value: bool) {
        self.in_flight.store(value, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{write_device, MS, H, W};
    use contracts::{PlaybackConfig, TransformConfig};
    use tempfile::TempDir;

    fn blueprint_for(devices: Vec<contracts::DeviceConfig>) -> RigBlueprint {
        RigBlueprint {
            version: Default::default(),
            playback: PlaybackConfig::default(),
            devices,
            sinks: vec![],
        }
    }

    #[test]
    fn test_process_frame_merges_devices() {
        let dir = TempDir::new().unwrap();
        let mut cam2 = write_device(&dir, "B2", 10, 1, 1000);
        // Camera 2 sits one meter along world x
        cam2.world_pose = Some(TransformConfig {
            rotation: TransformConfig::identity().rotation,
            translation_m: [1.0, 0.0, 0.0],
        });
        let devices = vec![write_device(&dir, "A1", 10, 1, 1000), cam2];

        let aggregator = MultiStreamAggregator::open(&blueprint_for(devices)).unwrap();
        let frame = aggregator.process_frame(100 * MS).unwrap();

        assert_eq!(frame.reports.len(), 2);
        assert_eq!(frame.failed_devices(), 0);
        // Both cameras contribute a full grid
        assert_eq!(frame.points.len(), 2 * (W * H) as usize);
        assert_eq!(frame.frame_id, 1);

        // Camera 2's points carry its world pose translation
        let cam1_x = frame.points[0].position.x;
        let cam2_x = frame.points[(W * H) as usize].position.x;
        assert!((cam2_x - cam1_x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_partial_success_isolates_failed_device() {
        let dir = TempDir::new().unwrap();
        // Second camera's recording is much shorter; seeking past its end
        // fails only that device
        let devices = vec![
            write_device(&dir, "A1", 10, 1, 1000),
            write_device(&dir, "B2", 2, 1, 1000),
        ];

        let aggregator = MultiStreamAggregator::open(&blueprint_for(devices)).unwrap();
        let frame = aggregator.process_frame(200 * MS).unwrap();

        assert_eq!(frame.failed_devices(), 1);
        assert_eq!(frame.points.len(), (W * H) as usize);
        assert!(frame.reports[1].is_failure());
    }

    #[test]
    fn test_all_devices_failing_propagates_error() {
        let dir = TempDir::new().unwrap();
        let devices = vec![write_device(&dir, "A1", 2, 1, 1000)];

        let aggregator = MultiStreamAggregator::open(&blueprint_for(devices)).unwrap();
        let err = aggregator.process_frame(10_000 * MS).unwrap_err();
        assert!(matches!(err, ReplayError::SyncExhausted { .. }));
    }

    #[test]
    fn test_busy_gate_drops_request() {
        let dir = TempDir::new().unwrap();
        let devices = vec![write_device(&dir, "A1", 3, 1, 1000)];
        let aggregator = MultiStreamAggregator::open(&blueprint_for(devices)).unwrap();

        aggregator.force_in_flight(true);
        let err = aggregator.process_frame(0).unwrap_err();
        assert!(matches!(err, ReplayError::RequestInFlight));

        aggregator.force_in_flight(false);
        assert!(aggregator.process_frame(0).is_ok());
    }

    #[test]
    fn test_status_lines_cover_all_devices() {
        let dir = TempDir::new().unwrap();
        let devices = vec![
            write_device(&dir, "A1", 3, 1, 1000),
            write_device(&dir, "B2", 3, 1, 1000),
        ];
        let aggregator = MultiStreamAggregator::open(&blueprint_for(devices)).unwrap();

        let lines = aggregator.status_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("A1"));
        assert!(lines[1].contains("B2"));
    }
}
