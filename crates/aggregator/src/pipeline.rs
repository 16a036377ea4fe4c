//! DevicePipeline - one camera's parser pair, calibration and seeker

use calibration::CalibrationSet;
use contracts::{
    DeviceConfig, DeviceId, PlaybackConfig, ReconstructedPoint, ReplayError, RigidTransform,
};
use reconstruction::{ExecutionMode, PointCloudReconstructor, ReconstructOptions};
use stream_parser::SensorStreamParser;
use sync_engine::{FrameSeeker, StreamSynchronizer};
use tracing::{info, instrument};

use crate::Result;

/// One camera's contribution to a frame, in depth-camera space.
#[derive(Debug, Clone)]
pub struct DeviceFrame {
    /// Timestamp of the synchronized pair actually used
    pub actual_ts_ns: u64,
    pub points: Vec<ReconstructedPoint>,
}

/// Pipeline state shown in the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineState {
    Ready,
    Exhausted,
    Failed,
}

impl PipelineState {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Exhausted => "exhausted",
            Self::Failed => "failed",
        }
    }
}

/// Full replay pipeline for one camera device.
pub struct DevicePipeline {
    device_id: DeviceId,
    display_name: String,
    seeker: FrameSeeker,
    calibration: CalibrationSet,
    reconstructor: PointCloudReconstructor,
    depth_bulk: bool,
    state: PipelineState,
    frames_produced: u64,
}

impl DevicePipeline {
    /// Open both streams, assemble calibration (building the undistortion
    /// LUT) and wire the seeker.
    ///
    /// A header pair from which no sync tolerance can be derived is
    /// rejected here, at open time, rather than surfacing mid-playback.
    #[instrument(name = "device_pipeline_open", skip_all, fields(serial = %device.serial))]
    pub fn open(device: &DeviceConfig, playback: &PlaybackConfig) -> Result<Self> {
        let depth = SensorStreamParser::open(&device.depth_stream)?;
        let color = SensorStreamParser::open(&device.color_stream)?;

        let calibration = CalibrationSet::assemble(depth.header(), color.header(), device)?;

        let synchronizer = StreamSynchronizer::from_playback(playback);
        synchronizer.tolerance_ns(depth.header(), color.header())?;

        let display_name = device
            .name
            .clone()
            .unwrap_or_else(|| device.serial.clone());

        info!(
            serial = %device.serial,
            depth = %device.depth_stream.display(),
            color = %device.color_stream.display(),
            "device pipeline opened"
        );

        Ok(Self {
            device_id: DeviceId::from(device.serial.as_str()),
            display_name,
            seeker: FrameSeeker::new(depth, color, synchronizer),
            calibration,
            reconstructor: PointCloudReconstructor::new(ReconstructOptions {
                execution: if playback.bulk_decode {
                    ExecutionMode::Batched
                } else {
                    ExecutionMode::Sequential
                },
            }),
            depth_bulk: playback.bulk_decode,
            state: PipelineState::Ready,
            frames_produced: 0,
        })
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    /// The device world pose from calibration, if declared.
    pub fn world_pose(&self) -> Option<&RigidTransform> {
        self.calibration.world_pose.as_ref()
    }

    /// Seek to the target, read the synchronized pair and reconstruct it.
    ///
    /// Points come back in depth-camera space; the aggregator applies the
    /// world pose during the merge.
    #[instrument(
        name = "device_pipeline_frame",
        skip(self),
        fields(device = %self.device_id, target_ns)
    )]
    pub fn seek_and_reconstruct(&mut self, target_ns: u64) -> Result<DeviceFrame> {
        let outcome = match self.seeker.seek_to_timestamp(target_ns) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.state = PipelineState::Failed;
                return Err(e);
            }
        };
        if !outcome.reached {
            self.state = PipelineState::Exhausted;
            return Err(ReplayError::SyncExhausted {
                depth_ts: None,
                color_ts: None,
            });
        }

        // Color must be decoded for CPU sampling; packed depth is fine
        let result = match self.seeker.read_pair(self.depth_bulk, false) {
            Ok((depth, color)) => self.reconstructor.reconstruct(depth, color, &self.calibration),
            Err(e) => Err(e),
        };

        match result {
            Ok(points) => {
                self.state = PipelineState::Ready;
                self.frames_produced += 1;
                Ok(DeviceFrame {
                    actual_ts_ns: outcome.actual_ts_ns,
                    points,
                })
            }
            Err(e) => {
                self.state = PipelineState::Failed;
                Err(e)
            }
        }
    }

    /// Timestamp of this device's synchronized pair number `frame_index`.
    ///
    /// Replays from the start of the recording; see
    /// [`FrameSeeker::timestamp_for_frame`].
    pub fn timestamp_for_frame(&mut self, frame_index: u64) -> Result<u64> {
        self.seeker.timestamp_for_frame(frame_index)
    }

    /// Nominal frame period from the stream headers, nanoseconds.
    pub fn nominal_period_ns(&self) -> Option<u64> {
        self.seeker
            .depth_header()
            .frame_period_ns()
            .or_else(|| self.seeker.color_header().frame_period_ns())
    }

    /// Opaque status string for UI display.
    pub fn status_line(&self) -> String {
        let depth = self.seeker.depth_header();
        let color = self.seeker.color_header();
        let position_ms = self
            .seeker
            .position_ns()
            .map(|ns| format!("{:.1}", ns as f64 / 1e6))
            .unwrap_or_else(|| "-".into());
        format!(
            "{}: depth {}x{} color {}x{} fps {} state {} position {}ms frames {}",
            self.display_name,
            depth.width,
            depth.height,
            color.width,
            color.height,
            depth
                .fps
                .or(color.fps)
                .map(|f| format!("{f:.1}"))
                .unwrap_or_else(|| "?".into()),
            self.state.as_str(),
            position_ms,
            self.frames_produced,
        )
    }
}

impl std::fmt::Debug for DevicePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevicePipeline")
            .field("device_id", &self.device_id)
            .field("state", &self.state.as_str())
            .field("frames_produced", &self.frames_produced)
            .finish()
    }
}
