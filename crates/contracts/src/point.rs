//! ReconstructedPoint / MergedFrame - Reconstruction and Aggregator output
//!
//! Produced transiently per frame request; ownership passes to the caller
//! immediately, nothing is retained by the pipeline.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::DeviceId;

/// One colored 3D point.
///
/// Position is in depth-camera space, or in the shared world frame after the
/// aggregator applies the device pose. `aux` is carried opaquely for callers
/// that attach per-point data (e.g. motion vectors); the reconstruction core
/// always emits zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconstructedPoint {
    /// 3D position, meters
    pub position: Vector3<f32>,

    /// RGBA color; alpha 0 marks the out-of-bounds color fallback
    pub color: [u8; 4],

    /// Opaque per-point auxiliary vector
    pub aux: Vector3<f32>,
}

impl ReconstructedPoint {
    /// Point with a sampled color and zero aux vector.
    pub fn new(position: Vector3<f32>, color: [u8; 4]) -> Self {
        Self {
            position,
            color,
            aux: Vector3::zeros(),
        }
    }

    /// Whether the color sample landed inside the color image.
    #[inline]
    pub fn has_color(&self) -> bool {
        self.color[3] != 0
    }
}

/// Outcome of one device's contribution to a merged frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceOutcome {
    /// Device reached the target and produced points.
    Reconstructed {
        /// Timestamp of the synchronized pair actually used
        actual_ts_ns: u64,
        /// Points contributed to the merged buffer
        point_count: usize,
    },
    /// Device failed; the rest of the rig still reports (partial success).
    Failed { message: String },
}

/// Per-device report attached to a merged frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceReport {
    pub device: DeviceId,
    pub outcome: DeviceOutcome,
}

impl DeviceReport {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, DeviceOutcome::Failed { .. })
    }
}

/// All cameras' points merged into one buffer for a single target timestamp.
#[derive(Debug, Clone, Default)]
pub struct MergedFrame {
    /// The requested target timestamp
    pub target_ts_ns: u64,

    /// Frame sequence number (monotonically increasing per aggregator)
    pub frame_id: u64,

    /// Merged point buffer, per-device points appended in device order
    pub points: Vec<ReconstructedPoint>,

    /// One report per configured device, in device order
    pub reports: Vec<DeviceReport>,
}

impl MergedFrame {
    /// Count of devices that failed this frame.
    pub fn failed_devices(&self) -> usize {
        self.reports.iter().filter(|r| r.is_failure()).count()
    }
}
