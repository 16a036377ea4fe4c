//! RigBlueprint - Calibration loader output
//!
//! Describes a complete playback rig: devices (stream files + extrinsics),
//! synchronization tuning, and output routing. Loaded once at startup into
//! plain immutable structs; there is no edit-time/play-time split, only a
//! load phase and a run phase.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::{ReplayError, RigidTransform};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete rig configuration blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Playback / synchronization tuning
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// Camera device entries, keyed by serial
    pub devices: Vec<DeviceConfig>,

    /// Output routing configuration
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

impl RigBlueprint {
    /// Look up a device entry by serial.
    pub fn device_by_serial(&self, serial: &str) -> Option<&DeviceConfig> {
        self.devices.iter().find(|d| d.serial == serial)
    }
}

/// Playback tuning shared by every device pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Sync tolerance as a fraction of the nominal frame period.
    /// Two heads are a pair when |delta| <= period * fraction.
    #[serde(default = "default_tolerance_fraction")]
    pub tolerance_fraction: f64,

    /// Explicit fallback rate for streams whose header declares none.
    /// Absent, a missing rate is a hard error (never silently defaulted).
    #[serde(default)]
    pub fallback_fps: Option<f64>,

    /// Apply each device's world pose during aggregation.
    #[serde(default = "default_true")]
    pub world_space: bool,

    /// Keep payloads in their packed on-disk form (batched/GPU consumers).
    #[serde(default)]
    pub bulk_decode: bool,
}

fn default_tolerance_fraction() -> f64 {
    0.25
}

fn default_true() -> bool {
    true
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tolerance_fraction: default_tolerance_fraction(),
            fallback_fps: None,
            world_space: true,
            bulk_decode: false,
        }
    }
}

/// One camera device: its recorded streams plus per-device calibration that
/// the stream headers cannot carry (extrinsics, depth correction, pose).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device serial; must match the `serial` header key of both streams
    pub serial: String,

    /// Optional display name for status lines
    #[serde(default)]
    pub name: Option<String>,

    /// Path to the depth stream file (RCST)
    pub depth_stream: PathBuf,

    /// Path to the color stream file (RCSV)
    pub color_stream: PathBuf,

    /// Multiplicative raw-depth correction, meters per unit
    #[serde(default = "default_depth_scale")]
    pub depth_scale: f64,

    /// Additive raw-depth correction, meters
    #[serde(default)]
    pub depth_bias: f64,

    /// Depth-camera to color-camera rigid transform
    pub depth_to_color: TransformConfig,

    /// Device to shared-world rigid transform
    #[serde(default)]
    pub world_pose: Option<TransformConfig>,
}

fn default_depth_scale() -> f64 {
    0.001 // recorded units are millimeters
}

/// Serialized rigid transform: row-major 3x3 rotation + translation (m).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Row-major rotation matrix, exactly 9 elements
    pub rotation: Vec<f64>,

    /// Translation, meters
    pub translation_m: [f64; 3],
}

impl TransformConfig {
    /// Convert into a runtime transform, validating the rotation shape.
    pub fn to_rigid(&self, field: &str) -> Result<RigidTransform, ReplayError> {
        let rotation: [f64; 9] = self.rotation.as_slice().try_into().map_err(|_| {
            ReplayError::config_validation(
                field,
                format!("rotation must have 9 elements, got {}", self.rotation.len()),
            )
        })?;
        Ok(RigidTransform::from_parts(rotation, self.translation_m))
    }

    /// Identity transform config.
    pub fn identity() -> Self {
        Self {
            rotation: vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            translation_m: [0.0; 3],
        }
    }
}

/// Sink output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log frame summaries
    Log,
    /// Binary PLY files, one per frame
    PlyFile,
}
