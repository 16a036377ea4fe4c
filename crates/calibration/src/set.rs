//! CalibrationSet - everything reconstruction needs for one device
//!
//! Assembled once when a device pipeline opens: intrinsics/distortion come
//! from the stream headers, extrinsics and depth correction from the rig
//! file entry. Read-only for the lifetime of a playback session.

use contracts::{
    DeviceConfig, Distortion, Intrinsics, ReplayError, RigidTransform, StreamHeader, StreamKind,
};
use tracing::info;

use crate::lut::UndistortionLut;
use crate::Result;

/// Number of values in an intrinsics string:
/// fx, fy, cx, cy, k1..k6, p1, p2.
const INTRINSICS_FIELD_COUNT: usize = 12;

/// Parse a header intrinsics string into intrinsics + distortion.
///
/// `field` names the source in errors (e.g. `"depth.intrinsics"`).
pub fn parse_intrinsics_string(raw: &str, field: &str) -> Result<(Intrinsics, Distortion)> {
    let values: Vec<f64> = raw
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|_| ReplayError::calibration(field, format!("invalid number {part:?}")))
        })
        .collect::<Result<_>>()?;

    if values.len() != INTRINSICS_FIELD_COUNT {
        return Err(ReplayError::calibration(
            field,
            format!(
                "expected {INTRINSICS_FIELD_COUNT} values (fx,fy,cx,cy,k1..k6,p1,p2), got {}",
                values.len()
            ),
        ));
    }
    if values[0] == 0.0 || values[1] == 0.0 {
        return Err(ReplayError::calibration(field, "zero focal length"));
    }

    let intrinsics = Intrinsics {
        fx: values[0],
        fy: values[1],
        cx: values[2],
        cy: values[3],
    };
    let distortion = Distortion {
        k1: values[4],
        k2: values[5],
        k3: values[6],
        k4: values[7],
        k5: values[8],
        k6: values[9],
        p1: values[10],
        p2: values[11],
    };
    Ok((intrinsics, distortion))
}

/// Full per-device calibration.
#[derive(Debug)]
pub struct CalibrationSet {
    pub serial: String,
    pub depth_intrinsics: Intrinsics,
    pub depth_distortion: Distortion,
    pub color_intrinsics: Intrinsics,
    pub color_distortion: Distortion,
    /// One corrected ray per depth pixel, built at assemble time
    pub lut: UndistortionLut,
    /// Depth-camera to color-camera transform
    pub depth_to_color: RigidTransform,
    /// Device to shared-world transform
    pub world_pose: Option<RigidTransform>,
    /// Raw depth to meters: `z = raw * depth_scale + depth_bias`
    pub depth_scale: f64,
    pub depth_bias: f64,
}

impl CalibrationSet {
    /// Assemble calibration for one device from its stream headers and rig
    /// file entry, building the undistortion LUT.
    pub fn assemble(
        depth_header: &StreamHeader,
        color_header: &StreamHeader,
        device: &DeviceConfig,
    ) -> Result<Self> {
        if depth_header.kind != StreamKind::Depth {
            return Err(ReplayError::calibration(
                "depth_stream",
                format!("expected a depth stream, got {}", depth_header.kind),
            ));
        }
        if color_header.kind != StreamKind::Color {
            return Err(ReplayError::calibration(
                "color_stream",
                format!("expected a color stream, got {}", color_header.kind),
            ));
        }

        check_serial(depth_header, device)?;
        check_serial(color_header, device)?;

        let depth_raw = depth_header.intrinsics_raw.as_deref().ok_or_else(|| {
            ReplayError::calibration("depth.intrinsics", "header carries no intrinsics string")
        })?;
        let color_raw = color_header.intrinsics_raw.as_deref().ok_or_else(|| {
            ReplayError::calibration("color.intrinsics", "header carries no intrinsics string")
        })?;

        let (depth_intrinsics, depth_distortion) =
            parse_intrinsics_string(depth_raw, "depth.intrinsics")?;
        let (color_intrinsics, color_distortion) =
            parse_intrinsics_string(color_raw, "color.intrinsics")?;

        let depth_to_color = device
            .depth_to_color
            .to_rigid(&format!("devices[{}].depth_to_color", device.serial))?;
        let world_pose = device
            .world_pose
            .as_ref()
            .map(|pose| pose.to_rigid(&format!("devices[{}].world_pose", device.serial)))
            .transpose()?;

        let lut = UndistortionLut::build(
            &depth_intrinsics,
            &depth_distortion,
            depth_header.width,
            depth_header.height,
        );

        info!(
            serial = %device.serial,
            depth = format!("{}x{}", depth_header.width, depth_header.height),
            color = format!("{}x{}", color_header.width, color_header.height),
            depth_scale = device.depth_scale,
            "calibration assembled"
        );

        Ok(Self {
            serial: device.serial.clone(),
            depth_intrinsics,
            depth_distortion,
            color_intrinsics,
            color_distortion,
            lut,
            depth_to_color,
            world_pose,
            depth_scale: device.depth_scale,
            depth_bias: device.depth_bias,
        })
    }

    /// Metric depth for a raw sample.
    #[inline]
    pub fn metric_depth(&self, raw: u16) -> f64 {
        raw as f64 * self.depth_scale + self.depth_bias
    }
}

fn check_serial(header: &StreamHeader, device: &DeviceConfig) -> Result<()> {
    if let Some(serial) = &header.serial {
        if *serial != device.serial {
            return Err(ReplayError::calibration(
                "serial",
                format!(
                    "{} stream was recorded by '{serial}' but the rig entry is '{}'",
                    header.kind, device.serial
                ),
            ));
        }
    }
    Ok(())
}
