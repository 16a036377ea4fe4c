//! Rig configuration validation
//!
//! Validation rules:
//! - device serial unique and non-empty
//! - stream paths non-empty
//! - depth_scale > 0
//! - rotation matrices have 9 elements
//! - tolerance_fraction in (0, 1]
//! - fallback_fps > 0 when present
//! - sink required fields present

use std::collections::HashSet;

use contracts::{ReplayError, RigBlueprint};

use crate::Result;

/// Validate a RigBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &RigBlueprint) -> Result<()> {
    validate_devices(blueprint)?;
    validate_playback(blueprint)?;
    validate_sinks(blueprint)?;
    Ok(())
}

fn validate_devices(blueprint: &RigBlueprint) -> Result<()> {
    if blueprint.devices.is_empty() {
        return Err(ReplayError::config_validation(
            "devices",
            "at least one device is required",
        ));
    }

    let mut seen = HashSet::new();
    for (idx, device) in blueprint.devices.iter().enumerate() {
        let field = |name: &str| format!("devices[{idx}].{name}");

        if device.serial.is_empty() {
            return Err(ReplayError::config_validation(
                field("serial"),
                "serial cannot be empty",
            ));
        }
        if !seen.insert(&device.serial) {
            return Err(ReplayError::config_validation(
                field("serial"),
                format!("duplicate device serial '{}'", device.serial),
            ));
        }

        if device.depth_stream.as_os_str().is_empty() {
            return Err(ReplayError::config_validation(
                field("depth_stream"),
                "depth stream path cannot be empty",
            ));
        }
        if device.color_stream.as_os_str().is_empty() {
            return Err(ReplayError::config_validation(
                field("color_stream"),
                "color stream path cannot be empty",
            ));
        }

        if device.depth_scale <= 0.0 {
            return Err(ReplayError::config_validation(
                field("depth_scale"),
                format!("depth_scale must be > 0, got {}", device.depth_scale),
            ));
        }

        // Surface malformed rotations at load time, not mid-playback
        device.depth_to_color.to_rigid(&field("depth_to_color"))?;
        if let Some(pose) = &device.world_pose {
            pose.to_rigid(&field("world_pose"))?;
        }
    }
    Ok(())
}

fn validate_playback(blueprint: &RigBlueprint) -> Result<()> {
    let playback = &blueprint.playback;

    if playback.tolerance_fraction <= 0.0 || playback.tolerance_fraction > 1.0 {
        return Err(ReplayError::config_validation(
            "playback.tolerance_fraction",
            format!(
                "tolerance_fraction must be in (0, 1], got {}",
                playback.tolerance_fraction
            ),
        ));
    }

    if let Some(fps) = playback.fallback_fps {
        if fps <= 0.0 {
            return Err(ReplayError::config_validation(
                "playback.fallback_fps",
                format!("fallback_fps must be > 0, got {fps}"),
            ));
        }
    }

    Ok(())
}

fn validate_sinks(blueprint: &RigBlueprint) -> Result<()> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ReplayError::config_validation(
                format!("sinks[{idx}].name"),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(&sink.name) {
            return Err(ReplayError::config_validation(
                format!("sinks[{idx}].name"),
                format!("duplicate sink name '{}'", sink.name),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        ConfigVersion, DeviceConfig, PlaybackConfig, SinkConfig, SinkType, TransformConfig,
    };
    use std::path::PathBuf;

    fn minimal_blueprint() -> RigBlueprint {
        RigBlueprint {
            version: ConfigVersion::V1,
            playback: PlaybackConfig::default(),
            devices: vec![DeviceConfig {
                serial: "A1".into(),
                name: None,
                depth_stream: PathBuf::from("a1_depth.rcs"),
                color_stream: PathBuf::from("a1_color.rcs"),
                depth_scale: 0.001,
                depth_bias: 0.0,
                depth_to_color: TransformConfig::identity(),
                world_pose: None,
            }],
            sinks: vec![SinkConfig {
                name: "log".into(),
                sink_type: SinkType::Log,
                queue_capacity: 100,
                params: Default::default(),
            }],
        }
    }

    #[test]
    fn test_valid_config() {
        let bp = minimal_blueprint();
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_no_devices() {
        let mut bp = minimal_blueprint();
        bp.devices.clear();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("at least one device"), "got: {err}");
    }

    #[test]
    fn test_duplicate_serial() {
        let mut bp = minimal_blueprint();
        bp.devices.push(bp.devices[0].clone());
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("duplicate device serial"), "got: {err}");
    }

    #[test]
    fn test_invalid_depth_scale() {
        let mut bp = minimal_blueprint();
        bp.devices[0].depth_scale = 0.0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("depth_scale must be > 0"), "got: {err}");
    }

    #[test]
    fn test_bad_rotation_shape() {
        let mut bp = minimal_blueprint();
        bp.devices[0].depth_to_color.rotation = vec![1.0, 0.0, 0.0];
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("9 elements"), "got: {err}");
    }

    #[test]
    fn test_tolerance_out_of_range() {
        let mut bp = minimal_blueprint();
        bp.playback.tolerance_fraction = 1.5;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("tolerance_fraction"), "got: {err}");
    }

    #[test]
    fn test_negative_fallback_fps() {
        let mut bp = minimal_blueprint();
        bp.playback.fallback_fps = Some(-30.0);
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("fallback_fps"), "got: {err}");
    }

    #[test]
    fn test_empty_sink_name() {
        let mut bp = minimal_blueprint();
        bp.sinks[0].name = String::new();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("cannot be empty"), "got: {err}");
    }
}
