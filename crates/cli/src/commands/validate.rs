//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    rig_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<RigSummary>,
}

#[derive(Serialize)]
struct RigSummary {
    device_count: usize,
    sink_count: usize,
    tolerance_fraction: f64,
    world_space: bool,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(rig = %args.rig.display(), "Validating rig calibration");

    let result = validate_rig(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Rig calibration validation failed")
    }
}

fn validate_rig(args: &ValidateArgs) -> ValidationResult {
    let rig_path = args.rig.display().to_string();

    // Check file exists
    if !args.rig.exists() {
        return ValidationResult {
            valid: false,
            rig_path,
            error: Some(format!("File not found: {}", args.rig.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match calibration::RigCalibration::load_from_path(&args.rig) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                rig_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(RigSummary {
                    device_count: blueprint.devices.len(),
                    sink_count: blueprint.sinks.len(),
                    tolerance_fraction: blueprint.playback.tolerance_fraction,
                    world_space: blueprint.playback.world_space,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            rig_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &contracts::RigBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.sinks.is_empty() {
        warnings.push("No sinks configured - played frames will only be counted".to_string());
    }

    for device in &blueprint.devices {
        if !device.depth_stream.exists() {
            warnings.push(format!(
                "Device '{}': depth stream {} does not exist",
                device.serial,
                device.depth_stream.display()
            ));
        }
        if !device.color_stream.exists() {
            warnings.push(format!(
                "Device '{}': color stream {} does not exist",
                device.serial,
                device.color_stream.display()
            ));
        }
        if device.world_pose.is_none() {
            warnings.push(format!(
                "Device '{}' has no world pose - its points stay in camera space",
                device.serial
            ));
        }
    }

    if blueprint.playback.fallback_fps.is_some() {
        warnings.push(
            "playback.fallback_fps is set - streams without a declared rate will not error"
                .to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Rig calibration is valid: {}", result.rig_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Devices: {}", summary.device_count);
            println!("  Sinks: {}", summary.sink_count);
            println!("  Sync tolerance: {} of frame period", summary.tolerance_fraction);
            println!("  World space merge: {}", summary.world_space);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Rig calibration is invalid: {}", result.rig_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
