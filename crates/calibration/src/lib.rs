//! # Calibration
//!
//! Rig calibration loading and camera geometry.
//!
//! Responsibilities:
//! - Parse TOML/JSON rig files (per-device extrinsics, depth correction, pose)
//! - Validate configuration legality
//! - Parse intrinsics/distortion strings from stream headers
//! - Precompute the per-pixel undistortion lookup table
//!
//! # Example
//!
//! ```no_run
//! use calibration::RigCalibration;
//! use std::path::Path;
//!
//! let blueprint = RigCalibration::load_from_path(Path::new("rig.toml")).unwrap();
//! println!("Devices: {}", blueprint.devices.len());
//! ```

mod lut;
mod model;
mod parser;
mod set;
mod validator;

pub use contracts::RigBlueprint;
pub use lut::UndistortionLut;
pub use model::{distort, undistort};
pub use parser::ConfigFormat;
pub use set::{parse_intrinsics_string, CalibrationSet};

use contracts::ReplayError;
use std::path::Path;

/// Result alias over the unified pipeline error.
pub type Result<T> = std::result::Result<T, ReplayError>;

/// Rig calibration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct RigCalibration;

impl RigCalibration {
    /// Load a rig blueprint from a file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<RigBlueprint> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load a rig blueprint from a string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<RigBlueprint> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Serialize a RigBlueprint to a TOML string
    pub fn to_toml(blueprint: &RigBlueprint) -> Result<String> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ReplayError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize a RigBlueprint to a JSON string
    pub fn to_json(blueprint: &RigBlueprint) -> Result<String> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ReplayError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl RigCalibration {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ReplayError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext)
            .ok_or_else(|| ReplayError::config_parse(format!("unsupported config format: .{ext}")))
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String> {
        Ok(std::fs::read_to_string(path)?)
    }
}
