//! Rig file parsing
//!
//! Supports TOML (primary) and JSON (optional) formats.

use contracts::{ReplayError, RigBlueprint};

use crate::Result;

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML format (recommended)
    Toml,
    /// JSON format
    Json,
}

impl ConfigFormat {
    /// Infer format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse TOML rig configuration
pub fn parse_toml(content: &str) -> Result<RigBlueprint> {
    toml::from_str(content).map_err(|e| ReplayError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON rig configuration
pub fn parse_json(content: &str) -> Result<RigBlueprint> {
    serde_json::from_str(content).map_err(|e| ReplayError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse rig configuration in the given format
pub fn parse(content: &str, format: ConfigFormat) -> Result<RigBlueprint> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}
