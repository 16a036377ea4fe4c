//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[allow(dead_code)]
#[derive(Error, Debug)]
pub enum CliError {
    /// Rig file not found
    #[error("Rig calibration file not found: {path}")]
    RigNotFound { path: String },

    /// Rig file parsing error
    #[error("Failed to parse rig calibration: {message}")]
    RigParse { message: String },

    /// Rig file validation error
    #[error("Rig calibration validation failed: {message}")]
    RigValidation { message: String },

    /// Playback execution error
    #[error("Playback failed: {message}")]
    Playback { message: String },

    /// Graceful shutdown error
    #[error("Error during shutdown: {message}")]
    Shutdown { message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error wrapper
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

#[allow(dead_code)]
impl CliError {
    pub fn rig_not_found(path: impl Into<String>) -> Self {
        Self::RigNotFound { path: path.into() }
    }

    pub fn rig_parse(message: impl Into<String>) -> Self {
        Self::RigParse {
            message: message.into(),
        }
    }

    pub fn rig_validation(message: impl Into<String>) -> Self {
        Self::RigValidation {
            message: message.into(),
        }
    }

    pub fn playback(message: impl Into<String>) -> Self {
        Self::Playback {
            message: message.into(),
        }
    }

    pub fn shutdown(message: impl Into<String>) -> Self {
        Self::Shutdown {
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
#[allow(dead_code)]
pub type Result<T> = std::result::Result<T, CliError>;
