//! Layered error definitions
//!
//! Categorized by source: format / calibration / sync / config / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ReplayError {
    // ===== Stream Format Errors =====
    /// Unrecognized tag, short read, misaligned or undecodable payload.
    /// Fatal for the stream; the parser must be reset before further use.
    #[error("stream format error: {message}")]
    Format { message: String },

    // ===== Calibration Errors =====
    /// Missing or malformed intrinsics/extrinsics fields.
    /// Fatal for the device; reconstruction is impossible without them.
    #[error("calibration error at '{field}': {message}")]
    Calibration { field: String, message: String },

    /// Header carries no frame rate where one is required (sync tolerance,
    /// timestamp estimation). Never silently defaulted; callers opt into a
    /// fallback explicitly via configuration.
    #[error("stream '{stream}' declares no frame rate")]
    MissingFrameRate { stream: String },

    // ===== Sync Errors =====
    /// One stream ended before the other reached the target.
    /// Recoverable at the caller level ("no more frames").
    #[error("synchronization exhausted (depth head: {depth_ts:?}, color head: {color_ts:?})")]
    SyncExhausted {
        depth_ts: Option<u64>,
        color_ts: Option<u64>,
    },

    /// A frame request arrived while another was being processed.
    /// The request is dropped, not queued; callers retry.
    #[error("frame request dropped: another request is in flight")]
    RequestInFlight,

    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ReplayError {
    /// Create stream format error
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
        }
    }

    /// Create calibration error
    pub fn calibration(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Calibration {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create missing-frame-rate error
    pub fn missing_frame_rate(stream: impl Into<String>) -> Self {
        Self::MissingFrameRate {
            stream: stream.into(),
        }
    }

    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Whether the caller may continue replaying after this error
    /// (skip the frame) instead of tearing the pipeline down.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SyncExhausted { .. } | Self::RequestInFlight | Self::SinkWrite { .. }
        )
    }
}
