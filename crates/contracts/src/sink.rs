//! PointSink trait - Dispatcher output interface
//!
//! Defines the abstract interface for sinks consuming merged frames.

use crate::{MergedFrame, ReplayError};

/// Frame output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(PointSink: Send)]
pub trait LocalPointSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one merged frame
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, frame: &MergedFrame) -> Result<(), ReplayError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ReplayError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ReplayError>;
}
