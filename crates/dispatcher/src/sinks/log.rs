//! LogSink - logs frame summary via tracing

use contracts::{MergedFrame, PointSink, ReplayError};
use tracing::{info, instrument};

/// Sink that logs frame summaries for debugging
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_frame_summary(&self, frame: &MergedFrame) {
        let colored = frame.points.iter().filter(|p| p.has_color()).count();

        info!(
            sink = %self.name,
            frame_id = frame.frame_id,
            target_ts_ns = frame.target_ts_ns,
            points = frame.points.len(),
            colored,
            devices = frame.reports.len(),
            failed_devices = frame.failed_devices(),
            "MergedFrame received"
        );
    }
}

impl PointSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, frame),
        fields(sink = %self.name, frame_id = frame.frame_id)
    )]
    async fn write(&mut self, frame: &MergedFrame) -> Result<(), ReplayError> {
        self.log_frame_summary(frame);
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ReplayError> {
        // Nothing to flush for log sink
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ReplayError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}
