//! Playback statistics.

use std::time::Duration;

use contracts::MergedFrame;
use observability::ReplayMetricsAggregator;

/// Statistics for one playback run
pub struct PlayStats {
    /// Frames merged and dispatched
    pub frames_played: u64,

    /// Frames where at least one device failed
    pub frames_with_failures: u64,

    /// Total points across all frames
    pub total_points: u64,

    /// Wall-clock playback duration
    pub duration: Duration,

    /// Detailed per-frame statistics
    pub metrics: ReplayMetricsAggregator,
}

impl PlayStats {
    pub fn new() -> Self {
        Self {
            frames_played: 0,
            frames_with_failures: 0,
            total_points: 0,
            duration: Duration::ZERO,
            metrics: ReplayMetricsAggregator::new(),
        }
    }

    /// Fold one merged frame into the statistics
    pub fn record_frame(&mut self, frame: &MergedFrame) {
        self.frames_played += 1;
        self.total_points += frame.points.len() as u64;
        if frame.failed_devices() > 0 {
            self.frames_with_failures += 1;
        }
        self.metrics.update(frame);
    }

    /// Average playback rate
    pub fn fps(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.frames_played as f64 / secs
        } else {
            0.0
        }
    }

    /// Print the end-of-run summary to stdout
    pub fn print_summary(&self) {
        println!("{}", self.metrics.summary());
        println!(
            "Played {} frames ({} with failures) in {:.2}s ({:.1} fps)",
            self.frames_played,
            self.frames_with_failures,
            self.duration.as_secs_f64(),
            self.fps()
        );
    }
}

impl Default for PlayStats {
    fn default() -> Self {
        Self::new()
    }
}
