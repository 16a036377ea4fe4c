//! StreamSynchronizer - head-of-stream pairing with catch-up
//!
//! A depth record and a color record form a pair when their timestamps
//! differ by at most `frame_period * tolerance_fraction`. When the heads
//! are apart, the stream with the earlier head is skipped forward record by
//! record; per-stream timestamp monotonicity makes this greedy merge
//! correct, and its cost is O(records skipped).

use contracts::{PlaybackConfig, ReplayError, StreamAhead, StreamHeader, SyncResult};
use stream_parser::SensorStreamParser;
use tracing::{instrument, trace};

use crate::Result;

/// Synchronizes the heads of one depth/color parser pair.
#[derive(Debug, Clone)]
pub struct StreamSynchronizer {
    /// Tolerance as a fraction of the nominal frame period
    tolerance_fraction: f64,

    /// Explicit last-resort rate for headers that declare none
    fallback_fps: Option<f64>,
}

impl StreamSynchronizer {
    /// Create a synchronizer with an explicit tolerance fraction and
    /// optional fallback rate.
    pub fn new(tolerance_fraction: f64, fallback_fps: Option<f64>) -> Self {
        Self {
            tolerance_fraction,
            fallback_fps,
        }
    }

    /// Create from playback configuration.
    pub fn from_playback(config: &PlaybackConfig) -> Self {
        Self::new(config.tolerance_fraction, config.fallback_fps)
    }

    /// The frame rate used for tolerance and estimation: the depth header's,
    /// else the color header's, else the configured fallback.
    ///
    /// A pair of headers with no rate and no configured fallback is an
    /// unrecoverable configuration problem for this device; it surfaces as
    /// `MissingFrameRate` instead of silently assuming a rate.
    pub fn frame_rate(&self, depth: &StreamHeader, color: &StreamHeader) -> Result<f64> {
        depth
            .fps
            .filter(|f| *f > 0.0)
            .or(color.fps.filter(|f| *f > 0.0))
            .or(self.fallback_fps)
            .ok_or_else(|| ReplayError::missing_frame_rate("depth/color pair"))
    }

    /// Pairing tolerance in nanoseconds.
    pub fn tolerance_ns(&self, depth: &StreamHeader, color: &StreamHeader) -> Result<u64> {
        let fps = self.frame_rate(depth, color)?;
        let period_ns = 1_000_000_000.0 / fps;
        Ok((period_ns * self.tolerance_fraction).round() as u64)
    }

    /// Compare the two heads without consuming anything.
    ///
    /// Either stream empty reports "not synchronized, no data".
    pub fn check(
        &self,
        depth: &mut SensorStreamParser,
        color: &mut SensorStreamParser,
    ) -> Result<SyncResult> {
        let depth_ts = depth.peek_next_timestamp()?;
        let color_ts = color.peek_next_timestamp()?;

        let (Some(d), Some(c)) = (depth_ts, color_ts) else {
            return Ok(SyncResult::no_data(depth_ts, color_ts));
        };

        let tolerance = self.tolerance_ns(depth.header(), color.header())?;
        let delta = d as i128 - c as i128;
        let in_sync = delta.unsigned_abs() <= tolerance as u128;

        let ahead = match delta {
            0 => StreamAhead::Neither,
            d if d > 0 => StreamAhead::Depth,
            _ => StreamAhead::Color,
        };

        Ok(SyncResult {
            depth_ts,
            color_ts,
            delta_ns: delta.clamp(i64::MIN as i128, i64::MAX as i128) as i64,
            in_sync,
            ahead,
        })
    }

    /// Skip the lagging stream forward until the heads pair up.
    ///
    /// Errors with `SyncExhausted` when either stream runs out of records
    /// before a pair is found.
    #[instrument(name = "synchronizer_synchronize", level = "debug", skip_all)]
    pub fn synchronize(
        &self,
        depth: &mut SensorStreamParser,
        color: &mut SensorStreamParser,
    ) -> Result<SyncResult> {
        loop {
            let result = self.check(depth, color)?;

            if result.in_sync {
                metrics::histogram!("replay_sync_delta_ns").record(result.delta_ns.abs() as f64);
                return Ok(result);
            }

            if !result.has_data() {
                return Err(ReplayError::SyncExhausted {
                    depth_ts: result.depth_ts,
                    color_ts: result.color_ts,
                });
            }

            // Consume-and-retry on the earlier head. `ahead` names the later
            // stream, so the other one is skipped.
            let (lagging, name) = match result.ahead {
                StreamAhead::Depth => (&mut *color, "color"),
                StreamAhead::Color | StreamAhead::Neither => (&mut *depth, "depth"),
            };
            trace!(
                depth_ts = ?result.depth_ts,
                color_ts = ?result.color_ts,
                skipping = name,
                "heads apart, catching up"
            );
            if !lagging.skip_current_record()? {
                return Err(ReplayError::SyncExhausted {
                    depth_ts: result.depth_ts,
                    color_ts: result.color_ts,
                });
            }
            metrics::counter!("replay_sync_catchup_skips_total", "stream" => name).increment(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MS: u64 = 1_000_000;

    fn write_depth_stream(timestamps_ms: &[u64]) -> NamedTempFile {
        write_stream(b"RCST", "width=2\nheight=2\nfps=30\nmeta_size=8\n", timestamps_ms, 8)
    }

    fn write_color_stream(timestamps_ms: &[u64]) -> NamedTempFile {
        // Payload bytes are opaque to the synchronizer (peek/skip only)
        write_stream(
            b"RCSV",
            "width=2\nheight=2\nfps=30\nmeta_size=8\nsize_field=16\n",
            timestamps_ms,
            0,
        )
    }

    fn write_stream(
        tag: &[u8; 4],
        header: &str,
        timestamps_ms: &[u64],
        depth_payload_len: usize,
    ) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(tag).unwrap();
        file.write_all(&(header.len() as u32).to_le_bytes()).unwrap();
        file.write_all(header.as_bytes()).unwrap();
        for ts in timestamps_ms {
            file.write_all(&(ts * MS).to_le_bytes()).unwrap();
            if tag == b"RCST" {
                file.write_all(&vec![0u8; depth_payload_len]).unwrap();
            } else {
                let payload = [0xabu8; 5];
                file.write_all(&(payload.len() as u16).to_le_bytes()).unwrap();
                file.write_all(&payload).unwrap();
            }
        }
        file.flush().unwrap();
        file
    }

    fn open(file: &NamedTempFile) -> SensorStreamParser {
        SensorStreamParser::open(file.path()).unwrap()
    }

    #[test]
    fn test_skewed_streams_pair_up_every_frame() {
        // 30 fps, 25% tolerance = 8.33ms; a constant 2ms skew stays in sync
        let depth_file = write_depth_stream(&[0, 33, 66, 99]);
        let color_file = write_color_stream(&[2, 35, 68, 101]);
        let mut depth = open(&depth_file);
        let mut color = open(&color_file);
        let sync = StreamSynchronizer::new(0.25, None);

        for expected in [0u64, 33, 66, 99] {
            let result = sync.synchronize(&mut depth, &mut color).unwrap();
            assert!(result.in_sync);
            assert_eq!(result.depth_ts, Some(expected * MS));
            assert_eq!(result.delta_ns, -2 * MS as i64);
            depth.skip_current_record().unwrap();
            color.skip_current_record().unwrap();
        }
    }

    #[test]
    fn test_gap_in_color_stream_skips_earlier_head() {
        // Color misses its 68ms record; depth 66 has no partner and must be
        // consumed before the streams pair up again at (99, 101).
        let depth_file = write_depth_stream(&[0, 33, 66, 99]);
        let color_file = write_color_stream(&[2, 35, 101]);
        let mut depth = open(&depth_file);
        let mut color = open(&color_file);
        let sync = StreamSynchronizer::new(0.25, None);

        for _ in 0..2 {
            let result = sync.synchronize(&mut depth, &mut color).unwrap();
            assert!(result.in_sync);
            depth.skip_current_record().unwrap();
            color.skip_current_record().unwrap();
        }

        let result = sync.synchronize(&mut depth, &mut color).unwrap();
        assert_eq!(result.depth_ts, Some(99 * MS));
        assert_eq!(result.color_ts, Some(101 * MS));
        // Exactly the orphaned depth record was skipped
        assert_eq!(depth.records_read(), 3);
        assert_eq!(color.records_read(), 2);
    }

    #[test]
    fn test_exhaustion_is_an_error() {
        let depth_file = write_depth_stream(&[0, 33, 66]);
        let color_file = write_color_stream(&[500]);
        let mut depth = open(&depth_file);
        let mut color = open(&color_file);
        let sync = StreamSynchronizer::new(0.25, None);

        let err = sync.synchronize(&mut depth, &mut color).unwrap_err();
        assert!(matches!(err, ReplayError::SyncExhausted { .. }));
    }

    #[test]
    fn test_empty_stream_reports_no_data() {
        let depth_file = write_depth_stream(&[]);
        let color_file = write_color_stream(&[2]);
        let mut depth = open(&depth_file);
        let mut color = open(&color_file);
        let sync = StreamSynchronizer::new(0.25, None);

        let result = sync.check(&mut depth, &mut color).unwrap();
        assert!(!result.in_sync);
        assert!(!result.has_data());
        assert_eq!(result.ahead, StreamAhead::Neither);
    }

    #[test]
    fn test_missing_frame_rate_is_surfaced() {
        let depth_file = write_stream(b"RCST", "width=2\nheight=2\nmeta_size=8\n", &[0], 8);
        let color_file = write_stream(
            b"RCSV",
            "width=2\nheight=2\nmeta_size=8\nsize_field=16\n",
            &[2],
            0,
        );
        let mut depth = open(&depth_file);
        let mut color = open(&color_file);

        let sync = StreamSynchronizer::new(0.25, None);
        let err = sync.check(&mut depth, &mut color).unwrap_err();
        assert!(matches!(err, ReplayError::MissingFrameRate { .. }));

        // An explicit fallback is the caller opting in
        let sync = StreamSynchronizer::new(0.25, Some(30.0));
        let result = sync.check(&mut depth, &mut color).unwrap();
        assert!(result.in_sync);
    }

    #[test]
    fn test_tolerance_derivation() {
        let depth_file = write_depth_stream(&[]);
        let color_file = write_color_stream(&[]);
        let depth = open(&depth_file);
        let color = open(&color_file);

        let sync = StreamSynchronizer::new(0.25, None);
        let tolerance = sync.tolerance_ns(depth.header(), color.header()).unwrap();
        // 30 fps -> 33.33ms period; a quarter of it
        assert_eq!(tolerance, 8_333_333);
    }
}
