//! FrameSeeker - forward-only frame and timestamp addressing
//!
//! Owns one device's depth/color parser pair. The underlying streams only
//! move forward, so a target behind the cursor forces a full reset and
//! replay; backward scrubbing is O(n) by design and its replay cost is
//! exported as a metric.

use contracts::{ReplayError, SeekOutcome, StreamRecord};
use stream_parser::SensorStreamParser;
use tracing::{debug, instrument};

use crate::synchronizer::StreamSynchronizer;
use crate::Result;

/// Seeks a synchronized depth/color pair to a frame index or timestamp.
pub struct FrameSeeker {
    depth: SensorStreamParser,
    color: SensorStreamParser,
    synchronizer: StreamSynchronizer,
    /// Timestamp of the newest synchronized pair located so far
    position_ns: Option<u64>,
}

impl FrameSeeker {
    /// Build a seeker over an opened parser pair.
    pub fn new(
        depth: SensorStreamParser,
        color: SensorStreamParser,
        synchronizer: StreamSynchronizer,
    ) -> Self {
        Self {
            depth,
            color,
            synchronizer,
            position_ns: None,
        }
    }

    /// Depth parser header access.
    pub fn depth_header(&self) -> &contracts::StreamHeader {
        self.depth.header()
    }

    /// Color parser header access.
    pub fn color_header(&self) -> &contracts::StreamHeader {
        self.color.header()
    }

    /// Timestamp of the newest synchronized pair located so far.
    pub fn position_ns(&self) -> Option<u64> {
        self.position_ns
    }

    /// Locate the first synchronized pair at or after `target_ns`.
    ///
    /// A target behind the current position resets and replays both streams
    /// first; there is no backward primitive. On success the pair is left
    /// unconsumed at the stream heads, ready for [`read_pair`].
    ///
    /// Returns `reached = false` when a stream is exhausted before the
    /// target; `actual_ts_ns` then holds the last synchronized position.
    ///
    /// [`read_pair`]: FrameSeeker::read_pair
    #[instrument(name = "seeker_seek_to_timestamp", skip(self), fields(target_ns))]
    pub fn seek_to_timestamp(&mut self, target_ns: u64) -> Result<SeekOutcome> {
        if let Some(position) = self.position_ns {
            if target_ns < position {
                debug!(position, target_ns, "target behind cursor, replaying from start");
                metrics::counter!("replay_seek_resets_total").increment(1);
                self.reset()?;
            }
        }

        let mut replayed: u64 = 0;
        loop {
            let result = match self.synchronizer.synchronize(&mut self.depth, &mut self.color) {
                Ok(result) => result,
                Err(ReplayError::SyncExhausted { .. }) => {
                    metrics::histogram!("replay_seek_records_replayed").record(replayed as f64);
                    return Ok(SeekOutcome {
                        reached: false,
                        actual_ts_ns: self.position_ns.unwrap_or(0),
                    });
                }
                Err(e) => return Err(e),
            };

            // Synchronized pair timestamps are the depth head by convention
            let pair_ts = result.pair_ts().expect("synchronize returned a pair");
            self.position_ns = Some(pair_ts);

            if pair_ts >= target_ns {
                metrics::histogram!("replay_seek_records_replayed").record(replayed as f64);
                return Ok(SeekOutcome {
                    reached: true,
                    actual_ts_ns: pair_ts,
                });
            }

            // Pair is before the target: consume both and keep walking
            self.depth.skip_current_record()?;
            self.color.skip_current_record()?;
            replayed += 2;
        }
    }

    /// Read and decode the synchronized pair a successful seek left at the
    /// stream heads.
    ///
    /// Bulk mode is selected per stream: CPU reconstruction keeps packed
    /// depth cheap to accept but must sample decoded color pixels, so the
    /// two flags commonly differ.
    pub fn read_pair(
        &mut self,
        depth_bulk: bool,
        color_bulk: bool,
    ) -> Result<(&StreamRecord, &StreamRecord)> {
        if !self.depth.read_next_record(depth_bulk)? {
            return Err(ReplayError::SyncExhausted {
                depth_ts: None,
                color_ts: self.color.peek_next_timestamp()?,
            });
        }
        if !self.color.read_next_record(color_bulk)? {
            return Err(ReplayError::SyncExhausted {
                depth_ts: Some(self.depth.record().timestamp_ns),
                color_ts: None,
            });
        }
        Ok((self.depth.record(), self.color.record()))
    }

    /// Timestamp of synchronized pair number `frame_index` (0-based).
    ///
    /// Replays deterministically from the start counting pairs. If the
    /// recording ends first, falls back to the estimate
    /// `frame_index * period`; callers treat estimated and exact values
    /// identically, both being inputs to the same seek contract.
    #[instrument(name = "seeker_timestamp_for_frame", skip(self), fields(frame_index))]
    pub fn timestamp_for_frame(&mut self, frame_index: u64) -> Result<u64> {
        self.reset()?;

        let mut counted: u64 = 0;
        loop {
            let result = match self.synchronizer.synchronize(&mut self.depth, &mut self.color) {
                Ok(result) => result,
                Err(ReplayError::SyncExhausted { .. }) => {
                    let fps = self
                        .synchronizer
                        .frame_rate(self.depth.header(), self.color.header())?;
                    let period_ns = 1_000_000_000.0 / fps;
                    let estimate = (frame_index as f64 * period_ns).round() as u64;
                    debug!(frame_index, estimate, "recording shorter than frame index, estimating");
                    return Ok(estimate);
                }
                Err(e) => return Err(e),
            };

            let pair_ts = result.pair_ts().expect("synchronize returned a pair");
            self.position_ns = Some(pair_ts);

            if counted == frame_index {
                return Ok(pair_ts);
            }
            counted += 1;
            self.depth.skip_current_record()?;
            self.color.skip_current_record()?;
        }
    }

    /// Reset both parsers to their first record.
    pub fn reset(&mut self) -> Result<()> {
        self.depth.reset()?;
        self.color.reset()?;
        self.position_ns = None;
        Ok(())
    }
}

impl std::fmt::Debug for FrameSeeker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSeeker")
            .field("position_ns", &self.position_ns)
            .field("depth", &self.depth)
            .field("color", &self.color)
            .finish()
    }
}
