//! SyncResult / SeekOutcome - Sync Engine output
//!
//! Transient synchronization state; used between the synchronizer and the
//! seeker, never persisted.

use serde::{Deserialize, Serialize};

/// Which stream's head record is currently ahead in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamAhead {
    Depth,
    Color,
    /// Heads are within tolerance, or at least one stream has no data.
    Neither,
}

/// Result of comparing the two stream heads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncResult {
    /// Head timestamp of the depth stream, if it has data
    pub depth_ts: Option<u64>,

    /// Head timestamp of the color stream, if it has data
    pub color_ts: Option<u64>,

    /// `depth_ts - color_ts`, nanoseconds; 0 when either head is missing
    pub delta_ns: i64,

    /// Heads are within the frame-rate-derived tolerance
    pub in_sync: bool,

    /// The stream whose head is later (the other one must catch up)
    pub ahead: StreamAhead,
}

impl SyncResult {
    /// "Not synchronized, no data" result.
    pub fn no_data(depth_ts: Option<u64>, color_ts: Option<u64>) -> Self {
        Self {
            depth_ts,
            color_ts,
            delta_ns: 0,
            in_sync: false,
            ahead: StreamAhead::Neither,
        }
    }

    /// Both heads present.
    pub fn has_data(&self) -> bool {
        self.depth_ts.is_some() && self.color_ts.is_some()
    }

    /// Timestamp of the synchronized pair (the depth head, by convention).
    /// Only meaningful when `in_sync`.
    pub fn pair_ts(&self) -> Option<u64> {
        if self.in_sync { self.depth_ts } else { None }
    }
}

/// Result of a seek operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeekOutcome {
    /// A synchronized pair at/after the target was found
    pub reached: bool,

    /// Timestamp of that pair; the last synchronized position on failure
    pub actual_ts_ns: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_data_is_not_in_sync() {
        let r = SyncResult::no_data(Some(5), None);
        assert!(!r.in_sync);
        assert!(!r.has_data());
        assert_eq!(r.ahead, StreamAhead::Neither);
        assert_eq!(r.pair_ts(), None);
    }

    #[test]
    fn test_pair_ts_only_when_synced() {
        let r = SyncResult {
            depth_ts: Some(100),
            color_ts: Some(102),
            delta_ns: -2,
            in_sync: true,
            ahead: StreamAhead::Neither,
        };
        assert_eq!(r.pair_ts(), Some(100));
    }
}
