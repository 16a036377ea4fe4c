//! StreamRecord - the parser's "latest record" slot
//!
//! One record per parser, mutated in place on every advance. No history is
//! retained; callers needing a record beyond the next advance must copy it.

use bytes::Bytes;

/// One decoded record of a sensor stream.
///
/// "Latest record" semantics: the owning parser overwrites this value each
/// time it advances, so a reference is only valid until the next
/// `read_next_record`/`skip_current_record` call.
#[derive(Debug, Clone, Default)]
pub struct StreamRecord {
    /// Device-clock timestamp, nanoseconds
    pub timestamp_ns: u64,

    /// Decoded payload
    pub payload: RecordPayload,
}

/// Record payload, per modality and per execution path.
///
/// The bulk variants keep the bytes in their on-disk packing so batched/GPU
/// consumers skip the per-record conversion; the decoded variants are the
/// sequential reference representation.
#[derive(Debug, Clone, Default)]
pub enum RecordPayload {
    /// Nothing read yet, or the record was skipped (timestamp only).
    #[default]
    Empty,

    /// Dense depth samples, one u16 per pixel, row-major.
    DepthSamples(Vec<u16>),

    /// Depth payload as read: packed u16 little-endian bytes.
    DepthRaw(Bytes),

    /// Decoded color image plus the compressed bytes it came from.
    ColorPixels {
        width: u32,
        height: u32,
        /// RGBA8, row-major
        rgba: Bytes,
        /// Original compressed payload (kept for re-encode-free export)
        compressed: Bytes,
    },

    /// Compressed color payload as read, undecoded.
    ColorRaw(Bytes),
}

impl RecordPayload {
    /// Whether this payload still needs decoding before per-pixel access.
    pub fn is_raw(&self) -> bool {
        matches!(self, Self::DepthRaw(_) | Self::ColorRaw(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        let record = StreamRecord::default();
        assert_eq!(record.timestamp_ns, 0);
        assert!(matches!(record.payload, RecordPayload::Empty));
    }

    #[test]
    fn test_raw_flag() {
        assert!(RecordPayload::DepthRaw(Bytes::new()).is_raw());
        assert!(RecordPayload::ColorRaw(Bytes::new()).is_raw());
        assert!(!RecordPayload::DepthSamples(vec![]).is_raw());
        assert!(!RecordPayload::Empty.is_raw());
    }
}
