//! StreamHeader - self-describing metadata of one recorded sensor stream
//!
//! Parsed once at open time by the stream parser; immutable afterwards and
//! owned exclusively by its parser instance.

use serde::{Deserialize, Serialize};

/// 4-byte format tag opening a depth stream file.
pub const DEPTH_FORMAT_TAG: &[u8; 4] = b"RCST";

/// 4-byte format tag opening a color stream file.
pub const COLOR_FORMAT_TAG: &[u8; 4] = b"RCSV";

/// Bytes of a depth sample (u16 little-endian).
pub const DEPTH_SAMPLE_WIDTH: usize = 2;

/// Stream modality, derived from the format tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    /// Dense u16 depth samples, fixed payload size per record.
    Depth,
    /// Compressed color image, payload size read per record.
    Color,
}

impl StreamKind {
    /// Resolve a format tag; `None` for unrecognized tags.
    pub fn from_tag(tag: &[u8; 4]) -> Option<Self> {
        match tag {
            t if t == DEPTH_FORMAT_TAG => Some(Self::Depth),
            t if t == COLOR_FORMAT_TAG => Some(Self::Color),
            _ => None,
        }
    }

    /// The tag that opens a stream of this kind.
    pub fn tag(&self) -> &'static [u8; 4] {
        match self {
            Self::Depth => DEPTH_FORMAT_TAG,
            Self::Color => COLOR_FORMAT_TAG,
        }
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Depth => write!(f, "depth"),
            Self::Color => write!(f, "color"),
        }
    }
}

/// Width of the per-record compressed-payload size field (color streams).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SizeFieldWidth {
    /// u16 little-endian; bounds payloads to 65535 bytes.
    U16,
    /// u32 little-endian.
    #[default]
    U32,
}

impl SizeFieldWidth {
    /// Byte width of the size field on the wire.
    pub fn byte_len(&self) -> usize {
        match self {
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }
}

/// Parsed stream header.
///
/// Immutable once parsed. Every record that follows the header text block
/// carries `meta_size` metadata bytes (u64 LE timestamp at offset 0) plus
/// a modality-specific payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamHeader {
    /// Stream modality (from the 4-byte format tag)
    pub kind: StreamKind,

    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Nominal frame rate; absent headers surface `MissingFrameRate`
    /// wherever a rate is required
    pub fps: Option<f64>,

    /// Per-record metadata byte count (>= 8; timestamp lives at offset 0)
    pub meta_size: usize,

    /// Size-field width for color payloads; ignored by depth streams
    pub size_field: SizeFieldWidth,

    /// Raw intrinsics/distortion parameter string
    /// (order: fx,fy,cx,cy,k1,k2,k3,k4,k5,k6,p1,p2)
    pub intrinsics_raw: Option<String>,

    /// Recording device serial; joins the stream to its rig calibration entry
    pub serial: Option<String>,

    /// Free-form device info, opaque to the pipeline
    pub device_info: Option<String>,
}

impl StreamHeader {
    /// Fixed depth payload length in bytes (`width * height * 2`).
    pub fn depth_payload_len(&self) -> usize {
        self.width as usize * self.height as usize * DEPTH_SAMPLE_WIDTH
    }

    /// Nominal frame period in nanoseconds, if the header declares a rate.
    pub fn frame_period_ns(&self) -> Option<u64> {
        self.fps
            .filter(|f| *f > 0.0)
            .map(|f| (1_000_000_000.0 / f).round() as u64)
    }
}
