//! Stream header parsing
//!
//! Layout: `[4-byte tag][u32 LE text length][key=value text block]`.
//! Unknown keys are ignored so recorders can add fields without breaking
//! older readers.

use std::io::Read;

use contracts::{ReplayError, SizeFieldWidth, StreamHeader, StreamKind, DEPTH_SAMPLE_WIDTH};

use crate::Result;

/// Upper bound on the header text block; anything larger is a corrupt
/// length field, not a real header.
const MAX_HEADER_TEXT_LEN: u32 = 1 << 20;

/// Parse a stream header from the start of `reader`.
///
/// Fails with `ReplayError::Format` on an unrecognized tag, a corrupt
/// length field, non-UTF-8 text, or missing/invalid required keys.
pub fn parse_header<R: Read>(reader: &mut R) -> Result<StreamHeader> {
    let mut tag = [0u8; 4];
    reader
        .read_exact(&mut tag)
        .map_err(|e| ReplayError::format(format!("short read on format tag: {e}")))?;

    let kind = StreamKind::from_tag(&tag).ok_or_else(|| {
        ReplayError::format(format!(
            "unrecognized format tag {:?}",
            String::from_utf8_lossy(&tag)
        ))
    })?;

    let mut len_buf = [0u8; 4];
    reader
        .read_exact(&mut len_buf)
        .map_err(|e| ReplayError::format(format!("short read on header length: {e}")))?;
    let text_len = u32::from_le_bytes(len_buf);
    if text_len == 0 || text_len > MAX_HEADER_TEXT_LEN {
        return Err(ReplayError::format(format!(
            "implausible header text length {text_len}"
        )));
    }

    let mut text = vec![0u8; text_len as usize];
    reader
        .read_exact(&mut text)
        .map_err(|e| ReplayError::format(format!("short read on header text: {e}")))?;
    let text = String::from_utf8(text)
        .map_err(|e| ReplayError::format(format!("header text is not UTF-8: {e}")))?;

    parse_header_text(kind, &text)
}

fn parse_header_text(kind: StreamKind, text: &str) -> Result<StreamHeader> {
    let mut width: Option<u32> = None;
    let mut height: Option<u32> = None;
    let mut fps: Option<f64> = None;
    let mut meta_size: Option<usize> = None;
    let mut size_field = SizeFieldWidth::default();
    let mut payload_size: Option<usize> = None;
    let mut intrinsics_raw: Option<String> = None;
    let mut serial: Option<String> = None;
    let mut device_info: Option<String> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(ReplayError::format(format!(
                "malformed header line: {line:?}"
            )));
        };
        let (key, value) = (key.trim(), value.trim());

        match key {
            "width" => width = Some(parse_num(key, value)?),
            "height" => height = Some(parse_num(key, value)?),
            "fps" => fps = Some(parse_num(key, value)?),
            "meta_size" => meta_size = Some(parse_num(key, value)?),
            "payload_size" => payload_size = Some(parse_num(key, value)?),
            "size_field" => {
                size_field = match value {
                    "16" => SizeFieldWidth::U16,
                    "32" => SizeFieldWidth::U32,
                    other => {
                        return Err(ReplayError::format(format!(
                            "size_field must be 16 or 32, got {other:?}"
                        )))
                    }
                }
            }
            "intrinsics" => intrinsics_raw = Some(value.to_string()),
            "serial" => serial = Some(value.to_string()),
            "device" => device_info = Some(value.to_string()),
            // Unknown keys are forward-compatible noise
            _ => {}
        }
    }

    let width = width.ok_or_else(|| ReplayError::format("header missing required key 'width'"))?;
    let height =
        height.ok_or_else(|| ReplayError::format("header missing required key 'height'"))?;
    let meta_size =
        meta_size.ok_or_else(|| ReplayError::format("header missing required key 'meta_size'"))?;

    if width == 0 || height == 0 {
        return Err(ReplayError::format(format!(
            "degenerate image dimensions {width}x{height}"
        )));
    }
    if meta_size < 8 {
        return Err(ReplayError::format(format!(
            "meta_size {meta_size} cannot hold a u64 timestamp"
        )));
    }

    let header = StreamHeader {
        kind,
        width,
        height,
        fps,
        meta_size,
        size_field,
        intrinsics_raw,
        serial,
        device_info,
    };

    // A declared depth payload size must agree with the sample grid; a size
    // that does not divide into whole u16 samples is corrupt framing, never
    // silently truncated.
    if kind == StreamKind::Depth {
        if let Some(declared) = payload_size {
            if declared % DEPTH_SAMPLE_WIDTH != 0 {
                return Err(ReplayError::format(format!(
                    "depth payload_size {declared} is not a multiple of the sample width"
                )));
            }
            if declared != header.depth_payload_len() {
                return Err(ReplayError::format(format!(
                    "depth payload_size {declared} does not match {width}x{height} u16 samples"
                )));
            }
        }
    }

    Ok(header)
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| ReplayError::format(format!("invalid numeric value for '{key}': {value:?}")))
}
