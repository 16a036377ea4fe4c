//! Payload decoding helpers
//!
//! Depth payloads are packed u16 little-endian; color payloads are JPEG.

use bytes::Bytes;
use contracts::{ReplayError, DEPTH_SAMPLE_WIDTH};

use crate::Result;

/// Decode a packed little-endian depth payload into u16 samples.
///
/// The payload length is validated against the sample width even though the
/// header already guarantees it; a truncated buffer reaching this point is a
/// framing bug, not data to truncate.
pub fn decode_depth_samples(payload: &[u8]) -> Result<Vec<u16>> {
    if payload.len() % DEPTH_SAMPLE_WIDTH != 0 {
        return Err(ReplayError::format(format!(
            "depth payload of {} bytes is not a multiple of the sample width",
            payload.len()
        )));
    }

    // Aligned buffers cast in place; unaligned ones take the copy path.
    if let Ok(words) = bytemuck::try_cast_slice::<u8, u16>(payload) {
        return Ok(words.iter().map(|w| u16::from_le(*w)).collect());
    }

    Ok(payload
        .chunks_exact(DEPTH_SAMPLE_WIDTH)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Decode a compressed color payload into an RGBA8 pixel buffer.
///
/// Returns `(width, height, rgba)`.
pub fn decode_color_image(compressed: &[u8]) -> Result<(u32, u32, Bytes)> {
    let image = image::load_from_memory(compressed)
        .map_err(|e| ReplayError::format(format!("undecodable color payload: {e}")))?;
    let rgba = image.to_rgba8();
    let (width, height) = (rgba.width(), rgba.height());
    Ok((width, height, Bytes::from(rgba.into_raw())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_depth_le() {
        let payload = [0x01, 0x00, 0xff, 0x00, 0x00, 0x01];
        let samples = decode_depth_samples(&payload).unwrap();
        assert_eq!(samples, vec![1, 255, 256]);
    }

    #[test]
    fn test_decode_depth_misaligned_len() {
        let err = decode_depth_samples(&[0x01, 0x00, 0xff]).unwrap_err();
        assert!(matches!(err, ReplayError::Format { .. }));
    }

    #[test]
    fn test_decode_depth_unaligned_start() {
        // Slice starting at an odd offset exercises the copy path
        let backing = [0u8, 0x02, 0x00, 0x03, 0x00];
        let samples = decode_depth_samples(&backing[1..]).unwrap();
        assert_eq!(samples, vec![2, 3]);
    }

    #[test]
    fn test_decode_color_jpeg() {
        // 2x2 solid image round-tripped through the jpeg encoder
        let img = image::RgbImage::from_pixel(2, 2, image::Rgb([200u8, 100, 50]));
        let mut jpeg = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut jpeg),
            image::ImageFormat::Jpeg,
        )
        .unwrap();

        let (w, h, rgba) = decode_color_image(&jpeg).unwrap();
        assert_eq!((w, h), (2, 2));
        assert_eq!(rgba.len(), 2 * 2 * 4);
        assert_eq!(rgba[3], 255); // alpha filled in
    }

    #[test]
    fn test_decode_color_garbage() {
        let err = decode_color_image(&[0xde, 0xad, 0xbe, 0xef]).unwrap_err();
        assert!(err.to_string().contains("undecodable"));
    }
}
