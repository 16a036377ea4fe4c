//! Synthetic recording builders for integration tests.
//!
//! Writes RCST/RCSV stream files and rig entries with controllable
//! timestamps, depth content and calibration, so end-to-end scenarios can
//! be scripted without real sensor captures.

use std::io::Write;
use std::path::{Path, PathBuf};

use contracts::{DeviceConfig, TransformConfig};

/// Nanoseconds per millisecond.
pub const MS: u64 = 1_000_000;

/// Identity pinhole intrinsics string: normalized rays equal pixel indices.
pub const IDENTITY_INTRINSICS: &str = "1,1,0,0,0,0,0,0,0,0,0,0";

/// Parameters of one synthetic stream.
#[derive(Debug, Clone)]
pub struct StreamSpec {
    pub width: u32,
    pub height: u32,
    pub fps: Option<f64>,
    pub serial: String,
    pub intrinsics: Option<String>,
    pub timestamps_ns: Vec<u64>,
}

impl StreamSpec {
    /// Spec with `frames` timestamps at `fps` plus a constant skew.
    pub fn at_rate(serial: &str, width: u32, height: u32, fps: f64, frames: u64, skew_ns: u64) -> Self {
        let period = (1e9 / fps).round() as u64;
        Self {
            width,
            height,
            fps: Some(fps),
            serial: serial.to_string(),
            intrinsics: Some(IDENTITY_INTRINSICS.to_string()),
            timestamps_ns: (0..frames).map(|k| k * period + skew_ns).collect(),
        }
    }
}

fn header_text(spec: &StreamSpec, color: bool) -> String {
    let mut text = format!(
        "width={}\nheight={}\nmeta_size=16\nserial={}\n",
        spec.width, spec.height, spec.serial
    );
    if let Some(fps) = spec.fps {
        text.push_str(&format!("fps={fps}\n"));
    }
    if let Some(intrinsics) = &spec.intrinsics {
        text.push_str(&format!("intrinsics={intrinsics}\n"));
    }
    if color {
        text.push_str("size_field=32\n");
    }
    text
}

fn write_prefix(file: &mut std::fs::File, tag: &[u8; 4], header: &str) -> std::io::Result<()> {
    file.write_all(tag)?;
    file.write_all(&(header.len() as u32).to_le_bytes())?;
    file.write_all(header.as_bytes())?;
    Ok(())
}

fn write_meta(file: &mut std::fs::File, ts: u64) -> std::io::Result<()> {
    let mut meta = [0u8; 16];
    meta[..8].copy_from_slice(&ts.to_le_bytes());
    file.write_all(&meta)
}

/// Write a depth stream; `sample` maps (frame, u, v) to a raw u16.
pub fn write_depth_stream(
    path: &Path,
    spec: &StreamSpec,
    sample: impl Fn(usize, u32, u32) -> u16,
) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    write_prefix(&mut file, b"RCST", &header_text(spec, false))?;
    for (frame, ts) in spec.timestamps_ns.iter().enumerate() {
        write_meta(&mut file, *ts)?;
        for v in 0..spec.height {
            for u in 0..spec.width {
                file.write_all(&sample(frame, u, v).to_le_bytes())?;
            }
        }
    }
    Ok(())
}

/// Write a color stream; `pixel` maps (frame, u, v) to RGB.
pub fn write_color_stream(
    path: &Path,
    spec: &StreamSpec,
    pixel: impl Fn(usize, u32, u32) -> [u8; 3],
) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    write_prefix(&mut file, b"RCSV", &header_text(spec, true))?;
    for (frame, ts) in spec.timestamps_ns.iter().enumerate() {
        let image = image::RgbImage::from_fn(spec.width, spec.height, |u, v| {
            image::Rgb(pixel(frame, u, v))
        });
        let mut jpeg = Vec::new();
        image
            .write_to(
                &mut std::io::Cursor::new(&mut jpeg),
                image::ImageFormat::Jpeg,
            )
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        write_meta(&mut file, *ts)?;
        file.write_all(&(jpeg.len() as u32).to_le_bytes())?;
        file.write_all(&jpeg)?;
    }
    Ok(())
}

/// Write a full device: uniform depth, solid color, constant color skew.
///
/// Returns the device entry pointing at the two files in `dir`.
pub fn write_device(
    dir: &Path,
    serial: &str,
    width: u32,
    height: u32,
    fps: f64,
    frames: u64,
    color_skew_ns: u64,
    depth_raw: u16,
) -> std::io::Result<DeviceConfig> {
    let depth_path = dir.join(format!("{serial}_depth.rcs"));
    let color_path = dir.join(format!("{serial}_color.rcs"));

    let depth_spec = StreamSpec::at_rate(serial, width, height, fps, frames, 0);
    write_depth_stream(&depth_path, &depth_spec, |_, _, _| depth_raw)?;

    let color_spec = StreamSpec::at_rate(serial, width, height, fps, frames, color_skew_ns);
    write_color_stream(&color_path, &color_spec, |_, _, _| [128, 96, 64])?;

    Ok(device_config(serial, depth_path, color_path))
}

/// Minimal device entry with identity extrinsics.
pub fn device_config(serial: &str, depth_stream: PathBuf, color_stream: PathBuf) -> DeviceConfig {
    DeviceConfig {
        serial: serial.to_string(),
        name: None,
        depth_stream,
        color_stream,
        depth_scale: 0.001,
        depth_bias: 0.0,
        depth_to_color: TransformConfig::identity(),
        world_pose: None,
    }
}
