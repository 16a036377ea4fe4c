//! PointCloudReconstructor - per-pixel unprojection and color sampling

use std::borrow::Cow;

use calibration::{distort, CalibrationSet};
use contracts::{RecordPayload, ReconstructedPoint, ReplayError, StreamRecord};
use nalgebra::Vector3;
use rayon::prelude::*;
use tracing::instrument;

use crate::Result;

/// Color for points whose projection misses the color image. The point is
/// kept with alpha 0 (geometry preserved, consumers filter on alpha); this
/// is the single policy for the out-of-bounds case.
const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];

/// Execution strategy for one reconstruction call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Per-pixel synchronous loop; the reference path.
    #[default]
    Sequential,
    /// Row-parallel dispatch. Identical arithmetic, identical output order
    /// (rows concatenated in index order).
    Batched,
}

/// Reconstruction options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconstructOptions {
    pub execution: ExecutionMode,
}

/// Reconstructs colored 3D points from synchronized record pairs.
#[derive(Debug, Clone, Default)]
pub struct PointCloudReconstructor {
    options: ReconstructOptions,
}

/// Borrowed view of a decoded color image.
#[derive(Clone, Copy)]
struct ColorView<'a> {
    width: u32,
    height: u32,
    rgba: &'a [u8],
}

impl PointCloudReconstructor {
    pub fn new(options: ReconstructOptions) -> Self {
        Self { options }
    }

    /// Reconstruct one frame.
    ///
    /// Accepts decoded or bulk depth payloads; the color record must be
    /// decoded (`ColorPixels`), since sampling needs pixels - bulk color is
    /// only for consumers that never sample on the CPU.
    #[instrument(
        name = "reconstruct_frame",
        skip_all,
        fields(depth_ts = depth.timestamp_ns, color_ts = color.timestamp_ns)
    )]
    pub fn reconstruct(
        &self,
        depth: &StreamRecord,
        color: &StreamRecord,
        calibration: &CalibrationSet,
    ) -> Result<Vec<ReconstructedPoint>> {
        let samples = depth_samples(depth)?;
        let color_view = color_view(color)?;

        let (width, height) = (calibration.lut.width(), calibration.lut.height());
        if samples.len() != (width as usize) * (height as usize) {
            return Err(ReplayError::format(format!(
                "depth payload has {} samples, expected {}x{}",
                samples.len(),
                width,
                height
            )));
        }

        let points = match self.options.execution {
            ExecutionMode::Sequential => {
                let mut points = Vec::with_capacity(samples.len() / 4);
                for v in 0..height {
                    reconstruct_row(v, &samples, calibration, color_view, &mut points);
                }
                points
            }
            ExecutionMode::Batched => {
                let rows: Vec<Vec<ReconstructedPoint>> = (0..height)
                    .into_par_iter()
                    .map(|v| {
                        let mut row = Vec::new();
                        reconstruct_row(v, &samples, calibration, color_view, &mut row);
                        row
                    })
                    .collect();
                rows.into_iter().flatten().collect()
            }
        };

        metrics::counter!("replay_frames_reconstructed_total").increment(1);
        metrics::histogram!("replay_points_per_frame").record(points.len() as f64);

        Ok(points)
    }
}

fn reconstruct_row(
    v: u32,
    samples: &[u16],
    calibration: &CalibrationSet,
    color: ColorView<'_>,
    out: &mut Vec<ReconstructedPoint>,
) {
    let width = calibration.lut.width();
    let row_base = (v as usize) * (width as usize);
    for u in 0..width {
        let raw = samples[row_base + u as usize];
        if let Some(point) = reconstruct_pixel(u, v, raw, calibration, color) {
            out.push(point);
        }
    }
}

#[inline]
fn reconstruct_pixel(
    u: u32,
    v: u32,
    raw: u16,
    calibration: &CalibrationSet,
    color: ColorView<'_>,
) -> Option<ReconstructedPoint> {
    // Zero raw depth means "no measurement", never a point at the origin
    if raw == 0 {
        return None;
    }
    let ray = calibration.lut.ray(u, v)?;

    let z = calibration.metric_depth(raw);
    if z <= 0.0 {
        return None;
    }

    let p = Vector3::new(ray[0] as f64 * z, ray[1] as f64 * z, z);
    let in_color = calibration.depth_to_color.apply(&p);
    let rgba = sample_color(&in_color, calibration, color);

    Some(ReconstructedPoint::new(
        Vector3::new(p.x as f32, p.y as f32, p.z as f32),
        rgba,
    ))
}

/// Project a color-camera-space point into the color image and sample it.
///
/// The forward distortion of the color camera is applied before the
/// intrinsics: the stored image is distorted, so only distorted pixel
/// coordinates sample it correctly.
#[inline]
fn sample_color(p: &Vector3<f64>, calibration: &CalibrationSet, color: ColorView<'_>) -> [u8; 4] {
    if p.z <= 0.0 {
        return TRANSPARENT;
    }

    let (xd, yd) = distort(&calibration.color_distortion, p.x / p.z, p.y / p.z);
    let (u, v) = calibration.color_intrinsics.denormalize(xd, yd);

    let (ui, vi) = (u.round(), v.round());
    if ui < 0.0 || vi < 0.0 || ui >= color.width as f64 || vi >= color.height as f64 {
        return TRANSPARENT;
    }

    let idx = ((vi as usize) * (color.width as usize) + ui as usize) * 4;
    [
        color.rgba[idx],
        color.rgba[idx + 1],
        color.rgba[idx + 2],
        color.rgba[idx + 3],
    ]
}

fn depth_samples(record: &StreamRecord) -> Result<Cow<'_, [u16]>> {
    match &record.payload {
        RecordPayload::DepthSamples(samples) => Ok(Cow::Borrowed(samples)),
        RecordPayload::DepthRaw(raw) => Ok(Cow::Owned(stream_parser::decode_depth_samples(raw)?)),
        other => Err(ReplayError::format(format!(
            "expected a depth payload, got {}",
            payload_name(other)
        ))),
    }
}

fn color_view(record: &StreamRecord) -> Result<ColorView<'_>> {
    match &record.payload {
        RecordPayload::ColorPixels {
            width,
            height,
            rgba,
            ..
        } => Ok(ColorView {
            width: *width,
            height: *height,
            rgba,
        }),
        RecordPayload::ColorRaw(_) => Err(ReplayError::format(
            "color payload was read in bulk mode and cannot be sampled",
        )),
        other => Err(ReplayError::format(format!(
            "expected a color payload, got {}",
            payload_name(other)
        ))),
    }
}

fn payload_name(payload: &RecordPayload) -> &'static str {
    match payload {
        RecordPayload::Empty => "empty",
        RecordPayload::DepthSamples(_) => "depth samples",
        RecordPayload::DepthRaw(_) => "raw depth",
        RecordPayload::ColorPixels { .. } => "color pixels",
        RecordPayload::ColorRaw(_) => "raw color",
    }
}
