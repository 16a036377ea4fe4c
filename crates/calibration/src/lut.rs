//! Precomputed per-pixel undistortion lookup table
//!
//! The inverse distortion solve runs once per pixel at load time; frame
//! reconstruction is then a table lookup. This trade is what keeps
//! per-frame reconstruction tractable.

use contracts::{Distortion, Intrinsics};
use tracing::debug;

/// One corrected normalized ray per raw pixel coordinate.
///
/// Rays are stored as `(x, y)` camera-plane components of a unit-z ray;
/// pixels whose inverse solve failed hold NaN and are skipped downstream.
pub struct UndistortionLut {
    width: u32,
    height: u32,
    rays: Vec<[f32; 2]>,
}

impl UndistortionLut {
    /// Solve the inverse distortion model for every pixel of a
    /// `width` x `height` grid.
    pub fn build(
        intrinsics: &Intrinsics,
        distortion: &Distortion,
        width: u32,
        height: u32,
    ) -> Self {
        let mut rays = Vec::with_capacity(width as usize * height as usize);
        let mut invalid = 0usize;

        for v in 0..height {
            for u in 0..width {
                let (xd, yd) = intrinsics.normalize(u as f64, v as f64);
                match crate::model::undistort(distortion, xd, yd) {
                    Some((x, y)) => rays.push([x as f32, y as f32]),
                    None => {
                        invalid += 1;
                        rays.push([f32::NAN, f32::NAN]);
                    }
                }
            }
        }

        if invalid > 0 {
            debug!(
                invalid,
                total = rays.len(),
                "undistortion solve failed for some pixels; they will emit no points"
            );
        }

        Self {
            width,
            height,
            rays,
        }
    }

    /// Grid width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Corrected ray for a pixel; `None` outside the grid or where the
    /// solve failed.
    #[inline]
    pub fn ray(&self, u: u32, v: u32) -> Option<[f32; 2]> {
        if u >= self.width || v >= self.height {
            return None;
        }
        let ray = self.rays[(v * self.width + u) as usize];
        if ray[0].is_nan() {
            None
        } else {
            Some(ray)
        }
    }

    /// Raw ray storage, row-major. NaN entries mark failed pixels.
    pub fn rays(&self) -> &[[f32; 2]] {
        &self.rays
    }
}

impl std::fmt::Debug for UndistortionLut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndistortionLut")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::distort;

    fn test_intrinsics() -> Intrinsics {
        Intrinsics {
            fx: 250.0,
            fy: 250.0,
            cx: 16.0,
            cy: 12.0,
        }
    }

    fn test_distortion() -> Distortion {
        Distortion {
            k1: 0.1,
            k2: -0.02,
            k4: 0.3,
            p1: 0.0002,
            p2: -0.0001,
            ..Default::default()
        }
    }

    #[test]
    fn test_lut_round_trip_law() {
        // Forward-distorting a LUT ray must land back on the source pixel
        let intr = test_intrinsics();
        let dist = test_distortion();
        let lut = UndistortionLut::build(&intr, &dist, 32, 24);

        for v in 0..24 {
            for u in 0..32 {
                let ray = lut.ray(u, v).expect("all pixels converge on this grid");
                let (xd, yd) = distort(&dist, ray[0] as f64, ray[1] as f64);
                let (pu, pv) = intr.denormalize(xd, yd);
                assert!(
                    (pu - u as f64).abs() < 1e-3,
                    "pixel ({u},{v}): u round trip {pu}"
                );
                assert!(
                    (pv - v as f64).abs() < 1e-3,
                    "pixel ({u},{v}): v round trip {pv}"
                );
            }
        }
    }

    #[test]
    fn test_zero_distortion_rays_are_normalized_pixels() {
        let intr = test_intrinsics();
        let lut = UndistortionLut::build(&intr, &Distortion::default(), 8, 8);
        let ray = lut.ray(4, 2).unwrap();
        let (x, y) = intr.normalize(4.0, 2.0);
        assert!((ray[0] as f64 - x).abs() < 1e-7);
        assert!((ray[1] as f64 - y).abs() < 1e-7);
    }

    #[test]
    fn test_out_of_grid_is_none() {
        let lut = UndistortionLut::build(&test_intrinsics(), &Distortion::default(), 4, 4);
        assert!(lut.ray(4, 0).is_none());
        assert!(lut.ray(0, 4).is_none());
    }
}
