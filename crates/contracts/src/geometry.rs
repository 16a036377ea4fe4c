//! Camera geometry primitives shared across the pipeline
//!
//! Intrinsics and distortion coefficients come from stream headers; rigid
//! transforms come from the rig calibration file. All are read-only for the
//! lifetime of a playback session.

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// Pinhole intrinsics: focal lengths and principal point, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl Intrinsics {
    /// Normalize a pixel coordinate into camera-plane units.
    #[inline]
    pub fn normalize(&self, u: f64, v: f64) -> (f64, f64) {
        ((u - self.cx) / self.fx, (v - self.cy) / self.fy)
    }

    /// Map a normalized camera-plane coordinate back to pixels.
    #[inline]
    pub fn denormalize(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.fx + self.cx, y * self.fy + self.cy)
    }
}

/// Brown-Conrady rational distortion coefficients.
///
/// Radial terms k1..k6 form the rational model
/// `(1 + k1 r^2 + k2 r^4 + k3 r^6) / (1 + k4 r^2 + k5 r^4 + k6 r^6)`;
/// p1/p2 are the tangential terms.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Distortion {
    pub k1: f64,
    pub k2: f64,
    pub k3: f64,
    pub k4: f64,
    pub k5: f64,
    pub k6: f64,
    pub p1: f64,
    pub p2: f64,
}

impl Distortion {
    /// True when every coefficient is zero (pure pinhole).
    pub fn is_zero(&self) -> bool {
        [
            self.k1, self.k2, self.k3, self.k4, self.k5, self.k6, self.p1, self.p2,
        ]
        .iter()
        .all(|c| *c == 0.0)
    }
}

/// Rigid transform: rotation followed by translation, meters.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidTransform {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

impl RigidTransform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Build from a row-major 9-element rotation and a translation.
    pub fn from_parts(rotation_row_major: [f64; 9], translation: [f64; 3]) -> Self {
        Self {
            rotation: Matrix3::from_row_slice(&rotation_row_major),
            translation: Vector3::from_column_slice(&translation),
        }
    }

    /// Apply to a point: `R * p + t`.
    #[inline]
    pub fn apply(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * p + self.translation
    }

    /// Apply to an f32 point, computing in f64.
    #[inline]
    pub fn apply_f32(&self, p: &Vector3<f32>) -> Vector3<f32> {
        let out = self.apply(&Vector3::new(p.x as f64, p.y as f64, p.z as f64));
        Vector3::new(out.x as f32, out.y as f32, out.z as f32)
    }
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_denormalize_round_trip() {
        let intr = Intrinsics {
            fx: 500.0,
            fy: 505.0,
            cx: 320.5,
            cy: 240.5,
        };
        let (x, y) = intr.normalize(100.0, 50.0);
        let (u, v) = intr.denormalize(x, y);
        assert!((u - 100.0).abs() < 1e-12);
        assert!((v - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_identity_transform() {
        let t = RigidTransform::identity();
        let p = Vector3::new(1.0, 2.0, 3.0);
        assert_eq!(t.apply(&p), p);
    }

    #[test]
    fn test_transform_translation_only() {
        let t = RigidTransform::from_parts(
            [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            [0.032, 0.0, -0.002],
        );
        let out = t.apply(&Vector3::new(0.0, 0.0, 1.0));
        assert!((out.x - 0.032).abs() < 1e-12);
        assert!((out.z - 0.998).abs() < 1e-12);
    }

    #[test]
    fn test_zero_distortion() {
        assert!(Distortion::default().is_zero());
        let d = Distortion {
            k1: 0.1,
            ..Default::default()
        };
        assert!(!d.is_zero());
    }
}
