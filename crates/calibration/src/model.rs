//! Brown-Conrady rational distortion model
//!
//! Forward distortion maps an ideal normalized camera-plane coordinate to
//! the distorted coordinate the sensor actually observed. The inverse has
//! no closed form; it is solved by fixed-point iteration, which converges
//! quickly for lens parameters in the range these sensors report.

use contracts::Distortion;

/// Iteration cap for the inverse solve.
const MAX_ITERATIONS: usize = 20;

/// Step size below which the fixed-point iteration is considered converged.
const CONVERGENCE_EPS: f64 = 1e-10;

/// Residual bound for accepting a solution: forward-distorting the result
/// must land this close to the observed coordinate.
const ACCEPT_EPS: f64 = 1e-6;

/// Apply forward distortion to a normalized camera-plane coordinate.
pub fn distort(d: &Distortion, x: f64, y: f64) -> (f64, f64) {
    let r2 = x * x + y * y;
    let r4 = r2 * r2;
    let r6 = r4 * r2;

    let radial =
        (1.0 + d.k1 * r2 + d.k2 * r4 + d.k3 * r6) / (1.0 + d.k4 * r2 + d.k5 * r4 + d.k6 * r6);

    let dx = 2.0 * d.p1 * x * y + d.p2 * (r2 + 2.0 * x * x);
    let dy = d.p1 * (r2 + 2.0 * y * y) + 2.0 * d.p2 * x * y;

    (x * radial + dx, y * radial + dy)
}

/// Invert the distortion model for one observed coordinate.
///
/// Returns `None` when the iteration diverges or the residual check fails;
/// such pixels get no LUT ray and are skipped during reconstruction.
pub fn undistort(d: &Distortion, xd: f64, yd: f64) -> Option<(f64, f64)> {
    if d.is_zero() {
        return Some((xd, yd));
    }

    let (mut x, mut y) = (xd, yd);

    for _ in 0..MAX_ITERATIONS {
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;

        let radial =
            (1.0 + d.k1 * r2 + d.k2 * r4 + d.k3 * r6) / (1.0 + d.k4 * r2 + d.k5 * r4 + d.k6 * r6);
        if !radial.is_finite() || radial.abs() < 1e-12 {
            return None;
        }

        let dx = 2.0 * d.p1 * x * y + d.p2 * (r2 + 2.0 * x * x);
        let dy = d.p1 * (r2 + 2.0 * y * y) + 2.0 * d.p2 * x * y;

        let x_next = (xd - dx) / radial;
        let y_next = (yd - dy) / radial;

        let step = (x_next - x).abs().max((y_next - y).abs());
        x = x_next;
        y = y_next;
        if step < CONVERGENCE_EPS {
            break;
        }
    }

    if !x.is_finite() || !y.is_finite() {
        return None;
    }

    let (rx, ry) = distort(d, x, y);
    let residual = ((rx - xd).powi(2) + (ry - yd).powi(2)).sqrt();
    if residual < ACCEPT_EPS {
        Some((x, y))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_distortion() -> Distortion {
        // In-range coefficients for a wide depth lens
        Distortion {
            k1: 0.12,
            k2: -0.05,
            k3: 0.006,
            k4: 0.45,
            k5: -0.02,
            k6: 0.001,
            p1: 0.0003,
            p2: -0.0002,
        }
    }

    #[test]
    fn test_zero_distortion_is_identity() {
        let d = Distortion::default();
        let (x, y) = distort(&d, 0.3, -0.2);
        assert_eq!((x, y), (0.3, -0.2));
        assert_eq!(undistort(&d, 0.3, -0.2), Some((0.3, -0.2)));
    }

    #[test]
    fn test_undistort_inverts_distort() {
        let d = sample_distortion();
        for &(x, y) in &[(0.0, 0.0), (0.25, 0.1), (-0.4, 0.3), (0.5, -0.5)] {
            let (xd, yd) = distort(&d, x, y);
            let (xu, yu) = undistort(&d, xd, yd).expect("should converge");
            assert!((xu - x).abs() < 1e-7, "x: {xu} vs {x}");
            assert!((yu - y).abs() < 1e-7, "y: {yu} vs {y}");
        }
    }

    #[test]
    fn test_round_trip_through_forward() {
        let d = sample_distortion();
        let (xd, yd) = (0.31, -0.17);
        let (xu, yu) = undistort(&d, xd, yd).unwrap();
        let (rx, ry) = distort(&d, xu, yu);
        assert!((rx - xd).abs() < 1e-7);
        assert!((ry - yd).abs() < 1e-7);
    }
}
