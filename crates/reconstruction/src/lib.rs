//! # Reconstruction
//!
//! Converts one synchronized depth/color record pair plus calibration into
//! a buffer of colored 3D points.
//!
//! For every depth pixel with a nonzero sample: metric depth via the
//! per-device scale/bias, ray lookup in the precomputed undistortion table,
//! unprojection into depth-camera space, rigid transform into color-camera
//! space, forward-distorted projection into the color image, color sample.
//! Zero-depth pixels never emit a point - sparsity is the contract, not an
//! accident.
//!
//! Two execution strategies produce identical numeric results: a sequential
//! reference path and a row-parallel batched path.

mod reconstructor;

pub use reconstructor::{ExecutionMode, PointCloudReconstructor, ReconstructOptions};

/// Result alias over the unified pipeline error.
pub type Result<T> = std::result::Result<T, contracts::ReplayError>;
