//! # Aggregator
//!
//! Runs N per-camera pipelines against one global target timestamp and
//! merges their outputs in the shared world frame.
//!
//! The object graph is explicit and test-constructible: each
//! `DevicePipeline` owns its parser pair, calibration and seeker; the
//! `MultiStreamAggregator` owns the pipelines and nothing else owns them.
//! There are no global singletons.
//!
//! `process_frame` is synchronous request/response - it fully completes
//! (seek, decode, reconstruct, merge) before returning, and a single
//! in-flight gate drops overlapping requests instead of queueing them.
//! Callers wanting a background pipeline use [`ReplayWorker`], which owns
//! the aggregator exclusively on a dedicated thread and communicates over
//! channels carrying immutable frames; no parser state crosses threads.

mod aggregator;
mod pipeline;
mod worker;

pub use aggregator::MultiStreamAggregator;
pub use pipeline::{DeviceFrame, DevicePipeline};
pub use worker::{ReplayWorker, WorkerHandle};

/// Result alias over the unified pipeline error.
pub type Result<T> = std::result::Result<T, contracts::ReplayError>;
