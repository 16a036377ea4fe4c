//! # Sync Engine
//!
//! Pairs the head records of two independently-clocked sensor streams and
//! seeks over them.
//!
//! The two streams of one device (depth and color) advance at nominally the
//! same rate but on drifting clocks. The synchronizer compares head
//! timestamps against a frame-rate-derived tolerance and catches the lagging
//! stream up with a greedy two-pointer merge; the seeker layers forward-only
//! frame/timestamp addressing on top, replaying from the start when a target
//! lies behind the cursor.

mod seeker;
mod synchronizer;

pub use seeker::FrameSeeker;
pub use synchronizer::StreamSynchronizer;

/// Result alias over the unified pipeline error.
pub type Result<T> = std::result::Result<T, contracts::ReplayError>;
