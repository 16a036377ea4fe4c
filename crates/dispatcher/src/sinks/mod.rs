//! Sink implementations

mod log;
mod ply;

pub use log::LogSink;
pub use ply::{PlyFileSink, PlySinkConfig};
