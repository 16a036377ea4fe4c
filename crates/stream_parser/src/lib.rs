//! # Stream Parser
//!
//! Sequential, forward-only reader over one recorded sensor stream.
//!
//! Responsibilities:
//! - Parse the self-describing stream header (format tag + key-value block)
//! - Decode one record (timestamp + payload) at a time, for either modality
//! - Cheap peek/skip primitives for synchronization catch-up
//! - Reset (reopen + reparse) as the only way back - there is no backward seek
//!
//! ## Usage Example
//!
//! ```ignore
//! use stream_parser::SensorStreamParser;
//!
//! let mut parser = SensorStreamParser::open("cam0_depth.rcs")?;
//! while parser.read_next_record(false)? {
//!     let record = parser.record();
//!     println!("ts={}ns", record.timestamp_ns);
//! }
//! ```

mod decode;
mod header;
mod parser;

pub use decode::{decode_color_image, decode_depth_samples};
pub use header::parse_header;
pub use parser::SensorStreamParser;

/// Result alias over the unified pipeline error.
pub type Result<T> = std::result::Result<T, contracts::ReplayError>;
