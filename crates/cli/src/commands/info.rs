//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Stream info for JSON output
#[derive(Serialize)]
struct StreamInfo {
    path: String,
    kind: String,
    width: u32,
    height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    fps: Option<f64>,
    meta_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    serial: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    device_info: Option<String>,
    has_intrinsics: bool,
    record_count: u64,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(stream = %args.stream.display(), "Inspecting stream header");

    if !args.stream.exists() {
        anyhow::bail!("Stream file not found: {}", args.stream.display());
    }

    let mut parser = stream_parser::SensorStreamParser::open(&args.stream)
        .with_context(|| format!("Failed to open stream {}", args.stream.display()))?;

    // Walk the records cheaply for a count; headers do not store it
    let mut record_count: u64 = 0;
    while parser
        .skip_current_record()
        .with_context(|| format!("Corrupt record {} in stream", record_count))?
    {
        record_count += 1;
    }

    let header = parser.header();
    let stream_info = StreamInfo {
        path: args.stream.display().to_string(),
        kind: header.kind.to_string(),
        width: header.width,
        height: header.height,
        fps: header.fps,
        meta_size: header.meta_size,
        serial: header.serial.clone(),
        device_info: header.device_info.clone(),
        has_intrinsics: header.intrinsics_raw.is_some(),
        record_count,
    };

    if args.json {
        let json =
            serde_json::to_string_pretty(&stream_info).context("Failed to serialize stream info")?;
        println!("{}", json);
    } else {
        print_stream_info(&stream_info);
    }

    Ok(())
}

fn print_stream_info(info: &StreamInfo) {
    println!("Stream: {}", info.path);
    println!("  Kind: {}", info.kind);
    println!("  Resolution: {}x{}", info.width, info.height);
    match info.fps {
        Some(fps) => println!("  Frame rate: {fps} fps"),
        None => println!("  Frame rate: (not declared)"),
    }
    println!("  Record metadata: {} bytes", info.meta_size);
    match &info.serial {
        Some(serial) => println!("  Device serial: {serial}"),
        None => println!("  Device serial: (not declared)"),
    }
    if let Some(device) = &info.device_info {
        println!("  Device info: {device}");
    }
    println!(
        "  Intrinsics: {}",
        if info.has_intrinsics {
            "present"
        } else {
            "missing"
        }
    );
    println!("  Records: {}", info.record_count);
}
