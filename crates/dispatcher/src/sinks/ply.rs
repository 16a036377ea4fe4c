//! PlyFileSink - writes one binary PLY file per frame
//!
//! Vertex layout: position as three floats, color as three uchars, then
//! the auxiliary vector as three floats (vx/vy/vz). Downstream point-cloud
//! tooling reads this layout directly.

use contracts::{MergedFrame, PointSink, ReconstructedPoint, ReplayError};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, error, instrument};

/// Configuration for PlyFileSink
#[derive(Debug, Clone)]
pub struct PlySinkConfig {
    /// Base output directory
    pub base_path: PathBuf,

    /// Also write points whose color projection missed the color image
    /// (alpha 0). Off by default: most consumers want colored points only.
    pub include_transparent: bool,
}

impl PlySinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output"));
        let include_transparent = params
            .get("include_transparent")
            .map(|v| v == "true")
            .unwrap_or(false);

        Self {
            base_path,
            include_transparent,
        }
    }
}

/// Per-frame manifest written next to each PLY file.
#[derive(serde::Serialize)]
struct FrameManifest<'a> {
    frame_id: u64,
    target_ts_ns: u64,
    generated_at: String,
    point_count: usize,
    reports: &'a [contracts::DeviceReport],
}

/// Sink that writes merged frames as binary PLY files
pub struct PlyFileSink {
    name: String,
    config: PlySinkConfig,
}

impl PlyFileSink {
    /// Create a new PlyFileSink
    pub fn new(name: impl Into<String>, config: PlySinkConfig) -> std::io::Result<Self> {
        // Create base directory if it doesn't exist
        fs::create_dir_all(&config.base_path)?;

        Ok(Self {
            name: name.into(),
            config,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let config = PlySinkConfig::from_params(params);
        Self::new(name, config)
    }

    fn write_frame_to_disk(&self, frame: &MergedFrame) -> std::io::Result<()> {
        let points: Vec<&ReconstructedPoint> = frame
            .points
            .iter()
            .filter(|p| self.config.include_transparent || p.has_color())
            .collect();

        let ply_path = self
            .config
            .base_path
            .join(format!("frame_{:06}.ply", frame.frame_id));
        let mut writer = BufWriter::new(File::create(&ply_path)?);
        Self::write_ply(&mut writer, &points)?;
        writer.flush()?;

        let manifest_path = self
            .config
            .base_path
            .join(format!("frame_{:06}.json", frame.frame_id));
        let manifest = FrameManifest {
            frame_id: frame.frame_id,
            target_ts_ns: frame.target_ts_ns,
            generated_at: chrono::Utc::now().to_rfc3339(),
            point_count: points.len(),
            reports: &frame.reports,
        };
        let manifest_file = File::create(manifest_path)?;
        serde_json::to_writer_pretty(manifest_file, &manifest)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        debug!(
            sink = %self.name,
            path = %ply_path.display(),
            points = points.len(),
            "frame written"
        );
        Ok(())
    }

    fn write_ply<W: Write>(writer: &mut W, points: &[&ReconstructedPoint]) -> std::io::Result<()> {
        writeln!(writer, "ply")?;
        writeln!(writer, "format binary_little_endian 1.0")?;
        writeln!(writer, "element vertex {}", points.len())?;
        writeln!(writer, "property float x")?;
        writeln!(writer, "property float y")?;
        writeln!(writer, "property float z")?;
        writeln!(writer, "property uchar red")?;
        writeln!(writer, "property uchar green")?;
        writeln!(writer, "property uchar blue")?;
        writeln!(writer, "property float vx")?;
        writeln!(writer, "property float vy")?;
        writeln!(writer, "property float vz")?;
        writeln!(writer, "end_header")?;

        for point in points {
            writer.write_all(&point.position.x.to_le_bytes())?;
            writer.write_all(&point.position.y.to_le_bytes())?;
            writer.write_all(&point.position.z.to_le_bytes())?;
            writer.write_all(&point.color[..3])?;
            writer.write_all(&point.aux.x.to_le_bytes())?;
            writer.write_all(&point.aux.y.to_le_bytes())?;
            writer.write_all(&point.aux.z.to_le_bytes())?;
        }
        Ok(())
    }

    fn persist_frame(&self, frame: &MergedFrame) -> Result<(), ReplayError> {
        self.write_frame_to_disk(frame).map_err(|e| {
            error!(sink = %self.name, frame_id = frame.frame_id, error = %e, "Write failed");
            ReplayError::sink_write(&self.name, e.to_string())
        })
    }
}

impl PointSink for PlyFileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "ply_sink_write",
        skip(self, frame),
        fields(sink = %self.name, frame_id = frame.frame_id)
    )]
    async fn write(&mut self, frame: &MergedFrame) -> Result<(), ReplayError> {
        self.persist_frame(frame)?;
        Ok(())
    }

    #[instrument(name = "ply_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ReplayError> {
        Ok(())
    }

    #[instrument(name = "ply_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ReplayError> {
        debug!(sink = %self.name, "PlyFileSink closed");
        Ok(())
    }
}
