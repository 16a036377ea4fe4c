//! SensorStreamParser - forward-only record reader
//!
//! Owns the file handle exclusively; the read cursor only advances. Reaching
//! an earlier record requires `reset()` (reopen + reparse), which is what the
//! seeker builds its replay strategy on.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use contracts::{RecordPayload, ReplayError, StreamHeader, StreamKind, StreamRecord};
use tracing::{debug, instrument, warn};

use crate::decode::{decode_color_image, decode_depth_samples};
use crate::header::parse_header;
use crate::Result;

/// Sequential reader over one recorded stream.
///
/// Holds a single "latest record" slot that is overwritten on every advance.
/// After a read returns `Ok(false)` (end of stream) the parser is exhausted
/// and only `reset()` makes it usable again.
pub struct SensorStreamParser {
    path: PathBuf,
    header: StreamHeader,
    reader: BufReader<File>,
    record: StreamRecord,
    records_read: u64,
    last_timestamp: Option<u64>,
    exhausted: bool,
}

impl SensorStreamParser {
    /// Open a stream file and parse its header.
    #[instrument(name = "stream_parser_open", skip(path), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let mut reader = BufReader::new(file);
        let header = parse_header(&mut reader)?;

        debug!(
            kind = %header.kind,
            width = header.width,
            height = header.height,
            fps = ?header.fps,
            "stream opened"
        );

        Ok(Self {
            path,
            header,
            reader,
            record: StreamRecord::default(),
            records_read: 0,
            last_timestamp: None,
            exhausted: false,
        })
    }

    /// The parsed header. Immutable for the parser's lifetime.
    pub fn header(&self) -> &StreamHeader {
        &self.header
    }

    /// The latest record. Valid until the next advance.
    pub fn record(&self) -> &StreamRecord {
        &self.record
    }

    /// Records consumed (read or skipped) since open/reset.
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Whether the stream hit its end; only `reset()` clears this.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Source file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the next record, decoding its payload.
    ///
    /// `optimize_for_bulk` keeps the payload in its packed on-disk form
    /// (no u16 unpack, no image decode) for batched consumers; both forms
    /// are the same bytes.
    ///
    /// Returns `Ok(false)` on a clean end of stream. A short read inside a
    /// record is a `Format` error.
    pub fn read_next_record(&mut self, optimize_for_bulk: bool) -> Result<bool> {
        let Some(meta) = self.read_metadata()? else {
            return Ok(false);
        };
        let timestamp_ns = timestamp_of(&meta);

        let payload = match self.header.kind {
            StreamKind::Depth => {
                let mut payload = vec![0u8; self.header.depth_payload_len()];
                self.read_payload(&mut payload)?;
                if optimize_for_bulk {
                    RecordPayload::DepthRaw(Bytes::from(payload))
                } else {
                    RecordPayload::DepthSamples(decode_depth_samples(&payload)?)
                }
            }
            StreamKind::Color => {
                let len = self.read_color_size_field()?;
                let mut payload = vec![0u8; len];
                self.read_payload(&mut payload)?;
                let compressed = Bytes::from(payload);
                if optimize_for_bulk {
                    RecordPayload::ColorRaw(compressed)
                } else {
                    let (width, height, rgba) = decode_color_image(&compressed)?;
                    RecordPayload::ColorPixels {
                        width,
                        height,
                        rgba,
                        compressed,
                    }
                }
            }
        };

        self.commit_record(timestamp_ns, payload);
        Ok(true)
    }

    /// Read only the next record's timestamp, restoring the cursor so a
    /// following `read_next_record` is unaffected.
    pub fn peek_next_timestamp(&mut self) -> Result<Option<u64>> {
        if self.exhausted {
            return Ok(None);
        }
        let Some(meta) = self.read_metadata_raw()? else {
            // Peek must not poison the parser; the definitive end-of-stream
            // call is the read/skip that actually consumes.
            return Ok(None);
        };
        self.reader
            .seek_relative(-(self.header.meta_size as i64))?;
        Ok(Some(timestamp_of(&meta)))
    }

    /// Advance past the next record decoding only its timestamp.
    ///
    /// Cheap catch-up for synchronization: the payload bytes are seeked
    /// over, never copied or decoded.
    pub fn skip_current_record(&mut self) -> Result<bool> {
        let Some(meta) = self.read_metadata()? else {
            return Ok(false);
        };
        let timestamp_ns = timestamp_of(&meta);

        let payload_len = match self.header.kind {
            StreamKind::Depth => self.header.depth_payload_len(),
            StreamKind::Color => self.read_color_size_field()?,
        };
        self.reader.seek_relative(payload_len as i64)?;

        metrics::counter!(
            "replay_records_skipped_total",
            "stream" => self.header.kind.to_string()
        )
        .increment(1);

        self.commit_record(timestamp_ns, RecordPayload::Empty);
        Ok(true)
    }

    /// Reopen the file and reparse the header, returning the cursor to the
    /// first record. The forward-only model's single rewind primitive.
    #[instrument(name = "stream_parser_reset", skip(self), fields(path = %self.path.display()))]
    pub fn reset(&mut self) -> Result<()> {
        let file = File::open(&self.path)?;
        let mut reader = BufReader::new(file);
        let header = parse_header(&mut reader)?;

        self.header = header;
        self.reader = reader;
        self.record = StreamRecord::default();
        self.records_read = 0;
        self.last_timestamp = None;
        self.exhausted = false;
        Ok(())
    }

    fn commit_record(&mut self, timestamp_ns: u64, payload: RecordPayload) {
        if let Some(last) = self.last_timestamp {
            if timestamp_ns < last {
                warn!(
                    stream = %self.header.kind,
                    timestamp_ns,
                    last_timestamp_ns = last,
                    "record timestamp went backwards"
                );
            }
        }
        self.last_timestamp = Some(timestamp_ns);
        self.record.timestamp_ns = timestamp_ns;
        self.record.payload = payload;
        self.records_read += 1;

        metrics::counter!(
            "replay_records_read_total",
            "stream" => self.header.kind.to_string()
        )
        .increment(1);
    }

    /// Read the fixed metadata block; `None` on a clean end of stream,
    /// which marks the parser exhausted.
    fn read_metadata(&mut self) -> Result<Option<Vec<u8>>> {
        if self.exhausted {
            return Ok(None);
        }
        match self.read_metadata_raw()? {
            Some(meta) => Ok(Some(meta)),
            None => {
                self.exhausted = true;
                Ok(None)
            }
        }
    }

    fn read_metadata_raw(&mut self) -> Result<Option<Vec<u8>>> {
        let mut meta = vec![0u8; self.header.meta_size];
        match read_exact_or_eof(&mut self.reader, &mut meta)? {
            ReadOutcome::Full => Ok(Some(meta)),
            ReadOutcome::Eof => Ok(None),
            ReadOutcome::Partial(read) => Err(ReplayError::format(format!(
                "short read in record metadata: {read} of {} bytes",
                self.header.meta_size
            ))),
        }
    }

    fn read_payload(&mut self, buf: &mut [u8]) -> Result<()> {
        match read_exact_or_eof(&mut self.reader, buf)? {
            ReadOutcome::Full => Ok(()),
            ReadOutcome::Eof | ReadOutcome::Partial(_) => Err(ReplayError::format(format!(
                "short read in record payload: expected {} bytes",
                buf.len()
            ))),
        }
    }

    fn read_color_size_field(&mut self) -> Result<usize> {
        let width = self.header.size_field.byte_len();
        let mut buf = [0u8; 4];
        match read_exact_or_eof(&mut self.reader, &mut buf[..width])? {
            ReadOutcome::Full => {}
            _ => {
                return Err(ReplayError::format(
                    "short read in color payload size field",
                ))
            }
        }
        Ok(match width {
            2 => u16::from_le_bytes([buf[0], buf[1]]) as usize,
            _ => u32::from_le_bytes(buf) as usize,
        })
    }
}

impl std::fmt::Debug for SensorStreamParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorStreamParser")
            .field("path", &self.path)
            .field("kind", &self.header.kind)
            .field("records_read", &self.records_read)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

fn timestamp_of(meta: &[u8]) -> u64 {
    // Header parsing guarantees meta_size >= 8
    u64::from_le_bytes(meta[..8].try_into().unwrap())
}

enum ReadOutcome {
    Full,
    Eof,
    Partial(usize),
}

/// read_exact that distinguishes "nothing left" from "cut off mid-buffer".
fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<ReadOutcome> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Ok(if filled == 0 {
                    ReadOutcome::Eof
                } else {
                    ReadOutcome::Partial(filled)
                });
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(ReadOutcome::Full)
}
