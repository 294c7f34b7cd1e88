//! Capture file writer

use super::format::{CaptureFileHeader, RECORD_HEADER_SIZE, RecordHeader};
use crate::types::CaptureRecord;
use crate::{ProtocolError, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, trace};

/// Writes a standard capture file.
///
/// The file header is written on construction. Each record is assembled in
/// memory and handed to the sink in a single `write_all`, so a failure while
/// producing the next record never leaves half of it in the output.
pub struct CaptureWriter<W: Write> {
    writer: W,
    buf: Vec<u8>,
    records_written: usize,
}

impl CaptureWriter<BufWriter<File>> {
    /// Create (or truncate) a capture file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(&path)
            .map_err(|e| ProtocolError::file_error(path.as_ref().to_path_buf(), e))?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> CaptureWriter<W> {
    pub fn new(mut writer: W) -> Result<Self> {
        writer.write_all(&CaptureFileHeader::default().to_bytes())?;
        Ok(Self { writer, buf: Vec::new(), records_written: 0 })
    }

    pub fn write_record(&mut self, record: &CaptureRecord) -> Result<()> {
        self.buf.clear();
        self.buf.reserve(RECORD_HEADER_SIZE + record.payload.len());
        RecordHeader::for_record(record).write_to(&mut self.buf);
        self.buf.extend_from_slice(&record.payload);

        self.writer.write_all(&self.buf)?;
        self.records_written += 1;
        trace!(index = self.records_written, len = record.payload.len(), "Wrote capture record");
        Ok(())
    }

    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Flush and return the underlying sink.
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        debug!(records = self.records_written, "Finished capture file");
        Ok(self.writer)
    }
}
