//! Lazy capture file reader
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use lxwire::btsnoop::CaptureReader;
//!
//! fn dump() -> lxwire::Result<()> {
//!     let reader = CaptureReader::open("btsnoop_hci.log")?;
//!     for record in reader {
//!         let record = record?;
//!         println!("{:?} {} bytes", record.direction(), record.payload.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Records are read one at a time; nothing beyond the current record is
//! buffered. The sequence stops at the first error.

use super::format::{CaptureFileHeader, FILE_HEADER_SIZE, RECORD_HEADER_SIZE, RecordHeader};
use crate::types::CaptureRecord;
use crate::{ProtocolError, Result};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Forward-only reader over a standard capture file.
pub struct CaptureReader<R> {
    reader: R,
    path: PathBuf,
    header: CaptureFileHeader,
    offset: u64,
    records_read: usize,
    finished: bool,
}

impl CaptureReader<BufReader<File>> {
    /// Open a capture file with a buffered reader.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)
            .map_err(|e| ProtocolError::file_error(path.as_ref().to_path_buf(), e))?;
        Self::with_path(BufReader::new(file), path.as_ref().to_path_buf())
    }
}

impl<R: Read> CaptureReader<R> {
    /// Read and validate the file header from `reader`.
    pub fn new(reader: R) -> Result<Self> {
        Self::with_path(reader, PathBuf::from("<stream>"))
    }

    fn with_path(mut reader: R, path: PathBuf) -> Result<Self> {
        let mut buf = [0u8; FILE_HEADER_SIZE];
        let read = read_up_to(&mut reader, &mut buf)
            .map_err(|e| ProtocolError::file_error(path.clone(), e))?;
        if read < FILE_HEADER_SIZE {
            return Err(ProtocolError::InvalidCaptureHeader {
                details: format!("file header needs {} bytes, found {}", FILE_HEADER_SIZE, read),
            });
        }

        let header = CaptureFileHeader::parse(&buf)?;
        debug!(path = %path.display(), "Opened capture file");

        Ok(Self {
            reader,
            path,
            header,
            offset: FILE_HEADER_SIZE as u64,
            records_read: 0,
            finished: false,
        })
    }

    pub fn header(&self) -> &CaptureFileHeader {
        &self.header
    }

    /// Byte offset of the next record header.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn records_read(&self) -> usize {
        self.records_read
    }

    /// Read the next record; `Ok(None)` at a clean end of file.
    pub fn read_record(&mut self) -> Result<Option<CaptureRecord>> {
        let record_offset = self.offset;

        let mut buf = [0u8; RECORD_HEADER_SIZE];
        let read = read_up_to(&mut self.reader, &mut buf)
            .map_err(|e| ProtocolError::file_error(self.path.clone(), e))?;
        if read == 0 {
            trace!(records = self.records_read, "End of capture");
            return Ok(None);
        }
        if read < RECORD_HEADER_SIZE {
            return Err(ProtocolError::TruncatedRecord {
                offset: record_offset,
                needed: RECORD_HEADER_SIZE,
                available: read,
            });
        }

        let header = RecordHeader::parse(&buf);
        if header.included_len > header.original_len {
            warn!(
                offset = record_offset,
                included = header.included_len,
                original = header.original_len,
                "Record includes more bytes than its original length"
            );
        }

        // Only bytes actually present are buffered, whatever the header declares.
        let needed = header.included_len as usize;
        let mut payload = Vec::new();
        let read = (&mut self.reader)
            .take(u64::from(header.included_len))
            .read_to_end(&mut payload)
            .map_err(|e| ProtocolError::file_error(self.path.clone(), e))?;
        if read < needed {
            return Err(ProtocolError::TruncatedRecord {
                offset: record_offset + RECORD_HEADER_SIZE as u64,
                needed,
                available: read,
            });
        }

        self.offset += (RECORD_HEADER_SIZE + needed) as u64;
        self.records_read += 1;
        trace!(offset = record_offset, len = needed, flags = header.flags, "Capture record");

        Ok(Some(CaptureRecord {
            original_len: header.original_len,
            flags: header.flags,
            drops: header.drops,
            timestamp: header.timestamp,
            payload,
        }))
    }
}

impl<R: Read> Iterator for CaptureReader<R> {
    type Item = Result<CaptureRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Fill as much of `buf` as the reader can supply, returning the count.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::btsnoop::CaptureWriter;
    use crate::test_utils::sample_records;

    fn capture_bytes(records: &[CaptureRecord]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut writer = CaptureWriter::new(&mut out).unwrap();
        for record in records {
            writer.write_record(record).unwrap();
        }
        writer.finish().unwrap();
        out
    }

    #[test]
    fn reads_back_written_records() {
        let records = sample_records();
        let data = capture_bytes(&records);

        let reader = CaptureReader::new(data.as_slice()).unwrap();
        let read: Vec<_> = reader.collect::<Result<_>>().unwrap();
        assert_eq!(read, records);
    }

    #[test]
    fn header_only_file_is_empty() {
        let data = capture_bytes(&[]);
        assert_eq!(data.len(), FILE_HEADER_SIZE);
        assert_eq!(CaptureReader::new(data.as_slice()).unwrap().count(), 0);
    }

    #[test]
    fn short_file_header_is_invalid() {
        let data = b"btsnoop\0\x00\x00";
        assert!(matches!(
            CaptureReader::new(&data[..]),
            Err(ProtocolError::InvalidCaptureHeader { .. })
        ));
    }

    #[test]
    fn short_record_header_is_truncation() {
        let mut data = capture_bytes(&sample_records()[..1]);
        let boundary = data.len() as u64;
        data.extend_from_slice(&[0u8; 10]);

        let results: Vec<_> = CaptureReader::new(data.as_slice()).unwrap().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        match &results[1] {
            Err(ProtocolError::TruncatedRecord { offset, needed, available }) => {
                assert_eq!(*offset, boundary);
                assert_eq!(*needed, RECORD_HEADER_SIZE);
                assert_eq!(*available, 10);
            }
            other => panic!("expected TruncatedRecord, got {other:?}"),
        }
    }

    #[test]
    fn short_payload_is_truncation_and_ends_the_sequence() {
        let mut data = capture_bytes(&sample_records()[..1]);
        data.truncate(data.len() - 2);

        let mut reader = CaptureReader::new(data.as_slice()).unwrap();
        assert!(matches!(reader.next(), Some(Err(ProtocolError::TruncatedRecord { .. }))));
        assert!(reader.next().is_none());
    }

    #[test]
    fn huge_declared_length_is_truncation() {
        let mut data = capture_bytes(&[]);
        let header = RecordHeader {
            original_len: 0xFFFF_FFF0,
            included_len: 0xFFFF_FFF0,
            flags: 0,
            drops: 0,
            timestamp: 0,
        };
        header.write_to(&mut data);
        data.extend_from_slice(&[0x02, 0x40, 0x20, 0x00]);

        let mut reader = CaptureReader::new(data.as_slice()).unwrap();
        match reader.next() {
            Some(Err(ProtocolError::TruncatedRecord { needed, available, .. })) => {
                assert_eq!(needed, 0xFFFF_FFF0);
                assert_eq!(available, 4);
            }
            other => panic!("expected TruncatedRecord, got {other:?}"),
        }
        assert!(reader.next().is_none());
    }

    #[test]
    fn open_reads_files_from_disk() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("capture.log");
        std::fs::write(&path, capture_bytes(&sample_records()))?;

        let reader = CaptureReader::open(&path)?;
        assert_eq!(reader.count(), sample_records().len());
        Ok(())
    }
}
