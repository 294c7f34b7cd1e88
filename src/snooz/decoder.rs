//! Vendor capture container decoding
//!
//! Turns a btsnooz container into [`CaptureRecord`]s, and from there into a
//! standard capture file.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use lxwire::snooz::SnoozContainer;
//!
//! fn convert() -> lxwire::Result<()> {
//!     let container = SnoozContainer::open("btsnooz.bin")?;
//!     println!("Container version {:?}", container.header().version);
//!
//!     for record in container.into_records()? {
//!         let record = record?;
//!         println!("{} bytes at {:?}", record.payload.len(), record.unix_millis());
//!     }
//!     Ok(())
//! }
//! ```

use super::format::{SNOOZ_HEADER_SIZE, SnoozHeader, SnoozRecordHeader, SnoozVersion};
use crate::btsnoop::CaptureWriter;
use crate::types::CaptureRecord;
use crate::{ProtocolError, Result};
use flate2::read::ZlibDecoder;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info, trace, warn};

/// A decompressed vendor capture container.
///
/// The container is one-shot: [`SnoozContainer::into_records`] and
/// [`SnoozContainer::write_btsnoop`] consume it.
#[derive(Debug)]
pub struct SnoozContainer {
    header: SnoozHeader,
    body: Vec<u8>,
}

impl SnoozContainer {
    /// Read and decompress a container file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(&path)
            .map_err(|e| ProtocolError::file_error(path.as_ref().to_path_buf(), e))?;
        Self::parse(&data)
    }

    /// Validate the header and decompress everything after it.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let header = SnoozHeader::parse(data)?;

        // The 9-byte header is stored uncompressed; only the body is deflated.
        let mut body = Vec::new();
        ZlibDecoder::new(&data[SNOOZ_HEADER_SIZE..]).read_to_end(&mut body).map_err(|e| {
            ProtocolError::InvalidEncoding {
                details: format!("container body failed to decompress: {}", e),
            }
        })?;

        info!(
            version = header.version.as_byte(),
            compressed = data.len() - SNOOZ_HEADER_SIZE,
            decompressed = body.len(),
            "Decompressed capture container"
        );

        Ok(Self { header, body })
    }

    pub fn header(&self) -> &SnoozHeader {
        &self.header
    }

    /// Size of the decompressed record stream.
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Consume the container into its record sequence.
    ///
    /// Runs the first timestamp pass eagerly, so framing errors anywhere in
    /// the container surface here, before a single record is produced.
    pub fn into_records(self) -> Result<SnoozRecords> {
        SnoozRecords::new(self.header, self.body)
    }

    /// Consume the container and write it out as a standard capture file.
    ///
    /// Returns the number of records written.
    pub fn write_btsnoop<W: Write>(self, writer: W) -> Result<usize> {
        let records = self.into_records()?;
        let mut writer = CaptureWriter::new(writer)?;
        for record in records {
            writer.write_record(&record?)?;
        }
        let written = writer.records_written();
        writer.finish()?;
        Ok(written)
    }
}

/// Two-pass record iterator over a decompressed container body.
///
/// Pass one (in [`SnoozRecords::new`]) walks every record header, summing
/// deltas, and subtracts the total from the stored final timestamp to get the
/// clock value *before* the first record. Pass two (iteration) walks forward
/// again, adding each record's own delta before emitting it, so the last
/// record lands exactly on the stored final timestamp.
pub struct SnoozRecords {
    version: SnoozVersion,
    body: Vec<u8>,
    offset: usize,
    clock_ms: u64,
    record_count: usize,
    emitted: usize,
}

impl SnoozRecords {
    fn new(header: SnoozHeader, body: Vec<u8>) -> Result<Self> {
        let version = header.version;

        // Pass one: validate framing and total the deltas.
        let mut offset = 0;
        let mut total_delta: u64 = 0;
        let mut record_count = 0;
        while offset < body.len() {
            let record = SnoozRecordHeader::parse(version, &body, offset)?;
            total_delta += u64::from(record.delta_ms);
            offset += record.frame_len(version);
            record_count += 1;
        }

        let clock_ms = header.last_timestamp_ms.checked_sub(total_delta).ok_or_else(|| {
            ProtocolError::InvalidEncoding {
                details: format!(
                    "record deltas total {} ms, more than the final timestamp {} ms",
                    total_delta, header.last_timestamp_ms
                ),
            }
        })?;

        debug!(records = record_count, first_timestamp_ms = clock_ms, "Container first pass done");

        Ok(Self { version, body, offset: 0, clock_ms, record_count, emitted: 0 })
    }

    /// Number of records found by the first pass.
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    fn next_record(&mut self) -> Result<CaptureRecord> {
        let header = SnoozRecordHeader::parse(self.version, &self.body, self.offset)?;
        let body_start = self.offset + self.version.record_header_size();
        let body_end = body_start + header.body_len();

        self.clock_ms += u64::from(header.delta_ms);
        let timestamp = CaptureRecord::timestamp_from_unix_millis(self.clock_ms).ok_or_else(|| {
            ProtocolError::InvalidEncoding {
                details: format!("timestamp {} ms does not fit a capture timestamp", self.clock_ms),
            }
        })?;

        let mut payload = Vec::with_capacity(header.length as usize);
        payload.push(header.packet_type.transport_byte());
        payload.extend_from_slice(&self.body[body_start..body_end]);

        if header.packet_length < header.length {
            warn!(
                offset = self.offset,
                packet_length = header.packet_length,
                length = header.length,
                "Container record is longer than its on-wire packet"
            );
        }

        trace!(
            offset = self.offset,
            delta_ms = header.delta_ms,
            packet_type = header.packet_type.as_byte(),
            "Container record"
        );

        self.offset = body_end;
        Ok(CaptureRecord {
            original_len: u32::from(header.packet_length),
            flags: header.packet_type.direction().to_flags(),
            drops: 0,
            timestamp,
            payload,
        })
    }
}

impl Iterator for SnoozRecords {
    type Item = Result<CaptureRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.body.len() {
            return None;
        }

        let result = self.next_record();
        if result.is_err() {
            // Stop after the first failure; the source is not restartable.
            self.offset = self.body.len();
        } else {
            self.emitted += 1;
        }
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.record_count - self.emitted;
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::btsnoop::CaptureReader;
    use crate::snooz::format::SnoozPacketType;
    use crate::test_utils::{ContainerRecord, build_container};
    use crate::types::Direction;

    fn three_records() -> Vec<ContainerRecord> {
        vec![
            ContainerRecord::new(0, SnoozPacketType::OutboundCommand, vec![0x03, 0x0C, 0x00]),
            ContainerRecord::new(250, SnoozPacketType::InboundEvent, vec![0x0E, 0x04, 0x01]),
            ContainerRecord::new(1_500, SnoozPacketType::OutboundAcl, vec![0x40, 0x00, 0x07]),
        ]
    }

    #[test]
    fn timestamps_are_reconstructed_backwards_from_the_final_one() {
        let records = vec![
            ContainerRecord::new(100, SnoozPacketType::OutboundCommand, vec![0x01]),
            ContainerRecord::new(250, SnoozPacketType::InboundEvent, vec![0x02]),
            ContainerRecord::new(1_500, SnoozPacketType::InboundAcl, vec![0x03]),
        ];
        let last = 1_700_000_000_000;
        let data = build_container(SnoozVersion::V1, last, &records);

        let decoded: Vec<_> = SnoozContainer::parse(&data)
            .unwrap()
            .into_records()
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        let times: Vec<_> = decoded.iter().map(|r| r.unix_millis().unwrap()).collect();
        assert_eq!(times, vec![last - 250 - 1_500, last - 1_500, last]);
    }

    #[test]
    fn records_carry_direction_and_transport_byte() {
        let data = build_container(SnoozVersion::V1, 10_000, &three_records());
        let decoded: Vec<_> = SnoozContainer::parse(&data)
            .unwrap()
            .into_records()
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded[0].payload, vec![0x01, 0x03, 0x0C, 0x00]);
        assert_eq!(decoded[0].direction(), Direction::Outbound);
        assert_eq!(decoded[1].payload[0], 0x04);
        assert_eq!(decoded[1].direction(), Direction::Inbound);
        assert_eq!(decoded[2].payload[0], 0x02);
        assert_eq!(decoded[2].original_len, 4);
    }

    #[test]
    fn v2_reports_packet_length_separately() {
        let mut record = ContainerRecord::new(5, SnoozPacketType::InboundAcl, vec![0xAA; 4]);
        record.packet_length = Some(64);
        let data = build_container(SnoozVersion::V2, 5_000, &[record]);

        let decoded: Vec<_> = SnoozContainer::parse(&data)
            .unwrap()
            .into_records()
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(decoded[0].original_len, 64);
        assert_eq!(decoded[0].included_len(), 5);
        assert!(decoded[0].is_truncated());
    }

    #[test]
    fn truncated_body_fails_before_any_record() {
        let mut body = Vec::new();
        let header = SnoozRecordHeader {
            length: 10,
            packet_length: 10,
            delta_ms: 1,
            packet_type: SnoozPacketType::OutboundAcl,
        };
        header.write_to(SnoozVersion::V1, &mut body);
        body.extend_from_slice(&[0u8; 3]);
        let data = crate::test_utils::wrap_container(SnoozVersion::V1, 100, &body);

        let err = SnoozContainer::parse(&data).unwrap().into_records().err().unwrap();
        assert!(matches!(err, ProtocolError::TruncatedContainer { offset: 0, .. }));
    }

    #[test]
    fn deltas_larger_than_final_timestamp_are_rejected() {
        let records = vec![ContainerRecord::new(500, SnoozPacketType::InboundEvent, vec![0x0E])];
        let data = build_container(SnoozVersion::V1, 100, &records);
        let err = SnoozContainer::parse(&data).unwrap().into_records().err().unwrap();
        assert!(matches!(err, ProtocolError::InvalidEncoding { .. }));
    }

    #[test]
    fn garbage_body_fails_decompression() {
        let mut data = vec![1u8];
        data.extend_from_slice(&0u64.to_le_bytes());
        data.extend_from_slice(b"definitely not zlib");
        assert!(matches!(
            SnoozContainer::parse(&data),
            Err(ProtocolError::InvalidEncoding { .. })
        ));
    }

    #[test]
    fn conversion_produces_a_readable_capture() {
        let data = build_container(SnoozVersion::V2, 1_000_000, &three_records());
        let mut out = Vec::new();
        let written = SnoozContainer::parse(&data).unwrap().write_btsnoop(&mut out).unwrap();
        assert_eq!(written, 3);

        let reader = CaptureReader::new(out.as_slice()).unwrap();
        let records: Vec<_> = reader.collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].unix_millis(), Some(1_000_000));
        assert_eq!(records[1].payload, vec![0x04, 0x0E, 0x04, 0x01]);
    }
}
