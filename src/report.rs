//! Capture summaries
//!
//! [`CaptureReport`] folds a capture record stream into counts per layer:
//! transport types, HCI commands and events, channel identifiers, ATT
//! opcodes, and per-handle traffic with the distribution of leading value
//! bytes. Attribute values are classified with the application frame codec
//! and listed in capture order as the application opcode stream.

use crate::att::{AttOpcode, AttributeUnit};
use crate::codec::{AppFrame, CodecConfig, Dialect};
use crate::hci::names::{channel_name, command_name, event_name, le_subevent_name};
use crate::hci::{Routed, TransportFrame, demux};
use crate::types::{CaptureRecord, Direction};
use crate::{ProtocolError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Traffic on one attribute handle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HandleSummary {
    pub writes: usize,
    pub pushes: usize,
    pub other: usize,
    pub bytes: usize,
    /// Leading value byte, the application dialect marker
    pub first_bytes: BTreeMap<u8, usize>,
}

/// One attribute value in the application opcode stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameEntry {
    pub index: usize,
    pub unix_millis: Option<u64>,
    pub direction: Direction,
    pub handle: Option<u16>,
    pub dialect: String,
    pub summary: String,
}

/// Layer-by-layer summary of a capture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaptureReport {
    pub records: usize,
    /// Records whose capture kept fewer bytes than the packet had
    pub truncated_records: usize,
    pub dropped_packets: u64,
    pub first_millis: Option<u64>,
    pub last_millis: Option<u64>,
    pub transports: BTreeMap<String, usize>,
    pub commands: BTreeMap<String, usize>,
    pub events: BTreeMap<String, usize>,
    pub channels: BTreeMap<u16, usize>,
    /// ACL continuation fragments, which are not reassembled
    pub continuations: usize,
    pub att_opcodes: BTreeMap<String, usize>,
    pub handles: BTreeMap<u16, HandleSummary>,
    pub dialects: BTreeMap<String, usize>,
    pub frames: Vec<FrameEntry>,
    /// Non-fatal findings: unknown opcodes and values that failed to decode
    pub anomalies: Vec<String>,
}

impl CaptureReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a whole record stream, stopping at the first record error.
    pub fn from_records<I>(records: I, codec: &CodecConfig) -> Result<Self>
    where
        I: IntoIterator<Item = Result<CaptureRecord>>,
    {
        let mut report = Self::new();
        for record in records {
            report.add_record(&record?, codec);
        }
        debug!(records = report.records, frames = report.frames.len(), "Capture report built");
        Ok(report)
    }

    /// Account for one record.
    pub fn add_record(&mut self, record: &CaptureRecord, codec: &CodecConfig) {
        let index = self.records;
        self.records += 1;
        self.dropped_packets += u64::from(record.drops);
        if record.is_truncated() {
            self.truncated_records += 1;
        }
        if let Some(ms) = record.unix_millis() {
            self.first_millis.get_or_insert(ms);
            self.last_millis = Some(ms);
        }

        let frame = demux(&record.payload);
        if let Some(transport) = frame.transport_type() {
            *self.transports.entry(transport.to_string()).or_default() += 1;
        }

        match frame {
            TransportFrame::Command { header, .. } => {
                let name = command_name(header.opcode).unwrap_or("unknown");
                let key = format!("{:#06x} {}", header.opcode, name);
                *self.commands.entry(key).or_default() += 1;
            }
            TransportFrame::Event { header, .. } => {
                let mut key = format!(
                    "{:#04x} {}",
                    header.code,
                    event_name(header.code).unwrap_or("unknown")
                );
                if let Some(sub) = header.le_subevent {
                    key.push_str(&format!(" / {}", le_subevent_name(sub).unwrap_or("unknown")));
                }
                *self.events.entry(key).or_default() += 1;
            }
            TransportFrame::Acl(Routed::Att(channel) | Routed::OtherChannel(channel)) => {
                *self.channels.entry(channel.cid).or_default() += 1;
                if !channel.is_complete() {
                    warn!(
                        index,
                        declared = channel.length,
                        present = channel.payload.len(),
                        "Channel length mismatch"
                    );
                }
            }
            TransportFrame::Acl(Routed::Continuation { .. }) => self.continuations += 1,
            TransportFrame::Truncated { transport, len } => self
                .anomalies
                .push(format!("record {}: truncated {} frame of {} bytes", index, transport, len)),
            _ => {}
        }

        if let Some(unit) = AttributeUnit::from_record(index, record) {
            self.add_unit(&unit, codec);
        }
    }

    fn add_unit(&mut self, unit: &AttributeUnit, codec: &CodecConfig) {
        *self.att_opcodes.entry(unit.opcode.to_string()).or_default() += 1;
        if let AttOpcode::Unknown(byte) = unit.opcode {
            let marker = ProtocolError::UnknownOpcode { opcode: byte };
            self.anomalies.push(format!("record {}: {}", unit.index, marker));
        }

        if let Some(handle) = unit.handle {
            let summary = self.handles.entry(handle).or_default();
            if unit.opcode.is_write() {
                summary.writes += 1;
            } else if unit.opcode.is_value_push() {
                summary.pushes += 1;
            } else {
                summary.other += 1;
            }
            summary.bytes += unit.value.len();
            if let Some(&first) = unit.value.first() {
                *summary.first_bytes.entry(first).or_default() += 1;
            }
        }

        if !(unit.opcode.is_write() || unit.opcode.is_value_push()) || unit.value.is_empty() {
            return;
        }

        let (dialect, summary) = match AppFrame::decode(&unit.value, codec) {
            Ok(frame) => (frame.dialect(), frame.to_string()),
            Err(e) => {
                self.anomalies.push(format!("record {}: {}", unit.index, e));
                (Dialect::of(&unit.value), format!("undecodable {:02x?}", unit.value))
            }
        };
        *self.dialects.entry(dialect.to_string()).or_default() += 1;
        self.frames.push(FrameEntry {
            index: unit.index,
            unix_millis: unit.unix_millis(),
            direction: unit.direction,
            handle: unit.handle,
            dialect: dialect.to_string(),
            summary,
        });
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml_ng::to_string(self)
            .map_err(|e| ProtocolError::config_error(format!("cannot serialize report: {}", e)))
    }
}

fn write_counts<K: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    counts: &BTreeMap<K, usize>,
) -> fmt::Result {
    if counts.is_empty() {
        return Ok(());
    }
    writeln!(f, "{}:", title)?;
    for (key, count) in counts {
        writeln!(f, "  {:<48} {:>8}", key.to_string(), count)?;
    }
    Ok(())
}

impl fmt::Display for CaptureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "records: {} (truncated {}, dropped {})",
            self.records, self.truncated_records, self.dropped_packets
        )?;
        if let (Some(first), Some(last)) = (self.first_millis, self.last_millis) {
            writeln!(f, "span: {} ms", last.saturating_sub(first))?;
        }

        write_counts(f, "transports", &self.transports)?;
        write_counts(f, "commands", &self.commands)?;
        write_counts(f, "events", &self.events)?;

        if !self.channels.is_empty() {
            writeln!(f, "channels:")?;
            for (cid, count) in &self.channels {
                let name = channel_name(*cid).unwrap_or("dynamic");
                writeln!(f, "  {:#06x} {:<41} {:>8}", cid, name, count)?;
            }
        }
        if self.continuations > 0 {
            writeln!(f, "continuation fragments: {}", self.continuations)?;
        }

        write_counts(f, "att opcodes", &self.att_opcodes)?;

        if !self.handles.is_empty() {
            writeln!(f, "handles:")?;
            for (handle, s) in &self.handles {
                writeln!(
                    f,
                    "  {:#06x} writes={} pushes={} other={} bytes={}",
                    handle, s.writes, s.pushes, s.other, s.bytes
                )?;
                let markers: Vec<String> =
                    s.first_bytes.iter().map(|(b, n)| format!("{:02x}:{}", b, n)).collect();
                if !markers.is_empty() {
                    writeln!(f, "         first bytes {}", markers.join(" "))?;
                }
            }
        }

        write_counts(f, "dialects", &self.dialects)?;

        if !self.frames.is_empty() {
            writeln!(f, "frames:")?;
            for frame in &self.frames {
                let handle = frame.handle.map(|h| format!("{:#06x}", h)).unwrap_or_default();
                writeln!(
                    f,
                    "  #{:<6} {} {:<6} {}",
                    frame.index, frame.direction, handle, frame.summary
                )?;
            }
        }

        if !self.anomalies.is_empty() {
            writeln!(f, "anomalies:")?;
            for anomaly in &self.anomalies {
                writeln!(f, "  {}", anomaly)?;
            }
        }
        Ok(())
    }
}
