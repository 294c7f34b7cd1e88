//! Test utilities for synthetic captures and a loopback printer
//!
//! The capture builders produce byte-exact containers and records without
//! any fixture files. [`LoopbackPrinter`] stands in for a connected printer:
//! it records every write and answers control frames the way the device
//! does, with switches to silence or reject individual opcodes.

#![cfg(any(test, feature = "benchmark"))]

use crate::codec::block::BLOCK_HEADER_SIZE;
use crate::codec::control::legacy_payload_len;
use crate::codec::{BLOCK_SIZE_SHORT, CONTROL_MARKER, ControlFrame, Framing, opcode};
use crate::hci::ATT_CID;
use crate::snooz::format::{SnoozHeader, SnoozRecordHeader};
use crate::snooz::{SnoozPacketType, SnoozVersion};
use crate::transport::Transport;
use crate::types::{CaptureRecord, Direction};
use crate::{ProtocolError, Result};
use flate2::Compression;
use flate2::write::ZlibEncoder;
use futures::StreamExt;
use futures::stream::BoxStream;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// One record to place in a synthetic container.
#[derive(Debug, Clone)]
pub struct ContainerRecord {
    pub delta_ms: u32,
    pub packet_type: SnoozPacketType,
    /// Bytes after the type byte
    pub body: Vec<u8>,
    /// On-wire length written by v2 containers; defaults to the record length
    pub packet_length: Option<u16>,
}

impl ContainerRecord {
    pub fn new(delta_ms: u32, packet_type: SnoozPacketType, body: Vec<u8>) -> Self {
        Self { delta_ms, packet_type, body, packet_length: None }
    }
}

/// Build a complete container holding `records`.
pub fn build_container(
    version: SnoozVersion,
    last_timestamp_ms: u64,
    records: &[ContainerRecord],
) -> Vec<u8> {
    let mut body = Vec::new();
    for record in records {
        let length = (record.body.len() + 1) as u16;
        let header = SnoozRecordHeader {
            length,
            packet_length: record.packet_length.unwrap_or(length),
            delta_ms: record.delta_ms,
            packet_type: record.packet_type,
        };
        header.write_to(version, &mut body);
        body.extend_from_slice(&record.body);
    }
    wrap_container(version, last_timestamp_ms, &body)
}

/// Put the container header in front of a zlib-compressed `body`.
pub fn wrap_container(version: SnoozVersion, last_timestamp_ms: u64, body: &[u8]) -> Vec<u8> {
    let header = SnoozHeader { version, last_timestamp_ms };
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body).unwrap();
    let compressed = encoder.finish().unwrap();

    let mut out = header.to_bytes().to_vec();
    out.extend_from_slice(&compressed);
    out
}

/// A short capture: an HCI command, its completion event and two ATT packets.
pub fn sample_records() -> Vec<CaptureRecord> {
    let base = CaptureRecord::timestamp_from_unix_millis(1_700_000_000_000).unwrap();
    let mut records = vec![
        CaptureRecord::new(
            Direction::Outbound.to_flags() | 0x02,
            base,
            vec![0x01, 0x03, 0x0C, 0x00],
        ),
        CaptureRecord::new(
            Direction::Inbound.to_flags() | 0x02,
            base + 1_500,
            vec![0x04, 0x0E, 0x04, 0x01, 0x03, 0x0C, 0x00],
        ),
        att_record(Direction::Outbound, 0x52, 0x000E, &[0x5A, 0x01, 0x00, 0x00]),
        att_record(Direction::Inbound, 0x1B, 0x0010, &[0x5A, 0x01, 0x00, 0x00]),
    ];
    records[2].timestamp = base + 20_000;
    records[3].timestamp = base + 45_000;
    records[3].drops = 1;
    records
}

/// An ACL record carrying one ATT PDU on connection handle 0x0040.
pub fn att_record(
    direction: Direction,
    att_opcode: u8,
    handle: u16,
    value: &[u8],
) -> CaptureRecord {
    let mut pdu = vec![att_opcode];
    pdu.extend_from_slice(&handle.to_le_bytes());
    pdu.extend_from_slice(value);
    acl_record(direction, ATT_CID, &pdu)
}

/// An ACL record carrying `payload` on channel `cid`.
pub fn acl_record(direction: Direction, cid: u16, payload: &[u8]) -> CaptureRecord {
    let l2cap_len = payload.len() as u16;
    let acl_len = l2cap_len + 4;
    // Connection handle 0x0040, packet boundary "first automatically flushable".
    let handle_flags: u16 = 0x0040 | (0x2 << 12);

    let mut data = vec![0x02];
    data.extend_from_slice(&handle_flags.to_le_bytes());
    data.extend_from_slice(&acl_len.to_le_bytes());
    data.extend_from_slice(&l2cap_len.to_le_bytes());
    data.extend_from_slice(&cid.to_le_bytes());
    data.extend_from_slice(payload);

    let ts = CaptureRecord::timestamp_from_unix_millis(1_700_000_000_000).unwrap();
    CaptureRecord::new(direction.to_flags(), ts, data)
}

/// Completion notification for `block_count` blocks.
pub fn completion_notification(block_count: u16) -> Vec<u8> {
    let mut raw = vec![CONTROL_MARKER, opcode::COMPLETION];
    raw.extend_from_slice(&block_count.to_le_bytes());
    raw.extend_from_slice(&1u16.to_le_bytes());
    raw
}

/// Read a control frame the way the printer does: fixed legacy shapes first.
fn parse_control(data: &[u8]) -> Option<ControlFrame> {
    let (&marker, &op) = (data.first()?, data.get(1)?);
    if marker != CONTROL_MARKER {
        return None;
    }
    match legacy_payload_len(op) {
        Some(len) if len + 2 == data.len() => {
            Some(ControlFrame::new(op, &data[2..]).with_framing(Framing::Legacy))
        }
        _ => ControlFrame::decode(data).ok(),
    }
}

/// Data stream the printer expects after a job start.
#[derive(Debug)]
struct Stream {
    start_opcode: u8,
    expected: usize,
    received: usize,
    block_count: u16,
}

#[derive(Debug, Default)]
struct PrinterState {
    writes: Vec<Vec<u8>>,
    control: Vec<u8>,
    stream: Option<Stream>,
    silent: HashSet<u8>,
    rejections: HashMap<u8, u8>,
    no_completion: bool,
    ack_checksum: bool,
}

/// In-memory printer answering control frames over a notification stream.
///
/// By default every control frame is echoed, a completed data stream is
/// followed by the completion notification (after the execute echo, for jobs
/// that execute), and the final acknowledgment gets no answer.
pub struct LoopbackPrinter {
    state: Mutex<PrinterState>,
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<Vec<u8>>>>,
    block_frame_len: usize,
}

impl Default for LoopbackPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackPrinter {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            state: Mutex::new(PrinterState::default()),
            tx,
            rx: Mutex::new(Some(rx)),
            block_frame_len: BLOCK_HEADER_SIZE + BLOCK_SIZE_SHORT,
        }
    }

    /// Never answer `opcode`.
    pub fn silence(&self, opcode: u8) -> &Self {
        self.state.lock().silent.insert(opcode);
        self
    }

    /// Answer `opcode` with a non-zero status byte.
    pub fn reject(&self, opcode: u8, code: u8) -> &Self {
        self.state.lock().rejections.insert(opcode, code);
        self
    }

    /// Never send the completion notification.
    pub fn without_completion(&self) -> &Self {
        self.state.lock().no_completion = true;
        self
    }

    /// Echo the start opcode once the data stream and its trailer arrive.
    pub fn ack_checksum(&self) -> &Self {
        self.state.lock().ack_checksum = true;
        self
    }

    /// Deliver an arbitrary notification payload.
    pub fn notify(&self, raw: Vec<u8>) {
        let _ = self.tx.send(raw);
    }

    /// Every write received, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.lock().writes.clone()
    }

    /// Opcodes of the control frames received outside data streams.
    pub fn control_opcodes(&self) -> Vec<u8> {
        self.state.lock().control.clone()
    }

    /// Bytes received as data stream, trailer included.
    pub fn streamed(&self) -> Vec<u8> {
        let state = self.state.lock();
        let mut in_stream = false;
        let mut out = Vec::new();
        let mut remaining = 0usize;
        // Replay the writes: stream bytes follow a job start until the announced size.
        for write in &state.writes {
            if in_stream {
                out.extend_from_slice(write);
                remaining = remaining.saturating_sub(write.len());
                in_stream = remaining > 0;
            } else if let Some(expected) = self.announced(write) {
                remaining = expected;
                in_stream = remaining > 0;
            }
        }
        out
    }

    fn announced(&self, write: &[u8]) -> Option<usize> {
        let frame = parse_control(write)?;
        let words = frame.words();
        match frame.opcode {
            opcode::SET_LENGTH => words.first().map(|w| *w as usize),
            opcode::START_RASTER if words.len() >= 2 => {
                Some((words[0] as usize).div_ceil(8) * words[1] as usize + 4)
            }
            opcode::START_JOB if words.len() >= 2 && words[1] != 0x0100 => {
                Some(words[0] as usize * self.block_frame_len)
            }
            _ => None,
        }
    }

    fn emit(&self, raw: Vec<u8>) {
        let _ = self.tx.send(raw);
    }

    fn handle_stream(&self, state: &mut PrinterState, len: usize) -> bool {
        let Some(stream) = state.stream.as_mut().filter(|s| s.received < s.expected) else {
            return false;
        };
        stream.received += len;
        if stream.received >= stream.expected {
            let (op, count) = (stream.start_opcode, stream.block_count);
            if op == opcode::START_JOB {
                if !state.no_completion {
                    self.emit(completion_notification(count));
                }
            } else if state.ack_checksum {
                self.emit(vec![CONTROL_MARKER, op, 0x00, 0x00]);
            }
        }
        true
    }

    fn handle_control(&self, state: &mut PrinterState, data: &[u8]) {
        let Some(frame) = parse_control(data) else {
            return;
        };
        let op = frame.opcode;
        state.control.push(op);

        if state.silent.contains(&op) {
            return;
        }
        if let Some(code) = state.rejections.get(&op) {
            self.emit(vec![CONTROL_MARKER, op, 0x01, 0x00, *code]);
            return;
        }

        let words = frame.words();
        if op == opcode::START_JOB && words.get(1) == Some(&0x0100) {
            // Final acknowledgment closes the job silently.
            state.stream = None;
            return;
        }

        if let Some(expected) = self.announced(data) {
            let block_count = match op {
                opcode::START_RASTER => words[1],
                opcode::START_JOB => words[0],
                _ => (expected / self.block_frame_len) as u16,
            };
            state.stream = Some(Stream { start_opcode: op, expected, received: 0, block_count });
        }

        self.emit(data.to_vec());

        if op == opcode::EXECUTE && !state.no_completion {
            if let Some(stream) = state.stream.as_ref().filter(|s| s.received >= s.expected) {
                self.emit(completion_notification(stream.block_count));
            }
        }
    }
}

#[async_trait::async_trait]
impl Transport for LoopbackPrinter {
    async fn write(&self, data: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        state.writes.push(data.to_vec());

        if !self.handle_stream(&mut state, data.len()) && data.first() == Some(&CONTROL_MARKER) {
            self.handle_control(&mut state, data);
        }
        Ok(())
    }

    async fn subscribe(&self) -> Result<BoxStream<'static, Vec<u8>>> {
        let rx = self
            .rx
            .lock()
            .take()
            .ok_or_else(|| ProtocolError::transport_failed("loopback printer already subscribed"))?;
        Ok(UnboundedReceiverStream::new(rx).boxed())
    }
}
