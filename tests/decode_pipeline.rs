//! End-to-end decode: bug report -> container -> btsnoop file -> ATT -> frames

use anyhow::Result;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use lxwire::att::AttOpcode;
use lxwire::codec::{AppFrame, CodecConfig, ControlFrame, DataBlock, opcode};
use lxwire::engine::Notification;
use lxwire::types::Direction;
use lxwire::{CaptureReader, CaptureReport, SnoozContainer, decode_capture};
use std::io::Write;

const LAST_TIMESTAMP_MS: u64 = 1_700_000_123_456;

/// L2CAP ATT payload wrapped in an ACL header for connection 0x0040.
fn acl_body(att: &[u8]) -> Vec<u8> {
    let l2cap_len = att.len() as u16;
    let mut body = vec![0x40, 0x20];
    body.extend_from_slice(&(l2cap_len + 4).to_le_bytes());
    body.extend_from_slice(&l2cap_len.to_le_bytes());
    body.extend_from_slice(&0x0004u16.to_le_bytes());
    body.extend_from_slice(att);
    body
}

fn att(att_opcode: u8, handle: u16, value: &[u8]) -> Vec<u8> {
    let mut pdu = vec![att_opcode];
    pdu.extend_from_slice(&handle.to_le_bytes());
    pdu.extend_from_slice(value);
    acl_body(&pdu)
}

/// v1 container records: (delta ms, packet type, body after the type byte).
fn container(records: &[(u32, u8, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    for (delta, packet_type, record) in records {
        body.extend_from_slice(&(record.len() as u16 + 1).to_le_bytes());
        body.extend_from_slice(&delta.to_le_bytes());
        body.push(*packet_type);
        body.extend_from_slice(record);
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&body)?;

    let mut out = vec![1u8];
    out.extend_from_slice(&LAST_TIMESTAMP_MS.to_le_bytes());
    out.extend_from_slice(&encoder.finish()?);
    Ok(out)
}

fn bug_report(container: &[u8]) -> String {
    let encoded = STANDARD.encode(container);
    let mut text = String::from("== dumpsys bluetooth_manager ==\nBluetooth Status\n");
    text.push_str("--- BEGIN:BTSNOOP_LOG_SUMMARY (1234 bytes in) ---\n");
    for chunk in encoded.as_bytes().chunks(76) {
        text.push_str("  ");
        text.push_str(std::str::from_utf8(chunk).expect("base64 is ascii"));
        text.push('\n');
    }
    text.push_str("--- END:BTSNOOP_LOG_SUMMARY ---\n");
    text
}

fn print_job_records() -> Result<Vec<(u32, u8, Vec<u8>)>> {
    let mut block = vec![0x55, 0x00, 0x00, 0x00];
    block.extend_from_slice(&[0xF0; 16]);

    Ok(vec![
        // HCI Reset and its Command Complete
        (0, 0x20, vec![0x03, 0x0C, 0x00]),
        (2, 0x10, vec![0x0E, 0x04, 0x01, 0x03, 0x0C, 0x00]),
        // Init, echoed
        (40, 0x21, att(0x52, 0x000E, &ControlFrame::init().encode()?)),
        (15, 0x11, att(0x1B, 0x0010, &[0x5A, 0x01, 0x00, 0x00])),
        // Set length in the legacy shape, then one block
        (10, 0x21, att(0x52, 0x000E, &[0x5A, 0x0B, 0x16, 0x00])),
        (12, 0x21, att(0x52, 0x000E, &block)),
        // Completion notification
        (300, 0x11, att(0x1B, 0x0010, &[0x5A, 0x06, 0x01, 0x00, 0x01, 0x00])),
    ])
}

#[test]
fn bug_report_decodes_to_application_frames() -> Result<()> {
    let report_text = bug_report(&container(&print_job_records()?)?);
    let dir = tempfile::tempdir()?;

    let report_path = dir.path().join("bugreport.txt");
    std::fs::write(&report_path, &report_text)?;
    let capture_path = dir.path().join("btsnoop_hci.log");

    let container = SnoozContainer::open_bugreport(&report_path)?;
    let file = std::fs::File::create(&capture_path)?;
    assert_eq!(container.write_btsnoop(file)?, 7);

    let reader = CaptureReader::open(&capture_path)?;
    let units: Vec<_> = decode_capture(reader).collect::<lxwire::Result<_>>()?;
    assert_eq!(units.len(), 5);

    let last = units.last().expect("units");
    assert_eq!(last.unix_millis(), Some(LAST_TIMESTAMP_MS));
    assert_eq!(last.direction, Direction::Inbound);
    assert_eq!(last.opcode, AttOpcode::HandleValueNotification);
    assert_eq!(units[0].unix_millis(), Some(LAST_TIMESTAMP_MS - 15 - 10 - 12 - 300));

    let codec = CodecConfig::default();
    let frames: Vec<_> = units[..4]
        .iter()
        .map(|unit| AppFrame::decode(&unit.value, &codec))
        .collect::<lxwire::Result<_>>()?;

    assert_eq!(frames[0], AppFrame::Control(ControlFrame::init()));
    match &frames[2] {
        AppFrame::Control(frame) => {
            assert_eq!(frame.opcode, opcode::SET_LENGTH);
            assert_eq!(frame.words(), vec![22]);
        }
        other => panic!("expected set length, got {other}"),
    }
    assert_eq!(frames[3], AppFrame::DataBlock(DataBlock::new(0, 0, vec![0xF0; 16])));

    // The completion's count word is not a length, so only the notification
    // reading makes sense of it.
    assert!(AppFrame::decode(&last.value, &codec).is_err());
    let completion = Notification::parse(&last.value).expect("control notification");
    assert_eq!(completion.opcode, opcode::COMPLETION);
    assert!(completion.is_completion());
    assert_eq!(completion.words(), vec![1, 1]);
    Ok(())
}

#[test]
fn report_over_container_records() -> Result<()> {
    let container = SnoozContainer::parse(&container(&print_job_records()?)?)?;
    let codec = CodecConfig::default();
    let report = CaptureReport::from_records(container.into_records()?, &codec)?;

    assert_eq!(report.records, 7);
    assert_eq!(report.transports.get("acl"), Some(&5));
    assert_eq!(report.handles[&0x000E].writes, 3);
    assert_eq!(report.handles[&0x0010].pushes, 2);
    assert_eq!(report.handles[&0x000E].first_bytes.get(&0x55), Some(&1));
    assert_eq!(report.dialects.get("data-block"), Some(&1));
    assert_eq!(report.last_millis, Some(LAST_TIMESTAMP_MS));
    assert_eq!(report.frames.len(), 5);
    assert_eq!(report.anomalies.len(), 1, "{:?}", report.anomalies);
    assert!(report.anomalies[0].starts_with("record 6:"));
    Ok(())
}

#[test]
fn broken_inputs_fail_with_context() {
    let missing = SnoozContainer::from_bugreport("no capture here\n").unwrap_err();
    assert!(matches!(missing, lxwire::ProtocolError::ContainerNotFound { .. }));

    let mut bad_version = container(&[]).expect("container");
    bad_version[0] = 9;
    let err = SnoozContainer::parse(&bad_version).unwrap_err();
    assert!(matches!(err, lxwire::ProtocolError::UnsupportedContainerVersion { version: 9 }));
    assert!(!err.recovery_suggestions().is_empty());
}
