use sikboot::client::DeviceInfo;
use sikboot::operation::OperationEvent;
use sikboot::protocol::{BOARD_RF50, FREQ_433};
use sikboot::targets::Target;

use super::human::HumanOutput;
use super::json::{operation_event_to_json, JsonOutput};
use super::{hex_dump_lines, JsonProgressMode, OperationRecorder, OutputOptions};

fn target(port: &str, vid: Option<u16>) -> Target {
    Target {
        port_name: port.to_string(),
        vid,
        pid: vid.map(|_| 0xEA60),
        serial_number: None,
        manufacturer: None,
        product: Some("CP2102".to_string()),
    }
}

#[test]
fn json_event_has_schema_and_event() {
    let ev = operation_event_to_json(OperationEvent::HexLoaded {
        bytes: 12,
        segments: 3,
        signed: true,
    });
    let v = serde_json::to_value(&ev).unwrap();
    assert_eq!(v.get("schema").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(v.get("event").and_then(|v| v.as_str()), Some("hex_loaded"));
    assert_eq!(v.get("bytes").and_then(|v| v.as_u64()), Some(12));
    assert_eq!(v.get("segments").and_then(|v| v.as_u64()), Some(3));
    assert_eq!(v.get("signed").and_then(|v| v.as_bool()), Some(true));
}

#[test]
fn json_device_event_names_board_and_band() {
    let ev = operation_event_to_json(OperationEvent::DeviceIdentified {
        info: DeviceInfo {
            board_id: BOARD_RF50,
            board_frequency: FREQ_433,
        },
    });
    let v = serde_json::to_value(&ev).unwrap();
    let device = v.get("device").unwrap();
    assert_eq!(device.get("board_id").and_then(|v| v.as_u64()), Some(0x4D));
    assert_eq!(device.get("board").and_then(|v| v.as_str()), Some("RF50"));
    assert_eq!(
        device.get("frequency").and_then(|v| v.as_str()),
        Some("433MHz")
    );
}

#[test]
fn json_timestamps_are_added_when_enabled() {
    let mut out = JsonOutput::new(OutputOptions {
        verbose: false,
        quiet: false,
        json_timestamps: true,
        json_progress: JsonProgressMode::Chunks,
    });
    let line = out.render_event_json(operation_event_to_json(OperationEvent::SyncOk));
    let v: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(v.get("event").and_then(|v| v.as_str()), Some("sync_ok"));
    assert!(v.get("t_ms").is_some());
}

#[test]
fn percent_progress_throttles_chunks() {
    let mut out = JsonOutput::new(OutputOptions {
        verbose: false,
        quiet: false,
        json_timestamps: false,
        json_progress: JsonProgressMode::Percent,
    });
    let emitted = (0..1000).filter(|&i| out.should_emit_chunk(i, 1000)).count();
    assert_eq!(emitted, 101);
}

#[test]
fn recorder_counts_chunks_and_bytes() {
    let mut rec = OperationRecorder::new("flash");
    rec.observe(&OperationEvent::PortOpen {
        port: "/dev/ttyUSB0".to_string(),
        baud: 115_200,
    });
    for (i, len) in [32usize, 32, 6].into_iter().enumerate() {
        rec.observe(&OperationEvent::Chunk {
            index: i,
            total: 3,
            addr: 0x0400 + (i as u16) * 32,
            len,
        });
    }
    rec.observe(&OperationEvent::Verify {
        index: 0,
        total: 1,
        addr: 0x0400,
        len: 70,
    });
    let summary = rec.finish(0, None);
    assert_eq!(summary.chunks, 3);
    assert_eq!(summary.bytes, 70);
    assert!(summary.verified);
    assert!(!summary.rebooted);
    assert_eq!(summary.port.as_deref(), Some("/dev/ttyUSB0"));
}

#[test]
fn hex_dump_rows() {
    let data: Vec<u8> = (0x40..0x54).collect();
    let lines = hex_dump_lines(0x0400, &data);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("0400: 40 41 42"));
    assert!(lines[0].ends_with("|@ABCDEFGHIJKLMNO|"));
    assert!(lines[1].starts_with("0410: 50 51 52 53"));
    assert!(lines[1].ends_with("|PQRS|"));
}

#[test]
fn ambiguous_help_includes_targets() {
    let detected = vec![
        Some(target("/dev/ttyUSB0", Some(0x10C4))),
        None,
        Some(target("/dev/ttyS0", None)),
    ];

    let lines = HumanOutput::ambiguous_help_lines(&detected);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("serial:/dev/ttyUSB0"));
    assert!(lines[0].contains("10C4:EA60"));
    assert!(lines[1].starts_with("[2] serial:/dev/ttyS0"));
}
