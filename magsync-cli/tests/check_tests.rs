use std::fs;
use tempfile::tempdir;

use magsync_cli::commands::check;
use magsync_core::{
    encoder::encode_record,
    records::{DecimatedSample, Heartbeat, RawBlock},
    Record, RecordKind, SyncConfig,
};

fn heartbeat(index: u64) -> Vec<u8> {
    let mut serial_number = [0u8; 8];
    serial_number[..6].copy_from_slice(b"ME0042");

    encode_record(&Record::Heartbeat(Heartbeat {
        index,
        serial_number,
        ip_address: u32::from_le_bytes([10, 0, 0, 7]),
        sample_period_ms: 1,
        ..Default::default()
    }))
    .unwrap()
    .to_vec()
}

fn raw_block(first_sample_index: u64) -> Vec<u8> {
    encode_record(&Record::RawBlock(RawBlock {
        first_sample_index,
        ..Default::default()
    }))
    .unwrap()
    .to_vec()
}

fn decimated(index: u64) -> Vec<u8> {
    encode_record(&Record::Decimated(DecimatedSample {
        index,
        ..Default::default()
    }))
    .unwrap()
    .to_vec()
}

/// Helper: a clean capture of `seconds` heartbeats, each followed by two raw blocks
fn create_capture(seconds: u64) -> Vec<u8> {
    let mut data = Vec::new();
    for second in 0..seconds {
        data.extend(heartbeat(second));
        data.extend(raw_block(second * 80));
        data.extend(raw_block(second * 80 + 40));
        data.extend(decimated(second * 100));
    }
    data
}

#[test]
fn test_check_clean_capture() {
    let td = tempdir().unwrap();
    let path = td.path().join("clean.bin");
    fs::write(&path, create_capture(3)).unwrap();

    let report = check::analyze(&path, SyncConfig::default()).unwrap();

    assert!(report.is_clean());
    assert_eq!(report.stats.records(), 12);
    assert_eq!(report.stats.raw_blocks, 6);
    assert_eq!(report.truncated_tail, None);

    let instrument = report.instrument.unwrap();
    assert_eq!(instrument.serial, "ME0042");
    assert_eq!(instrument.ip_address.to_string(), "10.0.0.7");
}

#[test]
fn test_check_reports_gap_and_noise() {
    let td = tempdir().unwrap();
    let path = td.path().join("gappy.bin");

    let mut data = vec![0xEEu8; 64];
    data.extend(heartbeat(0));
    data.extend(raw_block(0));
    data.extend(raw_block(40));
    // raw block 80 lost
    data.extend(raw_block(120));
    fs::write(&path, data).unwrap();

    let report = check::analyze(&path, SyncConfig::default()).unwrap();

    assert!(!report.is_clean());
    assert_eq!(report.stats.bytes_discarded, 64);
    assert_eq!(report.continuity.gaps.len(), 1);

    let gap = report.continuity.gaps[0];
    assert_eq!(gap.kind, RecordKind::RawBlock);
    assert_eq!(gap.expected, 80);
    assert_eq!(gap.missing(), 1);
}

#[test]
fn test_check_index_jump_shorter_than_stride() {
    let td = tempdir().unwrap();
    let path = td.path().join("restart.bin");

    let mut data = heartbeat(0);
    data.extend(raw_block(0));
    data.extend(raw_block(40));
    data.extend(raw_block(60));
    fs::write(&path, data).unwrap();

    let report = check::analyze(&path, SyncConfig::default()).unwrap();
    assert_eq!(report.continuity.gaps.len(), 1);
    assert_eq!(report.continuity.missing(), 0);
    assert!(!report.is_clean());

    check::execute(&path, false, None).unwrap();
}

#[test]
fn test_check_truncated_tail() {
    let td = tempdir().unwrap();
    let path = td.path().join("truncated.bin");

    let mut data = create_capture(1);
    data.extend_from_slice(&heartbeat(1)[..50]);
    fs::write(&path, data).unwrap();

    let report = check::analyze(&path, SyncConfig::default()).unwrap();

    assert_eq!(report.stats.records(), 4);
    assert!(report.truncated_tail.is_some());
    assert!(!report.is_clean());
}

#[test]
fn test_check_json_output() {
    let td = tempdir().unwrap();
    let path = td.path().join("capture.bin");
    fs::write(&path, create_capture(2)).unwrap();

    check::execute(&path, true, None).unwrap();

    let report = check::analyze(&path, SyncConfig::default()).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["stats"]["heartbeats"].as_u64(), Some(2));
    assert_eq!(json["continuity"]["lanes"][0]["kind"], "RawBlock");
}

#[test]
fn test_check_missing_file() {
    let td = tempdir().unwrap();
    let result = check::execute(&td.path().join("absent.bin"), false, None);
    assert!(result.is_err());
}

#[test]
fn test_check_empty_file() {
    let td = tempdir().unwrap();
    let path = td.path().join("empty.bin");
    fs::write(&path, b"").unwrap();

    let report = check::analyze(&path, SyncConfig::default()).unwrap();
    assert_eq!(report.stats.records(), 0);

    check::execute(&path, false, None).unwrap();
}
