//! Record decoding
//!
//! Every field is read at a fixed offset in little-endian order. No buffer is
//! ever reinterpreted as a structure.

use crate::catalog::{self, RecordKind};
use crate::constants::{HEADER_SIZE, RAW_SAMPLES_PER_BLOCK};
use crate::error::SyncError;
use crate::records::{
    DecimatedSample, Heartbeat, RawBlock, RawSample, Record, RecordHeader,
};
use bytes::Buf;

/// Decode `bytes` as a record of type `type_id`.
///
/// `bytes` must hold the whole record, header included, and be exactly the
/// catalog size for the type.
pub fn decode(type_id: u32, bytes: &[u8]) -> Result<Record, SyncError> {
    let kind = RecordKind::from_type_id(type_id).ok_or(SyncError::UnknownRecordType(type_id))?;
    decode_kind(kind, bytes)
}

/// Decode a complete record, validating its header against the catalog
pub fn decode_record(bytes: &[u8]) -> Result<Record, SyncError> {
    let header = RecordHeader::parse(bytes)?;
    let kind = catalog::classify(&header)?;
    decode_kind(kind, bytes)
}

/// Decode `bytes` as a record of a known kind
pub fn decode_kind(kind: RecordKind, bytes: &[u8]) -> Result<Record, SyncError> {
    if bytes.len() != kind.wire_size() {
        return Err(SyncError::IncompleteRecord {
            expected: kind.wire_size(),
            actual: bytes.len(),
        });
    }

    let mut body = &bytes[HEADER_SIZE..];
    let record = match kind {
        RecordKind::RawBlock => Record::RawBlock(decode_raw_block(&mut body)),
        RecordKind::Decimated => Record::Decimated(decode_decimated(&mut body)),
        RecordKind::Heartbeat => Record::Heartbeat(decode_heartbeat(&mut body)),
    };

    Ok(record)
}

fn decode_heartbeat(buf: &mut &[u8]) -> Heartbeat {
    let index = buf.get_u64_le();
    let ip_address = buf.get_u32_le();
    let mut serial_number = [0u8; 8];
    buf.copy_to_slice(&mut serial_number);
    let mut mfam_serial_number = [0u8; 8];
    buf.copy_to_slice(&mut mfam_serial_number);

    let sample_period_ms = buf.get_u32_le();
    let mfam_running_mode = buf.get_u32_le();
    let pps_status = buf.get_u32_le();
    let counter_at_last_pps = buf.get_u64_le();
    let counter_at_first_pps = buf.get_u64_le();
    let supply_voltage = buf.get_u16_le();
    let leak_detector = buf.get_u16_le();
    let aux_port_status = buf.get_u16_le();
    let total_run_time = buf.get_u16_le();
    let fpga_temperature = buf.get_u16_le();
    let board_temperature = buf.get_u16_le();
    let system_faults = buf.get_u32_le();
    let reserved2 = buf.get_u32_le();
    let mfam_status = [
        buf.get_u16_le(),
        buf.get_u16_le(),
        buf.get_u16_le(),
        buf.get_u16_le(),
    ];
    let mut reserved1 = [0u8; 16];
    buf.copy_to_slice(&mut reserved1);

    Heartbeat {
        index,
        ip_address,
        serial_number,
        mfam_serial_number,
        sample_period_ms,
        mfam_running_mode,
        pps_status,
        counter_at_last_pps,
        counter_at_first_pps,
        supply_voltage,
        leak_detector,
        aux_port_status,
        total_run_time,
        fpga_temperature,
        board_temperature,
        system_faults,
        reserved2,
        mfam_status,
        reserved1,
    }
}

fn decode_decimated(buf: &mut &[u8]) -> DecimatedSample {
    let index = buf.get_u64_le();
    let mag_data = buf.get_f64_le();
    let field_strength = buf.get_f32_le();
    let data_valid = buf.get_u32_le();
    let compass = [buf.get_f32_le(), buf.get_f32_le(), buf.get_f32_le()];
    let accelerometer = [buf.get_f32_le(), buf.get_f32_le(), buf.get_f32_le()];
    let gyro = [buf.get_f32_le(), buf.get_f32_le(), buf.get_f32_le()];
    let imu_temperature = buf.get_f32_le();
    let mut reserved = [0u8; 16];
    buf.copy_to_slice(&mut reserved);

    DecimatedSample {
        index,
        mag_data,
        field_strength,
        data_valid,
        compass,
        accelerometer,
        gyro,
        imu_temperature,
        reserved,
    }
}

fn decode_raw_block(buf: &mut &[u8]) -> RawBlock {
    let first_sample_index = buf.get_u64_le();
    let samples = (0..RAW_SAMPLES_PER_BLOCK)
        .map(|_| decode_raw_sample(buf))
        .collect();

    RawBlock {
        first_sample_index,
        samples,
    }
}

fn decode_raw_sample(buf: &mut &[u8]) -> RawSample {
    RawSample {
        frame_id: buf.get_u16_le(),
        sys_status: buf.get_u16_le(),
        mag1_data: buf.get_u32_le(),
        mag1_status: buf.get_u16_le(),
        mag2_status: buf.get_u16_le(),
        mag2_data: buf.get_u32_le(),
        aux: [
            buf.get_u16_le(),
            buf.get_u16_le(),
            buf.get_u16_le(),
            buf.get_u16_le(),
        ],
        analog: [
            buf.get_u16_le(),
            buf.get_u16_le(),
            buf.get_u16_le(),
            buf.get_u16_le(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DECIMATED_TYPE, HEARTBEAT_SIZE, HEARTBEAT_TYPE};
    use crate::encoder::encode_record;

    fn put(buf: &mut [u8], offset: usize, bytes: &[u8]) {
        buf[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    #[test]
    fn test_decode_heartbeat_offsets() {
        let mut wire = vec![0u8; HEARTBEAT_SIZE];
        put(&mut wire, 0, &HEARTBEAT_TYPE.to_le_bytes());
        put(&mut wire, 4, &(HEARTBEAT_SIZE as u32).to_le_bytes());
        put(&mut wire, 8, &77u64.to_le_bytes());
        put(&mut wire, 36, &1000u32.to_le_bytes());
        put(&mut wire, 48, &5_000u64.to_le_bytes());
        put(&mut wire, 56, &1_000u64.to_le_bytes());
        put(&mut wire, 74, &321u16.to_le_bytes());
        put(&mut wire, 84, &0xC123u16.to_le_bytes());
        put(&mut wire, 90, &0x0001u16.to_le_bytes());
        wire[107] = 0xAB;

        let record = decode_record(&wire).unwrap();
        let Record::Heartbeat(status) = record else {
            panic!("expected heartbeat");
        };

        assert_eq!(status.index, 77);
        assert_eq!(status.sample_period_ms, 1000);
        assert_eq!(status.counter_at_last_pps, 5_000);
        assert_eq!(status.counter_at_first_pps, 1_000);
        assert_eq!(status.board_temperature, 321);
        assert_eq!(status.mfam_status, [0xC123, 0, 0, 1]);
        assert_eq!(status.reserved1[15], 0xAB);
    }

    #[test]
    fn test_decode_decimated_offsets() {
        let mut wire = vec![0u8; 88];
        put(&mut wire, 0, &DECIMATED_TYPE.to_le_bytes());
        put(&mut wire, 4, &88u32.to_le_bytes());
        put(&mut wire, 8, &9u64.to_le_bytes());
        put(&mut wire, 16, &52_000.5f64.to_le_bytes());
        put(&mut wire, 32, &1.5f32.to_le_bytes());
        put(&mut wire, 56, &(-2.0f32).to_le_bytes());
        put(&mut wire, 68, &25.0f32.to_le_bytes());

        let Record::Decimated(sample) = decode(DECIMATED_TYPE, &wire).unwrap() else {
            panic!("expected decimated");
        };

        assert_eq!(sample.index, 9);
        assert_eq!(sample.mag_data, 52_000.5);
        assert_eq!(sample.compass[0], 1.5);
        assert_eq!(sample.gyro[0], -2.0);
        assert_eq!(sample.imu_temperature, 25.0);
    }

    #[test]
    fn test_decode_raw_block_offsets() {
        let mut block = RawBlock {
            first_sample_index: 4000,
            ..Default::default()
        };
        block.samples[39].mag2_data = 1_000_000;
        block.samples[0].analog = [1, 2, 3, 4];

        let wire = encode_record(&Record::RawBlock(block.clone())).unwrap();
        // Last sample's mag2 sits at 16 + 39 * 32 + 12
        assert_eq!(&wire[1276..1280], &1_000_000u32.to_le_bytes());
        // First sample's adc0 sits at 16 + 24
        assert_eq!(&wire[40..42], &1u16.to_le_bytes());

        assert_eq!(decode_record(&wire).unwrap(), Record::RawBlock(block));
    }

    #[test]
    fn test_decode_wrong_length() {
        let result = decode(HEARTBEAT_TYPE, &[0u8; 100]);
        assert_eq!(
            result,
            Err(SyncError::IncompleteRecord {
                expected: 108,
                actual: 100
            })
        );
    }

    #[test]
    fn test_decode_unknown_type() {
        assert_eq!(
            decode(0x0001_0099, &[0u8; 88]),
            Err(SyncError::UnknownRecordType(0x0001_0099))
        );
    }

    #[test]
    fn test_decode_record_rejects_size_mismatch() {
        let mut wire = vec![0u8; 88];
        put(&mut wire, 0, &DECIMATED_TYPE.to_le_bytes());
        put(&mut wire, 4, &96u32.to_le_bytes());
        assert!(matches!(
            decode_record(&wire),
            Err(SyncError::SizeMismatch { declared: 96, .. })
        ));
    }
}
