//! Record encoding
//!
//! Produces the exact wire image of a record, header included. Used to write
//! test fixtures and simulated instrument traffic.

use crate::constants::RAW_SAMPLES_PER_BLOCK;
use crate::error::SyncError;
use crate::records::{DecimatedSample, Heartbeat, RawBlock, RawSample, Record, RecordHeader};
use bytes::{BufMut, Bytes, BytesMut};

/// Encode a record into its wire form
///
/// Layout (little-endian, packed):
/// 1. Type identifier (4 bytes)
/// 2. Record size (4 bytes)
/// 3. Body, per the record kind
pub fn encode_record(record: &Record) -> Result<Bytes, SyncError> {
    let kind = record.kind();
    let mut buf = BytesMut::with_capacity(kind.wire_size());

    buf.put_slice(&RecordHeader::new(kind).to_bytes());

    match record {
        Record::RawBlock(block) => encode_raw_block(block, &mut buf)?,
        Record::Decimated(sample) => encode_decimated(sample, &mut buf),
        Record::Heartbeat(status) => encode_heartbeat(status, &mut buf),
    }

    debug_assert_eq!(buf.len(), kind.wire_size());
    Ok(buf.freeze())
}

fn encode_heartbeat(status: &Heartbeat, buf: &mut BytesMut) {
    buf.put_u64_le(status.index);
    buf.put_u32_le(status.ip_address);
    buf.put_slice(&status.serial_number);
    buf.put_slice(&status.mfam_serial_number);
    buf.put_u32_le(status.sample_period_ms);
    buf.put_u32_le(status.mfam_running_mode);
    buf.put_u32_le(status.pps_status);
    buf.put_u64_le(status.counter_at_last_pps);
    buf.put_u64_le(status.counter_at_first_pps);
    buf.put_u16_le(status.supply_voltage);
    buf.put_u16_le(status.leak_detector);
    buf.put_u16_le(status.aux_port_status);
    buf.put_u16_le(status.total_run_time);
    buf.put_u16_le(status.fpga_temperature);
    buf.put_u16_le(status.board_temperature);
    buf.put_u32_le(status.system_faults);
    buf.put_u32_le(status.reserved2);
    for word in status.mfam_status {
        buf.put_u16_le(word);
    }
    buf.put_slice(&status.reserved1);
}

fn encode_decimated(sample: &DecimatedSample, buf: &mut BytesMut) {
    buf.put_u64_le(sample.index);
    buf.put_f64_le(sample.mag_data);
    buf.put_f32_le(sample.field_strength);
    buf.put_u32_le(sample.data_valid);
    for axis in sample
        .compass
        .iter()
        .chain(&sample.accelerometer)
        .chain(&sample.gyro)
    {
        buf.put_f32_le(*axis);
    }
    buf.put_f32_le(sample.imu_temperature);
    buf.put_slice(&sample.reserved);
}

fn encode_raw_block(block: &RawBlock, buf: &mut BytesMut) -> Result<(), SyncError> {
    if block.samples.len() != RAW_SAMPLES_PER_BLOCK {
        return Err(SyncError::IncompleteRecord {
            expected: RAW_SAMPLES_PER_BLOCK,
            actual: block.samples.len(),
        });
    }

    buf.put_u64_le(block.first_sample_index);
    for sample in &block.samples {
        encode_raw_sample(sample, buf);
    }
    Ok(())
}

fn encode_raw_sample(sample: &RawSample, buf: &mut BytesMut) {
    buf.put_u16_le(sample.frame_id);
    buf.put_u16_le(sample.sys_status);
    buf.put_u32_le(sample.mag1_data);
    buf.put_u16_le(sample.mag1_status);
    buf.put_u16_le(sample.mag2_status);
    buf.put_u32_le(sample.mag2_data);
    for word in sample.aux.iter().chain(&sample.analog) {
        buf.put_u16_le(*word);
    }
}
