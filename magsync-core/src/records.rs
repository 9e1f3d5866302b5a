//! Typed records decoded from the wire

use crate::catalog::{self, RecordKind};
use crate::constants::{
    mag_to_nanotesla, AUX_ACCEL, AUX_COMPASS, AUX_DATA_MASK, AUX_GYRO, AUX_SERIAL,
    DEAD_ZONE_MASK, FAILURE_MASK, FID_COUNT_MASK, HEADER_SIZE, MAG_1_VALID, MAG_2_VALID,
    MAIN_MODE_MASK, MAIN_STATE_MASK, MFAM_IN_MAG_MODE, MFAM_IN_STARTUP, PPS_LOCK_MASK, PPS_MASK,
    RAW_SAMPLES_PER_BLOCK,
};
use crate::error::SyncError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// The `{ type_id, size }` pair opening every record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordHeader {
    /// Record type identifier
    pub type_id: u32,

    /// Record size in bytes as declared by the sender, header included
    pub declared_size: u32,
}

impl RecordHeader {
    /// Header the catalog expects for `kind`
    pub fn new(kind: RecordKind) -> Self {
        Self {
            type_id: kind.type_id(),
            declared_size: kind.wire_size() as u32,
        }
    }

    /// Parse the first eight bytes of `bytes`
    pub fn parse(bytes: &[u8]) -> Result<Self, SyncError> {
        if bytes.len() < HEADER_SIZE {
            return Err(SyncError::IncompleteRecord {
                expected: HEADER_SIZE,
                actual: bytes.len(),
            });
        }

        Ok(Self {
            type_id: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            declared_size: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        })
    }

    /// Wire representation
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[..4].copy_from_slice(&self.type_id.to_le_bytes());
        out[4..].copy_from_slice(&self.declared_size.to_le_bytes());
        out
    }

    /// Catalog kind, if the type is known and the size agrees
    pub fn kind(&self) -> Option<RecordKind> {
        catalog::classify(self).ok()
    }
}

/// 1 Hz status/telemetry record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    /// Heartbeat sequence index
    pub index: u64,
    /// Instrument IPv4 address as stored by the device
    pub ip_address: u32,
    /// Instrument serial number, ASCII, NUL padded
    pub serial_number: [u8; 8],
    /// MFAM sensor serial number, ASCII, NUL padded
    pub mfam_serial_number: [u8; 8],
    /// Sample period in milliseconds
    pub sample_period_ms: u32,
    pub mfam_running_mode: u32,
    pub pps_status: u32,
    /// Sample counter at the most recent PPS pulse
    pub counter_at_last_pps: u64,
    /// Sample counter at the first PPS pulse
    pub counter_at_first_pps: u64,
    /// Raw ADC reading of the supply voltage
    pub supply_voltage: u16,
    /// Raw ADC reading of the leak detector
    pub leak_detector: u16,
    pub aux_port_status: u16,
    pub total_run_time: u16,
    pub fpga_temperature: u16,
    pub board_temperature: u16,
    pub system_faults: u32,
    pub reserved2: u32,
    /// frame_id, sys_status, mag1 status and mag2 status of the last MFAM sample
    pub mfam_status: [u16; 4],
    pub reserved1: [u8; 16],
}

impl Heartbeat {
    /// Instrument address.
    ///
    /// The device stores the address in network order, so the little-endian
    /// bytes of the field are the octets.
    pub fn ip_addr(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.ip_address.to_le_bytes())
    }

    /// Instrument serial number as text
    pub fn serial(&self) -> String {
        ascii_field(&self.serial_number)
    }

    /// MFAM serial number as text
    pub fn mfam_serial(&self) -> String {
        ascii_field(&self.mfam_serial_number)
    }
}

fn ascii_field(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).trim().to_string()
}

/// Indexed, filtered magnetometer + IMU sample
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecimatedSample {
    /// Sample index
    pub index: u64,
    /// Filtered field reading, nanotesla
    pub mag_data: f64,
    pub field_strength: f32,
    pub data_valid: u32,
    /// Compass x, y, z
    pub compass: [f32; 3],
    /// Accelerometer x, y, z
    pub accelerometer: [f32; 3],
    /// Gyro x, y, z
    pub gyro: [f32; 3],
    pub imu_temperature: f32,
    pub reserved: [u8; 16],
}

/// What the auxiliary fields of a raw sample carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuxKind {
    /// Compass axes
    Compass,
    /// Gyro axes
    Gyro,
    /// Accelerometer axes
    Accelerometer,
    /// Serial number words
    Serial,
}

/// One raw MFAM sample with its four analog channels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSample {
    /// Fiducial counter plus validity and auxiliary-kind bits
    pub frame_id: u16,
    /// System status bits
    pub sys_status: u16,
    /// Magnetometer 1 raw count
    pub mag1_data: u32,
    pub mag1_status: u16,
    pub mag2_status: u16,
    /// Magnetometer 2 raw count
    pub mag2_data: u32,
    /// Auxiliary x, y, z, t; meaning given by [`RawSample::aux_kind`]
    pub aux: [u16; 4],
    /// ADC channels 0..3
    pub analog: [u16; 4],
}

impl RawSample {
    /// Monotonic per-sample counter (11 bits, wraps)
    pub fn fiducial(&self) -> u16 {
        self.frame_id & FID_COUNT_MASK
    }

    pub fn mag1_valid(&self) -> bool {
        self.frame_id & MAG_1_VALID != 0
    }

    pub fn mag2_valid(&self) -> bool {
        self.frame_id & MAG_2_VALID != 0
    }

    /// Kind of data in the auxiliary fields, `None` when they are unused
    pub fn aux_kind(&self) -> Option<AuxKind> {
        match self.frame_id & AUX_DATA_MASK {
            AUX_COMPASS => Some(AuxKind::Compass),
            AUX_GYRO => Some(AuxKind::Gyro),
            AUX_ACCEL => Some(AuxKind::Accelerometer),
            AUX_SERIAL => Some(AuxKind::Serial),
            _ => None,
        }
    }

    pub fn pps_received(&self) -> bool {
        self.sys_status & PPS_MASK != 0
    }

    pub fn pps_locked(&self) -> bool {
        self.sys_status & PPS_LOCK_MASK != 0
    }

    pub fn failed(&self) -> bool {
        self.sys_status & FAILURE_MASK != 0
    }

    /// Main system state field of `sys_status`
    pub fn main_state(&self) -> u16 {
        (self.sys_status & MAIN_STATE_MASK) >> 10
    }

    pub fn is_starting(&self) -> bool {
        self.sys_status & MAIN_MODE_MASK & MFAM_IN_STARTUP != 0
    }

    pub fn is_measuring(&self) -> bool {
        self.sys_status & MAIN_MODE_MASK & MFAM_IN_MAG_MODE != 0
    }

    pub fn mag1_dead_zone(&self) -> bool {
        self.mag1_status & DEAD_ZONE_MASK == DEAD_ZONE_MASK
    }

    pub fn mag2_dead_zone(&self) -> bool {
        self.mag2_status & DEAD_ZONE_MASK == DEAD_ZONE_MASK
    }

    /// Magnetometer 1 reading in nanotesla
    pub fn mag1_nanotesla(&self) -> f64 {
        mag_to_nanotesla(self.mag1_data)
    }

    /// Magnetometer 2 reading in nanotesla
    pub fn mag2_nanotesla(&self) -> f64 {
        mag_to_nanotesla(self.mag2_data)
    }
}

/// 1 kHz block of raw samples
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBlock {
    /// Index of the first sample in the block
    pub first_sample_index: u64,
    /// Exactly [`RAW_SAMPLES_PER_BLOCK`] samples
    pub samples: Vec<RawSample>,
}

impl Default for RawBlock {
    fn default() -> Self {
        Self {
            first_sample_index: 0,
            samples: vec![RawSample::default(); RAW_SAMPLES_PER_BLOCK],
        }
    }
}

/// A decoded record of any kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Record {
    /// Raw sample block
    RawBlock(RawBlock),
    /// Decimated sample
    Decimated(DecimatedSample),
    /// Heartbeat
    Heartbeat(Heartbeat),
}

impl Record {
    /// Catalog kind of this record
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::RawBlock(_) => RecordKind::RawBlock,
            Record::Decimated(_) => RecordKind::Decimated,
            Record::Heartbeat(_) => RecordKind::Heartbeat,
        }
    }

    /// The sequence index carried by the record
    pub fn index(&self) -> u64 {
        match self {
            Record::RawBlock(block) => block.first_sample_index,
            Record::Decimated(sample) => sample.index,
            Record::Heartbeat(status) => status.index,
        }
    }
}

/// A framed record: decoded view plus the exact bytes read from the wire
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedRecord {
    /// Decoded record
    pub record: Record,

    /// Wire bytes, header included
    pub raw: Bytes,
}

impl ClassifiedRecord {
    /// Catalog kind
    pub fn kind(&self) -> RecordKind {
        self.record.kind()
    }

    /// Size on the wire
    pub fn wire_size(&self) -> usize {
        self.raw.len()
    }
}
