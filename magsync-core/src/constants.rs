//! Constants and limits for the MagElement wire format

/// Domain bits shared by every magnetometer record type identifier
pub const MAGNETOMETER_DOMAIN: u32 = 0x01 << 16;

/// Type identifier of the 1 kHz, 40-sample raw MFAM block
pub const RAW_BLOCK_TYPE: u32 = MAGNETOMETER_DOMAIN | 0x1F;

/// Type identifier of the filtered, decimated MFAM sample
pub const DECIMATED_TYPE: u32 = MAGNETOMETER_DOMAIN | 0x22;

/// Type identifier of the 1 Hz heartbeat/status record
pub const HEARTBEAT_TYPE: u32 = MAGNETOMETER_DOMAIN | 0x23;

/// Size of the `{ type_id, size }` header that opens every record
pub const HEADER_SIZE: usize = 8;

/// Exact wire size of a raw block record, header included
pub const RAW_BLOCK_SIZE: usize = 1296;

/// Exact wire size of a decimated record, header included
pub const DECIMATED_SIZE: usize = 88;

/// Exact wire size of a heartbeat record, header included
pub const HEARTBEAT_SIZE: usize = 108;

/// Largest record in the catalog
pub const MAX_RECORD_SIZE: usize = RAW_BLOCK_SIZE;

/// Number of MFAM samples carried by one raw block
pub const RAW_SAMPLES_PER_BLOCK: usize = 40;

/// Wire size of one raw MFAM sample plus its analog quad
pub const RAW_SAMPLE_SIZE: usize = 32;

/// Length of the lock-on signature (a heartbeat header)
pub const SIGNATURE_LEN: usize = HEADER_SIZE;

/// Heartbeat header as it appears on the wire; the lock-on anchor
pub const HEARTBEAT_SIGNATURE: [u8; SIGNATURE_LEN] = [
    0x23, 0x00, 0x01, 0x00, // HEARTBEAT_TYPE, little-endian
    0x6C, 0x00, 0x00, 0x00, // 108, little-endian
];

/// Nanotesla per least-significant bit of a raw magnetometer count
pub const NANOTESLAS_PER_LSB: f64 = 5.0e-5;

/// Default upper bound on a single datagram read
pub const DEFAULT_MAX_DATAGRAM_SIZE: usize = 4096;

/// Default upper bound on a declared size that `SkipDeclared` will honor
pub const DEFAULT_MAX_SKIP_BYTES: usize = 2000;

/// Mask of the fiducial counter in an MFAM `frame_id`
pub const FID_COUNT_MASK: u16 = 0x07FF;

/// Magnetometer 1 reading is valid
pub const MAG_1_VALID: u16 = 0x4000;

/// Magnetometer 2 reading is valid
pub const MAG_2_VALID: u16 = 0x8000;

/// Bits of `frame_id` selecting what the auxiliary fields carry
pub const AUX_DATA_MASK: u16 = 0x3800;

/// Auxiliary fields carry compass data
pub const AUX_COMPASS: u16 = 0x0800;

/// Auxiliary fields carry gyro data
pub const AUX_GYRO: u16 = 0x1000;

/// Auxiliary fields carry accelerometer data
pub const AUX_ACCEL: u16 = 0x2000;

/// Auxiliary fields carry serial number data
pub const AUX_SERIAL: u16 = 0x3800;

/// `sys_status`: PPS pulse received
pub const PPS_MASK: u16 = 0x8000;

/// `sys_status`: locked to PPS
pub const PPS_LOCK_MASK: u16 = 0x4000;

/// `sys_status`: magnetometer failure
pub const FAILURE_MASK: u16 = 0x0001;

/// `sys_status`: main system state
pub const MAIN_STATE_MASK: u16 = 0x3C00;

/// `sys_status`: main operating mode
pub const MAIN_MODE_MASK: u16 = 0x0007;

/// Main mode value while the MFAM is starting up
pub const MFAM_IN_STARTUP: u16 = 0x0002;

/// Main mode value while the MFAM is measuring
pub const MFAM_IN_MAG_MODE: u16 = 0x0004;

/// Per-magnetometer status: sensor is in its dead zone
pub const DEAD_ZONE_MASK: u16 = 0x0001;

/// Convert a raw magnetometer count to nanotesla
pub fn mag_to_nanotesla(raw: u32) -> f64 {
    f64::from(raw) * NANOTESLAS_PER_LSB
}
