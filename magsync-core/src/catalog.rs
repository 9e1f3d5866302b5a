//! Static table of the record types understood on the wire

use crate::constants::{
    DECIMATED_SIZE, DECIMATED_TYPE, HEARTBEAT_SIZE, HEARTBEAT_TYPE, RAW_BLOCK_SIZE, RAW_BLOCK_TYPE,
};
use crate::error::SyncError;
use crate::records::RecordHeader;
use serde::{Deserialize, Serialize};

/// The record kinds carried by a MagElement link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// 1 kHz block of 40 raw MFAM samples with analog channels
    RawBlock,
    /// One indexed, filtered magnetometer + IMU sample
    Decimated,
    /// 1 Hz instrument status
    Heartbeat,
}

/// One row of the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Record kind
    pub kind: RecordKind,
    /// Type identifier found in the header
    pub type_id: u32,
    /// Exact size on the wire, header included
    pub wire_size: usize,
}

/// Every record type the synchronizer will accept
pub const CATALOG: [CatalogEntry; 3] = [
    CatalogEntry {
        kind: RecordKind::RawBlock,
        type_id: RAW_BLOCK_TYPE,
        wire_size: RAW_BLOCK_SIZE,
    },
    CatalogEntry {
        kind: RecordKind::Decimated,
        type_id: DECIMATED_TYPE,
        wire_size: DECIMATED_SIZE,
    },
    CatalogEntry {
        kind: RecordKind::Heartbeat,
        type_id: HEARTBEAT_TYPE,
        wire_size: HEARTBEAT_SIZE,
    },
];

/// Look up a type identifier
pub fn lookup(type_id: u32) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|entry| entry.type_id == type_id)
}

/// Classify a header, enforcing that its declared size matches the catalog
pub fn classify(header: &RecordHeader) -> Result<RecordKind, SyncError> {
    let entry = lookup(header.type_id).ok_or(SyncError::UnknownRecordType(header.type_id))?;

    if header.declared_size as usize != entry.wire_size {
        return Err(SyncError::SizeMismatch {
            type_id: header.type_id,
            declared: header.declared_size,
            expected: entry.wire_size,
        });
    }

    Ok(entry.kind)
}

impl RecordKind {
    /// All kinds, in catalog order
    pub const ALL: [RecordKind; 3] = [
        RecordKind::RawBlock,
        RecordKind::Decimated,
        RecordKind::Heartbeat,
    ];

    /// Type identifier written in the header
    pub const fn type_id(self) -> u32 {
        match self {
            RecordKind::RawBlock => RAW_BLOCK_TYPE,
            RecordKind::Decimated => DECIMATED_TYPE,
            RecordKind::Heartbeat => HEARTBEAT_TYPE,
        }
    }

    /// Exact wire size, header included
    pub const fn wire_size(self) -> usize {
        match self {
            RecordKind::RawBlock => RAW_BLOCK_SIZE,
            RecordKind::Decimated => DECIMATED_SIZE,
            RecordKind::Heartbeat => HEARTBEAT_SIZE,
        }
    }

    /// The low "kind" byte of the type identifier
    pub const fn kind_byte(self) -> u8 {
        (self.type_id() & 0xFF) as u8
    }

    /// Resolve a type identifier without checking any size
    pub fn from_type_id(type_id: u32) -> Option<Self> {
        lookup(type_id).map(|entry| entry.kind)
    }

    /// Short label used in summaries and reports
    pub const fn name(self) -> &'static str {
        match self {
            RecordKind::RawBlock => "raw",
            RecordKind::Decimated => "decimated",
            RecordKind::Heartbeat => "heartbeat",
        }
    }
}
