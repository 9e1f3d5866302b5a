//! Synchronizer configuration

use crate::constants::{
    DEFAULT_MAX_DATAGRAM_SIZE, DEFAULT_MAX_SKIP_BYTES, HEADER_SIZE, HEARTBEAT_SIZE,
    MAX_RECORD_SIZE, SIGNATURE_LEN,
};
use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to do with the rest of a record whose header was not recognized
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnrecognizedPolicy {
    /// Consume only the header and search the following bytes
    #[default]
    Rescan,
    /// Discard the declared remainder first, when the declared size is plausible
    SkipDeclared,
}

/// Tuning knobs for [`FrameSynchronizer`](crate::sync::FrameSynchronizer)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Bytes requested per stream read while unlocked
    pub lock_on_chunk: usize,

    /// Give up after discarding this many bytes in one unlocked episode
    pub max_lock_on_bytes: Option<u64>,

    /// Emit the heartbeat that produced lock-on instead of discarding it
    pub emit_anchor: bool,

    /// Handling of unrecognized headers while locked
    pub on_unrecognized: UnrecognizedPolicy,

    /// Largest declared size `SkipDeclared` will skip over
    pub max_skip_bytes: usize,

    /// Receive buffer size for datagram transports
    pub max_datagram_size: usize,

    /// Read deadline in milliseconds; cancellation is re-checked on expiry
    pub read_timeout_ms: Option<u64>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            lock_on_chunk: HEARTBEAT_SIZE,
            max_lock_on_bytes: None,
            emit_anchor: true,
            on_unrecognized: UnrecognizedPolicy::Rescan,
            max_skip_bytes: DEFAULT_MAX_SKIP_BYTES,
            max_datagram_size: DEFAULT_MAX_DATAGRAM_SIZE,
            read_timeout_ms: Some(500),
        }
    }
}

impl SyncConfig {
    /// Check that the values can drive a synchronizer
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.lock_on_chunk < SIGNATURE_LEN {
            return Err(SyncError::InvalidConfig(format!(
                "lock_on_chunk must be at least {} bytes, got {}",
                SIGNATURE_LEN, self.lock_on_chunk
            )));
        }

        if self.max_datagram_size < MAX_RECORD_SIZE {
            return Err(SyncError::InvalidConfig(format!(
                "max_datagram_size must hold the largest record ({} bytes), got {}",
                MAX_RECORD_SIZE, self.max_datagram_size
            )));
        }

        if self.max_skip_bytes < HEADER_SIZE {
            return Err(SyncError::InvalidConfig(format!(
                "max_skip_bytes must be at least {}, got {}",
                HEADER_SIZE, self.max_skip_bytes
            )));
        }

        if self.read_timeout_ms == Some(0) {
            return Err(SyncError::InvalidConfig(
                "read_timeout_ms must be positive; omit it to block indefinitely".into(),
            ));
        }

        Ok(())
    }

    /// Read deadline as a duration
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }
}
