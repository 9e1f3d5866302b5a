//! Error types for magsync operations

/// Errors that can occur while synchronizing or decoding records
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// Record type identifier not present in the catalog
    #[error("Unknown record type: {0:#010x}")]
    UnknownRecordType(u32),

    /// Declared size disagrees with the catalog size for this type
    #[error("Record {type_id:#010x} declares {declared} bytes, catalog says {expected}")]
    SizeMismatch {
        /// The record type identifier.
        type_id: u32,
        /// The size read from the wire header.
        declared: u32,
        /// The catalog size for this type.
        expected: usize,
    },

    /// Buffer handed to the decoder has the wrong length
    #[error("Incomplete record: expected {expected} bytes, got {actual}")]
    IncompleteRecord {
        /// The number of bytes expected.
        expected: usize,
        /// The number of bytes actually found.
        actual: usize,
    },

    /// The transport closed at a record boundary
    #[error("End of stream")]
    EndOfStream,

    /// The transport closed in the middle of a required read
    #[error("Stream truncated: needed {expected} bytes, got {actual}")]
    Truncated {
        /// The number of bytes the synchronizer was waiting for.
        expected: usize,
        /// The number of bytes available when the stream closed.
        actual: usize,
    },

    /// Lock-on discarded more bytes than the configured bound
    #[error("No heartbeat found after scanning {scanned} bytes")]
    LockOnExhausted {
        /// Bytes discarded while unlocked.
        scanned: u64,
    },

    /// Invalid synchronizer configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error during read
    #[error("IO error: {0}")]
    Io(String),
}

impl SyncError {
    /// True for errors that end a synchronization run.
    ///
    /// Framing faults (`UnknownRecordType`, `SizeMismatch`) are recovered by
    /// the synchronizer and only reach callers of the standalone decoder.
    pub fn is_transport_fault(&self) -> bool {
        matches!(
            self,
            SyncError::EndOfStream
                | SyncError::Truncated { .. }
                | SyncError::Io(_)
                | SyncError::LockOnExhausted { .. }
        )
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof => SyncError::EndOfStream,
            _ => SyncError::Io(err.to_string()),
        }
    }
}
