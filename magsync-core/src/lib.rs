//! # magsync Core
//!
//! Frame synchronization and record decoding for the MagElement magnetometer link.
//!
//! The instrument emits a stream of fixed-size binary records, each prefixed by an
//! 8-byte header (type identifier, total size). A receiver that joins mid-stream
//! cannot know where a record starts, so it searches for the heartbeat header,
//! locks on, and then reads records back to back until something stops making sense.
//!
//! ## Modules
//!
//! - `constants`: Wire constants, record sizes and status bit masks
//! - `catalog`: Type identifier to record kind and size
//! - `records`: Decoded record types
//! - `decoder` / `encoder`: Little-endian record codec
//! - `matcher`: Bounded signature search
//! - `sync`: The lock-on / framing state machine
//! - `transport`: Stream and datagram byte sources
//! - `sink`: Record consumers
//! - `continuity`: Index sequence checks
//! - `config` / `cancel`: Synchronizer tuning and cooperative cancellation

pub mod cancel;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod continuity;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod matcher;
pub mod records;
pub mod sink;
pub mod sync;
pub mod transport;

// Re-export commonly used types
pub use cancel::CancelToken;
pub use catalog::RecordKind;
pub use config::{SyncConfig, UnrecognizedPolicy};
pub use error::SyncError;
pub use records::{ClassifiedRecord, Record, RecordHeader};
pub use sink::{CaptureWriter, RecordSink};
pub use sync::{FrameSynchronizer, SyncState, SyncStats};
pub use transport::{DatagramQueue, DatagramTransport, Framing, StreamTransport, Transport};

/// Result type alias for magsync operations
pub type Result<T> = core::result::Result<T, SyncError>;
