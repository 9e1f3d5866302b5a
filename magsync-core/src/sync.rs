//! Frame synchronizer: lock-on and record framing over a transport
//!
//! The synchronizer is a two-state machine:
//!
//! - **Unlocked**: bytes are pulled from the transport and searched for the
//!   heartbeat header. Bytes before a match are discarded. Stream transports
//!   keep the last `SIGNATURE_LEN - 1` bytes between reads so a header split
//!   across two reads is still found.
//! - **Locked**: an 8-byte header is read and classified. Known records are
//!   read to their catalog size, decoded and returned. Anything else drops
//!   the synchronizer back to unlocked.
//!
//! Transport failures end the run. Framing failures never do.

use crate::cancel::CancelToken;
use crate::catalog::{self, RecordKind};
use crate::config::{SyncConfig, UnrecognizedPolicy};
use crate::constants::{HEADER_SIZE, HEARTBEAT_SIZE, SIGNATURE_LEN};
use crate::decoder::decode_kind;
use crate::error::SyncError;
use crate::matcher::SignatureMatcher;
use crate::records::{ClassifiedRecord, RecordHeader};
use crate::sink::RecordSink;
use crate::transport::{Framing, Transport};
use bytes::{Buf, BytesMut};
use serde::Serialize;
use std::io::ErrorKind;

#[cfg(feature = "logging")]
use tracing::{debug, info, warn};

/// Synchronization state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Searching for a heartbeat header
    Unlocked {
        /// Bytes discarded since lock was lost
        scanned: u64,
    },
    /// Reading records back to back
    Locked,
}

/// Counters kept across a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    /// Bytes pulled from the transport
    pub bytes_read: u64,

    /// Bytes dropped while searching or after a framing fault
    pub bytes_discarded: u64,

    /// Bytes delivered inside framed records
    pub bytes_framed: u64,

    /// Unlocked -> locked transitions
    pub lock_ons: u64,

    /// Locked -> unlocked transitions
    pub lock_losses: u64,

    /// Unknown, mis-sized or truncated records seen while locked
    pub framing_faults: u64,

    pub raw_blocks: u64,
    pub decimated: u64,
    pub heartbeats: u64,

    /// Records the sink failed to accept
    pub sink_failures: u64,
}

impl SyncStats {
    /// Total records framed
    pub fn records(&self) -> u64 {
        self.raw_blocks + self.decimated + self.heartbeats
    }

    /// Records framed of one kind
    pub fn count(&self, kind: RecordKind) -> u64 {
        match kind {
            RecordKind::RawBlock => self.raw_blocks,
            RecordKind::Decimated => self.decimated,
            RecordKind::Heartbeat => self.heartbeats,
        }
    }

    /// Share of bytes read that ended up in framed records, in percent
    pub fn framed_rate(&self) -> f64 {
        if self.bytes_read == 0 {
            0.0
        } else {
            (self.bytes_framed as f64 / self.bytes_read as f64) * 100.0
        }
    }

    fn record(&mut self, kind: RecordKind, size: usize) {
        self.bytes_framed += size as u64;
        match kind {
            RecordKind::RawBlock => self.raw_blocks += 1,
            RecordKind::Decimated => self.decimated += 1,
            RecordKind::Heartbeat => self.heartbeats += 1,
        }
    }
}

enum ReadOutcome {
    Data,
    Closed,
    Cancelled,
}

enum Fill {
    Ready,
    /// Datagram framing only: the buffered datagram is shorter than required
    Short,
    Cancelled,
}

enum Framed {
    Record(ClassifiedRecord),
    Unrecognized,
    Cancelled,
}

/// Locks onto a MagElement byte stream and frames its records
pub struct FrameSynchronizer<T> {
    transport: T,
    config: SyncConfig,
    cancel: CancelToken,
    matcher: SignatureMatcher,
    state: SyncState,
    buf: BytesMut,
    stats: SyncStats,
}

impl<T: Transport> FrameSynchronizer<T> {
    /// Create a synchronizer with the default configuration
    pub fn new(transport: T, cancel: CancelToken) -> Self {
        Self::build(transport, SyncConfig::default(), cancel)
    }

    /// Create a synchronizer with an explicit configuration
    pub fn with_config(
        transport: T,
        config: SyncConfig,
        cancel: CancelToken,
    ) -> Result<Self, SyncError> {
        config.validate()?;
        Ok(Self::build(transport, config, cancel))
    }

    fn build(transport: T, config: SyncConfig, cancel: CancelToken) -> Self {
        Self {
            transport,
            config,
            cancel,
            matcher: SignatureMatcher::heartbeat(),
            state: SyncState::Unlocked { scanned: 0 },
            buf: BytesMut::with_capacity(HEARTBEAT_SIZE * 2),
            stats: SyncStats::default(),
        }
    }

    /// Current state
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Whether a record boundary is currently known
    pub fn is_locked(&self) -> bool {
        self.state == SyncState::Locked
    }

    /// Counters so far
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Active configuration
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Consume the synchronizer and return its transport
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Frame the next record.
    ///
    /// Returns `Ok(None)` once cancellation is observed. Transport failures
    /// are returned as errors; framing faults are absorbed by falling back
    /// to lock-on.
    pub fn next_record(&mut self) -> Result<Option<ClassifiedRecord>, SyncError> {
        loop {
            // Records already buffered are not emitted once cancelled
            if self.cancel.is_cancelled() {
                return Ok(None);
            }

            match self.state {
                SyncState::Unlocked { .. } => {
                    if !self.lock_on()? {
                        return Ok(None);
                    }
                }
                SyncState::Locked => match self.read_record()? {
                    Framed::Record(record) => return Ok(Some(record)),
                    Framed::Unrecognized => {}
                    Framed::Cancelled => return Ok(None),
                },
            }
        }
    }

    /// Iterate over framed records until cancellation or the first error
    pub fn records(&mut self) -> Records<'_, T> {
        Records {
            sync: self,
            done: false,
        }
    }

    /// Feed every framed record to `sink` until cancellation or a transport fault.
    ///
    /// The sink is flushed before returning on either path. Sink failures are
    /// logged and counted, never fatal.
    pub fn run<S: RecordSink + ?Sized>(&mut self, sink: &mut S) -> Result<SyncStats, SyncError> {
        let outcome = self.pump(sink);

        if let Err(_e) = sink.flush() {
            self.stats.sink_failures += 1;
            #[cfg(feature = "logging")]
            warn!("Failed to flush record sink: {}", _e);
        }

        outcome.map(|()| self.stats.clone())
    }

    fn pump<S: RecordSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), SyncError> {
        while let Some(record) = self.next_record()? {
            if let Err(_e) = sink.accept(&record) {
                self.stats.sink_failures += 1;
                #[cfg(feature = "logging")]
                warn!("Sink rejected {} record: {}", record.kind().name(), _e);
            }
        }

        #[cfg(feature = "logging")]
        debug!("Synchronizer cancelled after {} records", self.stats.records());

        Ok(())
    }

    /// Search for the heartbeat header. Returns false when cancelled.
    fn lock_on(&mut self) -> Result<bool, SyncError> {
        let framing = self.transport.framing();

        loop {
            if let Some(offset) = self.matcher.find(&self.buf, self.buf.len()) {
                self.discard(offset);
                self.state = SyncState::Locked;
                self.stats.lock_ons += 1;

                #[cfg(feature = "logging")]
                info!("Locked on heartbeat (skipped {} bytes)", offset);

                if self.config.emit_anchor {
                    return Ok(true);
                }

                match self.fill_to(HEARTBEAT_SIZE)? {
                    Fill::Ready => {
                        self.discard(HEARTBEAT_SIZE);
                        return Ok(true);
                    }
                    Fill::Cancelled => return Ok(false),
                    Fill::Short => {
                        self.stats.framing_faults += 1;
                        self.drop_datagram();
                        self.lose_lock();
                        continue;
                    }
                }
            }

            let keep = match framing {
                Framing::Stream => self.buf.len().min(SIGNATURE_LEN - 1),
                Framing::Datagram => 0,
            };
            let dropped = self.buf.len() - keep;
            self.discard(dropped);

            if let SyncState::Unlocked { scanned } = &mut self.state {
                *scanned += dropped as u64;
                if let Some(limit) = self.config.max_lock_on_bytes {
                    if *scanned > limit {
                        return Err(SyncError::LockOnExhausted { scanned: *scanned });
                    }
                }
            }

            let max = match framing {
                Framing::Stream => self.config.lock_on_chunk,
                Framing::Datagram => self.config.max_datagram_size,
            };
            match self.read_once(max)? {
                ReadOutcome::Data => {}
                ReadOutcome::Cancelled => return Ok(false),
                ReadOutcome::Closed => return Err(SyncError::EndOfStream),
            }
        }
    }

    fn read_record(&mut self) -> Result<Framed, SyncError> {
        match self.fill_to(HEADER_SIZE)? {
            Fill::Ready => {}
            Fill::Cancelled => return Ok(Framed::Cancelled),
            Fill::Short => {
                #[cfg(feature = "logging")]
                warn!("Datagram of {} bytes too short for a header", self.buf.len());
                self.stats.framing_faults += 1;
                self.drop_datagram();
                self.lose_lock();
                return Ok(Framed::Unrecognized);
            }
        }

        let header = RecordHeader::parse(&self.buf[..HEADER_SIZE])?;
        let kind = match catalog::classify(&header) {
            Ok(kind) => kind,
            Err(_fault) => {
                #[cfg(feature = "logging")]
                warn!("Unrecognized record while locked: {}", _fault);
                return self.reject(&header);
            }
        };

        let size = kind.wire_size();
        match self.fill_to(size)? {
            Fill::Ready => {}
            Fill::Cancelled => return Ok(Framed::Cancelled),
            Fill::Short => {
                #[cfg(feature = "logging")]
                warn!(
                    "Datagram holds {} bytes of a {}-byte {} record",
                    self.buf.len(),
                    size,
                    kind.name()
                );
                self.stats.framing_faults += 1;
                self.drop_datagram();
                self.lose_lock();
                return Ok(Framed::Unrecognized);
            }
        }

        let raw = self.buf.split_to(size).freeze();
        let record = decode_kind(kind, &raw)?;
        self.stats.record(kind, size);

        #[cfg(feature = "logging")]
        debug!("Framed {} record ({} bytes)", kind.name(), size);

        Ok(Framed::Record(ClassifiedRecord { record, raw }))
    }

    /// Handle a header the catalog refused
    fn reject(&mut self, header: &RecordHeader) -> Result<Framed, SyncError> {
        self.stats.framing_faults += 1;
        self.lose_lock();

        if self.transport.framing() == Framing::Datagram {
            self.drop_datagram();
            return Ok(Framed::Unrecognized);
        }

        self.discard(HEADER_SIZE);

        let declared = header.declared_size as usize;
        if self.config.on_unrecognized == UnrecognizedPolicy::SkipDeclared
            && (HEADER_SIZE..=self.config.max_skip_bytes).contains(&declared)
            && !self.skip(declared - HEADER_SIZE)?
        {
            return Ok(Framed::Cancelled);
        }

        Ok(Framed::Unrecognized)
    }

    /// Discard `n` bytes from the stream, reading as needed. False when cancelled.
    fn skip(&mut self, n: usize) -> Result<bool, SyncError> {
        let mut remaining = n;
        while remaining > 0 {
            if self.buf.is_empty() {
                match self.read_once(remaining)? {
                    ReadOutcome::Data => {}
                    ReadOutcome::Cancelled => return Ok(false),
                    ReadOutcome::Closed => {
                        return Err(SyncError::Truncated {
                            expected: n,
                            actual: n - remaining,
                        })
                    }
                }
            }
            let take = remaining.min(self.buf.len());
            self.discard(take);
            remaining -= take;
        }
        Ok(true)
    }

    /// Make sure at least `n` bytes are buffered
    fn fill_to(&mut self, n: usize) -> Result<Fill, SyncError> {
        match self.transport.framing() {
            Framing::Stream => {
                while self.buf.len() < n {
                    let missing = n - self.buf.len();
                    match self.read_once(missing)? {
                        ReadOutcome::Data => {}
                        ReadOutcome::Cancelled => return Ok(Fill::Cancelled),
                        ReadOutcome::Closed if self.buf.is_empty() => {
                            return Err(SyncError::EndOfStream)
                        }
                        ReadOutcome::Closed => {
                            return Err(SyncError::Truncated {
                                expected: n,
                                actual: self.buf.len(),
                            })
                        }
                    }
                }
                Ok(Fill::Ready)
            }
            Framing::Datagram => {
                while self.buf.is_empty() {
                    match self.read_once(self.config.max_datagram_size)? {
                        ReadOutcome::Data => {}
                        ReadOutcome::Cancelled => return Ok(Fill::Cancelled),
                        ReadOutcome::Closed => return Err(SyncError::EndOfStream),
                    }
                }
                if self.buf.len() >= n {
                    Ok(Fill::Ready)
                } else {
                    Ok(Fill::Short)
                }
            }
        }
    }

    /// One blocking read, retried across timeouts; cancellation is checked first
    fn read_once(&mut self, max: usize) -> Result<ReadOutcome, SyncError> {
        let framing = self.transport.framing();

        loop {
            if self.cancel.is_cancelled() {
                return Ok(ReadOutcome::Cancelled);
            }

            match self.transport.read_into(&mut self.buf, max) {
                Ok(0) if framing == Framing::Stream => return Ok(ReadOutcome::Closed),
                Ok(n) => {
                    self.stats.bytes_read += n as u64;
                    return Ok(ReadOutcome::Data);
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut
                    ) =>
                {
                    continue
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn discard(&mut self, n: usize) {
        self.buf.advance(n);
        self.stats.bytes_discarded += n as u64;
    }

    fn drop_datagram(&mut self) {
        let n = self.buf.len();
        self.discard(n);
    }

    fn lose_lock(&mut self) {
        if self.state == SyncState::Locked {
            self.stats.lock_losses += 1;

            #[cfg(feature = "logging")]
            info!("Lost lock; searching for heartbeat");
        }
        self.state = SyncState::Unlocked { scanned: 0 };
    }
}

/// Iterator over framed records, see [`FrameSynchronizer::records`]
pub struct Records<'a, T> {
    sync: &'a mut FrameSynchronizer<T>,
    done: bool,
}

impl<T: Transport> Iterator for Records<'_, T> {
    type Item = Result<ClassifiedRecord, SyncError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.sync.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
