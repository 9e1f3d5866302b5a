//! Integration tests for the complete lock-on → frame → decode → sink flow

use magsync_core::{
    encoder::encode_record,
    records::{DecimatedSample, Heartbeat, RawBlock},
    CancelToken, CaptureWriter, ClassifiedRecord, DatagramQueue, DatagramTransport,
    FrameSynchronizer, Record, RecordKind, RecordSink, StreamTransport, SyncConfig, SyncError,
    SyncState,
};
use std::io::{self, Cursor, Read};
use std::net::UdpSocket;
use std::thread;
use std::time::Duration;

fn heartbeat(index: u64) -> Vec<u8> {
    encode_record(&Record::Heartbeat(Heartbeat {
        index,
        sample_period_ms: 1,
        ..Default::default()
    }))
    .unwrap()
    .to_vec()
}

fn decimated(index: u64, mag_data: f64) -> Vec<u8> {
    encode_record(&Record::Decimated(DecimatedSample {
        index,
        mag_data,
        data_valid: 1,
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

fn collect(stream: Vec<u8>) -> (Vec<ClassifiedRecord>, SyncError, magsync_core::SyncStats) {
    let mut sync = FrameSynchronizer::new(
        StreamTransport::new(Cursor::new(stream)),
        CancelToken::new(),
    );
    let mut records = Vec::new();
    let err = sync.run(&mut records).unwrap_err();
    (records, err, sync.stats().clone())
}

#[test]
fn test_lock_on_after_noise() {
    let mut stream = vec![0xABu8; 200];
    stream.extend(heartbeat(10));
    stream.extend(decimated(11, 52_000.5));

    let (records, err, stats) = collect(stream);

    assert_eq!(err, SyncError::EndOfStream);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].kind(), RecordKind::Heartbeat);
    assert_eq!(records[0].record.index(), 10);
    assert_eq!(records[1].kind(), RecordKind::Decimated);

    match &records[1].record {
        Record::Decimated(sample) => assert_eq!(sample.mag_data, 52_000.5),
        other => panic!("expected decimated record, got {:?}", other),
    }

    assert_eq!(stats.lock_ons, 1);
    assert_eq!(stats.bytes_discarded, 200);
    assert_eq!(stats.bytes_read, 200 + 108 + 88);
}

#[test]
fn test_unknown_type_returns_to_lock_on() {
    let mut stream = heartbeat(1);
    stream.extend_from_slice(&0x0002_0001u32.to_le_bytes());
    stream.extend_from_slice(&40u32.to_le_bytes());
    stream.extend_from_slice(&[0x5Au8; 32]);
    // Not anchored by a heartbeat, so it is never framed
    stream.extend(decimated(2, 1.0));
    stream.extend(heartbeat(3));
    stream.extend(decimated(4, 1.0));

    let (records, err, stats) = collect(stream);

    assert_eq!(err, SyncError::EndOfStream);
    let indexes: Vec<u64> = records.iter().map(|r| r.record.index()).collect();
    assert_eq!(indexes, vec![1, 3, 4]);
    assert_eq!(stats.framing_faults, 1);
    assert_eq!(stats.lock_losses, 1);
    assert_eq!(stats.lock_ons, 2);
}

#[test]
fn test_size_mismatch_is_unrecognized() {
    let mut stream = heartbeat(1);
    // Decimated type id with the wrong declared size
    stream.extend_from_slice(&0x0001_0022u32.to_le_bytes());
    stream.extend_from_slice(&90u32.to_le_bytes());
    stream.extend_from_slice(&[0u8; 82]);
    stream.extend(heartbeat(2));

    let (records, _, stats) = collect(stream);

    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.kind() == RecordKind::Heartbeat));
    assert_eq!(stats.framing_faults, 1);
}

#[test]
fn test_raw_blocks_framed_back_to_back() {
    let mut stream = vec![0x11u8; 37];
    stream.extend(heartbeat(0));
    for block in 0..3u64 {
        stream.extend(raw_block(block * 40));
    }

    let (records, _, stats) = collect(stream);

    assert_eq!(records.len(), 4);
    assert_eq!(stats.raw_blocks, 3);
    assert_eq!(records[3].record.index(), 80);
    assert_eq!(records[3].wire_size(), 1296);
}

struct CountingReader {
    inner: Cursor<Vec<u8>>,
    reads: usize,
}

impl Read for CountingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reads += 1;
        self.inner.read(buf)
    }
}

#[test]
fn test_cancel_before_any_read() {
    let mut reader = CountingReader {
        inner: Cursor::new(heartbeat(1)),
        reads: 0,
    };
    let cancel = CancelToken::new();
    cancel.cancel();

    let stats = {
        let mut sync = FrameSynchronizer::new(StreamTransport::new(&mut reader), cancel);
        let mut records: Vec<ClassifiedRecord> = Vec::new();
        let stats = sync.run(&mut records).unwrap();
        assert!(records.is_empty());
        stats
    };

    assert_eq!(reader.reads, 0);
    assert_eq!(stats.bytes_read, 0);
    assert_eq!(stats.records(), 0);
}

/// Delivers its bytes, then cancels and times out forever
struct SilentAfter {
    inner: Cursor<Vec<u8>>,
    cancel: CancelToken,
}

impl Read for SilentAfter {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.read(buf)? {
            0 => {
                self.cancel.cancel();
                Err(io::Error::from(io::ErrorKind::WouldBlock))
            }
            n => Ok(n),
        }
    }
}

#[test]
fn test_timeout_rechecks_cancellation() {
    let cancel = CancelToken::new();
    let mut stream = heartbeat(1);
    stream.extend(decimated(2, 3.0));
    let reader = SilentAfter {
        inner: Cursor::new(stream),
        cancel: cancel.clone(),
    };

    let mut sync = FrameSynchronizer::new(StreamTransport::new(reader), cancel);
    let mut records: Vec<ClassifiedRecord> = Vec::new();
    let stats = sync.run(&mut records).unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(stats.records(), 2);
    assert_eq!(sync.state(), SyncState::Locked);
}

#[derive(Default)]
struct RejectingSink {
    offered: usize,
    flushed: bool,
}

impl RecordSink for RejectingSink {
    fn accept(&mut self, _record: &ClassifiedRecord) -> io::Result<()> {
        self.offered += 1;
        Err(io::Error::new(io::ErrorKind::Other, "disk full"))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushed = true;
        Ok(())
    }
}

#[test]
fn test_sink_failures_are_not_fatal() {
    let mut stream = heartbeat(1);
    stream.extend(heartbeat(2));
    stream.extend(heartbeat(3));

    let mut sync = FrameSynchronizer::new(
        StreamTransport::new(Cursor::new(stream)),
        CancelToken::new(),
    );
    let mut sink = RejectingSink::default();
    let err = sync.run(&mut sink).unwrap_err();

    assert_eq!(err, SyncError::EndOfStream);
    assert_eq!(sink.offered, 3);
    assert!(sink.flushed);
    assert_eq!(sync.stats().sink_failures, 3);
}

#[test]
fn test_capture_replays_identically() {
    let mut stream = vec![0xC3u8; 500];
    stream.extend(heartbeat(1));
    stream.extend(raw_block(0));
    stream.extend(decimated(2, 9.5));

    let mut sync = FrameSynchronizer::new(
        StreamTransport::new(Cursor::new(stream)),
        CancelToken::new(),
    );
    let mut capture = CaptureWriter::new(Vec::new());
    let _ = sync.run(&mut capture);
    assert_eq!(capture.records_written(), 3);
    let captured = capture.into_inner().unwrap();
    assert_eq!(captured.len(), 108 + 1296 + 88);

    let (replayed, _, stats) = collect(captured);
    assert_eq!(replayed.len(), 3);
    assert_eq!(stats.bytes_discarded, 0);
}

#[test]
fn test_datagram_noise_then_records() {
    let mut anchored = vec![0x42u8; 13];
    anchored.extend(heartbeat(5));
    anchored.extend(decimated(6, 0.0));

    let queue = DatagramQueue::new(vec![vec![0x99u8; 300], anchored, decimated(7, 0.0)]);
    let mut sync = FrameSynchronizer::new(queue, CancelToken::new());
    let mut records = Vec::new();
    let err = sync.run(&mut records).unwrap_err();

    assert_eq!(err, SyncError::EndOfStream);
    let indexes: Vec<u64> = records.iter().map(|r| r.record.index()).collect();
    assert_eq!(indexes, vec![5, 6, 7]);
    assert_eq!(sync.stats().bytes_discarded, 313);
}

#[test]
fn test_datagram_unknown_type_drops_rest_of_datagram() {
    let mut bad = 0x0009_0009u32.to_le_bytes().to_vec();
    bad.extend_from_slice(&16u32.to_le_bytes());
    bad.extend_from_slice(&[0u8; 8]);
    // Would be a valid record, but shares the datagram with garbage
    bad.extend(heartbeat(99));

    let queue = DatagramQueue::new(vec![heartbeat(1), bad, heartbeat(2)]);
    let mut sync = FrameSynchronizer::new(queue, CancelToken::new());
    let mut records = Vec::new();
    let _ = sync.run(&mut records);

    let indexes: Vec<u64> = records.iter().map(|r| r.record.index()).collect();
    assert_eq!(indexes, vec![1, 2]);
    assert_eq!(sync.stats().framing_faults, 1);
}

#[test]
fn test_udp_loopback_until_cancelled() {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    let addr = socket.local_addr().unwrap();
    let transport = DatagramTransport::new(socket, Some(Duration::from_millis(20))).unwrap();

    let cancel = CancelToken::new();
    let config = SyncConfig {
        read_timeout_ms: Some(20),
        ..Default::default()
    };
    let mut sync = FrameSynchronizer::with_config(transport, config, cancel.clone()).unwrap();

    let sender = thread::spawn(move || {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.send_to(&heartbeat(1), addr).unwrap();
        socket.send_to(&decimated(2, 4.0), addr).unwrap();
        socket.send_to(&decimated(3, 4.0), addr).unwrap();
        thread::sleep(Duration::from_millis(300));
        cancel.cancel();
    });

    let mut records: Vec<ClassifiedRecord> = Vec::new();
    let stats = sync.run(&mut records).unwrap();
    sender.join().unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(stats.decimated, 2);
}
