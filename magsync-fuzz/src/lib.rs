//! Fuzz entry points for magsync-core
//!
//! To use with cargo-fuzz:
//! 1. Install cargo-fuzz: cargo install cargo-fuzz
//! 2. Run fuzzer: cargo fuzz run fuzz_sync

use magsync_core::{CancelToken, ClassifiedRecord, DatagramQueue, FrameSynchronizer, StreamTransport};
use std::io::Cursor;

pub fn fuzz_decode(data: &[u8]) {
    use magsync_core::decoder::decode_record;

    // Try to decode - should never panic
    let _ = decode_record(data);
}

pub fn fuzz_sync(data: &[u8]) {
    // Stream framing over the whole input
    let mut sync = FrameSynchronizer::new(
        StreamTransport::new(Cursor::new(data)),
        CancelToken::new(),
    );
    let mut records: Vec<ClassifiedRecord> = Vec::new();
    let _ = sync.run(&mut records);

    // Datagram framing: first byte of each chunk picks the datagram length
    let mut datagrams = Vec::new();
    let mut rest = data;
    while let Some((&len, tail)) = rest.split_first() {
        let take = (len as usize * 8).min(tail.len());
        datagrams.push(tail[..take].to_vec());
        rest = &tail[take..];
    }

    let mut sync = FrameSynchronizer::new(DatagramQueue::new(datagrams), CancelToken::new());
    let _ = sync.run(&mut records);
}
