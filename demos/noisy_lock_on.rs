//! Lock onto a simulated instrument stream that starts mid-record and drops bytes

use magsync_core::{
    continuity::ContinuityTracker,
    encoder::encode_record,
    records::{DecimatedSample, Heartbeat, RawBlock},
    CancelToken, FrameSynchronizer, Record, RecordSink, StreamTransport,
};
use std::io::Cursor;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("magsync Noisy Lock-On Example\n");

    // Step 1: Three seconds of traffic
    let mut seconds = Vec::new();
    for second in 0..3u64 {
        let mut traffic = encode_record(&Record::Heartbeat(Heartbeat {
            index: second,
            sample_period_ms: 1,
            ..Default::default()
        }))?
        .to_vec();

        for block in 0..4u64 {
            traffic.extend_from_slice(&encode_record(&Record::RawBlock(RawBlock {
                first_sample_index: (second * 4 + block) * 40,
                ..Default::default()
            }))?);
        }

        traffic.extend_from_slice(&encode_record(&Record::Decimated(DecimatedSample {
            index: second,
            mag_data: 51_234.5 + second as f64,
            ..Default::default()
        }))?);

        seconds.push(traffic);
    }

    // Step 2: Join mid-record and lose part of the second second
    let mut stream = seconds[0][500..].to_vec();
    stream.extend_from_slice(&seconds[1][..700]);
    stream.extend_from_slice(&seconds[2]);
    println!("Stream: {} bytes, starting mid-record", stream.len());

    // Step 3: Synchronize
    let mut sync = FrameSynchronizer::new(
        StreamTransport::new(Cursor::new(stream)),
        CancelToken::new(),
    );
    let mut tracker = ContinuityTracker::new();

    loop {
        match sync.next_record() {
            Ok(Some(record)) => {
                tracker.accept(&record)?;
                println!("  {:>9} index {}", record.kind().name(), record.record.index());
            }
            Ok(None) => break,
            Err(e) => {
                println!("Stream ended: {}", e);
                break;
            }
        }
    }

    // Step 4: Report
    let stats = sync.stats();
    println!("\nFramed {} records", stats.records());
    println!("  Lock-ons: {}", stats.lock_ons);
    println!("  Discarded: {} bytes", stats.bytes_discarded);
    println!("  Framed: {:.1}% of bytes read", stats.framed_rate());

    let report = tracker.report();
    for gap in &report.gaps {
        println!(
            "  {} index jumped {} -> {} ({} missing)",
            gap.kind.name(),
            gap.before,
            gap.after,
            gap.missing()
        );
    }

    Ok(())
}
