use super::session::load_config;
use anyhow::{Context, Result};
use colored::*;
use magsync_core::{
    continuity::{ContinuityReport, ContinuityTracker},
    records::Heartbeat,
    CancelToken, ClassifiedRecord, FrameSynchronizer, Record, RecordSink, StreamTransport,
    SyncConfig, SyncError, SyncStats,
};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufReader};
use std::net::Ipv4Addr;
use std::path::Path;
use tracing::{info, warn};

/// Instrument identity taken from the first heartbeat in the file
#[derive(Debug, Clone, Serialize)]
pub struct InstrumentInfo {
    pub serial: String,
    pub mfam_serial: String,
    pub ip_address: Ipv4Addr,
    pub sample_period_ms: u32,
}

impl From<&Heartbeat> for InstrumentInfo {
    fn from(hb: &Heartbeat) -> Self {
        Self {
            serial: hb.serial(),
            mfam_serial: hb.mfam_serial(),
            ip_address: hb.ip_addr(),
            sample_period_ms: hb.sample_period_ms,
        }
    }
}

/// Result of checking a capture file
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub file: String,
    pub file_size: u64,
    pub stats: SyncStats,
    pub continuity: ContinuityReport,
    pub instrument: Option<InstrumentInfo>,
    /// Set when the file ends inside a record
    pub truncated_tail: Option<String>,
}

impl CheckReport {
    /// A file is clean when every byte was framed and every index follows its predecessor
    pub fn is_clean(&self) -> bool {
        self.stats.bytes_discarded == 0
            && self.stats.framing_faults == 0
            && self.truncated_tail.is_none()
            && self.continuity.is_continuous()
    }
}

#[derive(Default)]
struct CheckSink {
    tracker: ContinuityTracker,
    instrument: Option<InstrumentInfo>,
}

impl RecordSink for CheckSink {
    fn accept(&mut self, record: &ClassifiedRecord) -> io::Result<()> {
        if self.instrument.is_none() {
            if let Record::Heartbeat(hb) = &record.record {
                self.instrument = Some(InstrumentInfo::from(hb));
            }
        }
        self.tracker.accept(record)
    }
}

/// Run the synchronizer over a capture file
pub fn analyze(path: &Path, config: SyncConfig) -> Result<CheckReport> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open capture file: {}", path.display()))?;
    let file_size = file
        .metadata()
        .with_context(|| format!("Failed to stat capture file: {}", path.display()))?
        .len();

    info!("Checking {} ({} bytes)", path.display(), file_size);

    let mut sync = FrameSynchronizer::with_config(
        StreamTransport::new(BufReader::new(file)),
        config,
        CancelToken::new(),
    )
    .context("Invalid synchronizer configuration")?;

    let mut sink = CheckSink::default();
    let truncated_tail = match sync.run(&mut sink) {
        Ok(_) | Err(SyncError::EndOfStream) => None,
        Err(e @ SyncError::Truncated { .. }) => {
            warn!("Capture file ends inside a record: {}", e);
            Some(e.to_string())
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()));
        }
    };

    Ok(CheckReport {
        file: path.display().to_string(),
        file_size,
        stats: sync.stats().clone(),
        continuity: sink.tracker.report(),
        instrument: sink.instrument,
        truncated_tail,
    })
}

pub fn execute(file: &Path, json: bool, config: Option<&Path>) -> Result<()> {
    let config = load_config(config, None)?;
    let report = analyze(file, config)?;

    if json {
        let out = serde_json::to_string_pretty(&report)
            .with_context(|| "Failed to serialize check report")?;
        println!("{}", out);
        return Ok(());
    }

    print_report(&report);
    Ok(())
}

fn print_report(report: &CheckReport) {
    let stats = &report.stats;

    if stats.records() == 0 {
        println!("{} No records found in {}", "✗".red(), report.file);
        return;
    }

    println!("\n=== Check Results ===");
    println!("File size:         {} bytes", report.file_size);
    println!("Records:           {}", stats.records().to_string().green());
    println!("  Raw blocks:      {}", stats.raw_blocks);
    println!("  Decimated:       {}", stats.decimated);
    println!("  Heartbeats:      {}", stats.heartbeats);
    println!("Bytes discarded:   {} bytes", stats.bytes_discarded);
    println!("Lock-ons:          {}", stats.lock_ons);
    println!("Framing faults:    {}", stats.framing_faults);
    println!("Framed:            {:.2}%", stats.framed_rate());

    if let Some(instrument) = &report.instrument {
        println!("\n=== Instrument ===");
        println!("Serial:            {}", instrument.serial);
        println!("MFAM serial:       {}", instrument.mfam_serial);
        println!("Address:           {}", instrument.ip_address);
        println!("Sample period:     {} ms", instrument.sample_period_ms);
    }

    println!("\n=== Continuity ===");
    for lane in &report.continuity.lanes {
        println!(
            "{:<18} {} records, last index {}",
            format!("{}:", lane.kind.name()),
            lane.records,
            lane.last_index.map_or_else(|| "-".to_string(), |i| i.to_string())
        );
    }

    if report.continuity.is_continuous() {
        println!("{} No index gaps", "✓".green());
    } else {
        println!(
            "{} {} index breaks ({} records missing)",
            "✗".red(),
            report.continuity.gaps.len(),
            report.continuity.missing()
        );
        for gap in &report.continuity.gaps {
            let what = if gap.is_regression() {
                "regression".yellow()
            } else {
                "gap".red()
            };
            println!(
                "  {} {}: {} -> {} (expected {})",
                gap.kind.name(),
                what,
                gap.before,
                gap.after,
                gap.expected
            );
        }
    }

    if let Some(tail) = &report.truncated_tail {
        println!("{} {}", "✗".red(), tail);
    }

    println!();
    if report.is_clean() {
        println!("{} Capture is clean", "✓".green());
    } else {
        println!("{} Capture has defects", "✗".red());
    }
}
