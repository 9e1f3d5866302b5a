//! Shared plumbing for live sessions (tcp, udp)

use anyhow::{Context, Result};
use colored::*;
use magsync_core::{
    records::Record, CancelToken, CaptureWriter, ClassifiedRecord, FrameSynchronizer,
    RecordSink, SyncConfig, SyncStats, Transport,
};
use std::fs::{self, File};
use std::io::{self, BufRead, Stdout, Write};
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{info, warn};

/// Options common to every live session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Capture file; must not already exist
    pub capture: Option<PathBuf>,

    /// Print one summary line per record
    pub verbose: bool,

    /// JSON synchronizer configuration
    pub config: Option<PathBuf>,

    /// Overrides `read_timeout_ms` from the configuration
    pub timeout_ms: Option<u64>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            capture: None,
            verbose: true,
            config: None,
            timeout_ms: None,
        }
    }
}

/// Load and validate the synchronizer configuration
pub fn load_config(path: Option<&Path>, timeout_ms: Option<u64>) -> Result<SyncConfig> {
    let mut config = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid config file: {}", path.display()))?
        }
        None => SyncConfig::default(),
    };

    if let Some(ms) = timeout_ms {
        config.read_timeout_ms = Some(ms);
    }

    config
        .validate()
        .context("Invalid synchronizer configuration")?;

    Ok(config)
}

/// Cancel on Ctrl-C or when Enter is pressed
pub fn install_cancel_watchers(cancel: &CancelToken) -> Result<()> {
    let on_signal = cancel.clone();
    ctrlc::set_handler(move || on_signal.cancel())
        .context("Failed to install Ctrl-C handler")?;

    let on_enter = cancel.clone();
    thread::Builder::new()
        .name("stdin-watcher".into())
        .spawn(move || {
            let mut line = String::new();
            // EOF (stdin redirected from /dev/null) does not cancel
            if let Ok(n) = io::stdin().lock().read_line(&mut line) {
                if n > 0 {
                    on_enter.cancel();
                }
            }
        })
        .context("Failed to start stdin watcher")?;

    Ok(())
}

/// One console line for a record; `n` counts every record received
pub fn summary_line(n: u64, record: &Record) -> String {
    match record {
        Record::RawBlock(block) => match block.samples.first() {
            Some(s) => format!(
                "{}:RAW:{}:{}:{}:{}:{}:{}",
                n,
                s.mag1_nanotesla(),
                s.mag2_nanotesla(),
                s.analog[0],
                s.analog[1],
                s.analog[2],
                s.analog[3]
            ),
            None => format!("{}:RAW", n),
        },
        Record::Decimated(sample) => format!("{}:DEC:{}:{}", n, sample.index, sample.mag_data),
        Record::Heartbeat(hb) => format!(
            "Status: {}:{}:{}:{}:{}:{}:{}",
            hb.index,
            hb.counter_at_first_pps,
            hb.counter_at_last_pps,
            hb.mfam_status[0],
            hb.mfam_status[1],
            hb.mfam_status[2],
            hb.mfam_status[3]
        ),
    }
}

/// Prints record summaries
pub struct ConsoleSink<W: Write> {
    out: W,
    verbose: bool,
    received: u64,
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W, verbose: bool) -> Self {
        Self {
            out,
            verbose,
            received: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RecordSink for ConsoleSink<W> {
    fn accept(&mut self, record: &ClassifiedRecord) -> io::Result<()> {
        self.received += 1;
        if self.verbose {
            writeln!(self.out, "{}", summary_line(self.received, &record.record))?;
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Console output plus optional capture file
pub struct SessionSink {
    console: ConsoleSink<Stdout>,
    capture: Option<CaptureWriter<File>>,
}

impl SessionSink {
    /// Create the capture file (if any) before the link is opened
    pub fn open(options: &SessionOptions) -> Result<Self> {
        let capture = match &options.capture {
            Some(path) => {
                let writer = CaptureWriter::create_new(path).with_context(|| {
                    format!(
                        "Failed to create capture file: {} (it must not already exist)",
                        path.display()
                    )
                })?;
                info!("Capturing records to {}", path.display());
                Some(writer)
            }
            None => None,
        };

        Ok(Self {
            console: ConsoleSink::new(io::stdout(), options.verbose),
            capture,
        })
    }

    /// Records written to the capture file
    pub fn captured(&self) -> Option<u64> {
        self.capture.as_ref().map(CaptureWriter::records_written)
    }
}

impl RecordSink for SessionSink {
    fn accept(&mut self, record: &ClassifiedRecord) -> io::Result<()> {
        let captured = match &mut self.capture {
            Some(capture) => capture.accept(record),
            None => Ok(()),
        };
        self.console.accept(record)?;
        captured
    }

    fn flush(&mut self) -> io::Result<()> {
        let captured = match &mut self.capture {
            Some(capture) => capture.flush(),
            None => Ok(()),
        };
        self.console.flush()?;
        captured
    }
}

/// Drive the synchronizer until cancellation or a transport fault
pub fn run_session<T: Transport, S: RecordSink>(
    transport: T,
    config: SyncConfig,
    sink: &mut S,
    cancel: CancelToken,
) -> Result<SyncStats> {
    let mut sync = FrameSynchronizer::with_config(transport, config, cancel)
        .context("Invalid synchronizer configuration")?;

    let outcome = sync.run(sink);
    print_stats(sync.stats());

    match outcome {
        Ok(stats) => {
            info!("Session cancelled");
            Ok(stats)
        }
        Err(e) => {
            warn!("Session ended by transport fault");
            Err(e).context("Link failed")
        }
    }
}

fn print_stats(stats: &SyncStats) {
    println!("\n=== Session Statistics ===");
    println!("Bytes read:        {} bytes", stats.bytes_read);
    println!("Bytes discarded:   {} bytes", stats.bytes_discarded);
    println!(
        "Records:           {} ({} raw, {} decimated, {} heartbeat)",
        stats.records().to_string().green(),
        stats.raw_blocks,
        stats.decimated,
        stats.heartbeats
    );
    println!("Lock-ons:          {}", stats.lock_ons);
    if stats.framing_faults > 0 {
        println!("Framing faults:    {}", stats.framing_faults.to_string().yellow());
    } else {
        println!("Framing faults:    {}", stats.framing_faults);
    }
    if stats.sink_failures > 0 {
        println!("Sink failures:     {}", stats.sink_failures.to_string().red());
    }
}
