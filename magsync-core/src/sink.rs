//! Record consumers

use crate::records::ClassifiedRecord;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Receives every record the synchronizer frames.
///
/// Failures are reported back to the synchronizer, which logs and counts
/// them and keeps going.
pub trait RecordSink {
    /// Accept one record
    fn accept(&mut self, record: &ClassifiedRecord) -> io::Result<()>;

    /// Flush buffered output; called when a run ends for any reason
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl RecordSink for Vec<ClassifiedRecord> {
    fn accept(&mut self, record: &ClassifiedRecord) -> io::Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

impl<S: RecordSink + ?Sized> RecordSink for &mut S {
    fn accept(&mut self, record: &ClassifiedRecord) -> io::Result<()> {
        (**self).accept(record)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Appends records verbatim, in wire format.
///
/// The output can be replayed through a stream transport. Buffered bytes are
/// flushed by [`RecordSink::flush`] and again when the writer is dropped.
#[derive(Debug)]
pub struct CaptureWriter<W: Write> {
    out: BufWriter<W>,
    records: u64,
    bytes: u64,
}

impl CaptureWriter<File> {
    /// Create a new capture file; fails if `path` already exists
    pub fn create_new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)?;
        Ok(Self::new(file))
    }
}

impl<W: Write> CaptureWriter<W> {
    /// Wrap a writer
    pub fn new(out: W) -> Self {
        Self {
            out: BufWriter::new(out),
            records: 0,
            bytes: 0,
        }
    }

    /// Records written so far
    pub fn records_written(&self) -> u64 {
        self.records
    }

    /// Bytes written so far
    pub fn bytes_written(&self) -> u64 {
        self.bytes
    }

    /// Flush and return the inner writer
    pub fn into_inner(self) -> io::Result<W> {
        self.out.into_inner().map_err(|err| err.into_error())
    }
}

impl<W: Write> RecordSink for CaptureWriter<W> {
    fn accept(&mut self, record: &ClassifiedRecord) -> io::Result<()> {
        self.out.write_all(&record.raw)?;
        self.records += 1;
        self.bytes += record.raw.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
