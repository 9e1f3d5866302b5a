//! Index continuity across framed records
//!
//! Every record carries a running index. Raw blocks advance by the number of
//! samples they hold; decimated samples and heartbeats advance by a fixed
//! stride that depends on instrument settings, so that stride is learned from
//! the first two records of each kind.

use crate::catalog::RecordKind;
use crate::constants::RAW_SAMPLES_PER_BLOCK;
use crate::records::{ClassifiedRecord, Record};
use crate::sink::RecordSink;
use serde::Serialize;
use std::collections::HashMap;
use std::io;

#[cfg(feature = "logging")]
use tracing::{debug, warn};

/// A break in the index sequence of one record kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SequenceGap {
    /// Kind whose sequence broke
    pub kind: RecordKind,

    /// Index of the last record before the break
    pub before: u64,

    /// Index of the first record after the break
    pub after: u64,

    /// Index that was expected instead of `after`
    pub expected: u64,
}

impl SequenceGap {
    /// Whether the index went backwards or repeated (instrument restart, replay)
    pub fn is_regression(&self) -> bool {
        self.after <= self.before
    }

    /// Number of whole records missing, zero for regressions
    pub fn missing(&self) -> u64 {
        let stride = self.expected.saturating_sub(self.before);
        if self.is_regression() || stride == 0 {
            return 0;
        }
        ((self.after - self.before) / stride).saturating_sub(1)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Lane {
    last: Option<u64>,
    stride: Option<u64>,
    seen: u64,
}

/// Per-kind continuity summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaneSummary {
    pub kind: RecordKind,
    pub records: u64,
    pub stride: Option<u64>,
    pub last_index: Option<u64>,
}

/// Final continuity report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContinuityReport {
    pub lanes: Vec<LaneSummary>,
    pub gaps: Vec<SequenceGap>,
}

impl ContinuityReport {
    /// True when no kind skipped or repeated an index
    pub fn is_continuous(&self) -> bool {
        self.gaps.is_empty()
    }

    /// Total records missing across all kinds
    pub fn missing(&self) -> u64 {
        self.gaps.iter().map(SequenceGap::missing).sum()
    }
}

/// Tracks index sequences per record kind
#[derive(Debug, Default)]
pub struct ContinuityTracker {
    lanes: HashMap<RecordKind, Lane>,
    gaps: Vec<SequenceGap>,
}

impl ContinuityTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one record; returns the break it reveals, if any
    pub fn observe(&mut self, record: &Record) -> Option<SequenceGap> {
        let kind = record.kind();
        let index = record.index();
        let lane = self.lanes.entry(kind).or_default();
        lane.seen += 1;

        if kind == RecordKind::RawBlock {
            lane.stride = Some(RAW_SAMPLES_PER_BLOCK as u64);
        }

        let gap = match (lane.last, lane.stride) {
            (None, _) => None,
            (Some(last), None) if index > last => {
                #[cfg(feature = "logging")]
                debug!("Learned {} index stride {}", kind.name(), index - last);

                lane.stride = Some(index - last);
                None
            }
            (Some(last), None) => Some(SequenceGap {
                kind,
                before: last,
                after: index,
                expected: last.saturating_add(1),
            }),
            (Some(last), Some(stride)) => {
                let expected = last.saturating_add(stride);
                (index != expected).then_some(SequenceGap {
                    kind,
                    before: last,
                    after: index,
                    expected,
                })
            }
        };
        lane.last = Some(index);

        if let Some(gap) = gap {
            #[cfg(feature = "logging")]
            warn!(
                "{} index jumped from {} to {} (expected {})",
                kind.name(),
                gap.before,
                gap.after,
                gap.expected
            );

            self.gaps.push(gap);
        }

        gap
    }

    /// Breaks seen so far, in arrival order
    pub fn gaps(&self) -> &[SequenceGap] {
        &self.gaps
    }

    /// Summarize every kind seen
    pub fn report(&self) -> ContinuityReport {
        let lanes = RecordKind::ALL
            .iter()
            .filter_map(|kind| {
                self.lanes.get(kind).map(|lane| LaneSummary {
                    kind: *kind,
                    records: lane.seen,
                    stride: lane.stride,
                    last_index: lane.last,
                })
            })
            .collect();

        ContinuityReport {
            lanes,
            gaps: self.gaps.clone(),
        }
    }
}

impl RecordSink for ContinuityTracker {
    fn accept(&mut self, record: &ClassifiedRecord) -> io::Result<()> {
        self.observe(&record.record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{DecimatedSample, Heartbeat, RawBlock};

    fn raw(index: u64) -> Record {
        Record::RawBlock(RawBlock {
            first_sample_index: index,
            ..Default::default()
        })
    }

    fn decimated(index: u64) -> Record {
        Record::Decimated(DecimatedSample {
            index,
            ..Default::default()
        })
    }

    #[test]
    fn test_raw_blocks_advance_by_sample_count() {
        let mut tracker = ContinuityTracker::new();
        assert!(tracker.observe(&raw(0)).is_none());
        assert!(tracker.observe(&raw(40)).is_none());

        let gap = tracker.observe(&raw(120)).unwrap();
        assert_eq!(gap.expected, 80);
        assert_eq!(gap.missing(), 1);
        assert!(!gap.is_regression());
    }

    #[test]
    fn test_learned_stride() {
        let mut tracker = ContinuityTracker::new();
        for index in [1000, 1050, 1100, 1150] {
            assert!(tracker.observe(&decimated(index)).is_none());
        }

        let gap = tracker.observe(&decimated(1300)).unwrap();
        assert_eq!(gap.missing(), 2);
    }

    #[test]
    fn test_regression() {
        let mut tracker = ContinuityTracker::new();
        tracker.observe(&raw(400));
        let gap = tracker.observe(&raw(0)).unwrap();
        assert!(gap.is_regression());
        assert_eq!(gap.missing(), 0);
    }

    #[test]
    fn test_short_forward_jump() {
        let mut tracker = ContinuityTracker::new();
        tracker.observe(&raw(0));
        tracker.observe(&raw(40));

        let gap = tracker.observe(&raw(60)).unwrap();
        assert_eq!(gap.expected, 80);
        assert!(!gap.is_regression());
        assert_eq!(gap.missing(), 0);
        assert_eq!(tracker.report().missing(), 0);
    }

    #[test]
    fn test_kinds_tracked_independently() {
        let mut tracker = ContinuityTracker::new();
        tracker.observe(&raw(0));
        tracker.observe(&Record::Heartbeat(Heartbeat {
            index: 7,
            ..Default::default()
        }));
        tracker.observe(&raw(40));

        let report = tracker.report();
        assert!(report.is_continuous());
        assert_eq!(report.lanes.len(), 2);
        assert_eq!(report.lanes[0].kind, RecordKind::RawBlock);
        assert_eq!(report.lanes[0].records, 2);
        assert_eq!(report.lanes[0].last_index, Some(40));
    }
}
