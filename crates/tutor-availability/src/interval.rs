//! Interval algebra over time blocks: subtraction, merging and clipping.
//!
//! Blocks touching at a single instant do not overlap. Subtracting
//! `[12:00, 13:00)` from `[10:00, 12:00)` leaves the base untouched, while
//! merging the two produces `[10:00, 13:00)`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AvailabilityError, Result};

/// A span of time with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeBlock {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeBlock {
    /// Build a block, or `None` when the range is empty or inverted.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    /// Like [`TimeBlock::new`] but reports the bad range as an error.
    pub fn try_new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        Self::new(start, end).ok_or(AvailabilityError::InvalidBlock { start, end })
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn duration_minutes(&self) -> i64 {
        self.duration().num_minutes()
    }

    /// Strict overlap: sharing only an endpoint does not count.
    pub fn overlaps(&self, other: &TimeBlock) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The part of this block inside `[start, end]`, if any.
    pub fn clip(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<TimeBlock> {
        TimeBlock::new(self.start.max(start), self.end.min(end))
    }

    /// What is left of this block after removing `cut`: zero, one or two fragments.
    fn minus(self, cut: &TimeBlock) -> Vec<TimeBlock> {
        if !self.overlaps(cut) {
            return vec![self];
        }
        TimeBlock::new(self.start, cut.start)
            .into_iter()
            .chain(TimeBlock::new(cut.end, self.end))
            .collect()
    }
}

/// Remove every portion of `base` covered by any block in `cut`.
///
/// Each base block is folded over the cut list, re-splitting every remaining
/// fragment against each cut in turn. The result does not depend on the order
/// of `cut`. Output keeps the order of `base`; fragments are not merged.
pub fn subtract_blocks(base: &[TimeBlock], cut: &[TimeBlock]) -> Vec<TimeBlock> {
    base.iter()
        .flat_map(|block| {
            cut.iter().fold(vec![*block], |fragments, c| {
                fragments.into_iter().flat_map(|f| f.minus(c)).collect()
            })
        })
        .collect()
}

/// Merge overlapping or touching blocks.
///
/// Returns a sorted list in which consecutive blocks are separated by a gap.
pub fn merge_blocks(blocks: &[TimeBlock]) -> Vec<TimeBlock> {
    let mut sorted = blocks.to_vec();
    sorted.sort();

    let mut merged: Vec<TimeBlock> = Vec::with_capacity(sorted.len());
    for block in sorted {
        if let Some(last) = merged.last_mut() {
            if block.start <= last.end {
                // Overlapping or adjacent -- extend the current block.
                last.end = last.end.max(block.end);
                continue;
            }
        }
        merged.push(block);
    }
    merged
}

/// Clip every block to `[start, end]`, dropping blocks left empty.
pub fn clip_to_window(
    blocks: &[TimeBlock],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<TimeBlock> {
    blocks.iter().filter_map(|b| b.clip(start, end)).collect()
}
