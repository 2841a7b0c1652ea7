//! Backward traversal of a series' history through the shared ring.
//!
//! Each entry records the slot of the series' previous entry. Following those
//! pointers reconstructs the series' history, but the ring is shared by all
//! series and recycles slots, so a pointer may lead to:
//!
//! - a slot that now belongs to a different series
//! - a slot that was overwritten by the *same* series after the pointer was
//!   written, whose own `previous` leads back into entries already visited
//!
//! The second case is what makes a naive walk loop forever. Every hop is
//! therefore re-validated before it is taken:
//!
//! 1. the target slot must belong to the series being walked
//! 2. the target must be strictly older than the entry just visited: its write
//!    sequence must be lower and, when both exemplars carry timestamps, its
//!    timestamp must be lower too
//!
//! On top of that the walk never yields more than `capacity` entries.

use tracing::trace;

use crate::exemplar::Exemplar;
use crate::labels::Labels;
use crate::ring::{BufferEntry, CircularBuffer};

/// Iterator over a series' entries, newest first.
///
/// Created with [`ChainIter::new`]. Yields nothing if the head slot is empty
/// or has been recycled by another series.
#[derive(Debug)]
pub struct ChainIter<'a> {
    ring: &'a CircularBuffer,
    series: &'a Labels,
    /// Next entry to yield.
    next: Option<&'a BufferEntry>,
    /// Entries that may still be yielded.
    budget: usize,
}

impl<'a> ChainIter<'a> {
    /// Starts a walk at `head`, the slot the series index points at.
    pub fn new(ring: &'a CircularBuffer, head: usize, series: &'a Labels) -> Self {
        let next = ring.get(head).filter(|entry| entry.belongs_to(series));
        if next.is_none() {
            trace!(head, %series, "series index entry is stale");
        }
        Self {
            ring,
            series,
            next,
            budget: ring.capacity(),
        }
    }

    /// Returns the series' entries oldest to newest.
    pub fn collect_chronological(self) -> Vec<Exemplar> {
        let mut exemplars: Vec<Exemplar> = self.map(|entry| entry.exemplar().clone()).collect();
        exemplars.reverse();
        exemplars
    }

    /// Resolves the validated predecessor of `current`.
    fn predecessor(&self, current: &BufferEntry) -> Option<&'a BufferEntry> {
        let slot = current.previous()?;
        let Some(candidate) = self.ring.get(slot) else {
            trace!(slot, "chain ends at empty slot");
            return None;
        };
        if !candidate.belongs_to(self.series) {
            trace!(slot, "chain ends at slot recycled by another series");
            return None;
        }
        if !is_older(candidate, current) {
            trace!(slot, "chain ends at slot that is not older than its successor");
            return None;
        }
        Some(candidate)
    }
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = &'a BufferEntry;

    fn next(&mut self) -> Option<Self::Item> {
        if self.budget == 0 {
            return None;
        }
        let current = self.next.take()?;
        self.budget -= 1;
        self.next = self.predecessor(current);
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.next {
            Some(_) if self.budget > 0 => (1, Some(self.budget)),
            _ => (0, Some(0)),
        }
    }
}

/// Returns `true` if `candidate` was written before `visited`.
///
/// The write sequence always decides; exemplar timestamps tighten the check
/// when both sides carry one.
#[inline]
fn is_older(candidate: &BufferEntry, visited: &BufferEntry) -> bool {
    if candidate.seq() >= visited.seq() {
        return false;
    }
    match (candidate.exemplar().timestamp, visited.exemplar().timestamp) {
        (Some(older), Some(newer)) => older < newer,
        _ => true,
    }
}
