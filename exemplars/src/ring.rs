//! Circular buffer shared by every series.
//!
//! The buffer is a fixed-length arena of slots with a single write cursor.
//! All series write into the same arena, so it is not partitioned per series;
//! each [`BufferEntry`] instead carries the slot of the previous entry for the
//! same series, which threads a per-series history through the shared ring.
//!
//! # Design
//!
//! - Capacity is fixed at construction and bounds the number of live entries
//! - Every successful write lands at the cursor, which then advances `(cursor + 1) % capacity`
//! - Old entries are never deleted explicitly; they are overwritten when the cursor wraps
//! - Every write is stamped with a monotonically increasing sequence number so
//!   readers can tell a genuine predecessor from a recycled slot
//!
//! Because slots are recycled by unrelated writers, a `previous` pointer is
//! only a hint. See [`crate::chain`] for how it is validated.

use crate::error::{ConfigError, Result};
use crate::exemplar::Exemplar;
use crate::labels::Labels;

/// A single occupied slot in the circular buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferEntry {
    /// The stored exemplar.
    exemplar: Exemplar,
    /// Normalized labels of the series this entry belongs to.
    series_labels: Labels,
    /// Slot of this series' previous entry at the time of the write.
    previous: Option<usize>,
    /// Write sequence number, unique and increasing across the whole buffer.
    seq: u64,
}

impl BufferEntry {
    /// Creates an entry. Used by the buffer itself and by tests that need to
    /// lay out a specific ring state.
    pub(crate) fn new(
        exemplar: Exemplar,
        series_labels: Labels,
        previous: Option<usize>,
        seq: u64,
    ) -> Self {
        Self {
            exemplar,
            series_labels,
            previous,
            seq,
        }
    }

    /// Returns the stored exemplar.
    pub fn exemplar(&self) -> &Exemplar {
        &self.exemplar
    }

    /// Returns the normalized labels of the owning series.
    pub fn series_labels(&self) -> &Labels {
        &self.series_labels
    }

    /// Returns the slot of the series' previous entry, if any.
    pub fn previous(&self) -> Option<usize> {
        self.previous
    }

    /// Returns the write sequence number of this entry.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Returns `true` if this entry belongs to the series with `labels`.
    #[inline]
    pub fn belongs_to(&self, labels: &Labels) -> bool {
        self.series_labels == *labels
    }
}

/// Fixed-capacity ring of exemplar entries.
///
/// # Thread Safety
///
/// The buffer itself is not synchronized. [`crate::ExemplarStorage`] guards
/// it together with the series index behind a single lock.
#[derive(Debug)]
pub struct CircularBuffer {
    /// Slot arena. `None` means the slot has never been written since the
    /// last reset.
    entries: Vec<Option<BufferEntry>>,
    /// Slot the next write will land in.
    cursor: usize,
    /// Sequence number handed to the next write.
    next_seq: u64,
}

impl CircularBuffer {
    /// Creates an empty buffer with room for `capacity` entries.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCapacity`] if `capacity` is zero.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use exemplars::ring::CircularBuffer;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let ring = CircularBuffer::new(16)?;
    /// assert_eq!(ring.capacity(), 16);
    /// assert_eq!(ring.live_entries(), 0);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(ConfigError::InvalidCapacity { capacity }.into());
        }
        Ok(Self {
            entries: vec![None; capacity],
            cursor: 0,
            next_seq: 1,
        })
    }

    /// Returns the fixed number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Returns the slot the next write will land in.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Returns the entry stored at `slot`, or `None` if the slot is empty or
    /// out of range.
    #[inline]
    pub fn get(&self, slot: usize) -> Option<&BufferEntry> {
        self.entries.get(slot).and_then(Option::as_ref)
    }

    /// Returns the number of occupied slots. Never exceeds [`capacity`](Self::capacity).
    pub fn live_entries(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    /// Returns `true` if no slot has been written since creation or reset.
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(Option::is_none)
    }

    /// Writes a new entry at the cursor and advances it.
    ///
    /// Returns the slot that was written together with the entry it replaced,
    /// if the slot was already occupied.
    pub fn push(
        &mut self,
        series_labels: Labels,
        exemplar: Exemplar,
        previous: Option<usize>,
    ) -> (usize, Option<BufferEntry>) {
        let slot = self.cursor;
        let entry = BufferEntry::new(exemplar, series_labels, previous, self.next_seq);
        let evicted = self.entries[slot].replace(entry);

        self.next_seq += 1;
        self.cursor = (slot + 1) % self.entries.len();

        (slot, evicted)
    }

    /// Clears every slot and rewinds the cursor.
    pub fn reset(&mut self) {
        self.entries.iter_mut().for_each(|e| *e = None);
        self.cursor = 0;
        self.next_seq = 1;
    }

    /// Overwrites `slot` with a hand-built entry without touching the cursor.
    #[cfg(test)]
    pub(crate) fn put(&mut self, slot: usize, entry: BufferEntry) {
        self.next_seq = self.next_seq.max(entry.seq + 1);
        self.entries[slot] = Some(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(name: &str) -> Labels {
        Labels::new([("service", name)])
    }

    fn exemplar(id: &str, value: f64) -> Exemplar {
        Exemplar::new(Labels::new([("trace_id", id)]), value)
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            CircularBuffer::new(0),
            Err(crate::ExemplarError::Config(ConfigError::InvalidCapacity { capacity: 0 }))
        ));
    }

    #[test]
    fn test_push_advances_cursor_and_wraps() {
        let mut ring = CircularBuffer::new(3).unwrap();
        assert!(ring.is_empty());

        for (i, expected_slot) in [0, 1, 2, 0, 1].into_iter().enumerate() {
            let (slot, _) = ring.push(series("a"), exemplar(&i.to_string(), 0.0), None);
            assert_eq!(slot, expected_slot);
        }

        assert_eq!(ring.cursor(), 2);
        assert_eq!(ring.live_entries(), 3);
    }

    #[test]
    fn test_push_returns_evicted_entry() {
        let mut ring = CircularBuffer::new(2).unwrap();
        let (_, evicted) = ring.push(series("a"), exemplar("1", 1.0), None);
        assert!(evicted.is_none());
        ring.push(series("b"), exemplar("2", 2.0), None);

        let (slot, evicted) = ring.push(series("b"), exemplar("3", 3.0), Some(1));
        assert_eq!(slot, 0);
        let evicted = evicted.unwrap();
        assert_eq!(evicted.series_labels(), &series("a"));
        assert_eq!(evicted.exemplar(), &exemplar("1", 1.0));
    }

    #[test]
    fn test_sequence_numbers_increase() {
        let mut ring = CircularBuffer::new(2).unwrap();
        ring.push(series("a"), exemplar("1", 1.0), None);
        ring.push(series("a"), exemplar("2", 2.0), Some(0));
        ring.push(series("a"), exemplar("3", 3.0), Some(1));

        let newest = ring.get(0).unwrap();
        let older = ring.get(1).unwrap();
        assert!(newest.seq() > older.seq());
        assert_eq!(newest.previous(), Some(1));
    }

    #[test]
    fn test_get_out_of_range() {
        let ring = CircularBuffer::new(2).unwrap();
        assert!(ring.get(0).is_none());
        assert!(ring.get(5).is_none());
    }

    #[test]
    fn test_reset() {
        let mut ring = CircularBuffer::new(2).unwrap();
        ring.push(series("a"), exemplar("1", 1.0), None);
        ring.push(series("a"), exemplar("2", 2.0), Some(0));
        ring.reset();

        assert!(ring.is_empty());
        assert_eq!(ring.cursor(), 0);
        assert_eq!(ring.live_entries(), 0);
        assert_eq!(ring.capacity(), 2);
    }
}
