//! The exemplar storage engine.
//!
//! [`ExemplarStorage`] ties the shared [`CircularBuffer`], the series index,
//! and the relabel hook together behind two independent locks.
//!
//! # Design
//!
//! - One fixed-capacity ring holds the entries of every series
//! - The series index maps a [`SeriesKey`] to the slot of the series' newest entry
//! - Each entry points at the slot of the series' previous entry; [`ChainIter`]
//!   follows and validates those pointers on read
//! - When a write overwrites a series' newest entry, that series' index entry
//!   is pruned, so the index never outgrows the ring
//!
//! # Locking
//!
//! The buffer and index live behind a single `RwLock`: appends take it
//! exclusively, queries share it. The relabel hook sits behind its own lock.
//! An append clones the hook's `Arc` and releases the hook lock *before*
//! taking the data lock, so no call ever holds both and swapping the rules
//! never waits on ingestion.
//!
//! # Example
//!
//! ```rust
//! use exemplars::{Exemplar, ExemplarStorage, Labels};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = ExemplarStorage::new(1024)?;
//! let series = Labels::new([("__name__", "http_request_duration_seconds_bucket"), ("le", "0.5")]);
//!
//! let a1 = Exemplar::with_timestamp(Labels::new([("trace_id", "a1")]), 0.31, 1_000);
//! let b2 = Exemplar::with_timestamp(Labels::new([("trace_id", "b2")]), 0.42, 2_000);
//! storage.add_exemplar(&series, 0, a1)?;
//! storage.add_exemplar(&series, 0, b2)?;
//!
//! let exemplars = storage.select(&series)?;
//! assert_eq!(exemplars.len(), 2);
//! assert_eq!(exemplars[0].value, 0.31);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, trace};

use crate::chain::ChainIter;
use crate::config::StorageConfig;
use crate::error::{ExemplarError, Result};
use crate::exemplar::Exemplar;
use crate::labels::{LabelMatcher, Labels, SeriesKey};
use crate::query::{QueryResult, StorageStats, TimeRange};
use crate::relabel::{RelabelConfig, RelabelRules, Relabeler};
use crate::ring::CircularBuffer;

/// Ingestion-side view of an exemplar store.
pub trait ExemplarAppender: Send + Sync {
    /// Appends an exemplar for the series identified by `series`.
    ///
    /// `timestamp_hint` is the timestamp of the sample the exemplar was
    /// scraped with.
    ///
    /// # Errors
    ///
    /// Returns [`ExemplarError::DuplicateExemplar`] if `exemplar` equals the
    /// series' newest stored exemplar.
    fn append(&self, series: &Labels, timestamp_hint: i64, exemplar: Exemplar) -> Result<()>;
}

/// Query-side view of an exemplar store.
pub trait ExemplarQuerier: Send + Sync {
    /// Returns the stored exemplars of one series, oldest first.
    ///
    /// # Errors
    ///
    /// The in-memory store never fails a select; the `Result` leaves room
    /// for stores that do.
    fn select(&self, series: &Labels) -> Result<Vec<Exemplar>>;
}

/// State guarded by the data lock.
struct Inner {
    ring: CircularBuffer,
    index: HashMap<SeriesKey, usize>,
}

impl Inner {
    /// Returns the series' newest slot, ignoring index entries whose slot
    /// no longer belongs to the series.
    fn head(&self, key: &SeriesKey, series: &Labels) -> Option<usize> {
        let slot = *self.index.get(key)?;
        self.ring
            .get(slot)
            .is_some_and(|entry| entry.belongs_to(series))
            .then_some(slot)
    }
}

/// Bounded in-memory exemplar store shared by all series.
///
/// At most `capacity` exemplars are retained in total, independent of series
/// cardinality. Once the ring is full every new exemplar overwrites the
/// oldest one, whichever series it belongs to.
///
/// # Thread Safety
///
/// `ExemplarStorage` is `Send + Sync`. Share one instance between ingestion
/// workers and query handlers with an `Arc`.
pub struct ExemplarStorage {
    /// Ring and series index.
    data: RwLock<Inner>,
    /// Active relabel hook. Replaced wholesale, never mutated in place.
    relabel: RwLock<Arc<dyn Relabeler>>,
}

impl ExemplarStorage {
    /// Creates an empty store holding at most `capacity` exemplars, with no
    /// relabel rules.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::InvalidCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_relabeler(capacity, Arc::new(RelabelRules::empty()))
    }

    /// Creates an empty store from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::ConfigError`] if the capacity is zero or a relabel
    /// rule is invalid.
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        let rules = config.compile_relabel()?;
        Self::with_relabeler(config.capacity, Arc::new(rules))
    }

    /// Creates an empty store that relabels series with a custom hook.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::InvalidCapacity`] if `capacity` is zero.
    pub fn with_relabeler(capacity: usize, relabeler: Arc<dyn Relabeler>) -> Result<Self> {
        let ring = CircularBuffer::new(capacity)?;
        Ok(Self {
            data: RwLock::new(Inner {
                ring,
                index: HashMap::new(),
            }),
            relabel: RwLock::new(relabeler),
        })
    }

    /// Returns the fixed number of exemplars the store can hold.
    pub fn capacity(&self) -> usize {
        self.data.read().ring.capacity()
    }

    /// Stores an exemplar for the series identified by `series`.
    ///
    /// Empty-valued labels are removed from `series` and the relabel hook is
    /// applied. If relabeling leaves no labels the exemplar is dropped and
    /// `Ok(())` is returned.
    ///
    /// `timestamp_hint` is recorded in traces only; it does not influence
    /// retention.
    ///
    /// # Errors
    ///
    /// Returns [`ExemplarError::DuplicateExemplar`] without modifying the
    /// store if `exemplar` equals the series' newest stored exemplar.
    pub fn add_exemplar(
        &self,
        series: &Labels,
        timestamp_hint: i64,
        exemplar: Exemplar,
    ) -> Result<()> {
        let normalized = series.without_empty();

        // Hook lock is released at the end of this statement.
        let relabeler = Arc::clone(&*self.relabel.read());
        let Some(series_labels) = relabeler
            .relabel(&normalized)
            .map(|l| l.without_empty())
            .filter(|l| !l.is_empty())
        else {
            debug!(series = %normalized, "exemplar dropped by relabeling");
            return Ok(());
        };

        let key = series_labels.series_key();
        let mut inner = self.data.write();

        let previous = inner.head(&key, &series_labels);
        if let Some(slot) = previous
            && inner
                .ring
                .get(slot)
                .is_some_and(|newest| *newest.exemplar() == exemplar)
        {
            debug!(series = %key, slot, "duplicate exemplar rejected");
            return Err(ExemplarError::DuplicateExemplar);
        }

        let (slot, evicted) = inner.ring.push(series_labels, exemplar, previous);

        if let Some(evicted) = evicted {
            let evicted_key = evicted.series_labels().series_key();
            if inner.index.get(&evicted_key) == Some(&slot) {
                trace!(series = %evicted_key, slot, "last exemplar of series overwritten");
                inner.index.remove(&evicted_key);
            }
        }

        trace!(series = %key, slot, ?previous, timestamp_hint, "exemplar stored");
        inner.index.insert(key, slot);
        Ok(())
    }

    /// Returns the stored exemplars of `series`, oldest first.
    ///
    /// An unknown series yields an empty vector. Empty-valued labels in
    /// `series` are ignored; relabeling is not applied, so queries must use
    /// the labels the series was stored under.
    ///
    /// # Errors
    ///
    /// Never fails; see [`ExemplarQuerier::select`].
    pub fn select(&self, series: &Labels) -> Result<Vec<Exemplar>> {
        let series = series.without_empty();
        let key = series.series_key();

        let inner = self.data.read();
        let Some(&head) = inner.index.get(&key) else {
            return Ok(Vec::new());
        };
        Ok(ChainIter::new(&inner.ring, head, &series).collect_chronological())
    }

    /// Returns the exemplars in `range` of every series matching all
    /// `matchers`.
    ///
    /// Series without exemplars in the range are omitted. Results are sorted
    /// by series labels. An empty `matchers` slice matches every series.
    ///
    /// # Errors
    ///
    /// Never fails.
    pub fn select_range(
        &self,
        range: TimeRange,
        matchers: &[LabelMatcher],
    ) -> Result<Vec<QueryResult>> {
        let inner = self.data.read();

        let mut results: Vec<QueryResult> = inner
            .index
            .iter()
            .filter_map(|(key, &head)| {
                let series = inner.ring.get(head)?.series_labels();
                if series.series_key() != *key || !matchers.iter().all(|m| m.matches(series)) {
                    return None;
                }
                let mut exemplars: Vec<Exemplar> = ChainIter::new(&inner.ring, head, series)
                    .map(|entry| entry.exemplar())
                    .filter(|e| range.contains(e))
                    .cloned()
                    .collect();
                if exemplars.is_empty() {
                    return None;
                }
                exemplars.reverse();
                Some(QueryResult::new(series.clone(), exemplars))
            })
            .collect();

        results.sort_by(|a, b| a.series_labels.cmp(&b.series_labels));
        Ok(results)
    }

    /// Compiles `configs` and swaps them in as the active relabel rules.
    ///
    /// Concurrent appends see either the old or the new rule set in full.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::ConfigError`] if any rule is invalid; the previous
    /// rules stay active.
    pub fn apply_config(&self, configs: &[RelabelConfig]) -> Result<()> {
        let rules = RelabelRules::compile(configs)?;
        info!(rules = rules.len(), "applying exemplar relabel config");
        self.set_relabeler(Arc::new(rules));
        Ok(())
    }

    /// Swaps in a custom relabel hook.
    pub fn set_relabeler(&self, relabeler: Arc<dyn Relabeler>) {
        *self.relabel.write() = relabeler;
    }

    /// Clears every stored exemplar and the series index.
    ///
    /// Meant for tests and administrative resets. The relabel hook is kept.
    pub fn reset(&self) {
        let mut inner = self.data.write();
        inner.ring.reset();
        inner.index.clear();
        info!(capacity = inner.ring.capacity(), "exemplar storage reset");
    }

    /// Returns a snapshot of buffer occupancy.
    pub fn stats(&self) -> StorageStats {
        let inner = self.data.read();
        let series = inner
            .index
            .iter()
            .filter(|&(key, &slot)| {
                inner
                    .ring
                    .get(slot)
                    .is_some_and(|entry| entry.series_labels().series_key() == *key)
            })
            .count();
        StorageStats {
            capacity: inner.ring.capacity(),
            live_entries: inner.ring.live_entries(),
            series,
        }
    }

    /// Returns this store as an ingestion-side trait object.
    pub fn appender(&self) -> &dyn ExemplarAppender {
        self
    }

    /// Returns this store as a query-side trait object.
    pub fn querier(&self) -> &dyn ExemplarQuerier {
        self
    }
}

impl ExemplarAppender for ExemplarStorage {
    fn append(&self, series: &Labels, timestamp_hint: i64, exemplar: Exemplar) -> Result<()> {
        self.add_exemplar(series, timestamp_hint, exemplar)
    }
}

impl ExemplarQuerier for ExemplarStorage {
    fn select(&self, series: &Labels) -> Result<Vec<Exemplar>> {
        ExemplarStorage::select(self, series)
    }
}

impl fmt::Debug for ExemplarStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        f.debug_struct("ExemplarStorage")
            .field("capacity", &stats.capacity)
            .field("live_entries", &stats.live_entries)
            .field("series", &stats.series)
            .finish_non_exhaustive()
    }
}
