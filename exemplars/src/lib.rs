//! # exemplars
//!
//! Bounded in-memory exemplar storage for a metrics pipeline.
//!
//! Exemplars are trace-linking samples attached to individual metric
//! observations. This crate keeps the most recent exemplars of every series
//! in one fixed-capacity circular buffer, so memory use is set by
//! configuration rather than by series cardinality.
//!
//! ## Key Properties
//!
//! - One shared ring for all series; at most `capacity` exemplars are ever held
//! - Per-series history threaded through the ring with back-pointers,
//!   re-validated on every hop so recycled slots never cause loops
//! - Exact repeats of a series' newest exemplar are rejected with
//!   [`ExemplarError::DuplicateExemplar`]
//! - Hot-swappable relabel rules applied before storage; series that relabel
//!   to nothing are dropped silently
//! - `Send + Sync`: one instance serves ingestion and queries concurrently
//!
//! ## Quick Start
//!
//! ```rust
//! use exemplars::{Exemplar, ExemplarStorage, Labels};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = ExemplarStorage::new(100_000)?;
//!
//! let series = Labels::new([("__name__", "rpc_duration_seconds_bucket"), ("le", "0.1")]);
//! let trace = Labels::new([("trace_id", "4bf92f35")]);
//! let exemplar = Exemplar::with_timestamp(trace, 0.087, 1_700_000_000_000);
//!
//! storage.add_exemplar(&series, 1_700_000_000_000, exemplar.clone())?;
//!
//! // Adding the same exemplar again is reported, not stored twice.
//! let err = storage.add_exemplar(&series, 1_700_000_000_000, exemplar).unwrap_err();
//! assert!(err.is_duplicate());
//!
//! assert_eq!(storage.select(&series)?.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`ExemplarStorage`]: The engine: append, select, relabel config, reset
//! - [`Exemplar`] / [`Labels`]: Value types
//! - [`StorageConfig`]: Capacity and relabel rules
//! - [`ExemplarAppender`] / [`ExemplarQuerier`]: Narrow views for ingestion and queries
//!
//! ## Modules
//!
//! For lower-level access, the individual modules are also public:
//!
//! - [`storage`]: The engine and its trait views
//! - [`ring`]: Circular buffer of entries shared by all series
//! - [`chain`]: Validated backward walk over a series' entries
//! - [`labels`]: Label sets, series keys, matchers
//! - [`relabel`]: Relabel rules and the [`relabel::Relabeler`] hook
//! - [`config`]: Storage configuration
//! - [`query`]: Range query results and occupancy stats
//! - [`error`]: Error types

pub mod chain;
pub mod config;
pub mod error;
pub mod exemplar;
pub mod labels;
pub mod query;
pub mod relabel;
pub mod ring;
pub mod storage;

// Re-export primary API types at crate root for convenience.
pub use config::StorageConfig;
pub use error::{ConfigError, ExemplarError, Result};
pub use exemplar::Exemplar;
pub use labels::{LabelMatcher, Labels, SeriesKey};
pub use query::{QueryResult, StorageStats, TimeRange};
pub use relabel::{RelabelAction, RelabelConfig, Relabeler};
pub use storage::{ExemplarAppender, ExemplarQuerier, ExemplarStorage};
