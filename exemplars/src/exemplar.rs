//! The exemplar value type.

use serde::{Deserialize, Serialize};

use crate::labels::Labels;

/// A single exemplar attached to a metric observation.
///
/// Exemplars usually carry a trace or span ID in their labels so a sample can
/// be linked back to the request that produced it. The timestamp is optional
/// and its presence is explicit: an exemplar without a timestamp is not equal
/// to one with a timestamp of `0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exemplar {
    /// Exemplar labels, typically `trace_id` and friends.
    pub labels: Labels,
    /// The observed value.
    pub value: f64,
    /// Timestamp in milliseconds since the Unix epoch, if one was exposed.
    pub timestamp: Option<i64>,
}

impl Exemplar {
    /// Creates an exemplar without a timestamp.
    pub fn new(labels: Labels, value: f64) -> Self {
        Self {
            labels,
            value,
            timestamp: None,
        }
    }

    /// Creates an exemplar with an explicit timestamp.
    pub fn with_timestamp(labels: Labels, value: f64, timestamp: i64) -> Self {
        Self {
            labels,
            value,
            timestamp: Some(timestamp),
        }
    }

    /// Returns `true` if the exemplar carries a timestamp.
    pub fn has_timestamp(&self) -> bool {
        self.timestamp.is_some()
    }
}
