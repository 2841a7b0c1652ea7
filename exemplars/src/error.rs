//! Error types for the exemplar storage engine.

use thiserror::Error;

/// The main error type for all exemplar storage operations.
///
/// Only [`ExemplarError::DuplicateExemplar`] can be returned from the append
/// path. Everything else describes a configuration that was rejected before
/// it could take effect.
#[derive(Error, Debug)]
pub enum ExemplarError {
    /// The exemplar is identical to the newest exemplar already stored for
    /// the series.
    ///
    /// Callers should treat this as "already recorded" and not retry.
    #[error("duplicate exemplar")]
    DuplicateExemplar,

    /// Error during storage construction or relabel configuration.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl ExemplarError {
    /// Returns `true` if this is the duplicate-exemplar sentinel.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateExemplar)
    }
}

/// Errors that can occur while validating storage or relabel configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The circular buffer must hold at least one entry.
    #[error("invalid capacity {capacity}: must be > 0")]
    InvalidCapacity {
        /// The rejected capacity.
        capacity: usize,
    },

    /// A relabel rule carries a regex that does not compile.
    #[error("invalid relabel regex '{regex}': {source}")]
    InvalidRegex {
        /// The regex as written in the rule.
        regex: String,
        /// The underlying compilation error.
        #[source]
        source: regex::Error,
    },

    /// A relabel rule is structurally invalid for its action.
    #[error("invalid relabel rule {index}: {reason}")]
    InvalidRule {
        /// Position of the rule in the rule list.
        index: usize,
        /// Description of what makes the rule invalid.
        reason: String,
    },
}

/// Type alias for `Result<T, ExemplarError>`.
pub type Result<T> = std::result::Result<T, ExemplarError>;
