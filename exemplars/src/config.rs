//! Storage configuration.
//!
//! Configuration is parsed by the caller (from whatever file format the
//! platform uses) and handed to [`crate::ExemplarStorage::from_config`]. The
//! capacity is fixed for the lifetime of the storage; the relabel rules can
//! later be replaced with [`crate::ExemplarStorage::apply_config`].

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::relabel::{RelabelConfig, RelabelRules};

/// Default number of exemplars retained across all series.
pub const DEFAULT_CAPACITY: usize = 100_000;

/// Configuration for an [`crate::ExemplarStorage`].
///
/// # Example
///
/// ```rust
/// use exemplars::StorageConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = StorageConfig {
///     capacity: 1024,
///     ..StorageConfig::default()
/// };
/// config.validate()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Maximum number of exemplars held across all series combined.
    pub capacity: usize,

    /// Relabel rules applied to series labels before storage, in order.
    pub relabel_configs: Vec<RelabelConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            relabel_configs: Vec::new(),
        }
    }
}

impl StorageConfig {
    /// Validates the configuration, including every relabel rule.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidCapacity`] if `capacity` is zero
    /// - [`ConfigError::InvalidRule`] or [`ConfigError::InvalidRegex`] for a bad relabel rule
    pub fn validate(&self) -> Result<()> {
        self.compile_relabel().map(|_| ())
    }

    /// Validates the capacity and compiles the relabel rules.
    pub(crate) fn compile_relabel(&self) -> Result<RelabelRules> {
        if self.capacity == 0 {
            return Err(ConfigError::InvalidCapacity {
                capacity: self.capacity,
            }
            .into());
        }
        RelabelRules::compile(&self.relabel_configs)
    }
}
