//! Relabeling applied to series labels before an exemplar is stored.
//!
//! Relabeling is how operators rename, drop, or filter series. The storage
//! engine only sees it as a pure function from a label set to an optional
//! label set, expressed by the [`Relabeler`] trait. `None` (or an empty label
//! set) means the exemplar is dropped.
//!
//! [`RelabelRules`] is the bundled evaluator: an ordered list of
//! [`RelabelConfig`] rules, compiled once and applied in order.
//!
//! # Example
//!
//! ```rust
//! use exemplars::Labels;
//! use exemplars::relabel::{RelabelAction, RelabelConfig, RelabelRules, Relabeler};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let rules = RelabelRules::compile(&[RelabelConfig {
//!     source_labels: vec!["job".to_string()],
//!     regex: "debug-.*".to_string(),
//!     action: RelabelAction::Drop,
//!     ..RelabelConfig::default()
//! }])?;
//!
//! assert!(rules.relabel(&Labels::new([("job", "debug-api")])).is_none());
//! assert!(rules.relabel(&Labels::new([("job", "api")])).is_some());
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

use crate::error::{ConfigError, Result};
use crate::labels::{Labels, is_valid_label_name};

/// Default separator placed between concatenated source label values.
pub const DEFAULT_SEPARATOR: &str = ";";

/// Default regex; matches any value and captures it as `$1`.
pub const DEFAULT_REGEX: &str = "(.*)";

/// Default replacement; the first capture group.
pub const DEFAULT_REPLACEMENT: &str = "$1";

/// A label transformation applied before storage.
///
/// Implementations must be pure: the same input always yields the same
/// output. They are shared across ingestion threads.
pub trait Relabeler: Send + Sync {
    /// Transforms `labels`, returning `None` to drop the series.
    fn relabel(&self, labels: &Labels) -> Option<Labels>;
}

/// Action performed by a relabel rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelabelAction {
    /// Write the expanded replacement into `target_label` if the regex matches.
    #[default]
    Replace,
    /// Drop the series unless the regex matches.
    Keep,
    /// Drop the series if the regex matches.
    Drop,
    /// Write `hash(value) % modulus` into `target_label`.
    HashMod,
    /// Copy every label whose name matches to the expanded replacement name.
    LabelMap,
    /// Remove every label whose name matches.
    LabelDrop,
    /// Remove every label whose name does not match.
    LabelKeep,
}

/// A single relabel rule as written in configuration.
///
/// Field defaults follow the usual relabeling conventions, so a rule only
/// needs to spell out what differs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelabelConfig {
    /// Labels whose values are joined with `separator` to form the matched value.
    pub source_labels: Vec<String>,
    /// Separator placed between source label values.
    pub separator: String,
    /// Regex matched against the joined value (or label names for the
    /// `label*` actions). Always fully anchored.
    pub regex: String,
    /// Modulus for [`RelabelAction::HashMod`].
    pub modulus: u64,
    /// Label written by `replace` and `hashmod`.
    pub target_label: String,
    /// Replacement template; may reference capture groups as `$1` or `${name}`.
    pub replacement: String,
    /// The action to perform.
    pub action: RelabelAction,
}

impl Default for RelabelConfig {
    fn default() -> Self {
        Self {
            source_labels: Vec::new(),
            separator: DEFAULT_SEPARATOR.to_string(),
            regex: DEFAULT_REGEX.to_string(),
            modulus: 0,
            target_label: String::new(),
            replacement: DEFAULT_REPLACEMENT.to_string(),
            action: RelabelAction::Replace,
        }
    }
}

impl RelabelConfig {
    /// Validates the rule without compiling its regex.
    ///
    /// `index` is the rule's position, reported back in errors.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRule`] if the rule is missing a field its
    /// action requires.
    pub fn validate(&self, index: usize) -> Result<()> {
        let invalid = |reason: &str| -> Result<()> {
            Err(ConfigError::InvalidRule {
                index,
                reason: reason.to_string(),
            }
            .into())
        };

        match self.action {
            RelabelAction::Replace if self.target_label.is_empty() => {
                invalid("replace requires a target_label")
            }
            RelabelAction::HashMod if self.target_label.is_empty() => {
                invalid("hashmod requires a target_label")
            }
            RelabelAction::HashMod if self.modulus == 0 => invalid("hashmod requires modulus > 0"),
            RelabelAction::HashMod if !is_valid_label_name(&self.target_label) => {
                invalid("hashmod target_label is not a valid label name")
            }
            RelabelAction::LabelDrop | RelabelAction::LabelKeep
                if self.replacement != DEFAULT_REPLACEMENT || !self.target_label.is_empty() =>
            {
                invalid("labeldrop and labelkeep take no target_label or replacement")
            }
            _ => Ok(()),
        }
    }
}

/// A rule with its regex compiled.
#[derive(Debug, Clone)]
struct CompiledRule {
    config: RelabelConfig,
    regex: Regex,
}

/// An ordered, compiled set of relabel rules.
///
/// An empty rule set passes labels through unchanged.
#[derive(Debug, Clone, Default)]
pub struct RelabelRules {
    rules: Vec<CompiledRule>,
}

impl RelabelRules {
    /// Creates a rule set that passes every label set through.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Validates and compiles `configs` in order.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidRule`] if a rule is structurally invalid
    /// - [`ConfigError::InvalidRegex`] if a rule's regex does not compile
    pub fn compile(configs: &[RelabelConfig]) -> Result<Self> {
        let rules = configs
            .iter()
            .enumerate()
            .map(|(index, config)| {
                config.validate(index)?;
                let anchored = format!("^(?:{})$", config.regex);
                let regex = Regex::new(&anchored).map_err(|source| ConfigError::InvalidRegex {
                    regex: config.regex.clone(),
                    source,
                })?;
                Ok(CompiledRule {
                    config: config.clone(),
                    regex,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Returns the number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if there are no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Applies every rule in order.
    ///
    /// Returns `None` if a `keep` or `drop` rule discards the series, or if
    /// nothing is left once empty-valued labels are removed.
    pub fn process(&self, labels: &Labels) -> Option<Labels> {
        if self.rules.is_empty() {
            return Some(labels.clone()).filter(|l| !l.is_empty());
        }

        let mut builder: BTreeMap<String, String> = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        for rule in &self.rules {
            if !rule.apply(&mut builder) {
                return None;
            }
        }

        let result = Labels::new(builder.into_iter().filter(|(_, v)| !v.is_empty()));
        Some(result).filter(|l| !l.is_empty())
    }
}

impl Relabeler for RelabelRules {
    fn relabel(&self, labels: &Labels) -> Option<Labels> {
        self.process(labels)
    }
}

impl CompiledRule {
    /// Applies this rule to `labels` in place. Returns `false` if the series
    /// is dropped.
    fn apply(&self, labels: &mut BTreeMap<String, String>) -> bool {
        let cfg = &self.config;
        let value = cfg
            .source_labels
            .iter()
            .map(|name| labels.get(name).map(String::as_str).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(cfg.separator.as_str());

        match cfg.action {
            RelabelAction::Keep => return self.regex.is_match(&value),
            RelabelAction::Drop => return !self.regex.is_match(&value),
            RelabelAction::Replace => {
                let Some(captures) = self.regex.captures(&value) else {
                    return true;
                };
                let mut target = String::new();
                captures.expand(&cfg.target_label, &mut target);
                if !is_valid_label_name(&target) {
                    return true;
                }
                let mut replaced = String::new();
                captures.expand(&cfg.replacement, &mut replaced);
                if replaced.is_empty() {
                    labels.remove(&target);
                } else {
                    labels.insert(target, replaced);
                }
            }
            RelabelAction::HashMod => {
                let bucket = stable_hash(&value) % cfg.modulus;
                labels.insert(cfg.target_label.clone(), bucket.to_string());
            }
            RelabelAction::LabelMap => {
                let mapped: Vec<(String, String)> = labels
                    .iter()
                    .filter(|(name, _)| self.regex.is_match(name))
                    .map(|(name, v)| {
                        let renamed = self.regex.replace(name, cfg.replacement.as_str());
                        (renamed.into_owned(), v.clone())
                    })
                    .collect();
                labels.extend(mapped);
            }
            RelabelAction::LabelDrop => labels.retain(|name, _| !self.regex.is_match(name)),
            RelabelAction::LabelKeep => labels.retain(|name, _| self.regex.is_match(name)),
        }
        true
    }
}

/// Deterministic 64-bit hash used by `hashmod`.
///
/// XXH3 has a fixed output, so shard assignment survives toolchain upgrades.
fn stable_hash(value: &str) -> u64 {
    xxh3_64(value.as_bytes())
}
