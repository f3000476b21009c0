//! Analysis configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::hir::{Cardinality, Severity};

/// Knobs of the semantic passes.
///
/// Every field has a default, so a partial JSON object is a valid
/// configuration:
///
/// ```ignore
/// let config = AnalysisConfig::from_json(r#"{ "arrayBounds": "exactWhenUnbound" }"#)?;
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisConfig {
    /// How `(min, max)` array sizes are derived from a member's cardinality.
    pub array_bounds: ArrayBoundPolicy,
    /// Severity of references matching several distinct candidates.
    pub ambiguous_reference_severity: Severity,
    /// Attach same-named classifiers from other documents to linking errors.
    pub related_candidates: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            array_bounds: ArrayBoundPolicy::Declared,
            ambiguous_reference_severity: Severity::Error,
            related_candidates: true,
        }
    }
}

impl AnalysisConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Array size policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArrayBoundPolicy {
    /// `min = lowerBound ?? 0`, `max = upperBound ?? unbounded`.
    #[default]
    Declared,
    /// For members that are not `bound`, a single given bound (zero counts as
    /// absent) fixes both ends; `bound` members behave like `Declared` except
    /// that a zero bound also counts as absent.
    ExactWhenUnbound,
}

impl ArrayBoundPolicy {
    /// Inclusive `(min, max)` element counts.
    pub fn bounds(self, cardinality: &Cardinality) -> (u64, u64) {
        match self {
            ArrayBoundPolicy::Declared => (cardinality.min(), cardinality.max()),
            ArrayBoundPolicy::ExactWhenUnbound => {
                let lower = cardinality.lower.filter(|&n| n != 0);
                let upper = cardinality.upper.filter(|&n| n != 0);
                let (min, max) = if cardinality.bound {
                    (lower, upper)
                } else {
                    (lower.or(upper), upper.or(lower))
                };
                (min.unwrap_or(0), max.unwrap_or(u64::MAX))
            }
        }
    }
}
