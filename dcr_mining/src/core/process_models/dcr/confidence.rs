use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Threshold used if none is configured explicitly
pub const DEFAULT_THRESHOLD: f64 = 0.5;

///
/// Errors when constructing a [`Threshold`]
///
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ThresholdError {
    /// The value is not inside `[0, 1]` (or is NaN)
    #[error("Threshold must be within [0, 1], got {0}")]
    OutOfRange(f64),
}

///
/// Cutoff separating "relation holds" from "relation does not hold" in [`Confidence`] space
///
/// Always passed explicitly: a [`DcrGraph`](super::dcr_graph_struct::DcrGraph) stores the threshold
/// it was built with and all copies and compiled views read it from there.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Threshold(f64);

impl Threshold {
    /// Create a new [`Threshold`], which must lie within `[0, 1]`
    pub fn new(value: f64) -> Result<Self, ThresholdError> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ThresholdError::OutOfRange(value))
        }
    }

    /// Get the raw threshold value
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self(DEFAULT_THRESHOLD)
    }
}

impl TryFrom<f64> for Threshold {
    type Error = ThresholdError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Threshold> for f64 {
    fn from(value: Threshold) -> Self {
        value.0
    }
}

///
/// Statistical evidence backing a learned boolean: number of invocations and of violations
///
/// Counters only ever grow. Every mutating operation reports whether the update made the
/// violation ratio cross the threshold (in either direction).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
pub struct Confidence {
    /// How often the relation/state was put to the test
    pub invocations: u32,
    /// How often the relation/state was contradicted
    pub violations: u32,
}

impl Confidence {
    /// Create a [`Confidence`] with the given counters
    pub fn new(invocations: u32, violations: u32) -> Self {
        Self {
            invocations,
            violations,
        }
    }

    /// Violation ratio (`0.0` if there were no invocations yet)
    pub fn ratio(&self) -> f64 {
        if self.invocations == 0 {
            return 0.0;
        }
        self.violations as f64 / self.invocations as f64
    }

    /// Whether the violation ratio is strictly above the threshold
    pub fn is_above_threshold(&self, threshold: Threshold) -> bool {
        self.ratio() > threshold.value()
    }

    /// Increment invocations
    ///
    /// Returns whether the ratio crossed the threshold
    pub fn incr_invocations(&mut self, threshold: Threshold) -> bool {
        let old = self.ratio();
        self.invocations += 1;
        passed_threshold(old, self.ratio(), threshold)
    }

    /// Increment violations
    ///
    /// Returns whether the ratio crossed the threshold
    pub fn incr_violations(&mut self, threshold: Threshold) -> bool {
        let old = self.ratio();
        self.violations += 1;
        passed_threshold(old, self.ratio(), threshold)
    }

    /// Increment invocations and, if `violation_occurred`, also violations
    ///
    /// Returns whether the ratio crossed the threshold
    pub fn increment(&mut self, violation_occurred: bool, threshold: Threshold) -> bool {
        let old = self.ratio();
        self.invocations += 1;
        if violation_occurred {
            self.violations += 1;
        }
        passed_threshold(old, self.ratio(), threshold)
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} / {} ({:.2})",
            self.violations,
            self.invocations,
            self.ratio()
        )
    }
}

/// Raised above or fell below the threshold
fn passed_threshold(old: f64, new: f64, threshold: Threshold) -> bool {
    let t = threshold.value();
    (old <= t && t < new) || (new < t && t < old)
}
