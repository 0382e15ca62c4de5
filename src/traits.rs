//! Core traits for the frequency sketches
//!
//! Every sketch implements the base [`Sketch`] trait. Point-frequency estimators
//! add [`FrequencySketch`], sketches over an ordinal domain add
//! [`RangeFrequencySketch`].

use crate::error::SketchError;
use core::fmt::Debug;

#[cfg(feature = "std")]
use std::string::String;

#[cfg(not(feature = "std"))]
use alloc::string::String;

/// Error during sketch merge operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    /// Sketches have incompatible configurations
    IncompatibleConfig { expected: String, found: String },
}

impl core::fmt::Display for MergeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MergeError::IncompatibleConfig { expected, found } => {
                write!(f, "incompatible config: expected {}, found {}", expected, found)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for MergeError {}

/// Error bounds for a sketch estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorBounds {
    /// Lower bound of the estimate
    pub lower: f64,
    /// Point estimate
    pub estimate: f64,
    /// Upper bound of the estimate
    pub upper: f64,
    /// Probability that the true value lies within `[lower, upper]`
    pub confidence: f64,
}

impl ErrorBounds {
    /// Create new error bounds
    pub fn new(lower: f64, estimate: f64, upper: f64, confidence: f64) -> Self {
        Self {
            lower,
            estimate,
            upper,
            confidence,
        }
    }

    /// Check if a value falls within bounds
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    /// Width of the confidence interval
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Relative width (width / estimate)
    pub fn relative_width(&self) -> f64 {
        if self.estimate == 0.0 {
            0.0
        } else {
            self.width() / self.estimate
        }
    }
}

/// Core trait for all streaming sketches
///
/// Sketches only ever grow: there is no way to remove an item or reset
/// counters once they have been added.
pub trait Sketch: Clone + Debug {
    /// The type of item this sketch processes
    type Item: ?Sized;

    /// Add one occurrence of an item
    ///
    /// Returns an error, leaving the sketch untouched, if the item lies outside
    /// the sketch's domain.
    fn update(&mut self, item: &Self::Item) -> Result<(), SketchError>;

    /// Merge another sketch into this one
    ///
    /// Both sketches must have been built with identical dimensions, seeds and
    /// hash family.
    fn merge(&mut self, other: &Self) -> Result<(), MergeError>;

    /// Memory usage in bytes
    fn size_bytes(&self) -> usize;

    /// Total weight added
    fn total_count(&self) -> u64;

    /// Check if sketch is empty
    fn is_empty(&self) -> bool {
        self.total_count() == 0
    }
}

/// Point frequency estimation
pub trait FrequencySketch: Sketch {
    /// Estimate frequency of an item; never below the true frequency
    fn estimate_frequency(&self, item: &Self::Item) -> u64;

    /// Check if frequency exceeds threshold
    fn exceeds_threshold(&self, item: &Self::Item, threshold: u64) -> bool {
        self.estimate_frequency(item) >= threshold
    }
}

/// Range-sum frequency estimation over an ordinal domain `[1, span]`
pub trait RangeFrequencySketch: Sketch<Item = u64> {
    /// Estimate the total frequency of the values in `[lower, upper]`
    fn estimate_range(&self, lower: u64, upper: u64) -> Result<u64, SketchError>;

    /// Estimate the total frequency of the values in `[1, upper]`
    fn estimate_prefix(&self, upper: u64) -> Result<u64, SketchError> {
        self.estimate_range(1, upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_bounds() {
        let bounds = ErrorBounds::new(90.0, 100.0, 110.0, 0.95);

        assert!(bounds.contains(100.0));
        assert!(bounds.contains(90.0));
        assert!(bounds.contains(110.0));
        assert!(!bounds.contains(89.0));
        assert!(!bounds.contains(111.0));

        assert_eq!(bounds.width(), 20.0);
        assert!((bounds.relative_width() - 0.2).abs() < 0.001);
    }

    #[test]
    fn test_merge_error_display() {
        let err = MergeError::IncompatibleConfig {
            expected: "28x5".into(),
            found: "272x7".into(),
        };
        assert_eq!(
            err.to_string(),
            "incompatible config: expected 28x5, found 272x7"
        );
    }
}
