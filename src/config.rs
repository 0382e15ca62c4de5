//! Sketch configuration
//!
//! [`SketchConfig`] bundles the accuracy parameters shared by a standalone
//! [`CountMinSketch`](crate::frequency::CountMinSketch) and by every height of a
//! [`RangeSketch`](crate::range::RangeSketch), plus the hash seed and an optional
//! memory ceiling.
//!
//! ```
//! use rangecms::config::SketchConfig;
//!
//! let config = SketchConfig::new(0.01, 0.001)
//!     .with_seed(42)
//!     .with_memory_limit(64 * 1024 * 1024);
//! assert!(config.validate().is_ok());
//! ```

use crate::error::SketchError;
use crate::math;

/// Default additive error factor
pub const DEFAULT_EPSILON: f64 = 0.001;

/// Default failure probability
pub const DEFAULT_DELTA: f64 = 0.01;

/// Accuracy, seeding and resource parameters of a sketch
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SketchConfig {
    /// Additive error as a fraction of the total count, in `(0, 1]`
    pub epsilon: f64,
    /// Probability of exceeding the error bound, in `(0, 1]`
    pub delta: f64,
    /// Base seed of the hash family
    pub seed: u64,
    /// Upper bound on counter storage in bytes, if any
    pub memory_limit: Option<usize>,
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            delta: DEFAULT_DELTA,
            seed: 0,
            memory_limit: None,
        }
    }
}

impl SketchConfig {
    /// Create a configuration with the given error parameters
    pub fn new(epsilon: f64, delta: f64) -> Self {
        Self {
            epsilon,
            delta,
            ..Self::default()
        }
    }

    /// Set the base hash seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Cap counter storage at `bytes`
    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = Some(bytes);
        self
    }

    /// Check that `epsilon` and `delta` lie in `(0, 1]`
    pub fn validate(&self) -> Result<(), SketchError> {
        check_unit_interval("epsilon", self.epsilon)?;
        check_unit_interval("delta", self.delta)
    }

    /// Row width `m = ceil(e / epsilon)`
    pub fn width(&self) -> usize {
        math::ceil(core::f64::consts::E / self.epsilon) as usize
    }

    /// Row count `p = ceil(ln(1 / delta))`, at least one row
    ///
    /// `delta = 1` yields `ln(1) = 0`; a single row is kept so the estimator
    /// can still answer queries.
    pub fn depth(&self) -> usize {
        (math::ceil(math::ln(1.0 / self.delta)) as usize).max(1)
    }

    /// Check `cells` counters of `cell_size` bytes against the memory limit
    ///
    /// Without an explicit limit the ceiling is the largest allocation a
    /// `Vec` can hold.
    pub(crate) fn check_memory(&self, cells: usize, cell_size: usize) -> Result<(), SketchError> {
        let requested = cells.checked_mul(cell_size).unwrap_or(usize::MAX);
        let limit = self.memory_limit.unwrap_or(isize::MAX as usize);
        if requested > limit {
            tracing::warn!(requested, limit, "sketch exceeds memory limit");
            return Err(SketchError::MemoryLimitExceeded { requested, limit });
        }
        Ok(())
    }
}

fn check_unit_interval(name: &'static str, value: f64) -> Result<(), SketchError> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(SketchError::parameter(name, value, "(0, 1]"))
    }
}
