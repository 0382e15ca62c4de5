//! Range-sum frequency estimation
//!
//! This module provides a sketch that answers "how many stream values fell in
//! `[l, r]`?" over an ordinal domain `[1, max_value]` using `O(log max_value)`
//! Count-Min lookups per query.
//!
//! # Algorithms
//!
//! - [`RangeSketch`]: Count-Min estimators stacked over an implicit dyadic tree
//!
//! # Example
//!
//! ```
//! use rangecms::range::RangeSketch;
//!
//! let mut sketch = RangeSketch::new(1_000, 0.001, 0.01).unwrap();
//!
//! for latency_ms in [12, 15, 180, 15, 950, 14] {
//!     sketch.add(latency_ms).unwrap();
//! }
//!
//! let fast = sketch.range_query(1, 100).unwrap();
//! assert!(fast >= 4);
//! ```

mod range_sketch;

pub use range_sketch::RangeSketch;
#[cfg(feature = "concurrent")]
pub(crate) use range_sketch::{check_range, level_config};

use crate::config::SketchConfig;
use crate::dyadic;
use crate::error::SketchError;

/// Upper bound on the number of covering intervals for any range in a tree of
/// `height` levels
///
/// A minimal dyadic cover takes at most two intervals per level below the root.
pub fn max_cover_size(height: u32) -> usize {
    (2 * height.saturating_sub(1) as usize).max(1)
}

/// Counter storage in bytes of a range sketch over `[1, max_value]`
pub fn memory_for(max_value: u64, config: &SketchConfig) -> Result<usize, SketchError> {
    let height = dyadic::height_for(max_value)?;
    Ok(config
        .width()
        .saturating_mul(config.depth())
        .saturating_mul(height as usize)
        .saturating_mul(core::mem::size_of::<u64>()))
}

/// Worst-case additive error of a range query after `total_count` additions
///
/// Uses the [`max_cover_size`] of the tree, so it holds for every range.
pub fn worst_case_error(
    max_value: u64,
    config: &SketchConfig,
    total_count: u64,
) -> Result<f64, SketchError> {
    config.validate()?;
    let height = dyadic::height_for(max_value)?;
    Ok(max_cover_size(height) as f64 * config.epsilon * total_count as f64)
}
