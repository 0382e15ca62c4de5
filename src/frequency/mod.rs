//! Frequency estimation
//!
//! This module provides the point-frequency estimator the range sketch is
//! built on.
//!
//! # Algorithms
//!
//! - [`CountMinSketch`]: Classic count-min sketch with optional conservative update
//!
//! # Example
//!
//! ```
//! use rangecms::frequency::CountMinSketch;
//! use rangecms::traits::FrequencySketch;
//!
//! let mut cms = CountMinSketch::new(0.01, 0.001).unwrap(); // 1% error, 0.1% probability
//!
//! cms.add_count(b"item1", 5);
//! cms.add_count(b"item2", 3);
//!
//! let count = cms.estimate_frequency(b"item1");
//! assert!(count >= 5);
//! ```

mod count_min;

pub use count_min::CountMinSketch;
pub(crate) use count_min::check_dimensions;
#[cfg(feature = "concurrent")]
pub(crate) use count_min::column;
