//! # rangecms
//!
//! Range-sum frequency estimation for integer streams.
//!
//! rangecms answers two questions about a stream of values from an ordinal
//! domain `[1, max_value]` that is too large to count exactly: how often did a
//! value occur, and how many values fell in `[l, r]`? Memory is fixed up front
//! by the accuracy parameters and every query costs `O(log max_value)`
//! estimator lookups.
//!
//! ## Features
//!
//! - **Frequency Estimation**: Count-Min Sketch over arbitrary `Hash` keys
//! - **Range Queries**: Count-Min estimators stacked over an implicit dyadic tree
//! - **One-Sided Error**: Estimates never fall below the true count
//! - **Mergeability**: Identically configured sketches can be combined
//! - **Concurrency**: Lock-free variants for shared writers
//!
//! ## Quick Start
//!
//! ```rust
//! use rangecms::prelude::*;
//!
//! // Response sizes in KiB, up to 4096
//! let mut sketch = RangeSketch::new(4096, 0.001, 0.01).unwrap();
//! for size in [12, 640, 3, 18, 2048, 12] {
//!     sketch.add(size).unwrap();
//! }
//!
//! let small = sketch.range_query(1, 64).unwrap();
//! assert!(small >= 4);
//! ```
//!
//! ## Accuracy
//!
//! With `epsilon` and `delta`, each estimator has `ceil(ln(1/delta))` rows of
//! `ceil(e/epsilon)` counters and answers within `epsilon * N` of the truth with
//! probability `1 - delta`. A range query sums up to `2 (H - 1)` estimator
//! reads, so its error bound grows with the size of the range's dyadic cover;
//! see [`RangeSketch::range_error_bounds`](range::RangeSketch::range_error_bounds).
//!
//! ## Feature Flags
//!
//! - `frequency` (default): Count-Min Sketch
//! - `range` (default): dyadic range sketch
//! - `concurrent`: atomic sketches and parallel batch updates (requires `std`)
//! - `full`: Enable everything
//!
//! Platform features:
//! - `std` (default): Standard library support
//! - `serde`: (De)serialize [`SketchConfig`](config::SketchConfig)

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(not(feature = "std"))]
extern crate alloc;

// Core modules always available
pub mod config;
pub mod dyadic;
pub mod error;
pub mod hash;
pub mod traits;

mod math;

#[cfg(feature = "frequency")]
#[cfg_attr(docsrs, doc(cfg(feature = "frequency")))]
pub mod frequency;

#[cfg(feature = "range")]
#[cfg_attr(docsrs, doc(cfg(feature = "range")))]
pub mod range;

#[cfg(feature = "concurrent")]
#[cfg_attr(docsrs, doc(cfg(feature = "concurrent")))]
pub mod concurrent;

pub mod prelude {
    pub use crate::config::SketchConfig;
    pub use crate::dyadic::{dyadic_interval, DyadicNode};
    pub use crate::error::{ErrorKind, SketchError};
    pub use crate::hash::{HashFamily, Xxh3Family};
    pub use crate::traits::*;

    #[cfg(feature = "frequency")]
    pub use crate::frequency::CountMinSketch;

    #[cfg(feature = "range")]
    pub use crate::range::RangeSketch;

    #[cfg(feature = "concurrent")]
    pub use crate::concurrent::{AtomicCountMinSketch, ConcurrentRangeSketch};
}

pub use dyadic::dyadic_interval;
pub use error::SketchError;

#[cfg(feature = "frequency")]
pub use frequency::CountMinSketch;

#[cfg(feature = "range")]
pub use range::RangeSketch;
