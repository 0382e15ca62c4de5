//! Thread-safe sketch variants
//!
//! The sequential sketches take `&mut self` to add. The types here take
//! `&self` everywhere, storing counters in `AtomicU64` cells so that concurrent
//! increments are never lost and estimates never undercount.
//!
//! - [`AtomicCountMinSketch`]: lock-free Count-Min cells
//! - [`ConcurrentRangeSketch`]: one atomic estimator per tree level, with
//!   [`add_batch_parallel`](ConcurrentRangeSketch::add_batch_parallel)
//!   applying each level's increments on its own worker thread
//!
//! Both can be frozen into their sequential counterparts with `snapshot()`.

mod atomic_count_min;
mod concurrent_range;

pub use atomic_count_min::AtomicCountMinSketch;
pub(crate) use atomic_count_min::saturating_add;
pub use concurrent_range::ConcurrentRangeSketch;
