//! Lock-free Count-Min Sketch
//!
//! Same dimensions, seeds and estimates as
//! [`CountMinSketch`](crate::frequency::CountMinSketch), but every cell is an
//! `AtomicU64` so `add` takes `&self` and can be called from many threads.

use crate::config::SketchConfig;
use crate::error::SketchError;
use crate::frequency::{self, CountMinSketch};
use crate::hash::{self, HashFamily, Xxh3Family};
use core::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe Count-Min Sketch
///
/// Increments are atomic read-modify-writes that saturate at `u64::MAX`, so
/// concurrent updates are never lost and each cell stays at or above the true frequency of every key mapped to it.
/// Readers racing with writers may observe some rows of an in-flight `add`
/// and not others; the minimum is still never below the frequency of adds
/// that completed before the read started.
///
/// # Example
///
/// ```
/// use rangecms::concurrent::AtomicCountMinSketch;
/// use std::sync::Arc;
/// use std::thread;
///
/// let cms = Arc::new(AtomicCountMinSketch::new(0.01, 0.01).unwrap());
///
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let cms = Arc::clone(&cms);
///         thread::spawn(move || {
///             for _ in 0..1000 {
///                 cms.add("shared");
///             }
///         })
///     })
///     .collect();
/// for handle in handles {
///     handle.join().unwrap();
/// }
///
/// assert!(cms.count("shared") >= 4000);
/// ```
#[derive(Debug)]
pub struct AtomicCountMinSketch<H = Xxh3Family> {
    width: usize,
    depth: usize,
    /// Row-major cells, `depth * width`
    table: Vec<AtomicU64>,
    total_count: AtomicU64,
    seed: u64,
    seeds: Vec<u64>,
    hasher: H,
}

impl AtomicCountMinSketch<Xxh3Family> {
    /// Create a new sketch with the given error parameters
    pub fn new(epsilon: f64, delta: f64) -> Result<Self, SketchError> {
        Self::with_config(&SketchConfig::new(epsilon, delta))
    }

    /// Create a sketch from a configuration
    pub fn with_config(config: &SketchConfig) -> Result<Self, SketchError> {
        Self::with_config_and_hasher(config, Xxh3Family)
    }
}

impl<H: HashFamily> AtomicCountMinSketch<H> {
    /// Create a sketch from a configuration and a hash family
    pub fn with_config_and_hasher(config: &SketchConfig, hasher: H) -> Result<Self, SketchError> {
        config.validate()?;
        Self::from_parts(config.width(), config.depth(), config, hasher)
    }

    pub(crate) fn from_parts(
        width: usize,
        depth: usize,
        config: &SketchConfig,
        hasher: H,
    ) -> Result<Self, SketchError> {
        frequency::check_dimensions(width, depth)?;
        let cells = width.saturating_mul(depth);
        config.check_memory(cells, core::mem::size_of::<AtomicU64>())?;

        tracing::debug!(width, depth, seed = config.seed, "creating atomic count-min sketch");

        Ok(Self {
            width,
            depth,
            table: (0..cells).map(|_| AtomicU64::new(0)).collect(),
            total_count: AtomicU64::new(0),
            seed: config.seed,
            seeds: hash::row_seeds(config.seed, depth),
            hasher,
        })
    }

    /// Get the width of the sketch
    pub fn width(&self) -> usize {
        self.width
    }

    /// Get the depth of the sketch
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Seed the row seeds were derived from
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Total weight added so far
    pub fn total_count(&self) -> u64 {
        self.total_count.load(Ordering::Relaxed)
    }

    /// Add one occurrence of `key`
    pub fn add<K: Hash + ?Sized>(&self, key: &K) {
        self.add_count(key, 1);
    }

    /// Add `count` occurrences of `key`
    pub fn add_count<K: Hash + ?Sized>(&self, key: &K, count: u64) {
        for row in 0..self.depth {
            saturating_add(self.cell(row, key), count);
        }
        saturating_add(&self.total_count, count);
    }

    /// Estimate the frequency of `key`
    pub fn count<K: Hash + ?Sized>(&self, key: &K) -> u64 {
        (0..self.depth)
            .map(|row| self.cell(row, key).load(Ordering::Relaxed))
            .min()
            .unwrap_or(0)
    }

    /// Copy the current counters into a plain [`CountMinSketch`]
    pub fn snapshot(&self) -> CountMinSketch<H> {
        let cells = self
            .table
            .iter()
            .map(|cell| cell.load(Ordering::Relaxed))
            .collect::<Vec<_>>();
        CountMinSketch::from_counters(
            self.width,
            self.depth,
            self.seed,
            self.hasher.clone(),
            &cells,
            self.total_count(),
        )
    }

    #[inline]
    fn cell<K: Hash + ?Sized>(&self, row: usize, key: &K) -> &AtomicU64 {
        let col = frequency::column(&self.hasher, self.seeds[row], key, self.width);
        &self.table[row * self.width + col]
    }
}

/// Add `count` to `cell`, pinning at `u64::MAX` instead of wrapping
#[inline]
pub(crate) fn saturating_add(cell: &AtomicU64, count: u64) {
    // the closure never returns None, so the update always succeeds
    let _ = cell.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
        Some(current.saturating_add(count))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Sketch;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_matches_sequential_sketch() {
        let atomic = AtomicCountMinSketch::new(0.01, 0.01).unwrap();
        let mut plain = CountMinSketch::new(0.01, 0.01).unwrap();

        for i in 0..5000u64 {
            atomic.add(&(i % 300));
            plain.add(&(i % 300));
        }

        for key in 0..300u64 {
            assert_eq!(atomic.count(&key), plain.count(&key));
        }
        assert_eq!(atomic.total_count(), plain.total_count());
    }

    #[test]
    fn test_concurrent_adds_are_not_lost() {
        let cms = Arc::new(AtomicCountMinSketch::new(0.01, 0.01).unwrap());

        let handles: Vec<_> = (0..8u64)
            .map(|t| {
                let cms = Arc::clone(&cms);
                thread::spawn(move || {
                    for i in 0..2000u64 {
                        cms.add(&(i % 50));
                        cms.add(&(1000 + t));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cms.total_count(), 8 * 4000);
        for key in 0..50u64 {
            assert!(cms.count(&key) >= 8 * 40);
        }
        for t in 0..8u64 {
            assert!(cms.count(&(1000 + t)) >= 2000);
        }
    }

    #[test]
    fn test_snapshot() {
        let atomic = AtomicCountMinSketch::new(0.05, 0.05).unwrap();
        atomic.add_count("a", 7);
        atomic.add_count("b", 3);

        let snapshot = atomic.snapshot();
        assert_eq!(snapshot.count("a"), atomic.count("a"));
        assert_eq!(snapshot.count("b"), atomic.count("b"));
        assert_eq!(snapshot.total_count(), 10);

        // snapshots hash identically to sketches built with the same config
        let mut plain = CountMinSketch::new(0.05, 0.05).unwrap();
        plain.add_count("a", 1);
        plain.merge(&snapshot).unwrap();
        assert!(plain.count("a") >= 8);
    }

    #[test]
    fn test_weighted_adds_saturate() {
        let atomic = AtomicCountMinSketch::new(0.05, 0.05).unwrap();
        let mut plain = CountMinSketch::new(0.05, 0.05).unwrap();

        atomic.add_count("k", u64::MAX);
        atomic.add("k");
        plain.add_count("k", u64::MAX);
        plain.add("k");

        assert_eq!(atomic.count("k"), u64::MAX);
        assert_eq!(atomic.total_count(), u64::MAX);
        assert_eq!(atomic.count("k"), plain.count("k"));
        assert_eq!(atomic.snapshot().count("k"), u64::MAX);
    }
}
