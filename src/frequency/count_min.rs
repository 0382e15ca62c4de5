//! Count-Min Sketch frequency estimator
//!
//! The Count-Min Sketch is a probabilistic data structure for estimating
//! the frequency of elements in a data stream.

use crate::config::SketchConfig;
use crate::error::SketchError;
use crate::hash::{self, HashFamily, Xxh3Family};
use crate::traits::{FrequencySketch, MergeError, Sketch};
use core::hash::Hash;

#[cfg(feature = "std")]
use std::{string::String, vec::Vec};

#[cfg(not(feature = "std"))]
use alloc::{format, string::String, vec, vec::Vec};

/// Count-Min Sketch for frequency estimation
///
/// The Count-Min Sketch provides frequency estimates with the following guarantees:
/// - Point query: `actual_count <= estimate <= actual_count + ε * N`
/// - Where ε = e/width and N is the total count
/// - Probability of exceeding the error bound: δ = e^-depth
///
/// Dimensions follow the classic parameterization: `width = ceil(e / epsilon)`
/// and `depth = ceil(ln(1 / delta))`.
///
/// Keys may be any [`Hash`] type. A key must be queried with the same type it
/// was added with, since the hash covers the key's type-level encoding.
///
/// # Example
///
/// ```
/// use rangecms::frequency::CountMinSketch;
///
/// // Create with 1% error rate and 0.1% failure probability
/// let mut cms = CountMinSketch::new(0.01, 0.001).unwrap();
///
/// cms.add_count("apple", 5);
/// cms.add("banana");
/// cms.add_count("apple", 2);
///
/// assert!(cms.count("apple") >= 7);
/// assert!(cms.count("banana") >= 1);
/// ```
#[derive(Clone, Debug)]
pub struct CountMinSketch<H = Xxh3Family> {
    /// Width of each row (m)
    width: usize,
    /// Number of rows (p)
    depth: usize,
    /// Counter table, `depth` rows of `width` cells
    table: Vec<Vec<u64>>,
    /// Total weight of all items
    total_count: u64,
    /// Seed this sketch's row seeds were derived from
    seed: u64,
    /// Per-row hash seeds
    seeds: Vec<u64>,
    hasher: H,
}

impl CountMinSketch<Xxh3Family> {
    /// Create a new Count-Min Sketch with the given error parameters
    ///
    /// # Arguments
    ///
    /// * `epsilon` - Maximum overcount as a fraction of total, in `(0, 1]`
    /// * `delta` - Probability of exceeding the error bound, in `(0, 1]`
    pub fn new(epsilon: f64, delta: f64) -> Result<Self, SketchError> {
        Self::with_config(&SketchConfig::new(epsilon, delta))
    }

    /// Create a Count-Min Sketch whose row seeds derive from `seed`
    pub fn with_seed(epsilon: f64, delta: f64, seed: u64) -> Result<Self, SketchError> {
        Self::with_config(&SketchConfig::new(epsilon, delta).with_seed(seed))
    }

    /// Create a Count-Min Sketch from a configuration
    pub fn with_config(config: &SketchConfig) -> Result<Self, SketchError> {
        Self::with_config_and_hasher(config, Xxh3Family)
    }

    /// Create a Count-Min Sketch with specific dimensions
    ///
    /// # Arguments
    ///
    /// * `width` - Width of each row (larger = lower error)
    /// * `depth` - Number of rows (larger = lower failure probability)
    pub fn with_dimensions(width: usize, depth: usize) -> Result<Self, SketchError> {
        Self::from_parts(width, depth, &SketchConfig::default(), Xxh3Family)
    }
}

impl<H: HashFamily> CountMinSketch<H> {
    /// Create a Count-Min Sketch from a configuration and a hash family
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
        check_dimensions(width, depth)?;
        config.check_memory(width.saturating_mul(depth), core::mem::size_of::<u64>())?;

        tracing::debug!(width, depth, seed = config.seed, "creating count-min sketch");

        Ok(Self {
            width,
            depth,
            table: vec![vec![0u64; width]; depth],
            total_count: 0,
            seed: config.seed,
            seeds: hash::row_seeds(config.seed, depth),
            hasher,
        })
    }

    /// Rebuild a sketch from row-major counters
    #[cfg(feature = "concurrent")]
    pub(crate) fn from_counters(
        width: usize,
        depth: usize,
        seed: u64,
        hasher: H,
        cells: &[u64],
        total_count: u64,
    ) -> Self {
        debug_assert_eq!(cells.len(), width * depth);
        Self {
            width,
            depth,
            table: cells.chunks(width).map(<[u64]>::to_vec).collect(),
            total_count,
            seed,
            seeds: hash::row_seeds(seed, depth),
            hasher,
        }
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

    /// Hash family in use
    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Effective error factor `e / width`
    pub fn epsilon(&self) -> f64 {
        core::f64::consts::E / self.width as f64
    }

    /// Effective failure probability `e^-depth`
    pub fn delta(&self) -> f64 {
        1.0 / crate::math::exp(self.depth as f64)
    }

    /// Add one occurrence of `key`
    pub fn add<K: Hash + ?Sized>(&mut self, key: &K) {
        self.add_count(key, 1);
    }

    /// Add `count` occurrences of `key`
    pub fn add_count<K: Hash + ?Sized>(&mut self, key: &K, count: u64) {
        self.total_count = self.total_count.saturating_add(count);

        for row in 0..self.depth {
            let col = self.column(row, key);
            let cell = &mut self.table[row][col];
            *cell = cell.saturating_add(count);
        }
    }

    /// Add count using conservative update
    ///
    /// Conservative update only raises counters up to the new estimated value,
    /// which reduces over-counting while keeping every cell at or above the
    /// true frequency of each key mapped to it.
    pub fn add_conservative<K: Hash + ?Sized>(&mut self, key: &K, count: u64) {
        self.total_count = self.total_count.saturating_add(count);

        let new_val = self.count(key).saturating_add(count);

        for row in 0..self.depth {
            let col = self.column(row, key);
            let cell = &mut self.table[row][col];
            if *cell < new_val {
                *cell = new_val;
            }
        }
    }

    /// Estimate the frequency of `key`: the minimum of its cells across rows
    pub fn count<K: Hash + ?Sized>(&self, key: &K) -> u64 {
        (0..self.depth)
            .map(|row| self.table[row][self.column(row, key)])
            .min()
            .unwrap_or(0)
    }

    /// Theoretical error bound (epsilon * total_count)
    pub fn error_bound(&self) -> u64 {
        crate::math::ceil(self.epsilon() * self.total_count as f64) as u64
    }

    /// Whether `other` hashes identically and can be merged into this sketch
    pub fn is_compatible(&self, other: &Self) -> bool {
        self.width == other.width
            && self.depth == other.depth
            && self.seeds == other.seeds
            && self.hasher == other.hasher
    }

    #[inline]
    fn column<K: Hash + ?Sized>(&self, row: usize, key: &K) -> usize {
        column(&self.hasher, self.seeds[row], key, self.width)
    }

    fn describe(&self) -> String {
        format!("{}x{} seed {}", self.width, self.depth, self.seed)
    }
}

/// Column of `key` in a row hashed with `seed`
#[inline]
pub(crate) fn column<H: HashFamily, K: Hash + ?Sized>(
    hasher: &H,
    seed: u64,
    key: &K,
    width: usize,
) -> usize {
    (hasher.hash_one(seed, key) % width as u64) as usize
}

pub(crate) fn check_dimensions(width: usize, depth: usize) -> Result<(), SketchError> {
    if width == 0 {
        return Err(SketchError::parameter("width", 0.0, "a positive row width"));
    }
    if depth == 0 {
        return Err(SketchError::parameter("depth", 0.0, "a positive row count"));
    }
    Ok(())
}

impl<H: HashFamily> Sketch for CountMinSketch<H> {
    type Item = [u8];

    fn update(&mut self, item: &[u8]) -> Result<(), SketchError> {
        self.add(item);
        Ok(())
    }

    fn merge(&mut self, other: &Self) -> Result<(), MergeError> {
        if !self.is_compatible(other) {
            return Err(MergeError::IncompatibleConfig {
                expected: self.describe(),
                found: other.describe(),
            });
        }

        for (row, other_row) in self.table.iter_mut().zip(&other.table) {
            for (cell, &other_cell) in row.iter_mut().zip(other_row) {
                *cell = cell.saturating_add(other_cell);
            }
        }

        self.total_count = self.total_count.saturating_add(other.total_count);

        Ok(())
    }

    fn size_bytes(&self) -> usize {
        core::mem::size_of::<Self>()
            + self.depth * self.width * core::mem::size_of::<u64>()
            + self.seeds.len() * core::mem::size_of::<u64>()
    }

    fn total_count(&self) -> u64 {
        self.total_count
    }
}

impl<H: HashFamily> FrequencySketch for CountMinSketch<H> {
    fn estimate_frequency(&self, item: &[u8]) -> u64 {
        self.count(item)
    }
}
