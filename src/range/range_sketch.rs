//! Dyadic range sketch
//!
//! One Count-Min estimator per level of an implicit dyadic tree over
//! `[1, 2^(H-1)]`. Each streamed value is registered once per level, under the
//! coordinate of the interval containing it; a range query sums the estimates
//! of the minimal set of intervals covering the range.

use crate::config::SketchConfig;
use crate::dyadic::{self, DyadicNode};
use crate::error::SketchError;
use crate::frequency::CountMinSketch;
use crate::hash::{self, HashFamily, Xxh3Family};
use crate::traits::{ErrorBounds, MergeError, RangeFrequencySketch, Sketch};

#[cfg(feature = "std")]
use std::vec::Vec;

#[cfg(not(feature = "std"))]
use alloc::{format, vec::Vec};

/// Range-sum frequency sketch over `[1, max_value]`
///
/// The tree has `H = ceil(log2(max_value)) + 1` levels. Level `y` holds
/// intervals of length `2^y`; its estimator sits at index `(H - 1) - y`, so
/// index 0 is the root and index `H - 1` the leaves.
///
/// # Accuracy
///
/// Each estimator answers within `epsilon * N` of the truth with probability
/// `1 - delta`. A range query sums `k <= 2 (H - 1)` estimator reads, so its
/// additive error is at most `k * epsilon * N` and the union bound gives a
/// failure probability of at most `k * delta`. Neither parameter is adjusted
/// to compensate; [`RangeSketch::range_error_bounds`] reports the bound that
/// applies to a given range.
///
/// # Example
///
/// ```
/// use rangecms::range::RangeSketch;
///
/// let mut sketch = RangeSketch::new(16, 0.01, 0.01).unwrap();
/// assert_eq!(sketch.height(), 5);
///
/// sketch.add(5).unwrap();
/// sketch.add(12).unwrap();
///
/// assert!(sketch.range_query(1, 16).unwrap() >= 2);
/// assert!(sketch.range_query(5, 5).unwrap() >= 1);
/// assert!(sketch.range_query(9, 16).unwrap() >= 1);
/// assert!(sketch.add(17).is_err());
/// ```
#[derive(Clone, Debug)]
pub struct RangeSketch<H = Xxh3Family> {
    /// Largest value accepted by `add`
    max_value: u64,
    /// Number of tree levels (H)
    height: u32,
    /// Base seed of the per-level seed spaces
    seed: u64,
    /// One estimator per level, root first
    estimators: Vec<CountMinSketch<H>>,
    /// Total weight added
    total_count: u64,
}

impl RangeSketch<Xxh3Family> {
    /// Create a range sketch for values in `[1, max_value]`
    ///
    /// # Arguments
    ///
    /// * `max_value` - Largest value the stream may contain, `>= 1`
    /// * `epsilon` - Per-estimator overcount as a fraction of total, in `(0, 1]`
    /// * `delta` - Per-estimator failure probability, in `(0, 1]`
    pub fn new(max_value: u64, epsilon: f64, delta: f64) -> Result<Self, SketchError> {
        Self::with_config(max_value, &SketchConfig::new(epsilon, delta))
    }

    /// Create a range sketch from a configuration
    pub fn with_config(max_value: u64, config: &SketchConfig) -> Result<Self, SketchError> {
        Self::with_config_and_hasher(max_value, config, Xxh3Family)
    }
}

impl<H: HashFamily> RangeSketch<H> {
    /// Create a range sketch from a configuration and a hash family
    ///
    /// The estimator at level index `h` uses the seed
    /// [`estimator_seed(config.seed, h)`](hash::estimator_seed), so no two
    /// levels share row seeds.
    pub fn with_config_and_hasher(
        max_value: u64,
        config: &SketchConfig,
        hasher: H,
    ) -> Result<Self, SketchError> {
        config.validate()?;
        let height = dyadic::height_for(max_value)?;

        let (width, depth) = (config.width(), config.depth());
        crate::frequency::check_dimensions(width, depth)?;
        let cells = width
            .saturating_mul(depth)
            .saturating_mul(height as usize);
        config.check_memory(cells, core::mem::size_of::<u64>())?;

        tracing::debug!(
            max_value,
            height,
            width,
            depth,
            seed = config.seed,
            "creating range sketch"
        );

        let estimators = (0..height as usize)
            .map(|level| {
                CountMinSketch::from_parts(width, depth, &level_config(config, level), hasher.clone())
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            max_value,
            height,
            seed: config.seed,
            estimators,
            total_count: 0,
        })
    }

    /// Assemble a sketch from per-level estimators, root first
    #[cfg(feature = "concurrent")]
    pub(crate) fn from_estimators(
        max_value: u64,
        seed: u64,
        estimators: Vec<CountMinSketch<H>>,
        total_count: u64,
    ) -> Self {
        Self {
            max_value,
            height: estimators.len() as u32,
            seed,
            estimators,
            total_count,
        }
    }

    /// Largest value accepted by [`add`](Self::add)
    pub fn max_value(&self) -> u64 {
        self.max_value
    }

    /// Number of tree levels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Last value of the root interval, `2^(H-1)`; queries may range up to it
    pub fn span(&self) -> u64 {
        1u64 << (self.height - 1)
    }

    /// Base seed of the per-level seed spaces
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Per-level estimators, root first
    pub fn estimators(&self) -> &[CountMinSketch<H>] {
        &self.estimators
    }

    /// Root node of the implicit tree
    pub fn root(&self) -> DyadicNode {
        DyadicNode::root(self.height)
    }

    /// Add one occurrence of `value`
    pub fn add(&mut self, value: u64) -> Result<(), SketchError> {
        self.add_count(value, 1)
    }

    /// Add `count` occurrences of `value`
    ///
    /// Fails without touching any estimator if `value` is outside
    /// `[1, max_value]`.
    pub fn add_count(&mut self, value: u64, count: u64) -> Result<(), SketchError> {
        self.check_value(value)?;

        for (estimator, node) in self
            .estimators
            .iter_mut()
            .zip(dyadic::path(self.height, value))
        {
            estimator.add_count(&node.x, count);
        }
        self.total_count = self.total_count.saturating_add(count);

        Ok(())
    }

    /// Estimate the total frequency of the values in `[l, r]`
    ///
    /// `1 <= l <= r <= span()`. Never below the true sum.
    pub fn range_query(&self, l: u64, r: u64) -> Result<u64, SketchError> {
        self.check_range(l, r)?;

        let (estimate, nodes) = self.sum_cover(l, r);
        tracing::trace!(l, r, nodes, estimate, "range query");
        Ok(estimate)
    }

    /// Estimate the total frequency of the values in `[1, r]`
    pub fn prefix_query(&self, r: u64) -> Result<u64, SketchError> {
        self.range_query(1, r)
    }

    /// Estimate the frequency of a single value
    pub fn frequency(&self, value: u64) -> Result<u64, SketchError> {
        self.check_range(value, value)?;
        Ok(self.node_count(DyadicNode { x: value, y: 0 }))
    }

    /// Minimal set of dyadic intervals whose union is `[l, r]`, left to right
    pub fn cover(&self, l: u64, r: u64) -> Result<Vec<DyadicNode>, SketchError> {
        self.check_range(l, r)?;

        let mut nodes = Vec::new();
        dyadic::for_each_cover_node(self.root(), l, r, &mut |node| nodes.push(node));
        Ok(nodes)
    }

    /// Range estimate together with its accumulated error bound
    ///
    /// With `k` covering nodes, the true sum lies in
    /// `[estimate - k * epsilon * N, estimate]` with probability at least
    /// `1 - k * delta`.
    pub fn range_error_bounds(&self, l: u64, r: u64) -> Result<ErrorBounds, SketchError> {
        self.check_range(l, r)?;

        let (estimate, nodes) = self.sum_cover(l, r);
        let estimator = &self.estimators[0];
        let slack = nodes as f64 * estimator.epsilon() * self.total_count as f64;
        let estimate = estimate as f64;
        let confidence = (1.0 - nodes as f64 * estimator.delta()).max(0.0);

        Ok(ErrorBounds::new(
            (estimate - slack).max(0.0),
            estimate,
            estimate,
            confidence,
        ))
    }

    /// Sum of the estimates over the minimal cover of `[l, r]`, and its size
    fn sum_cover(&self, l: u64, r: u64) -> (u64, usize) {
        let mut estimate = 0u64;
        let mut nodes = 0usize;
        dyadic::for_each_cover_node(self.root(), l, r, &mut |node| {
            estimate = estimate.saturating_add(self.node_count(node));
            nodes += 1;
        });
        (estimate, nodes)
    }

    /// Estimator answering for nodes at level `y`
    #[inline]
    fn estimator_for(&self, y: u32) -> &CountMinSketch<H> {
        &self.estimators[(self.height - 1 - y) as usize]
    }

    #[inline]
    fn node_count(&self, node: DyadicNode) -> u64 {
        self.estimator_for(node.y).count(&node.x)
    }

    fn check_value(&self, value: u64) -> Result<(), SketchError> {
        if value == 0 || value > self.max_value {
            return Err(SketchError::ValueOutOfDomain {
                value,
                max_value: self.max_value,
            });
        }
        Ok(())
    }

    fn check_range(&self, l: u64, r: u64) -> Result<(), SketchError> {
        check_range(l, r, self.span())
    }
}

/// Configuration of the estimator at level index `level`
///
/// Only the seed changes; the memory ceiling is checked once for the whole tree.
pub(crate) fn level_config(config: &SketchConfig, level: usize) -> SketchConfig {
    SketchConfig {
        seed: hash::estimator_seed(config.seed, level),
        memory_limit: None,
        ..*config
    }
}

/// Validate `1 <= l <= r <= span`
pub(crate) fn check_range(l: u64, r: u64, span: u64) -> Result<(), SketchError> {
    if l == 0 || l > r || r > span {
        return Err(SketchError::InvalidRange {
            lower: l,
            upper: r,
            span,
        });
    }
    Ok(())
}

impl<H: HashFamily> Sketch for RangeSketch<H> {
    type Item = u64;

    fn update(&mut self, item: &u64) -> Result<(), SketchError> {
        self.add(*item)
    }

    fn merge(&mut self, other: &Self) -> Result<(), MergeError> {
        let compatible = self.max_value == other.max_value
            && self.height == other.height
            && self
                .estimators
                .iter()
                .zip(&other.estimators)
                .all(|(ours, theirs)| ours.is_compatible(theirs));
        if !compatible {
            let first = &self.estimators[0];
            let theirs = &other.estimators[0];
            return Err(MergeError::IncompatibleConfig {
                expected: format!(
                    "max_value {} {}x{} seed {}",
                    self.max_value,
                    first.width(),
                    first.depth(),
                    self.seed
                ),
                found: format!(
                    "max_value {} {}x{} seed {}",
                    other.max_value,
                    theirs.width(),
                    theirs.depth(),
                    other.seed
                ),
            });
        }

        for (ours, theirs) in self.estimators.iter_mut().zip(&other.estimators) {
            ours.merge(theirs)?;
        }
        self.total_count = self.total_count.saturating_add(other.total_count);

        Ok(())
    }

    fn size_bytes(&self) -> usize {
        core::mem::size_of::<Self>()
            + self
                .estimators
                .iter()
                .map(|estimator| estimator.size_bytes())
                .sum::<usize>()
    }

    fn total_count(&self) -> u64 {
        self.total_count
    }
}

impl<H: HashFamily> RangeFrequencySketch for RangeSketch<H> {
    fn estimate_range(&self, lower: u64, upper: u64) -> Result<u64, SketchError> {
        self.range_query(lower, upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use core::hash::{Hash, Hasher};

    /// Hashes integer keys to themselves, so distinct coordinates never
    /// collide while the row width exceeds the domain
    #[derive(Clone, Debug, PartialEq)]
    struct IdentityFamily;

    struct Capture(u64);

    impl Hasher for Capture {
        fn finish(&self) -> u64 {
            self.0
        }

        fn write(&mut self, bytes: &[u8]) {
            for &b in bytes {
                self.0 = (self.0 << 8) | b as u64;
            }
        }

        fn write_u64(&mut self, value: u64) {
            self.0 = value;
        }
    }

    impl HashFamily for IdentityFamily {
        fn hash_one<K: Hash + ?Sized>(&self, _seed: u64, key: &K) -> u64 {
            let mut capture = Capture(0);
            key.hash(&mut capture);
            capture.0
        }
    }

    fn exact_sketch(max_value: u64) -> RangeSketch<IdentityFamily> {
        // width ceil(e / 0.01) = 272 exceeds every domain used below
        RangeSketch::with_config_and_hasher(max_value, &SketchConfig::new(0.01, 0.1), IdentityFamily)
            .unwrap()
    }

    #[test]
    fn test_single_value_scenario() {
        let mut sketch = RangeSketch::new(16, 0.001, 0.001).unwrap();
        assert_eq!(sketch.height(), 5);
        assert_eq!(sketch.span(), 16);
        assert_eq!(dyadic::dyadic_interval(1, 4).unwrap(), (1, 16));

        sketch.add(5).unwrap();

        assert!(sketch.range_query(1, 16).unwrap() >= 1);
        assert!(sketch.range_query(5, 5).unwrap() >= 1);
        assert_eq!(sketch.range_query(1, 4).unwrap(), 0);
        assert_eq!(sketch.range_query(6, 16).unwrap(), 0);
        assert_eq!(sketch.frequency(5).unwrap(), 1);
    }

    #[test]
    fn test_exact_counts_without_collisions() {
        let mut sketch = exact_sketch(100);
        let mut truth = vec![0u64; 129];
        for i in 0..2000u64 {
            let value = (i * 37) % 100 + 1;
            sketch.add(value).unwrap();
            truth[value as usize] += 1;
        }

        for l in (1..=128u64).step_by(7) {
            for r in (l..=128).step_by(5) {
                let expected: u64 = truth[l as usize..=r as usize].iter().sum();
                assert_eq!(sketch.range_query(l, r).unwrap(), expected, "[{}, {}]", l, r);
            }
        }
        assert_eq!(sketch.range_query(1, 128).unwrap(), 2000);
    }

    #[test]
    fn test_never_undercounts() {
        let mut sketch = RangeSketch::new(1000, 0.05, 0.05).unwrap();
        let mut truth = vec![0u64; 1025];
        for i in 0..5000u64 {
            let value = (i * i + 7 * i) % 1000 + 1;
            sketch.add(value).unwrap();
            truth[value as usize] += 1;
        }

        for (l, r) in [(1, 1024), (1, 1), (17, 301), (500, 999), (1000, 1024), (3, 4)] {
            let expected: u64 = truth[l as usize..=r as usize].iter().sum();
            assert!(sketch.range_query(l, r).unwrap() >= expected);
        }
    }

    #[test]
    fn test_weighted_add() {
        let mut sketch = exact_sketch(16);
        sketch.add_count(3, 10).unwrap();
        sketch.add_count(14, 4).unwrap();

        assert_eq!(sketch.range_query(1, 8).unwrap(), 10);
        assert_eq!(sketch.range_query(9, 16).unwrap(), 4);
        assert_eq!(sketch.prefix_query(16).unwrap(), 14);
        assert_eq!(sketch.total_count(), 14);
    }

    #[test]
    fn test_domain_errors_leave_sketch_untouched() {
        let mut sketch = RangeSketch::new(10, 0.01, 0.01).unwrap();
        assert_eq!(sketch.span(), 16);

        for value in [0, 11, u64::MAX] {
            let err = sketch.add(value).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Domain);
        }
        assert!(sketch.is_empty());
        assert!(sketch
            .estimators()
            .iter()
            .all(|estimator| estimator.total_count() == 0));

        for (l, r) in [(0, 5), (6, 5), (1, 17), (17, 20)] {
            let err = sketch.range_query(l, r).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Domain);
        }
        // values past max_value but inside the root interval are queryable
        assert_eq!(sketch.range_query(11, 16).unwrap(), 0);
    }

    #[test]
    fn test_invalid_construction() {
        assert_eq!(
            RangeSketch::new(0, 0.1, 0.1).unwrap_err().kind(),
            ErrorKind::InvalidParameter
        );
        assert_eq!(
            RangeSketch::new(16, 0.0, 0.1).unwrap_err().kind(),
            ErrorKind::InvalidParameter
        );
        assert_eq!(
            RangeSketch::new(16, 0.1, 1.5).unwrap_err().kind(),
            ErrorKind::InvalidParameter
        );

        // 11 levels of 272 x 5 cells is ~119 KB
        let config = SketchConfig::new(0.01, 0.01).with_memory_limit(100 * 1024);
        assert_eq!(
            RangeSketch::with_config(1000, &config).unwrap_err().kind(),
            ErrorKind::Resource
        );
        let config = SketchConfig::new(0.01, 0.01).with_memory_limit(128 * 1024);
        assert!(RangeSketch::with_config(1000, &config).is_ok());
    }

    #[test]
    fn test_single_value_domain() {
        let mut sketch = RangeSketch::new(1, 0.1, 0.1).unwrap();
        assert_eq!(sketch.height(), 1);
        assert_eq!(sketch.span(), 1);

        sketch.add(1).unwrap();
        sketch.add(1).unwrap();
        assert_eq!(sketch.range_query(1, 1).unwrap(), 2);
        assert!(sketch.add(2).is_err());
    }

    #[test]
    fn test_levels_use_distinct_seeds() {
        let sketch = RangeSketch::new(1 << 20, 0.01, 0.01).unwrap();
        let mut seeds: Vec<u64> = sketch.estimators().iter().map(|e| e.seed()).collect();
        seeds.sort_unstable();
        seeds.dedup();
        assert_eq!(seeds.len(), sketch.height() as usize);
    }

    #[test]
    fn test_cover() {
        let sketch = RangeSketch::new(16, 0.1, 0.1).unwrap();
        let intervals: Vec<_> = sketch
            .cover(3, 13)
            .unwrap()
            .iter()
            .map(|node| node.interval())
            .collect();
        assert_eq!(intervals, vec![(3, 4), (5, 8), (9, 12), (13, 13)]);
        assert_eq!(sketch.cover(1, 16).unwrap(), vec![sketch.root()]);
    }

    #[test]
    fn test_cover_outside_root_rejected() {
        let sketch = RangeSketch::new(16, 0.1, 0.1).unwrap();
        for (l, r) in [(20, 30), (16, 17), (0, 4), (9, 3)] {
            let err = sketch.cover(l, r).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Domain);
        }
    }

    #[test]
    fn test_error_bounds() {
        let mut sketch = RangeSketch::new(16, 0.1, 0.01).unwrap();
        for value in 1..=16 {
            sketch.add(value).unwrap();
        }

        let bounds = sketch.range_error_bounds(2, 15).unwrap();
        assert_eq!(bounds.estimate, sketch.range_query(2, 15).unwrap() as f64);
        assert_eq!(bounds.upper, bounds.estimate);
        assert!(bounds.contains(14.0));
        // six covering nodes, each within e/28 * 16 of the truth
        let slack = 6.0 * core::f64::consts::E / 28.0 * 16.0;
        assert!((bounds.estimate - bounds.lower - slack).abs() < 1e-9 || bounds.lower == 0.0);
        assert!(bounds.confidence < 1.0 && bounds.confidence > 0.9);
    }

    #[test]
    fn test_merge() {
        let mut a = exact_sketch(64);
        let mut b = exact_sketch(64);
        a.add(3).unwrap();
        b.add(40).unwrap();
        b.add(41).unwrap();

        a.merge(&b).unwrap();
        assert_eq!(a.total_count(), 3);
        assert_eq!(a.range_query(1, 32).unwrap(), 1);
        assert_eq!(a.range_query(33, 64).unwrap(), 2);

        let mut c = RangeSketch::new(64, 0.01, 0.1).unwrap();
        let d = RangeSketch::new(128, 0.01, 0.1).unwrap();
        assert!(c.merge(&d).is_err());

        let e = RangeSketch::with_config(64, &SketchConfig::new(0.01, 0.1).with_seed(5)).unwrap();
        assert!(c.merge(&e).is_err());
    }

    #[test]
    fn test_trait_surface() {
        let mut sketch = exact_sketch(32);
        sketch.update(&7).unwrap();
        sketch.update(&9).unwrap();
        assert!(sketch.update(&33).is_err());

        assert_eq!(sketch.estimate_range(1, 8).unwrap(), 1);
        assert_eq!(sketch.estimate_prefix(9).unwrap(), 2);
        assert!(sketch.size_bytes() > 6 * 272 * 3 * 8);
    }
}
