//! Thread-safe dyadic range sketch

use crate::concurrent::{self, AtomicCountMinSketch};
use crate::config::SketchConfig;
use crate::dyadic::{self, DyadicNode};
use crate::error::SketchError;
use crate::hash::{HashFamily, Xxh3Family};
use crate::range::{self, RangeSketch};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

/// Range sketch whose updates and queries all take `&self`
///
/// Levels are [`AtomicCountMinSketch`]es, so any mix of concurrent `add` and
/// `range_query` calls is safe. A query racing with adds sees each level at
/// some point during the race, and never less than the adds that completed
/// before it started.
///
/// Seeds are derived exactly as in [`RangeSketch`]: a [`snapshot`](Self::snapshot)
/// can be merged with a sequential sketch built from the same configuration.
///
/// # Example
///
/// ```
/// use rangecms::concurrent::ConcurrentRangeSketch;
///
/// let sketch = ConcurrentRangeSketch::new(1024, 0.01, 0.01).unwrap();
/// let values: Vec<u64> = (1..=1024).collect();
///
/// sketch.add_batch_parallel(&values).unwrap();
///
/// assert!(sketch.range_query(1, 512).unwrap() >= 512);
/// ```
#[derive(Debug)]
pub struct ConcurrentRangeSketch<H = Xxh3Family> {
    max_value: u64,
    height: u32,
    seed: u64,
    /// One estimator per level, root first
    estimators: Vec<AtomicCountMinSketch<H>>,
    total_count: AtomicU64,
}

impl ConcurrentRangeSketch<Xxh3Family> {
    /// Create a concurrent range sketch for values in `[1, max_value]`
    pub fn new(max_value: u64, epsilon: f64, delta: f64) -> Result<Self, SketchError> {
        Self::with_config(max_value, &SketchConfig::new(epsilon, delta))
    }

    /// Create a concurrent range sketch from a configuration
    pub fn with_config(max_value: u64, config: &SketchConfig) -> Result<Self, SketchError> {
        Self::with_config_and_hasher(max_value, config, Xxh3Family)
    }
}

impl<H: HashFamily + Sync> ConcurrentRangeSketch<H> {
    /// Create a concurrent range sketch from a configuration and a hash family
    pub fn with_config_and_hasher(
        max_value: u64,
        config: &SketchConfig,
        hasher: H,
    ) -> Result<Self, SketchError> {
        config.validate()?;
        let height = dyadic::height_for(max_value)?;

        let (width, depth) = (config.width(), config.depth());
        let cells = width
            .saturating_mul(depth)
            .saturating_mul(height as usize);
        config.check_memory(cells, core::mem::size_of::<AtomicU64>())?;

        tracing::debug!(
            max_value,
            height,
            width,
            depth,
            seed = config.seed,
            "creating concurrent range sketch"
        );

        let estimators = (0..height as usize)
            .map(|level| {
                AtomicCountMinSketch::from_parts(
                    width,
                    depth,
                    &range::level_config(config, level),
                    hasher.clone(),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            max_value,
            height,
            seed: config.seed,
            estimators,
            total_count: AtomicU64::new(0),
        })
    }

    /// Largest value accepted by [`add`](Self::add)
    pub fn max_value(&self) -> u64 {
        self.max_value
    }

    /// Number of tree levels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Last value of the root interval, `2^(H-1)`
    pub fn span(&self) -> u64 {
        1u64 << (self.height - 1)
    }

    /// Total weight added so far
    pub fn total_count(&self) -> u64 {
        self.total_count.load(Ordering::Relaxed)
    }

    /// Add one occurrence of `value`
    pub fn add(&self, value: u64) -> Result<(), SketchError> {
        self.add_count(value, 1)
    }

    /// Add `count` occurrences of `value`
    pub fn add_count(&self, value: u64, count: u64) -> Result<(), SketchError> {
        self.check_value(value)?;

        for (estimator, node) in self.estimators.iter().zip(dyadic::path(self.height, value)) {
            estimator.add_count(&node.x, count);
        }
        concurrent::saturating_add(&self.total_count, count);

        Ok(())
    }

    /// Add a batch of values, one worker thread per level
    ///
    /// The whole batch is validated first; on error nothing is added. Paths
    /// are computed up front, then each level's coordinates are applied by a
    /// scoped thread that is the only writer to that level within this call.
    pub fn add_batch_parallel(&self, values: &[u64]) -> Result<(), SketchError> {
        for &value in values {
            self.check_value(value)?;
        }

        let mut levels: Vec<Vec<u64>> = (0..self.height)
            .map(|_| Vec::with_capacity(values.len()))
            .collect();
        for &value in values {
            for (coordinates, node) in levels.iter_mut().zip(dyadic::path(self.height, value)) {
                coordinates.push(node.x);
            }
        }

        tracing::trace!(
            values = values.len(),
            levels = self.height,
            "dispatching parallel batch"
        );

        thread::scope(|scope| {
            for (estimator, coordinates) in self.estimators.iter().zip(&levels) {
                scope.spawn(move || {
                    for x in coordinates {
                        estimator.add(x);
                    }
                });
            }
        });
        concurrent::saturating_add(&self.total_count, values.len() as u64);

        Ok(())
    }

    /// Estimate the total frequency of the values in `[l, r]`
    pub fn range_query(&self, l: u64, r: u64) -> Result<u64, SketchError> {
        range::check_range(l, r, self.span())?;

        let mut estimate = 0u64;
        let mut nodes = 0usize;
        dyadic::for_each_cover_node(DyadicNode::root(self.height), l, r, &mut |node| {
            let estimator = &self.estimators[(self.height - 1 - node.y) as usize];
            estimate = estimate.saturating_add(estimator.count(&node.x));
            nodes += 1;
        });

        tracing::trace!(l, r, nodes, estimate, "range query");
        Ok(estimate)
    }

    /// Estimate the frequency of a single value
    pub fn frequency(&self, value: u64) -> Result<u64, SketchError> {
        self.range_query(value, value)
    }

    /// Copy the current counters into a sequential [`RangeSketch`]
    pub fn snapshot(&self) -> RangeSketch<H> {
        RangeSketch::from_estimators(
            self.max_value,
            self.seed,
            self.estimators
                .iter()
                .map(AtomicCountMinSketch::snapshot)
                .collect(),
            self.total_count(),
        )
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
}
