//! Seeded hash families and seed-space derivation
//!
//! A Count-Min sketch needs `depth` hash functions that behave as if drawn
//! independently. They are modelled as one [`HashFamily`] indexed by a 64-bit
//! seed: row `i` of an estimator hashes with its own row seed.
//!
//! # Seed spaces
//!
//! Seeds are derived explicitly so that no two rows share a seed, neither
//! within an estimator nor across the estimators of a range sketch:
//!
//! - estimator `h` of a range sketch with base seed `s` gets
//!   [`estimator_seed(s, h)`](estimator_seed) `= splitmix64(s + h)`
//! - row `i` of an estimator with seed `t` gets
//!   [`row_seed(t, i)`](row_seed) `= splitmix64(t ^ (GOLDEN * (i + 1)))`

use core::fmt::Debug;
use core::hash::{Hash, Hasher};
use xxhash_rust::xxh3::{xxh3_64_with_seed, Xxh3};

#[cfg(feature = "std")]
use std::vec::Vec;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

const GOLDEN: u64 = 0x9e3779b97f4a7c15;

/// A family of seeded hash functions
///
/// Implementations must be deterministic per `(seed, key)` and should behave
/// as independent functions for distinct seeds. Two sketches can only be
/// merged when they hash identically, so families are compared with `PartialEq`.
pub trait HashFamily: Clone + Debug + PartialEq {
    /// Hash `key` with the function selected by `seed`
    fn hash_one<K: Hash + ?Sized>(&self, seed: u64, key: &K) -> u64;
}

/// Default hash family backed by seeded XXH3
///
/// Keys whose `Hash` encoding fits in [`INLINE_KEY_BYTES`] are hashed with a
/// single one-shot `xxh3_64_with_seed` call; longer keys switch to the
/// streaming state. Both paths produce the same digest for the same bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Xxh3Family;

impl HashFamily for Xxh3Family {
    #[inline]
    fn hash_one<K: Hash + ?Sized>(&self, seed: u64, key: &K) -> u64 {
        let mut hasher = KeyBytes::new(seed);
        key.hash(&mut hasher);
        hasher.finish()
    }
}

/// Largest key encoding buffered on the stack before hashing
pub const INLINE_KEY_BYTES: usize = 64;

/// Collects a key's `Hash` encoding for one seeded XXH3 digest
struct KeyBytes {
    seed: u64,
    buf: [u8; INLINE_KEY_BYTES],
    len: usize,
    spill: Option<Xxh3>,
}

impl KeyBytes {
    #[inline]
    fn new(seed: u64) -> Self {
        Self {
            seed,
            buf: [0; INLINE_KEY_BYTES],
            len: 0,
            spill: None,
        }
    }
}

impl Hasher for KeyBytes {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        if let Some(stream) = self.spill.as_mut() {
            stream.update(bytes);
            return;
        }

        let end = self.len + bytes.len();
        if end <= INLINE_KEY_BYTES {
            self.buf[self.len..end].copy_from_slice(bytes);
            self.len = end;
        } else {
            let mut stream = Xxh3::with_seed(self.seed);
            stream.update(&self.buf[..self.len]);
            stream.update(bytes);
            self.spill = Some(stream);
        }
    }

    #[inline]
    fn finish(&self) -> u64 {
        match &self.spill {
            Some(stream) => stream.digest(),
            None => xxh3_64_with_seed(&self.buf[..self.len], self.seed),
        }
    }
}

/// SplitMix64 finalizer
#[inline]
pub fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(GOLDEN);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

/// Seed of the estimator at height index `height` of a range sketch
#[inline]
pub fn estimator_seed(base: u64, height: usize) -> u64 {
    splitmix64(base.wrapping_add(height as u64))
}

/// Seed of row `row` within an estimator seeded with `estimator_seed`
#[inline]
pub fn row_seed(estimator_seed: u64, row: usize) -> u64 {
    splitmix64(estimator_seed ^ GOLDEN.wrapping_mul(row as u64 + 1))
}

/// All row seeds of an estimator
pub fn row_seeds(estimator_seed: u64, depth: usize) -> Vec<u64> {
    (0..depth).map(|row| row_seed(estimator_seed, row)).collect()
}
