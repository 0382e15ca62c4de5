//! Dyadic interval arithmetic
//!
//! A dyadic interval `D(x, y)` is the `x`-th interval (1-indexed) of length
//! `2^y` in the tiling of `[1, ∞)`:
//!
//! ```text
//! D(x, y) = [(x - 1) * 2^y + 1, x * 2^y]
//! ```
//!
//! A tree of height `H` is rooted at `D(1, H - 1) = [1, 2^(H-1)]`. The children
//! of `D(x, y)` are `D(2x - 1, y - 1)` and `D(2x, y - 1)`, which partition it
//! exactly. No node is ever materialized: a [`DyadicNode`] is just the
//! coordinate pair.
//!
//! # Example
//!
//! ```
//! use rangecms::dyadic::{dyadic_interval, DyadicNode};
//!
//! assert_eq!(dyadic_interval(1, 4).unwrap(), (1, 16));
//! assert_eq!(dyadic_interval(2, 5).unwrap(), (33, 64));
//!
//! let node = DyadicNode { x: 2, y: 3 };
//! assert_eq!(node.interval(), (9, 16));
//! assert!(node.contains(12));
//! ```
//!
//! Tree walks (root-to-leaf paths, minimal covers) stay inside the crate and
//! are only reached through validated sketch queries such as
//! [`RangeSketch::cover`](crate::range::RangeSketch::cover).

use crate::error::SketchError;
use crate::math;

/// Largest supported `max_value`; its tree spans exactly `[1, 2^63]`
pub const MAX_DOMAIN: u64 = 1 << 63;

/// Bounds of the dyadic interval `(x, y)`
///
/// Fails with a domain error when `x == 0` or the interval does not fit in
/// `u64`.
pub fn dyadic_interval(x: u64, y: u32) -> Result<(u64, u64), SketchError> {
    let invalid = SketchError::InvalidCoordinate { x, y };
    if x == 0 || y >= u64::BITS {
        return Err(invalid);
    }
    let right = x.checked_mul(1u64 << y).ok_or(invalid)?;
    Ok((right - (1u64 << y) + 1, right))
}

/// Tree height `H = ceil(log2(max_value)) + 1` for a domain `[1, max_value]`
pub fn height_for(max_value: u64) -> Result<u32, SketchError> {
    if max_value == 0 || max_value > MAX_DOMAIN {
        return Err(SketchError::InvalidMaxValue {
            max_value,
            limit: MAX_DOMAIN,
        });
    }
    Ok(math::ceil_log2(max_value) + 1)
}

/// Coordinate of an implicit dyadic tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DyadicNode {
    /// 1-based rank among intervals of length `2^y`
    pub x: u64,
    /// Level: the interval has length `2^y`
    pub y: u32,
}

impl DyadicNode {
    /// Root of a tree with `height` levels
    ///
    /// `height` must be in `1..=64`.
    #[inline]
    pub(crate) fn root(height: u32) -> Self {
        debug_assert!((1..=u64::BITS).contains(&height));
        Self { x: 1, y: height - 1 }
    }

    /// Length of the interval, `2^y`
    #[inline]
    pub fn len(&self) -> u64 {
        1u64 << self.y
    }

    /// Whether this node is a single value
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.y == 0
    }

    /// Inclusive bounds `(left, right)`
    ///
    /// Nodes reached from a validated root never overflow.
    #[inline]
    pub fn interval(&self) -> (u64, u64) {
        let right = self.x << self.y;
        (right - self.len() + 1, right)
    }

    /// Last value of the left half
    #[inline]
    pub fn midpoint(&self) -> u64 {
        let (left, right) = self.interval();
        right - (right - left + 1) / 2
    }

    /// Whether `value` falls inside this interval
    #[inline]
    pub fn contains(&self, value: u64) -> bool {
        let (left, right) = self.interval();
        left <= value && value <= right
    }

    /// Left child `(2x - 1, y - 1)`; must not be called on a leaf
    #[inline]
    pub(crate) fn left_child(&self) -> Self {
        debug_assert!(!self.is_leaf());
        Self {
            x: 2 * self.x - 1,
            y: self.y - 1,
        }
    }

    /// Right child `(2x, y - 1)`; must not be called on a leaf
    #[inline]
    pub(crate) fn right_child(&self) -> Self {
        debug_assert!(!self.is_leaf());
        Self {
            x: 2 * self.x,
            y: self.y - 1,
        }
    }

    /// Child on the path towards `value`
    #[inline]
    pub(crate) fn child_towards(&self, value: u64) -> Self {
        if value <= self.midpoint() {
            self.left_child()
        } else {
            self.right_child()
        }
    }
}

/// Root-to-leaf path of `value` in a tree with `height` levels
///
/// Yields exactly `height` nodes; the `h`-th is the unique interval of length
/// `2^(height - 1 - h)` containing `value`. `value` must lie within the root.
pub(crate) fn path(height: u32, value: u64) -> impl Iterator<Item = DyadicNode> {
    core::iter::successors(Some(DyadicNode::root(height)), move |node| {
        (!node.is_leaf()).then(|| node.child_towards(value))
    })
}

/// Visit the minimal set of dyadic intervals under `node` whose union is `[l, r]`
///
/// `[l, r]` must lie within `node`'s interval. Nodes are visited left to right.
pub(crate) fn for_each_cover_node<F>(node: DyadicNode, l: u64, r: u64, visit: &mut F)
where
    F: FnMut(DyadicNode),
{
    let (min_v, max_v) = node.interval();
    debug_assert!(min_v <= l && l <= r && r <= max_v);

    if l == min_v && r == max_v {
        visit(node);
        return;
    }

    let mid = node.midpoint();
    if r <= mid {
        for_each_cover_node(node.left_child(), l, r, visit);
    } else if l > mid {
        for_each_cover_node(node.right_child(), l, r, visit);
    } else {
        for_each_cover_node(node.left_child(), l, mid, visit);
        for_each_cover_node(node.right_child(), mid + 1, r, visit);
    }
}
