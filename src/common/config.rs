//! Configuration for the B+ tree index.

use crate::common::{Error, Result};

/// Default maximum number of keys per node (the tree's order `M`).
pub const DEFAULT_ORDER: usize = 4;

/// Smallest order that keeps every internal node with at least one
/// separator after a split.
///
/// Splitting a full internal node moves one key up and leaves
/// `M / 2` and `M - M / 2 - 1` keys behind; with `M < 3` the right half
/// would be empty.
pub const MIN_ORDER: usize = 3;

/// Tunable parameters of a [`BPlusTree`](crate::BPlusTree).
///
/// # Example
/// ```
/// use bptree::TreeConfig;
///
/// let config = TreeConfig::new(5);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.max_keys(), 5);
/// assert_eq!(config.min_leaf_keys(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeConfig {
    /// Maximum number of keys a node may hold.
    pub order: usize,
}

impl TreeConfig {
    /// Create a config with the given order.
    ///
    /// The order is not checked here; call [`validate`](Self::validate)
    /// or build the tree through `BPlusTree::with_config`.
    #[inline]
    pub fn new(order: usize) -> Self {
        Self { order }
    }

    /// Check that the order is usable.
    ///
    /// # Errors
    /// - `Error::InvalidOrder` if `order < MIN_ORDER`
    pub fn validate(&self) -> Result<()> {
        if self.order < MIN_ORDER {
            return Err(Error::InvalidOrder {
                order: self.order,
                min: MIN_ORDER,
            });
        }
        Ok(())
    }

    /// Maximum key count of any node. A node at this count is full.
    #[inline]
    pub fn max_keys(&self) -> usize {
        self.order
    }

    /// Minimum key count of a non-root leaf.
    #[inline]
    pub fn min_leaf_keys(&self) -> usize {
        self.order / 2
    }

    /// Minimum key count of a non-root internal node.
    ///
    /// Equal to `order / 2` for odd orders. For even orders an internal
    /// split leaves one key fewer on the right, so the floor drops by one.
    #[inline]
    pub fn min_internal_keys(&self) -> usize {
        (self.order - 1) / 2
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ORDER)
    }
}
