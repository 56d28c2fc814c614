//! Structural statistics for the B+ tree.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for restructuring work done by the tree.
///
/// All fields are atomic so readers can sample them without taking the
/// tree lock. Every counter is bumped while the exclusive tree lock is
/// held, so `Ordering::Relaxed` is enough: we only need atomicity.
///
/// # Example
/// ```
/// use bptree::TreeStats;
/// use std::sync::atomic::Ordering;
///
/// let stats = TreeStats::new();
/// stats.leaf_splits.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(stats.snapshot().splits(), 1);
/// ```
#[derive(Debug)]
pub struct TreeStats {
    /// Leaves split into two on the way down during insert.
    pub leaf_splits: AtomicU64,

    /// Internal nodes split into two on the way down during insert.
    pub internal_splits: AtomicU64,

    /// Times a full root was wrapped in a new root (height + 1).
    pub root_splits: AtomicU64,

    /// Keys rotated in from a sibling during delete.
    pub borrows: AtomicU64,

    /// Sibling pairs merged during delete.
    pub merges: AtomicU64,

    /// Times an empty internal root was replaced by its child (height - 1).
    pub root_collapses: AtomicU64,
}

impl TreeStats {
    /// Create a new stats tracker with all counters at zero.
    pub fn new() -> Self {
        Self {
            leaf_splits: AtomicU64::new(0),
            internal_splits: AtomicU64::new(0),
            root_splits: AtomicU64::new(0),
            borrows: AtomicU64::new(0),
            merges: AtomicU64::new(0),
            root_collapses: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            leaf_splits: self.leaf_splits.load(Ordering::Relaxed),
            internal_splits: self.internal_splits.load(Ordering::Relaxed),
            root_splits: self.root_splits.load(Ordering::Relaxed),
            borrows: self.borrows.load(Ordering::Relaxed),
            merges: self.merges.load(Ordering::Relaxed),
            root_collapses: self.root_collapses.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.leaf_splits.store(0, Ordering::Relaxed);
        self.internal_splits.store(0, Ordering::Relaxed);
        self.root_splits.store(0, Ordering::Relaxed);
        self.borrows.store(0, Ordering::Relaxed);
        self.merges.store(0, Ordering::Relaxed);
        self.root_collapses.store(0, Ordering::Relaxed);
    }
}

impl Default for TreeStats {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time copy of [`TreeStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub leaf_splits: u64,
    pub internal_splits: u64,
    pub root_splits: u64,
    pub borrows: u64,
    pub merges: u64,
    pub root_collapses: u64,
}

impl StatsSnapshot {
    /// Total node splits (leaf and internal).
    pub fn splits(&self) -> u64 {
        self.leaf_splits + self.internal_splits
    }

    /// Net change in height since the counters were last reset.
    pub fn height_delta(&self) -> i64 {
        self.root_splits as i64 - self.root_collapses as i64
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ splits: {} (leaf {}, internal {}), root_splits: {}, borrows: {}, merges: {}, root_collapses: {} }}",
            self.splits(),
            self.leaf_splits,
            self.internal_splits,
            self.root_splits,
            self.borrows,
            self.merges,
            self.root_collapses
        )
    }
}
