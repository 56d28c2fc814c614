//! The concurrent B+ tree.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::invariants::{self, TreeShape};
use super::node::{Node, NodeRef};
use super::stats::TreeStats;
use crate::common::{Result, TreeConfig};

/// An in-memory B+ tree of ordered keys.
///
/// # Architecture
/// ```text
/// ┌──────────────────────────────────────────────────────┐
/// │                     BPlusTree                        │
/// │  ┌────────────────────────────────────────────────┐  │
/// │  │ state: RwLock<TreeState>   (tree-level lock)   │  │
/// │  │   root: Arc<RwLock<Node>>  len  height         │  │
/// │  └───────────────────────┬────────────────────────┘  │
/// │                          ▼                           │
/// │        nodes, each behind its own RwLock             │
/// │  ┌──────────────┐  ┌──────────────┐                  │
/// │  │   config     │  │    stats     │                  │
/// │  │ TreeConfig   │  │  TreeStats   │                  │
/// │  └──────────────┘  └──────────────┘                  │
/// └──────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// - `state`: `RwLock`. `insert`/`delete` hold it exclusively for the whole
///   operation, `search` holds it shared. Mutations are fully serialized.
/// - nodes: `RwLock` each. Descent is hand-over-hand: the child's guard is
///   taken before the parent's is released, and siblings are locked left
///   to right. Under the tree lock these never contend; they are what a
///   narrower tree lock would rely on.
/// - `stats`: no lock, atomic counters.
///
/// Restructuring is eager and single-pass: insert splits full children
/// before stepping into them, delete refills minimal children before
/// stepping into them. Nothing is fixed up on the way back.
///
/// # Example
/// ```
/// use bptree::BPlusTree;
///
/// let tree = BPlusTree::new();
/// for key in [10, 20, 5, 6, 12] {
///     tree.insert(key);
/// }
/// assert!(tree.search(&12));
/// assert!(tree.delete(&12));
/// assert!(!tree.search(&12));
/// assert!(!tree.delete(&99));
/// ```
pub struct BPlusTree<K> {
    /// Root handle and tree-wide bookkeeping, guarded by the tree lock.
    state: RwLock<TreeState<K>>,

    /// Node capacity bounds (immutable after construction).
    config: TreeConfig,

    /// Restructuring counters.
    stats: TreeStats,
}

struct TreeState<K> {
    root: NodeRef<K>,
    /// Stored entries, duplicates included.
    len: usize,
    /// Levels from root to leaves; 1 for a lone leaf.
    height: usize,
}

impl<K> BPlusTree<K> {
    /// Create an empty tree with the default order.
    pub fn new() -> Self {
        Self::from_valid_config(TreeConfig::default())
    }

    /// Create an empty tree with the given config.
    ///
    /// # Errors
    /// - `Error::InvalidOrder` if the order is too small
    pub fn with_config(config: TreeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: TreeConfig) -> Self {
        Self {
            state: RwLock::new(TreeState {
                root: Node::new_leaf().into_ref(),
                len: 0,
                height: 1,
            }),
            config,
            stats: TreeStats::new(),
        }
    }

    /// Number of stored entries, counting each duplicate insert.
    pub fn len(&self) -> usize {
        self.state.read().len
    }

    /// Whether the tree holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of levels, 1 for a tree that is a single leaf.
    pub fn height(&self) -> usize {
        self.state.read().height
    }

    /// The tree's config.
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Restructuring statistics.
    pub fn stats(&self) -> &TreeStats {
        &self.stats
    }
}

impl<K: Ord + Clone> BPlusTree<K> {
    // ========================================================================
    // Public API
    // ========================================================================

    /// Add one occurrence of `key`.
    ///
    /// Never fails. Inserting a key that is already present stores another
    /// occurrence of it.
    pub fn insert(&self, key: K) {
        let mut state = self.state.write();

        if state.root.read().is_full(&self.config) {
            self.grow_root(&mut state);
        }

        let mut guard = state.root.write_arc();
        while !guard.is_leaf() {
            let mut idx = guard.route(&key);
            if guard.child(idx).read().is_full(&self.config) {
                self.split_child(&mut guard, idx);
                if key >= guard.keys()[idx] {
                    idx += 1;
                }
            }
            let child = guard.child(idx).write_arc();
            guard = child;
        }

        guard.leaf_insert(key);
        state.len += 1;
    }

    /// Whether at least one occurrence of `key` is stored.
    pub fn search(&self, key: &K) -> bool {
        let state = self.state.read();
        Self::contains(&state.root, key)
    }

    /// Remove one occurrence of `key`. Returns whether one was removed.
    ///
    /// Deleting an absent key is a no-op and leaves the structure untouched.
    pub fn delete(&self, key: &K) -> bool {
        let mut state = self.state.write();

        // Checked first so that a miss does not rebalance anything.
        if !Self::contains(&state.root, key) {
            return false;
        }

        let mut guard = state.root.write_arc();
        let mut at_root = true;
        while !guard.is_leaf() {
            let mut idx = guard.route(key);
            if self.is_at_minimum(guard.child(idx)) {
                idx = self.rebalance(&mut guard, idx);

                if at_root && guard.keys().is_empty() {
                    let child = guard.take_only_child();
                    state.root = Arc::clone(&child);
                    state.height -= 1;
                    TreeStats::bump(&self.stats.root_collapses);
                    tracing::debug!(height = state.height, "root collapsed");
                    guard = child.write_arc();
                    continue;
                }
            }
            let child = guard.child(idx).write_arc();
            guard = child;
            at_root = false;
        }

        let removed = guard.leaf_remove(key);
        assert!(removed, "key found by search but missing from its leaf");
        state.len -= 1;
        true
    }

    /// Walk the whole tree and check every structural invariant.
    ///
    /// Holds the tree lock in shared mode for the duration.
    ///
    /// # Panics
    /// Panics with a description of the first broken invariant.
    pub fn validate(&self) -> TreeShape {
        let state = self.state.read();
        invariants::validate(&state.root, &self.config, state.height, state.len)
    }

    // ========================================================================
    // Internal: descent helpers
    // ========================================================================

    fn contains(root: &NodeRef<K>, key: &K) -> bool {
        let mut guard = root.read_arc();
        while !guard.is_leaf() {
            let child = guard.child(guard.route(key)).read_arc();
            guard = child;
        }
        guard.leaf_contains(key)
    }

    /// Wrap the full root in a new keyless root and split it.
    fn grow_root(&self, state: &mut TreeState<K>) {
        let mut new_root = Node::new_root(Arc::clone(&state.root));
        self.split_child(&mut new_root, 0);
        state.root = new_root.into_ref();
        state.height += 1;
        TreeStats::bump(&self.stats.root_splits);
        tracing::debug!(height = state.height, "root split");
    }

    /// Split the full child at `idx` of `parent`.
    fn split_child(&self, parent: &mut Node<K>, idx: usize) {
        let child_ref = Arc::clone(parent.child(idx));
        let mut child = child_ref.write();
        let is_leaf = child.is_leaf();
        let (separator, sibling) = child.split();
        parent.insert_child(idx, separator, sibling);

        if is_leaf {
            TreeStats::bump(&self.stats.leaf_splits);
        } else {
            TreeStats::bump(&self.stats.internal_splits);
        }
        tracing::trace!(idx, is_leaf, "split child");
    }

    /// Whether a non-root child sits exactly at its minimum key count.
    fn is_at_minimum(&self, child_ref: &NodeRef<K>) -> bool {
        let child = child_ref.read();
        let min = child.min_keys(&self.config);
        assert!(
            child.len() >= min,
            "non-root node below minimum: {} keys, minimum {}",
            child.len(),
            min
        );
        child.len() == min
    }

    /// Give the child at `idx` a spare key so a deletion below it cannot
    /// leave it under the minimum.
    ///
    /// Borrows from the left sibling, then the right, and merges with a
    /// sibling only when neither can spare a key. Returns the index of the
    /// child that now covers the original child's key range.
    fn rebalance(&self, parent: &mut Node<K>, idx: usize) -> usize {
        if idx > 0 {
            let left_ref = Arc::clone(parent.child(idx - 1));
            let mut left = left_ref.write();
            if left.len() > left.min_keys(&self.config) {
                let child_ref = Arc::clone(parent.child(idx));
                let mut child = child_ref.write();
                Node::borrow_from_left(parent.separator_mut(idx - 1), &mut left, &mut child);
                TreeStats::bump(&self.stats.borrows);
                tracing::trace!(idx, "borrowed from left sibling");
                return idx;
            }
        }

        if idx + 1 < parent.children().len() {
            let child_ref = Arc::clone(parent.child(idx));
            let right_ref = Arc::clone(parent.child(idx + 1));
            let mut child = child_ref.write();
            let mut right = right_ref.write();
            if right.len() > right.min_keys(&self.config) {
                Node::borrow_from_right(parent.separator_mut(idx), &mut child, &mut right);
                TreeStats::bump(&self.stats.borrows);
                tracing::trace!(idx, "borrowed from right sibling");
                return idx;
            }
        }

        let left_idx = idx.saturating_sub(1);
        self.merge_children(parent, left_idx);
        left_idx
    }

    /// Merge children `idx` and `idx + 1` of `parent` into child `idx`.
    fn merge_children(&self, parent: &mut Node<K>, idx: usize) {
        let (separator, right_ref) = parent.remove_child(idx);
        let left_ref = Arc::clone(parent.child(idx));
        let mut left = left_ref.write();
        let mut right = right_ref.write();
        Node::merge(&mut left, separator, &mut right);
        assert!(
            left.len() <= self.config.max_keys(),
            "merge overflowed a node: {} keys",
            left.len()
        );

        TreeStats::bump(&self.stats.merges);
        tracing::trace!(idx, "merged siblings");
    }
}

impl<K> Default for BPlusTree<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> fmt::Debug for BPlusTree<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("BPlusTree")
            .field("order", &self.config.order)
            .field("len", &state.len)
            .field("height", &state.height)
            .finish()
    }
}

impl<K: Ord + Clone> FromIterator<K> for BPlusTree<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let tree = Self::new();
        for key in iter {
            tree.insert(key);
        }
        tree
    }
}

impl<K: Ord + Clone> Extend<K> for BPlusTree<K> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}
