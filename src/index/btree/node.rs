//! B+ tree nodes and single-node restructuring primitives.
//!
//! A [`Node`] is either a leaf (keys + occurrence counts + a forward link
//! to the next leaf) or an internal node (routing keys + owned children).
//! Every node sits behind its own `RwLock` inside an `Arc`:
//!
//! ```text
//!                 ┌──────────────────────┐
//!                 │ Internal [10 | 20]   │
//!                 └──┬────────┬───────┬──┘
//!          Arc (own) │        │       │
//!        ┌───────────▼┐ ┌─────▼────┐ ┌▼─────────┐
//!        │ Leaf [5,7] │→│ [10,12]  │→│ [20,30]  │→ ∅
//!        └────────────┘ └──────────┘ └──────────┘
//!                    Weak (next, non-owning)
//! ```
//!
//! The parent's `children` vector holds the only long-lived strong
//! reference to a node. `next` is a `Weak` and never extends a lifetime.
//!
//! The primitives here touch only the nodes handed to them. Locking and
//! the choice of which primitive to run live in the tree.

use std::mem;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::common::TreeConfig;

/// Shared handle to a locked node.
pub(crate) type NodeRef<K> = Arc<RwLock<Node<K>>>;

/// A tree vertex.
pub(crate) struct Node<K> {
    /// Sorted, no duplicates. Leaf keys are data; internal keys route.
    keys: Vec<K>,
    kind: NodeKind<K>,
}

enum NodeKind<K> {
    Leaf {
        /// `counts[i]` is the number of times `keys[i]` was inserted and
        /// not yet deleted. Never zero.
        counts: Vec<usize>,
        next: Weak<RwLock<Node<K>>>,
    },
    Internal {
        /// `children.len() == keys.len() + 1`
        children: Vec<NodeRef<K>>,
    },
}

impl<K> Node<K> {
    /// An empty leaf with no successor.
    pub(crate) fn new_leaf() -> Self {
        Self {
            keys: Vec::new(),
            kind: NodeKind::Leaf {
                counts: Vec::new(),
                next: Weak::new(),
            },
        }
    }

    /// A keyless internal node whose only child is `old_root`.
    ///
    /// Transiently breaks `children == keys + 1` until the child is split.
    pub(crate) fn new_root(old_root: NodeRef<K>) -> Self {
        Self {
            keys: Vec::new(),
            kind: NodeKind::Internal {
                children: vec![old_root],
            },
        }
    }

    pub(crate) fn into_ref(self) -> NodeRef<K> {
        Arc::new(RwLock::new(self))
    }

    #[inline]
    pub(crate) fn keys(&self) -> &[K] {
        &self.keys
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    #[inline]
    pub(crate) fn is_full(&self, config: &TreeConfig) -> bool {
        self.keys.len() >= config.max_keys()
    }

    /// Minimum key count for this node when it is not the root.
    #[inline]
    pub(crate) fn min_keys(&self, config: &TreeConfig) -> usize {
        if self.is_leaf() {
            config.min_leaf_keys()
        } else {
            config.min_internal_keys()
        }
    }

    /// Children of an internal node; empty for a leaf.
    pub(crate) fn children(&self) -> &[NodeRef<K>] {
        match &self.kind {
            NodeKind::Internal { children } => children,
            NodeKind::Leaf { .. } => &[],
        }
    }

    /// Child at `idx`.
    ///
    /// # Panics
    /// Panics on a leaf or an out-of-range index.
    #[inline]
    pub(crate) fn child(&self, idx: usize) -> &NodeRef<K> {
        &self.children()[idx]
    }

    /// Occurrence counts of a leaf; empty for an internal node.
    pub(crate) fn counts(&self) -> &[usize] {
        match &self.kind {
            NodeKind::Leaf { counts, .. } => counts,
            NodeKind::Internal { .. } => &[],
        }
    }

    /// Next leaf in key order, if any.
    pub(crate) fn next_leaf(&self) -> Option<NodeRef<K>> {
        match &self.kind {
            NodeKind::Leaf { next, .. } => next.upgrade(),
            NodeKind::Internal { .. } => None,
        }
    }

    /// Mutable access to the separator between children `idx` and `idx + 1`.
    #[inline]
    pub(crate) fn separator_mut(&mut self, idx: usize) -> &mut K {
        &mut self.keys[idx]
    }

    /// Parent side of a split: place `separator` at `idx` and the new right
    /// sibling just after child `idx`.
    pub(crate) fn insert_child(&mut self, idx: usize, separator: K, sibling: NodeRef<K>) {
        let NodeKind::Internal { children } = &mut self.kind else {
            unreachable!("insert_child on a leaf");
        };
        self.keys.insert(idx, separator);
        children.insert(idx + 1, sibling);
    }

    /// Parent side of a merge: detach the separator at `idx` and the child
    /// to its right.
    pub(crate) fn remove_child(&mut self, idx: usize) -> (K, NodeRef<K>) {
        let NodeKind::Internal { children } = &mut self.kind else {
            unreachable!("remove_child on a leaf");
        };
        let separator = self.keys.remove(idx);
        let right = children.remove(idx + 1);
        (separator, right)
    }

    /// Detach the sole child of a keyless internal node (root collapse).
    pub(crate) fn take_only_child(&mut self) -> NodeRef<K> {
        let NodeKind::Internal { children } = &mut self.kind else {
            unreachable!("take_only_child on a leaf");
        };
        assert!(
            self.keys.is_empty() && children.len() == 1,
            "collapsing a root with {} keys and {} children",
            self.keys.len(),
            children.len()
        );
        children.remove(0)
    }

    /// Append `right` (and the separator between them) onto `left`.
    ///
    /// Leaves drop the separator since it only copied `right`'s first key,
    /// and `left` inherits `right`'s place in the leaf chain. Internal nodes
    /// pull the separator down between the two key runs. `right` is left
    /// empty and should be dropped by the caller.
    pub(crate) fn merge(left: &mut Node<K>, separator: K, right: &mut Node<K>) {
        match (&mut left.kind, &mut right.kind) {
            (
                NodeKind::Leaf {
                    counts: left_counts,
                    next: left_next,
                },
                NodeKind::Leaf {
                    counts: right_counts,
                    next: right_next,
                },
            ) => {
                left.keys.append(&mut right.keys);
                left_counts.append(right_counts);
                *left_next = mem::take(right_next);
            }
            (
                NodeKind::Internal {
                    children: left_children,
                },
                NodeKind::Internal {
                    children: right_children,
                },
            ) => {
                left.keys.push(separator);
                left.keys.append(&mut right.keys);
                left_children.append(right_children);
            }
            _ => unreachable!("merging siblings at different depths"),
        }
    }
}

impl<K: Ord> Node<K> {
    /// Index of the child whose subtree may hold `key`: the number of
    /// separators `<= key`.
    #[inline]
    pub(crate) fn route(&self, key: &K) -> usize {
        self.keys.partition_point(|sep| sep <= key)
    }

    pub(crate) fn leaf_contains(&self, key: &K) -> bool {
        debug_assert!(self.is_leaf());
        self.keys.binary_search(key).is_ok()
    }

    /// Add one occurrence of `key` to this leaf.
    pub(crate) fn leaf_insert(&mut self, key: K) {
        let NodeKind::Leaf { counts, .. } = &mut self.kind else {
            unreachable!("leaf_insert on an internal node");
        };
        match self.keys.binary_search(&key) {
            Ok(i) => counts[i] += 1,
            Err(i) => {
                self.keys.insert(i, key);
                counts.insert(i, 1);
            }
        }
    }

    /// Remove one occurrence of `key` from this leaf. Returns whether
    /// anything was removed.
    pub(crate) fn leaf_remove(&mut self, key: &K) -> bool {
        let NodeKind::Leaf { counts, .. } = &mut self.kind else {
            unreachable!("leaf_remove on an internal node");
        };
        match self.keys.binary_search(key) {
            Ok(i) if counts[i] > 1 => {
                counts[i] -= 1;
                true
            }
            Ok(i) => {
                self.keys.remove(i);
                counts.remove(i);
                true
            }
            Err(_) => false,
        }
    }
}

impl<K: Ord + Clone> Node<K> {
    /// Split this node around its middle key.
    ///
    /// Keeps `len / 2` keys here and moves the rest into a new right
    /// sibling. Returns the separator for the parent and the sibling.
    /// A leaf copies the separator up (it stays as the sibling's first key)
    /// and splices the sibling into the leaf chain right after itself. An
    /// internal node moves the separator up, along with the children right
    /// of it going to the sibling.
    pub(crate) fn split(&mut self) -> (K, NodeRef<K>) {
        assert!(self.keys.len() >= 2, "splitting a node with {} keys", self.keys.len());
        let mid = self.keys.len() / 2;
        let mut right_keys = self.keys.split_off(mid);

        match &mut self.kind {
            NodeKind::Leaf { counts, next } => {
                let separator = right_keys[0].clone();
                let sibling = Node {
                    keys: right_keys,
                    kind: NodeKind::Leaf {
                        counts: counts.split_off(mid),
                        next: mem::take(next),
                    },
                }
                .into_ref();
                *next = Arc::downgrade(&sibling);
                (separator, sibling)
            }
            NodeKind::Internal { children } => {
                let separator = right_keys.remove(0);
                let sibling = Node {
                    keys: right_keys,
                    kind: NodeKind::Internal {
                        children: children.split_off(mid + 1),
                    },
                }
                .into_ref();
                (separator, sibling)
            }
        }
    }

    /// Move one key from `left` into the front of its right neighbour
    /// `child`. `separator` is the parent key between them.
    pub(crate) fn borrow_from_left(separator: &mut K, left: &mut Node<K>, child: &mut Node<K>) {
        match (&mut left.kind, &mut child.kind) {
            (
                NodeKind::Leaf {
                    counts: left_counts,
                    ..
                },
                NodeKind::Leaf {
                    counts: child_counts,
                    ..
                },
            ) => {
                let key = left.keys.pop().expect("left sibling has a key to spare");
                let count = left_counts.pop().expect("left sibling has a count to spare");
                child.keys.insert(0, key);
                child_counts.insert(0, count);
                *separator = child.keys[0].clone();
            }
            (
                NodeKind::Internal {
                    children: left_children,
                },
                NodeKind::Internal {
                    children: child_children,
                },
            ) => {
                let up = left.keys.pop().expect("left sibling has a key to spare");
                let down = mem::replace(separator, up);
                child.keys.insert(0, down);
                let moved = left_children.pop().expect("left sibling has a child to spare");
                child_children.insert(0, moved);
            }
            _ => unreachable!("borrowing between siblings at different depths"),
        }
    }

    /// Move one key from `right` onto the end of its left neighbour
    /// `child`. `separator` is the parent key between them.
    pub(crate) fn borrow_from_right(separator: &mut K, child: &mut Node<K>, right: &mut Node<K>) {
        match (&mut child.kind, &mut right.kind) {
            (
                NodeKind::Leaf {
                    counts: child_counts,
                    ..
                },
                NodeKind::Leaf {
                    counts: right_counts,
                    ..
                },
            ) => {
                child.keys.push(right.keys.remove(0));
                child_counts.push(right_counts.remove(0));
                *separator = right.keys[0].clone();
            }
            (
                NodeKind::Internal {
                    children: child_children,
                },
                NodeKind::Internal {
                    children: right_children,
                },
            ) => {
                let up = right.keys.remove(0);
                let down = mem::replace(separator, up);
                child.keys.push(down);
                child_children.push(right_children.remove(0));
            }
            _ => unreachable!("borrowing between siblings at different depths"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(keys: &[i32]) -> Node<i32> {
        let mut node = Node::new_leaf();
        for &k in keys {
            node.leaf_insert(k);
        }
        node
    }

    fn internal(keys: &[i32], children: Vec<Node<i32>>) -> Node<i32> {
        Node {
            keys: keys.to_vec(),
            kind: NodeKind::Internal {
                children: children.into_iter().map(Node::into_ref).collect(),
            },
        }
    }

    fn child_keys(node: &Node<i32>, idx: usize) -> Vec<i32> {
        node.child(idx).read().keys().to_vec()
    }

    #[test]
    fn test_leaf_insert_sorted_with_counts() {
        let mut node = leaf(&[20, 5, 10, 5]);
        assert_eq!(node.keys(), &[5, 10, 20]);
        assert_eq!(node.counts(), &[2, 1, 1]);

        assert!(node.leaf_remove(&5));
        assert_eq!(node.counts(), &[1, 1, 1]);
        assert!(node.leaf_remove(&5));
        assert_eq!(node.keys(), &[10, 20]);
        assert!(!node.leaf_remove(&5));
        assert!(node.leaf_contains(&10));
        assert!(!node.leaf_contains(&11));
    }

    #[test]
    fn test_route() {
        let node = internal(&[10, 20], vec![leaf(&[1]), leaf(&[10]), leaf(&[20])]);
        assert_eq!(node.route(&5), 0);
        assert_eq!(node.route(&10), 1);
        assert_eq!(node.route(&15), 1);
        assert_eq!(node.route(&20), 2);
        assert_eq!(node.route(&99), 2);
    }

    #[test]
    fn test_split_leaf_copies_separator_and_links() {
        let tail = leaf(&[50]).into_ref();
        let mut node = leaf(&[5, 6, 10, 20]);
        if let NodeKind::Leaf { next, .. } = &mut node.kind {
            *next = Arc::downgrade(&tail);
        }

        let (separator, sibling) = node.split();

        assert_eq!(separator, 10);
        assert_eq!(node.keys(), &[5, 6]);
        assert_eq!(sibling.read().keys(), &[10, 20]);
        assert_eq!(sibling.read().counts(), &[1, 1]);

        let next = node.next_leaf().unwrap();
        assert!(Arc::ptr_eq(&next, &sibling));
        let after = sibling.read().next_leaf().unwrap();
        assert!(Arc::ptr_eq(&after, &tail));
    }

    #[test]
    fn test_split_internal_moves_separator_up() {
        let mut node = internal(
            &[10, 20, 30, 40],
            vec![leaf(&[1]), leaf(&[10]), leaf(&[20]), leaf(&[30]), leaf(&[40])],
        );

        let (separator, sibling) = node.split();

        assert_eq!(separator, 30);
        assert_eq!(node.keys(), &[10, 20]);
        assert_eq!(node.children().len(), 3);
        let sibling = sibling.read();
        assert_eq!(sibling.keys(), &[40]);
        assert_eq!(sibling.children().len(), 2);
        assert_eq!(child_keys(&sibling, 0), vec![30]);
    }

    #[test]
    fn test_parent_insert_and_remove_child() {
        let mut parent = internal(&[10], vec![leaf(&[1, 2]), leaf(&[10, 11])]);
        parent.insert_child(1, 20, leaf(&[20, 21]).into_ref());
        assert_eq!(parent.keys(), &[10, 20]);
        assert_eq!(child_keys(&parent, 2), vec![20, 21]);

        let (separator, right) = parent.remove_child(0);
        assert_eq!(separator, 10);
        assert_eq!(right.read().keys(), &[10, 11]);
        assert_eq!(parent.keys(), &[20]);
        assert_eq!(parent.children().len(), 2);
    }

    #[test]
    fn test_borrow_between_leaves() {
        let mut separator = 10;
        let mut left = leaf(&[1, 2, 3]);
        let mut child = leaf(&[10, 11]);

        Node::borrow_from_left(&mut separator, &mut left, &mut child);
        assert_eq!(left.keys(), &[1, 2]);
        assert_eq!(child.keys(), &[3, 10, 11]);
        assert_eq!(separator, 3);

        let mut separator = 20;
        let mut child = leaf(&[1, 2]);
        let mut right = leaf(&[20, 21, 22]);

        Node::borrow_from_right(&mut separator, &mut child, &mut right);
        assert_eq!(child.keys(), &[1, 2, 20]);
        assert_eq!(right.keys(), &[21, 22]);
        assert_eq!(separator, 21);
    }

    #[test]
    fn test_borrow_between_internal_nodes_rotates() {
        let mut separator = 30;
        let mut left = internal(&[10, 20], vec![leaf(&[1]), leaf(&[10]), leaf(&[20])]);
        let mut child = internal(&[40], vec![leaf(&[30]), leaf(&[40])]);

        Node::borrow_from_left(&mut separator, &mut left, &mut child);
        assert_eq!(separator, 20);
        assert_eq!(left.keys(), &[10]);
        assert_eq!(child.keys(), &[30, 40]);
        assert_eq!(child_keys(&child, 0), vec![20]);

        Node::borrow_from_right(&mut separator, &mut left, &mut child);
        assert_eq!(separator, 30);
        assert_eq!(left.keys(), &[10, 20]);
        assert_eq!(child.keys(), &[40]);
        assert_eq!(child_keys(&left, 2), vec![20]);
    }

    #[test]
    fn test_merge_leaves_rewires_chain() {
        let tail = leaf(&[99]).into_ref();
        let mut left = leaf(&[1, 2]);
        let mut right = leaf(&[10, 11]);
        if let NodeKind::Leaf { next, .. } = &mut right.kind {
            *next = Arc::downgrade(&tail);
        }

        Node::merge(&mut left, 10, &mut right);

        assert_eq!(left.keys(), &[1, 2, 10, 11]);
        assert_eq!(left.counts(), &[1, 1, 1, 1]);
        assert!(Arc::ptr_eq(&left.next_leaf().unwrap(), &tail));
        assert!(right.keys().is_empty());
    }

    #[test]
    fn test_merge_internal_pulls_separator_down() {
        let mut left = internal(&[10], vec![leaf(&[1]), leaf(&[10])]);
        let mut right = internal(&[40], vec![leaf(&[30]), leaf(&[40])]);

        Node::merge(&mut left, 30, &mut right);

        assert_eq!(left.keys(), &[10, 30, 40]);
        assert_eq!(left.children().len(), 4);
    }

    #[test]
    fn test_new_root_then_collapse() {
        let old = leaf(&[1]).into_ref();
        let mut root = Node::new_root(Arc::clone(&old));
        assert!(!root.is_leaf());
        assert_eq!(root.children().len(), 1);

        let child = root.take_only_child();
        assert!(Arc::ptr_eq(&child, &old));
    }

    #[test]
    fn test_min_keys_by_kind() {
        let config = TreeConfig::new(4);
        assert_eq!(leaf(&[]).min_keys(&config), 2);
        assert_eq!(internal(&[1], vec![leaf(&[0]), leaf(&[1])]).min_keys(&config), 1);
        assert!(leaf(&[1, 2, 3, 4]).is_full(&config));
        assert!(!leaf(&[1, 2, 3]).is_full(&config));
    }
}
