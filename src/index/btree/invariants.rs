//! Structural validation for the B+ tree.
//!
//! Checks, for the tree reachable from a root:
//! - keys strictly ascending in every node
//! - every key inside the range its ancestors' separators allow
//! - `children == keys + 1` for internal nodes
//! - key counts within `[min, max]` for non-root nodes, `<= max` for the root
//! - all leaves at the same depth, matching the recorded height
//! - the leaf chain visits exactly the leaves in depth-first order
//! - occurrence counts are non-zero and sum to the recorded length

use std::sync::Arc;

use super::node::NodeRef;
use crate::common::TreeConfig;

/// Summary of a validated tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeShape {
    /// Levels from root to leaves.
    pub height: usize,
    /// Nodes reachable from the root.
    pub node_count: usize,
    /// Leaves reachable from the root.
    pub leaf_count: usize,
    /// Keys held by the root node.
    pub root_keys: usize,
    /// Stored entries, duplicates included.
    pub entries: usize,
}

struct Walk<'a, K> {
    config: &'a TreeConfig,
    leaves: Vec<NodeRef<K>>,
    leaf_depth: Option<usize>,
    shape: TreeShape,
}

pub(crate) fn validate<K: Ord>(
    root: &NodeRef<K>,
    config: &TreeConfig,
    height: usize,
    len: usize,
) -> TreeShape {
    let mut walk = Walk {
        config,
        leaves: Vec::new(),
        leaf_depth: None,
        shape: TreeShape::default(),
    };
    walk.shape.root_keys = root.read().len();
    walk.visit(root, 0, None, None);

    let leaf_depth = walk.leaf_depth.unwrap_or(0);
    assert_eq!(
        leaf_depth + 1,
        height,
        "recorded height {} but leaves sit at depth {}",
        height,
        leaf_depth
    );
    assert_eq!(
        walk.shape.entries, len,
        "recorded length {} but leaves hold {} entries",
        len, walk.shape.entries
    );
    check_leaf_chain(&walk.leaves);

    walk.shape.height = height;
    walk.shape.leaf_count = walk.leaves.len();
    walk.shape
}

impl<K: Ord> Walk<'_, K> {
    fn visit(&mut self, node_ref: &NodeRef<K>, depth: usize, lower: Option<&K>, upper: Option<&K>) {
        let node = node_ref.read();
        let keys = node.keys();
        self.shape.node_count += 1;

        assert!(
            keys.windows(2).all(|w| w[0] < w[1]),
            "keys out of order at depth {}",
            depth
        );
        if let Some(lower) = lower {
            assert!(
                keys.iter().all(|k| k >= lower),
                "key below its separator range at depth {}",
                depth
            );
        }
        if let Some(upper) = upper {
            assert!(
                keys.iter().all(|k| k < upper),
                "key above its separator range at depth {}",
                depth
            );
        }

        assert!(
            keys.len() <= self.config.max_keys(),
            "node with {} keys exceeds order {}",
            keys.len(),
            self.config.max_keys()
        );
        if depth > 0 {
            let min = node.min_keys(self.config);
            assert!(
                keys.len() >= min,
                "non-root node with {} keys, minimum {}",
                keys.len(),
                min
            );
        }

        if node.is_leaf() {
            let counts = node.counts();
            assert_eq!(counts.len(), keys.len(), "leaf counts out of step with keys");
            assert!(counts.iter().all(|&c| c > 0), "leaf holds a zero count");
            self.shape.entries += counts.iter().sum::<usize>();

            match self.leaf_depth {
                Some(expected) => assert_eq!(depth, expected, "leaves at unequal depths"),
                None => self.leaf_depth = Some(depth),
            }
            self.leaves.push(Arc::clone(node_ref));
            return;
        }

        let children = node.children();
        assert!(!keys.is_empty(), "internal node without separators at depth {}", depth);
        assert_eq!(
            children.len(),
            keys.len() + 1,
            "internal node with {} keys has {} children",
            keys.len(),
            children.len()
        );

        for (i, child) in children.iter().enumerate() {
            let child_lower = if i == 0 { lower } else { Some(&keys[i - 1]) };
            let child_upper = if i == keys.len() { upper } else { Some(&keys[i]) };
            self.visit(child, depth + 1, child_lower, child_upper);
        }
    }
}

fn check_leaf_chain<K>(leaves: &[NodeRef<K>]) {
    for (i, leaf) in leaves.iter().enumerate() {
        let next = leaf.read().next_leaf();
        match (next, leaves.get(i + 1)) {
            (Some(next), Some(expected)) => {
                assert!(Arc::ptr_eq(&next, expected), "leaf chain skips or repeats at leaf {}", i)
            }
            (None, None) => {}
            (Some(_), None) => panic!("leaf chain continues past the last leaf"),
            (None, Some(_)) => panic!("leaf chain ends early at leaf {} of {}", i, leaves.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{BPlusTree, TreeConfig};

    #[test]
    fn test_validate_empty_tree() {
        let tree: BPlusTree<i32> = BPlusTree::new();
        let shape = tree.validate();
        assert_eq!(shape.height, 1);
        assert_eq!(shape.node_count, 1);
        assert_eq!(shape.leaf_count, 1);
        assert_eq!(shape.entries, 0);
    }

    #[test]
    fn test_validate_after_growth() {
        let tree = BPlusTree::with_config(TreeConfig::new(3)).unwrap();
        for key in 0..200 {
            tree.insert(key);
            tree.validate();
        }
        let shape = tree.validate();
        assert_eq!(shape.entries, 200);
        assert!(shape.height >= 4);
        assert!(shape.leaf_count > 1);
    }

    #[test]
    fn test_validate_during_shrink() {
        let tree: BPlusTree<i32> = (0..100).collect();
        for key in (0..100).rev() {
            assert!(tree.delete(&key));
            tree.validate();
        }
        let shape = tree.validate();
        assert_eq!(shape.height, 1);
        assert_eq!(shape.entries, 0);
    }
}
