//! Property-based tests for the B+ tree.
//!
//! Differential testing against a `BTreeMap<key, occurrences>` oracle,
//! with full structural validation after every operation sequence.

use bptree::{BPlusTree, TreeConfig};
use proptest::prelude::*;
use std::collections::BTreeMap;

/// Operations for random testing.
#[derive(Debug, Clone)]
enum Op {
    Insert(u16),
    Delete(u16),
    Search(u16),
}

/// Small key domain so duplicates and hits on deletes are common.
fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u16..200).prop_map(Op::Insert),
        2 => (0u16..200).prop_map(Op::Delete),
        1 => (0u16..200).prop_map(Op::Search),
    ]
}

fn oracle_insert(oracle: &mut BTreeMap<u16, usize>, key: u16) {
    *oracle.entry(key).or_insert(0) += 1;
}

fn oracle_delete(oracle: &mut BTreeMap<u16, usize>, key: u16) -> bool {
    match oracle.get_mut(&key) {
        Some(count) if *count > 1 => {
            *count -= 1;
            true
        }
        Some(_) => {
            oracle.remove(&key);
            true
        }
        None => false,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_matches_multiset_oracle(
        order in 3usize..9,
        ops in prop::collection::vec(op(), 0..400),
    ) {
        let tree = BPlusTree::with_config(TreeConfig::new(order)).unwrap();
        let mut oracle = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key) => {
                    tree.insert(key);
                    oracle_insert(&mut oracle, key);
                }
                Op::Delete(key) => {
                    prop_assert_eq!(tree.delete(&key), oracle_delete(&mut oracle, key));
                }
                Op::Search(key) => {
                    prop_assert_eq!(tree.search(&key), oracle.contains_key(&key));
                }
            }
        }

        let shape = tree.validate();
        let expected: usize = oracle.values().sum();
        prop_assert_eq!(shape.entries, expected);
        prop_assert_eq!(tree.len(), expected);
        for key in 0u16..200 {
            prop_assert_eq!(tree.search(&key), oracle.contains_key(&key));
        }
    }

    #[test]
    fn prop_insert_all_then_delete_all(
        keys in prop::collection::vec(any::<i32>(), 0..300),
    ) {
        let tree = BPlusTree::new();
        for &key in &keys {
            tree.insert(key);
        }
        tree.validate();

        for &key in keys.iter().rev() {
            prop_assert!(tree.delete(&key));
        }

        let shape = tree.validate();
        prop_assert_eq!(shape.height, 1);
        prop_assert_eq!(shape.root_keys, 0);
        for key in &keys {
            prop_assert!(!tree.search(key));
        }
    }

    #[test]
    fn prop_delete_absent_keeps_shape(
        keys in prop::collection::hash_set(0i32..1000, 0..200),
        probe in 1000i32..2000,
    ) {
        let tree: BPlusTree<i32> = keys.iter().copied().collect();
        let before = tree.validate();
        let stats_before = tree.stats().snapshot();

        prop_assert!(!tree.delete(&probe));

        prop_assert_eq!(tree.validate(), before);
        prop_assert_eq!(tree.stats().snapshot(), stats_before);
    }
}
