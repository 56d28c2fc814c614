//! B+ tree index.
//!
//! An in-memory, concurrent B+ tree over ordered keys. Leaves hold the
//! keys (with an occurrence count each) and are linked left to right;
//! internal nodes hold routing separators only.
//!
//! # Components
//! - [`BPlusTree`] - The tree and its public operations
//! - [`TreeStats`] / [`StatsSnapshot`] - Restructuring counters
//! - [`TreeShape`] - Summary returned by [`BPlusTree::validate`]

mod invariants;
mod node;
mod stats;
mod tree;

pub use invariants::TreeShape;
pub use stats::{StatsSnapshot, TreeStats};
pub use tree::BPlusTree;
