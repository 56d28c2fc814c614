//! bptree - An in-memory concurrent B+ tree index.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           BPlusTree                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │          Public API (index/btree/tree.rs)                │   │
//! │  │        insert  ·  search  ·  delete  ·  validate         │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │        Tree-level RwLock (root, len, height)             │   │
//! │  │   exclusive for insert/delete · shared for search        │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │      Single-pass descent (hand-over-hand node locks)     │   │
//! │  │   split-before-descend  ·  rebalance-before-descend      │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Node primitives (index/btree/node.rs)          │   │
//! │  │          split  ·  borrow  ·  merge  ·  leaf chain       │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (config, Error)
//! - [`index`] - The B+ tree
//!
//! # Quick Start
//! ```
//! use bptree::{BPlusTree, TreeConfig};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let tree = Arc::new(BPlusTree::with_config(TreeConfig::new(4)).unwrap());
//!
//! let handles: Vec<_> = (0..4)
//!     .map(|t| {
//!         let tree = Arc::clone(&tree);
//!         thread::spawn(move || {
//!             for key in (t * 100)..(t * 100 + 100) {
//!                 tree.insert(key);
//!             }
//!         })
//!     })
//!     .collect();
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//!
//! assert_eq!(tree.len(), 400);
//! assert!(tree.search(&250));
//! tree.validate();
//! ```

pub mod common;
pub mod index;

// Re-export commonly used items at crate root for convenience
pub use common::config::{DEFAULT_ORDER, MIN_ORDER};
pub use common::{Error, Result, TreeConfig};

pub use index::btree::{BPlusTree, StatsSnapshot, TreeShape, TreeStats};
