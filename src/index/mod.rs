//! Index structures.
//!
//! - [`btree`] - Concurrent in-memory B+ tree

pub mod btree;
