//! Error types for the B+ tree index.

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All recoverable errors in the crate.
///
/// Tree operations themselves never fail: any key is valid, and duplicate
/// or absent keys have defined behavior. Only construction can be refused.
/// A broken structural invariant is a bug and panics instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested order cannot keep the tree balanced.
    #[error("Invalid tree order {order}: must be at least {min}")]
    InvalidOrder { order: usize, min: usize },
}
