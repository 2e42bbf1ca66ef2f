//! Error types for tree operations.

/// A specialized Result type for tree operations.
pub type Result<T> = std::result::Result<T, TreeError>;

/// Conditions signaled by tree operations.
///
/// All of them are recoverable: an operation that returns an error leaves the
/// receiving tree exactly as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// The key is already present.
    #[error("key {0} is already present")]
    DuplicateKey(i32),

    /// The key is not present.
    #[error("key {0} not found")]
    KeyNotFound(i32),

    /// The tree holds no elements.
    #[error("tree is empty")]
    EmptyTree,

    /// The separator or the other tree of a join overlaps the keys of this tree.
    #[error("join separator {0} does not separate the key ranges")]
    OverlappingRanges(i32),
}
