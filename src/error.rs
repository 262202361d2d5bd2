//! Error types for the B-tree map.

use thiserror::Error;

/// Result type alias for tree operations
pub type Result<T> = std::result::Result<T, TreeError>;

/// Errors that can occur in the tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Key not found (for operations that require an existing key)
    #[error("Key not found: {0:?}")]
    KeyNotFound(String),

    /// A structural invariant does not hold (reported by validation)
    #[error("Corruption detected: {0}")]
    Corruption(String),
}

impl TreeError {
    /// Create a key-not-found error for the given key
    pub fn key_not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound(key.into())
    }

    /// Create a corruption error with a message
    pub fn corruption(msg: impl Into<String>) -> Self {
        Self::Corruption(msg.into())
    }
}
