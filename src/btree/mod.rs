//! B-tree implementation.
//!
//! This module provides an in-memory B-tree that supports:
//! - Point lookups (find)
//! - Insertions and in-place updates (put)
//! - Deletions with rotate/merge rebalancing (remove)

mod node;
mod tree;

pub use node::Node;
pub use tree::Tree;
