//! # BTree KV
//!
//! An in-memory, self-balancing ordered key-value map built as a classical
//! B-tree. Keys are unique strings ordered byte-wise; every non-root node
//! holds between `min_items` and `2 * min_items` items.
//!
//! ## Architecture
//!
//! - **Types** (`types`): items, configuration and statistics
//! - **B-Tree Layer** (`btree`): nodes with split/rotate/merge primitives and
//!   the tree that drives them along a recorded descent path
//! - **Db** (this module): a shareable handle serializing access to one tree
//!
//! ## Usage
//!
//! ```rust
//! use btree_kv::Tree;
//!
//! let mut tree = Tree::new(2);
//!
//! // Put a key-value pair
//! tree.put("hello", "world");
//!
//! // Get a value
//! assert_eq!(tree.find("hello"), Some(&"world"));
//!
//! // Delete a key
//! tree.remove("hello").unwrap();
//! assert!(tree.find("hello").is_none());
//! ```

pub mod btree;
pub mod error;
pub mod types;

pub use error::{Result, TreeError};
pub use types::{Item, TreeConfig, TreeStats, DEFAULT_MIN_ITEMS};

// Re-export main public API
pub use btree::{Node, Tree};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Database configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// B-tree configuration for node limits
    pub btree_config: TreeConfig,
}

impl Config {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum number of items per non-root node
    pub fn min_items(mut self, min_items: usize) -> Self {
        self.btree_config = TreeConfig::new(min_items);
        self
    }

    /// Set B-tree configuration
    pub fn btree_config(mut self, config: TreeConfig) -> Self {
        self.btree_config = config;
        self
    }
}

/// Node type for visualization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    /// Whether this is a leaf node
    pub is_leaf: bool,
    /// Keys in this node
    pub keys: Vec<String>,
    /// Child nodes (only for internal nodes)
    pub children: Vec<TreeNode>,
}

/// Shared handle to a B-tree of byte values
///
/// The tree itself is single-threaded; this handle serializes access with a
/// reader-writer lock so it can be cloned across threads. Readers share the
/// lock, `put` and `delete` hold it exclusively for the whole operation.
#[derive(Clone)]
pub struct Db {
    btree: Arc<RwLock<Tree<Vec<u8>>>>,
    config: Config,
}

impl Db {
    /// Create an empty database
    pub fn open(config: Config) -> Self {
        let btree = Tree::with_config(config.btree_config);
        Self {
            btree: Arc::new(RwLock::new(btree)),
            config,
        }
    }

    /// Get the current B-tree configuration
    pub fn btree_config(&self) -> TreeConfig {
        self.config.btree_config
    }

    /// Get a value by key
    ///
    /// Returns `None` if the key does not exist.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let btree = self.btree.read();
        btree.find(key).cloned()
    }

    /// Insert or update a key-value pair
    ///
    /// Returns the previous value if the key existed.
    pub fn put(&self, key: &str, value: &[u8]) -> Option<Vec<u8>> {
        let mut btree = self.btree.write();
        btree.put(key, value.to_vec())
    }

    /// Delete a key-value pair, returning its value
    pub fn delete(&self, key: &str) -> Result<Vec<u8>> {
        let mut btree = self.btree.write();
        btree.remove(key)
    }

    /// Check if a key exists
    pub fn contains(&self, key: &str) -> bool {
        let btree = self.btree.read();
        btree.contains_key(key)
    }

    /// All key-value pairs in sorted order
    pub fn iter(&self) -> Vec<(String, Vec<u8>)> {
        let btree = self.btree.read();
        btree
            .entries()
            .into_iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.btree.read().len()
    }

    /// Check if the database holds no keys
    pub fn is_empty(&self) -> bool {
        self.btree.read().is_empty()
    }

    /// Debug trace a key lookup
    pub fn debug_get(&self, key: &str) -> Vec<String> {
        let btree = self.btree.read();
        btree.debug_find(key)
    }

    /// Get statistics about the database
    pub fn stats(&self) -> TreeStats {
        let btree = self.btree.read();
        btree.stats()
    }

    /// Check the tree invariants
    pub fn validate(&self) -> Result<()> {
        let btree = self.btree.read();
        btree.validate()
    }

    /// Export the tree structure for visualization
    pub fn export_tree(&self) -> TreeNode {
        let btree = self.btree.read();
        btree.export()
    }
}
