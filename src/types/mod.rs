//! Common types used throughout the tree.

mod item;

pub use item::Item;

use serde::{Deserialize, Serialize};

/// Default minimum number of items per non-root node
pub const DEFAULT_MIN_ITEMS: usize = 128;

/// Smallest accepted `min_items` (a 2-3 tree)
pub const MIN_ITEMS_FLOOR: usize = 1;

/// Tree configuration for node occupancy limits
///
/// Only `min_items` is stored; `max_items` is always `2 * min_items`, which
/// keeps a split of an overflowing node exactly balanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeConfig {
    /// Minimum items per non-root node
    pub min_items: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            min_items: DEFAULT_MIN_ITEMS,
        }
    }
}

impl TreeConfig {
    /// Create a new config with a custom minimum
    pub fn new(min_items: usize) -> Self {
        Self {
            min_items: min_items.max(MIN_ITEMS_FLOOR),
        }
    }

    /// Maximum items per node; a node holding more must split
    pub fn max_items(&self) -> usize {
        self.min_items * 2
    }
}

/// Shape and occupancy summary of a tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeStats {
    /// Number of stored keys
    pub len: usize,
    /// Number of levels (a lone leaf root has height 1)
    pub height: usize,
    /// Total number of nodes
    pub node_count: usize,
    /// Number of leaf nodes
    pub leaf_count: usize,
    /// Configured minimum items per non-root node
    pub min_items: usize,
    /// Configured maximum items per node
    pub max_items: usize,
}
