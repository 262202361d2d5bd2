//! B-tree node and its local restructuring primitives.
//!
//! A node never knows its parent or the tree that owns it. Every operation
//! that touches more than one node (split, rotation, merge) is expressed on
//! the *parent*, addressed by the index of the child being fixed. The tree
//! reaches the parent through the path it recorded while descending.

use crate::types::Item;

/// A B-tree node
///
/// Leaves have no children. Internal nodes have exactly one more child than
/// items, and `children[i]` holds keys between `items[i - 1]` and `items[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node<V> {
    pub(crate) items: Vec<Item<V>>,
    pub(crate) children: Vec<Node<V>>,
}

impl<V> Default for Node<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// How an underflowing child was fixed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rebalance {
    /// Borrowed the last item of the left sibling
    RotateRight,
    /// Borrowed the first item of the right sibling
    RotateLeft,
    /// Merged with the sibling on its left
    MergeLeft,
    /// Merged with the sibling on its right
    MergeRight,
}

impl<V> Node<V> {
    /// Create an empty leaf
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create a node from already-ordered items and children
    pub(crate) fn from_parts(items: Vec<Item<V>>, children: Vec<Node<V>>) -> Self {
        Self { items, children }
    }

    /// Check if this node is a leaf
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of items in this node
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the node holds no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in key order
    pub fn items(&self) -> &[Item<V>] {
        &self.items
    }

    /// Child nodes in key order
    pub fn children(&self) -> &[Node<V>] {
        &self.children
    }

    /// Search this node for `key`.
    ///
    /// Returns `(true, i)` when `items[i]` holds the key, otherwise
    /// `(false, i)` where `i` is the position the key would be inserted at
    /// (and, for internal nodes, the child to descend into).
    pub fn locate(&self, key: &str) -> (bool, usize) {
        match self
            .items
            .binary_search_by(|item| item.key.as_str().cmp(key))
        {
            Ok(idx) => (true, idx),
            Err(idx) => (false, idx),
        }
    }

    /// Split an overflowing node in half.
    ///
    /// The node must hold exactly `2 * min_items + 1` items. It keeps the
    /// lower `min_items` items (and `min_items + 1` children); the median and
    /// a new node with the upper half are returned.
    fn split(&mut self, min_items: usize) -> (Item<V>, Node<V>) {
        debug_assert_eq!(self.items.len(), 2 * min_items + 1);

        let right_items = self.items.split_off(min_items + 1);
        let right_children = if self.is_leaf() {
            Vec::new()
        } else {
            self.children.split_off(min_items + 1)
        };
        let Some(median) = self.items.pop() else {
            unreachable!("overflowing node has a median item");
        };

        (median, Node::from_parts(right_items, right_children))
    }

    /// Split `children[idx]` and hang the new right half at `idx + 1`,
    /// promoting the median into this node at `idx`.
    pub(crate) fn split_child(&mut self, idx: usize, min_items: usize) {
        let (median, right) = self.children[idx].split(min_items);

        tracing::trace!(
            target: "btree_kv::split",
            child = idx,
            median = %median.key,
            right_len = right.items.len(),
            "split overflowing child"
        );

        self.items.insert(idx, median);
        self.children.insert(idx + 1, right);
    }

    /// Restore `children[idx]` after it dropped below `min_items`.
    ///
    /// Prefers borrowing from the left sibling, then the right sibling, and
    /// merges with an adjacent sibling only when neither can spare an item.
    /// A merge removes one item from this node, which may leave it
    /// underflowing in turn.
    pub(crate) fn rebalance_child(&mut self, idx: usize, min_items: usize) -> Rebalance {
        let action = if idx > 0 && self.children[idx - 1].items.len() > min_items {
            self.rotate_right(idx);
            Rebalance::RotateRight
        } else if idx + 1 < self.children.len() && self.children[idx + 1].items.len() > min_items
        {
            self.rotate_left(idx);
            Rebalance::RotateLeft
        } else if idx > 0 {
            self.merge_children(idx - 1);
            Rebalance::MergeLeft
        } else {
            self.merge_children(idx);
            Rebalance::MergeRight
        };

        tracing::trace!(
            target: "btree_kv::rebalance",
            child = idx,
            ?action,
            parent_len = self.items.len(),
            "rebalanced underflowing child"
        );

        action
    }

    /// Move the separator `items[idx - 1]` down to the front of
    /// `children[idx]`, and the left sibling's last item up to replace it.
    fn rotate_right(&mut self, idx: usize) {
        let (left, rest) = self.children.split_at_mut(idx);
        let sibling = &mut left[idx - 1];
        let node = &mut rest[0];

        let Some(borrowed) = sibling.items.pop() else {
            unreachable!("rotation source has surplus items");
        };
        let separator = std::mem::replace(&mut self.items[idx - 1], borrowed);
        node.items.insert(0, separator);

        if let Some(child) = sibling.children.pop() {
            node.children.insert(0, child);
        }
    }

    /// Move the separator `items[idx]` down to the end of `children[idx]`,
    /// and the right sibling's first item up to replace it.
    fn rotate_left(&mut self, idx: usize) {
        let (left, rest) = self.children.split_at_mut(idx + 1);
        let node = &mut left[idx];
        let sibling = &mut rest[0];

        let borrowed = sibling.items.remove(0);
        let separator = std::mem::replace(&mut self.items[idx], borrowed);
        node.items.push(separator);

        if !sibling.is_leaf() {
            node.children.push(sibling.children.remove(0));
        }
    }

    /// Merge `children[left_idx + 1]` into `children[left_idx]`, pulling
    /// the separator between them down from this node.
    fn merge_children(&mut self, left_idx: usize) {
        let right = self.children.remove(left_idx + 1);
        let separator = self.items.remove(left_idx);

        let left = &mut self.children[left_idx];
        left.items.push(separator);
        left.items.extend(right.items);
        left.children.extend(right.children);
    }

    /// Detach the largest item of this subtree, appending to `path` the
    /// child index taken at every level on the way down to its leaf.
    pub(crate) fn pop_max(&mut self, path: &mut Vec<usize>) -> Option<Item<V>> {
        let mut node = self;
        while let Some(last) = node.children.len().checked_sub(1) {
            path.push(last);
            node = &mut node.children[last];
        }
        node.items.pop()
    }
}
