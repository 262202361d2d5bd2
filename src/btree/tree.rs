//! B-tree core implementation.
//!
//! This module provides the main Tree struct with operations for:
//! - find: Point lookups
//! - put: Insertions and updates
//! - remove: Removals
//!
//! Mutations descend once from the root, recording the child index taken at
//! each level, then walk that path back up to split overflowing nodes or
//! rebalance underflowing ones.

use super::node::Node;
use crate::error::{Result, TreeError};
use crate::types::{Item, TreeConfig, TreeStats};
use crate::TreeNode;

/// How `Tree::locate` treats a key that is not present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SearchMode {
    /// Report a miss as `None`
    Exact,
    /// Report the leaf and position the key would be inserted at
    Insert,
}

/// Where a key lives, or would live, in the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Location {
    /// Whether `node.items[index]` holds the key
    pub found: bool,
    /// Item index within the target node
    pub index: usize,
    /// Child indices from the root down to the target node
    pub path: Vec<usize>,
}

/// An in-memory B-tree map from string keys to values of type `V`
#[derive(Debug, Clone)]
pub struct Tree<V> {
    /// Root node (a leaf with no items when the tree is empty)
    root: Node<V>,
    /// Occupancy limits
    config: TreeConfig,
    /// Number of stored keys
    len: usize,
}

impl<V> Default for Tree<V> {
    fn default() -> Self {
        Self::with_config(TreeConfig::default())
    }
}

impl<V> Tree<V> {
    /// Create an empty tree whose non-root nodes hold between `min_items`
    /// and `2 * min_items` items
    pub fn new(min_items: usize) -> Self {
        Self::with_config(TreeConfig::new(min_items))
    }

    /// Create an empty tree with the given configuration
    pub fn with_config(config: TreeConfig) -> Self {
        Self::with_root(Node::new(), TreeConfig::new(config.min_items))
    }

    /// Wrap an existing root node. The caller is responsible for the node
    /// satisfying the tree invariants for `config`.
    pub(crate) fn with_root(root: Node<V>, config: TreeConfig) -> Self {
        let len = count_items(&root);
        Self { root, config, len }
    }

    /// Get the tree configuration
    pub fn config(&self) -> TreeConfig {
        self.config
    }

    /// Get the root node
    pub fn root(&self) -> &Node<V> {
        &self.root
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the tree holds no keys
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of levels; an empty or single-leaf tree has height 1
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut node = &self.root;
        while let Some(child) = node.children.first() {
            height += 1;
            node = child;
        }
        height
    }

    /// Look up a key and return its value
    pub fn find(&self, key: &str) -> Option<&V> {
        self.find_item(key).map(Item::value)
    }

    /// Look up a key and return the stored item
    pub fn find_item(&self, key: &str) -> Option<&Item<V>> {
        let mut node = &self.root;
        loop {
            let (found, idx) = node.locate(key);
            if found {
                return Some(&node.items[idx]);
            }
            if node.is_leaf() {
                return None;
            }
            node = &node.children[idx];
        }
    }

    /// Look up a key and return a mutable reference to its value
    pub fn find_mut(&mut self, key: &str) -> Option<&mut V> {
        let location = self.locate(key, SearchMode::Exact)?;
        let node = self.node_at_mut(&location.path);
        Some(&mut node.items[location.index].value)
    }

    /// Check if a key exists
    pub fn contains_key(&self, key: &str) -> bool {
        self.find_item(key).is_some()
    }

    /// Insert or update a key-value pair
    ///
    /// Returns the previous value when the key already existed; the tree's
    /// shape is not changed in that case.
    pub fn put(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        let Some(location) = self.locate(&key, SearchMode::Insert) else {
            unreachable!("insert-mode search always yields a location");
        };

        let node = self.node_at_mut(&location.path);
        if location.found {
            let previous = std::mem::replace(&mut node.items[location.index].value, value);
            return Some(previous);
        }

        node.items.insert(location.index, Item::new(key, value));
        self.len += 1;
        self.split_overflowing(&location.path);

        None
    }

    /// Delete a key from the tree and return its value
    ///
    /// Fails with `KeyNotFound`, leaving the tree untouched, if the key is
    /// absent.
    pub fn remove(&mut self, key: &str) -> Result<V> {
        let Some(Location {
            index, mut path, ..
        }) = self.locate(key, SearchMode::Exact)
        else {
            return Err(TreeError::key_not_found(key));
        };

        let node = self.node_at_mut(&path);
        let removed = if node.is_leaf() {
            node.items.remove(index)
        } else {
            // Swap in the in-order predecessor: the largest key under the
            // left child. Its leaf becomes the end of the rebalancing path.
            let mut descent = vec![index];
            let Some(predecessor) = node.children[index].pop_max(&mut descent) else {
                unreachable!("non-root subtree ends in a non-empty leaf");
            };
            let removed = std::mem::replace(&mut node.items[index], predecessor);
            path.extend(descent);
            removed
        };

        self.len -= 1;
        self.rebalance_underflowing(&path);

        Ok(removed.value)
    }

    /// Remove every key
    pub fn clear(&mut self) {
        self.root = Node::new();
        self.len = 0;
    }

    /// All key-value pairs in key order
    pub fn entries(&self) -> Vec<(&str, &V)> {
        let mut entries = Vec::with_capacity(self.len);
        collect_entries(&self.root, &mut entries);
        entries
    }

    /// All keys in order
    pub fn keys(&self) -> Vec<&str> {
        self.entries().into_iter().map(|(key, _)| key).collect()
    }

    /// Get statistics about the tree shape
    pub fn stats(&self) -> TreeStats {
        let (node_count, leaf_count) = count_nodes(&self.root);
        TreeStats {
            len: self.len,
            height: self.height(),
            node_count,
            leaf_count,
            min_items: self.config.min_items,
            max_items: self.config.max_items(),
        }
    }

    /// Export the tree structure (keys only) for visualization
    pub fn export(&self) -> TreeNode {
        export_node(&self.root)
    }

    /// Debug search - traces the path through the tree
    pub fn debug_find(&self, key: &str) -> Vec<String> {
        let mut trace = vec![
            format!("Searching for key: {:?}", key),
            format!("Height: {}, Keys: {}", self.height(), self.len),
        ];

        let mut node = &self.root;
        let mut depth = 0;
        loop {
            let keys: Vec<&str> = node.items.iter().map(Item::key).collect();
            trace.push(format!(
                "  Depth {}: is_leaf={}, keys={:?}",
                depth,
                node.is_leaf(),
                keys
            ));

            let (found, idx) = node.locate(key);
            if found {
                trace.push(format!("  FOUND at index {}", idx));
                return trace;
            }
            if node.is_leaf() {
                trace.push(format!("  NOT FOUND (would insert at index {})", idx));
                return trace;
            }

            trace.push(format!("  -> Descending to child {}", idx));
            node = &node.children[idx];
            depth += 1;
        }
    }

    /// Check every structural invariant, reporting the first violation
    pub fn validate(&self) -> Result<()> {
        let mut leaf_depth = None;
        let counted = validate_node(
            &self.root,
            &self.config,
            Bounds::default(),
            0,
            &mut leaf_depth,
        )?;

        if counted != self.len {
            return Err(TreeError::corruption(format!(
                "tree records {} keys but holds {}",
                self.len, counted
            )));
        }
        Ok(())
    }

    /// Descend from the root to `key`, recording the child index taken at
    /// each level
    pub(crate) fn locate(&self, key: &str, mode: SearchMode) -> Option<Location> {
        let mut node = &self.root;
        let mut path = Vec::new();
        loop {
            let (found, index) = node.locate(key);
            if found {
                return Some(Location { found, index, path });
            }
            if node.is_leaf() {
                return match mode {
                    SearchMode::Exact => None,
                    SearchMode::Insert => Some(Location { found, index, path }),
                };
            }
            path.push(index);
            node = &node.children[index];
        }
    }

    /// Follow a recorded path of child indices from the root
    fn node_at_mut(&mut self, path: &[usize]) -> &mut Node<V> {
        let mut node = &mut self.root;
        for &idx in path {
            node = &mut node.children[idx];
        }
        node
    }

    /// Walk up from the node at the end of `path`, splitting each node that
    /// holds more than `max_items`, then grow the tree if the root overflows
    fn split_overflowing(&mut self, path: &[usize]) {
        let min_items = self.config.min_items;
        let max_items = self.config.max_items();

        for depth in (1..=path.len()).rev() {
            let child_idx = path[depth - 1];
            let parent = self.node_at_mut(&path[..depth - 1]);
            if parent.children[child_idx].items.len() <= max_items {
                return;
            }
            parent.split_child(child_idx, min_items);
        }

        if self.root.items.len() > max_items {
            let old_root = std::mem::take(&mut self.root);
            self.root = Node::from_parts(Vec::new(), vec![old_root]);
            self.root.split_child(0, min_items);
            tracing::debug!(
                target: "btree_kv::height",
                height = self.height(),
                "root split, tree grew"
            );
        }
    }

    /// Walk up from the node at the end of `path`, rebalancing each node that
    /// holds fewer than `min_items`, then shrink the tree if the root emptied
    fn rebalance_underflowing(&mut self, path: &[usize]) {
        let min_items = self.config.min_items;

        for depth in (1..=path.len()).rev() {
            let child_idx = path[depth - 1];
            let parent = self.node_at_mut(&path[..depth - 1]);
            if parent.children[child_idx].items.len() >= min_items {
                return;
            }
            parent.rebalance_child(child_idx, min_items);
        }

        if self.root.items.is_empty() {
            if let Some(child) = self.root.children.pop() {
                self.root = child;
                tracing::debug!(
                    target: "btree_kv::height",
                    height = self.height(),
                    "root emptied, tree shrank"
                );
            }
        }
    }
}

/// Exclusive key range a subtree must fall inside
#[derive(Default, Clone, Copy)]
struct Bounds<'a> {
    lower: Option<&'a str>,
    upper: Option<&'a str>,
}

/// Validate a subtree, returning the number of items it holds
fn validate_node<'a, V>(
    node: &'a Node<V>,
    config: &TreeConfig,
    bounds: Bounds<'a>,
    depth: usize,
    leaf_depth: &mut Option<usize>,
) -> Result<usize> {
    let len = node.items.len();
    if len > config.max_items() {
        return Err(TreeError::corruption(format!(
            "node at depth {} holds {} items (max {})",
            depth,
            len,
            config.max_items()
        )));
    }
    if depth > 0 && len < config.min_items {
        return Err(TreeError::corruption(format!(
            "node at depth {} holds {} items (min {})",
            depth, len, config.min_items
        )));
    }

    for pair in node.items.windows(2) {
        if pair[0].key >= pair[1].key {
            return Err(TreeError::corruption(format!(
                "keys out of order: {:?} before {:?}",
                pair[0].key, pair[1].key
            )));
        }
    }
    if let (Some(lower), Some(first)) = (bounds.lower, node.items.first()) {
        if first.key.as_str() <= lower {
            return Err(TreeError::corruption(format!(
                "key {:?} not above separator {:?}",
                first.key, lower
            )));
        }
    }
    if let (Some(upper), Some(last)) = (bounds.upper, node.items.last()) {
        if last.key.as_str() >= upper {
            return Err(TreeError::corruption(format!(
                "key {:?} not below separator {:?}",
                last.key, upper
            )));
        }
    }

    if node.is_leaf() {
        match *leaf_depth {
            None => *leaf_depth = Some(depth),
            Some(expected) if expected != depth => {
                return Err(TreeError::corruption(format!(
                    "leaf at depth {} but other leaves at depth {}",
                    depth, expected
                )));
            }
            Some(_) => {}
        }
        return Ok(len);
    }

    if node.children.len() != len + 1 {
        return Err(TreeError::corruption(format!(
            "internal node at depth {} has {} items but {} children",
            depth,
            len,
            node.children.len()
        )));
    }

    let mut total = len;
    for (i, child) in node.children.iter().enumerate() {
        let child_bounds = Bounds {
            lower: if i == 0 {
                bounds.lower
            } else {
                Some(node.items[i - 1].key.as_str())
            },
            upper: if i == len {
                bounds.upper
            } else {
                Some(node.items[i].key.as_str())
            },
        };
        total += validate_node(child, config, child_bounds, depth + 1, leaf_depth)?;
    }
    Ok(total)
}

fn collect_entries<'a, V>(node: &'a Node<V>, out: &mut Vec<(&'a str, &'a V)>) {
    for (i, item) in node.items.iter().enumerate() {
        if let Some(child) = node.children.get(i) {
            collect_entries(child, out);
        }
        out.push((item.key.as_str(), &item.value));
    }
    if let Some(last) = node.children.get(node.items.len()) {
        collect_entries(last, out);
    }
}

fn count_items<V>(node: &Node<V>) -> usize {
    node.items.len() + node.children.iter().map(count_items).sum::<usize>()
}

/// Returns `(nodes, leaves)` in a subtree
fn count_nodes<V>(node: &Node<V>) -> (usize, usize) {
    if node.is_leaf() {
        return (1, 1);
    }
    node.children
        .iter()
        .map(count_nodes)
        .fold((1, 0), |(nodes, leaves), (n, l)| (nodes + n, leaves + l))
}

fn export_node<V>(node: &Node<V>) -> TreeNode {
    TreeNode {
        is_leaf: node.is_leaf(),
        keys: node.items.iter().map(|item| item.key.clone()).collect(),
        children: node.children.iter().map(export_node).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::{rngs::StdRng, SeedableRng};

    fn leaf(keys: &[&str]) -> Node<String> {
        Node::from_parts(
            keys.iter().map(|k| Item::new(*k, k.to_uppercase())).collect(),
            Vec::new(),
        )
    }

    fn root_keys<V>(tree: &Tree<V>) -> Vec<&str> {
        tree.root().items().iter().map(Item::key).collect()
    }

    fn child_keys<V>(tree: &Tree<V>, idx: usize) -> Vec<&str> {
        tree.root().children()[idx]
            .items()
            .iter()
            .map(Item::key)
            .collect()
    }

    /// Keys "a".."e" with min_items = 1: root [b, d] over [a] [c] [e]
    fn five_key_tree() -> Tree<u32> {
        let mut tree = Tree::new(1);
        for (i, key) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            tree.put(*key, i as u32);
        }
        tree
    }

    #[test]
    fn test_tree_empty() -> Result<()> {
        let tree: Tree<u32> = Tree::default();
        assert_eq!(tree.config().min_items, 128);
        assert_eq!(tree.find("key"), None);
        assert!(tree.is_empty());
        assert!(tree.root().is_leaf());
        assert_eq!(tree.height(), 1);
        tree.validate()
    }

    #[test]
    fn test_tree_single_insert() -> Result<()> {
        let mut tree = Tree::new(2);

        assert_eq!(tree.put("hello", "world"), None);
        assert_eq!(tree.find("hello"), Some(&"world"));
        assert_eq!(tree.find("other"), None);
        assert_eq!(tree.len(), 1);

        tree.validate()
    }

    #[test]
    fn test_scenario_a_split_on_third_insert() -> Result<()> {
        let mut tree = Tree::new(1);
        tree.put("b", 1);
        tree.put("a", 2);
        assert_eq!(tree.height(), 1);
        assert_eq!(root_keys(&tree), vec!["a", "b"]);

        tree.put("c", 3);
        assert_eq!(root_keys(&tree), vec!["b"]);
        assert_eq!(child_keys(&tree, 0), vec!["a"]);
        assert_eq!(child_keys(&tree, 1), vec!["c"]);

        tree.put("d", 4);
        assert_eq!(root_keys(&tree), vec!["b"]);
        assert_eq!(child_keys(&tree, 1), vec!["c", "d"]);
        assert_eq!(tree.height(), 2);

        assert_eq!(tree.find("a"), Some(&2));
        assert_eq!(tree.find("c"), Some(&3));
        assert_eq!(tree.find("d"), Some(&4));
        assert_eq!(tree.find("z"), None);
        tree.validate()
    }

    #[test]
    fn test_scenario_b_remove_underflowing_leaf() -> Result<()> {
        let mut tree = five_key_tree();
        assert_eq!(tree.height(), 2);
        assert_eq!(root_keys(&tree), vec!["b", "d"]);

        assert_eq!(tree.remove("a")?, 0);
        tree.validate()?;
        for key in ["b", "c", "d", "e"] {
            assert!(tree.find(key).is_some(), "missing {}", key);
        }
        assert_eq!(tree.find("a"), None);
        assert_eq!(tree.keys(), vec!["b", "c", "d", "e"]);
        Ok(())
    }

    #[test]
    fn test_scenario_c_remove_missing_key_is_noop() -> Result<()> {
        let mut tree = five_key_tree();
        let before = tree.export();

        let err = tree.remove("nonexistent").unwrap_err();
        assert_eq!(err, TreeError::KeyNotFound("nonexistent".to_string()));
        assert_eq!(tree.export(), before);
        assert_eq!(tree.len(), 5);

        let mut empty: Tree<u32> = Tree::new(1);
        assert!(empty.remove("a").is_err());
        empty.validate()
    }

    #[test]
    fn test_scenario_d_overwrite_keeps_shape() -> Result<()> {
        let mut tree = five_key_tree();
        let before = tree.export();

        // "d" lives in the root, "e" in a leaf
        assert_eq!(tree.put("d", 40), Some(3));
        assert_eq!(tree.put("e", 50), Some(4));
        assert_eq!(tree.put("e", 51), Some(50));

        assert_eq!(tree.find("d"), Some(&40));
        assert_eq!(tree.find("e"), Some(&51));
        assert_eq!(tree.export(), before);
        assert_eq!(tree.len(), 5);
        tree.validate()
    }

    #[test]
    fn test_rotate_right_on_remove() -> Result<()> {
        // root [c] over [a, b] [d]
        let root = Node::from_parts(
            vec![Item::new("c", "C".to_string())],
            vec![leaf(&["a", "b"]), leaf(&["d"])],
        );
        let mut tree = Tree::with_root(root, TreeConfig::new(1));
        tree.validate()?;

        tree.remove("d")?;
        assert_eq!(root_keys(&tree), vec!["b"]);
        assert_eq!(child_keys(&tree, 0), vec!["a"]);
        assert_eq!(child_keys(&tree, 1), vec!["c"]);
        tree.validate()
    }

    #[test]
    fn test_rotate_left_on_remove() -> Result<()> {
        // root [b] over [a] [c, d]
        let root = Node::from_parts(
            vec![Item::new("b", "B".to_string())],
            vec![leaf(&["a"]), leaf(&["c", "d"])],
        );
        let mut tree = Tree::with_root(root, TreeConfig::new(1));

        tree.remove("a")?;
        assert_eq!(root_keys(&tree), vec!["c"]);
        assert_eq!(child_keys(&tree, 0), vec!["b"]);
        assert_eq!(child_keys(&tree, 1), vec!["d"]);
        tree.validate()
    }

    #[test]
    fn test_merge_collapses_root() -> Result<()> {
        // root [b] over [a] [c]
        let root = Node::from_parts(
            vec![Item::new("b", "B".to_string())],
            vec![leaf(&["a"]), leaf(&["c"])],
        );
        let mut tree = Tree::with_root(root, TreeConfig::new(1));
        assert_eq!(tree.len(), 3);

        assert_eq!(tree.remove("c")?, "C");
        assert_eq!(tree.height(), 1);
        assert!(tree.root().is_leaf());
        assert_eq!(root_keys(&tree), vec!["a", "b"]);
        tree.validate()
    }

    #[test]
    fn test_remove_internal_uses_predecessor() -> Result<()> {
        let mut tree = five_key_tree();

        // "d" separates [c] and [e]; its predecessor is "c"
        assert_eq!(tree.remove("d")?, 3);
        tree.validate()?;
        assert_eq!(tree.find("d"), None);
        assert_eq!(tree.keys(), vec!["a", "b", "c", "e"]);

        let mut tree = Tree::new(1);
        for key in ["b", "a", "c", "d"] {
            tree.put(key, ());
        }
        // root [b] over [a] [c, d]: removing "b" pulls "a" up, then rotates
        tree.remove("b")?;
        assert_eq!(root_keys(&tree), vec!["c"]);
        assert_eq!(child_keys(&tree, 0), vec!["a"]);
        assert_eq!(child_keys(&tree, 1), vec!["d"]);
        tree.validate()
    }

    #[test]
    fn test_find_mut_updates_in_place() {
        let mut tree = five_key_tree();
        if let Some(value) = tree.find_mut("b") {
            *value = 99;
        }
        assert_eq!(tree.find("b"), Some(&99));
        assert_eq!(tree.find_mut("zz"), None);
    }

    #[test]
    fn test_locate_records_path() {
        let tree = five_key_tree();

        let hit = tree.locate("e", SearchMode::Exact).unwrap();
        assert!(hit.found);
        assert_eq!((hit.index, hit.path), (0, vec![2]));

        let root_hit = tree.locate("b", SearchMode::Exact).unwrap();
        assert_eq!((root_hit.index, root_hit.path), (0, vec![]));

        assert_eq!(tree.locate("bb", SearchMode::Exact), None);
        let insert = tree.locate("bb", SearchMode::Insert).unwrap();
        assert!(!insert.found);
        assert_eq!((insert.index, insert.path), (0, vec![1]));
    }

    #[test]
    fn test_many_inserts_and_removes() -> Result<()> {
        let mut tree = Tree::new(2);
        let mut keys: Vec<String> = (0..500).map(|i| format!("key{:04}", i)).collect();
        keys.shuffle(&mut StdRng::seed_from_u64(7));

        for (i, key) in keys.iter().enumerate() {
            tree.put(key.clone(), i);
        }
        tree.validate()?;
        assert_eq!(tree.len(), 500);
        assert!(tree.height() > 3);

        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(tree.keys(), sorted.iter().map(String::as_str).collect::<Vec<_>>());

        keys.shuffle(&mut StdRng::seed_from_u64(11));
        for (n, key) in keys.iter().enumerate() {
            assert!(tree.remove(key).is_ok(), "failed to remove {}", key);
            if n % 25 == 0 {
                tree.validate()?;
            }
        }

        assert!(tree.is_empty());
        assert!(tree.root().is_leaf());
        assert!(tree.root().is_empty());
        tree.validate()
    }

    #[test]
    fn test_stats_and_export() {
        let tree = five_key_tree();
        let stats = tree.stats();
        assert_eq!(stats.len, 5);
        assert_eq!(stats.height, 2);
        assert_eq!(stats.node_count, 4);
        assert_eq!(stats.leaf_count, 3);
        assert_eq!((stats.min_items, stats.max_items), (1, 2));

        let exported = tree.export();
        assert!(!exported.is_leaf);
        assert_eq!(exported.keys, vec!["b", "d"]);
        assert_eq!(exported.children.len(), 3);
        assert_eq!(exported.children[2].keys, vec!["e"]);
    }

    #[test]
    fn test_debug_find_trace() {
        let tree = five_key_tree();
        let trace = tree.debug_find("c");
        assert!(trace.iter().any(|line| line.contains("Descending to child 1")));
        assert_eq!(trace.last().map(String::as_str), Some("  FOUND at index 0"));

        let miss = tree.debug_find("cc");
        assert!(miss.last().unwrap().contains("NOT FOUND"));
    }

    #[test]
    fn test_validate_detects_corruption() {
        // leaves at different depths
        let root = Node::from_parts(
            vec![Item::new("b", "B".to_string())],
            vec![
                leaf(&["a"]),
                Node::from_parts(
                    vec![Item::new("d", "D".to_string())],
                    vec![leaf(&["c"]), leaf(&["e"])],
                ),
            ],
        );
        let tree = Tree::with_root(root, TreeConfig::new(1));
        assert!(matches!(tree.validate(), Err(TreeError::Corruption(_))));

        // key on the wrong side of its separator
        let root = Node::from_parts(
            vec![Item::new("b", "B".to_string())],
            vec![leaf(&["c"]), leaf(&["d"])],
        );
        let tree = Tree::with_root(root, TreeConfig::new(1));
        assert!(tree.validate().is_err());
    }

    #[test]
    fn test_clear() -> Result<()> {
        let mut tree = five_key_tree();
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 1);
        tree.validate()
    }
}
