//! Key/value item stored in tree nodes.

use std::fmt;

/// A key and its value.
///
/// Items are ordered by key alone; two items with the same key are never
/// stored in the same tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item<V> {
    pub(crate) key: String,
    pub(crate) value: V,
}

impl<V> Item<V> {
    /// Create a new item
    pub fn new(key: impl Into<String>, value: V) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Get the key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the value
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Split the item into its key and value
    pub fn into_parts(self) -> (String, V) {
        (self.key, self.value)
    }
}

impl<V: fmt::Debug> fmt::Display for Item<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={:?}", self.key, self.value)
    }
}
