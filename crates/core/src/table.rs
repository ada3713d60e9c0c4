use std::{
    hash::Hash,
    ops::{Deref, DerefMut},
};

use ahash::{HashMap, HashMapExt};

/// The default `HashMap` is created without allocating capacity. To avoid
/// early resizes for typical registry workloads, this wraps `ahash::HashMap`
/// and pre-allocates the configured capacity up front.
pub struct Table<K, V> {
    inner: HashMap<K, V>,
    capacity_hint: usize,
}

impl<K, V> Table<K, V> {
    pub fn with_capacity(capacity_hint: usize) -> Self {
        Self {
            inner: HashMap::with_capacity(capacity_hint),
            capacity_hint,
        }
    }
}

impl<K, V> Deref for Table<K, V> {
    type Target = HashMap<K, V>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<K, V> DerefMut for Table<K, V> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl<K, V> Table<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Snapshot of every key currently present.
    ///
    /// Used for the bulk-cancel "snapshot-then-act" traversal: collect
    /// first, mutate after, so removal never invalidates an in-progress
    /// traversal.
    pub fn snapshot_keys(&self) -> Vec<K> {
        self.inner.keys().cloned().collect()
    }
}

impl<K, V> Default for Table<K, V> {
    fn default() -> Self {
        Self::with_capacity(8192)
    }
}
