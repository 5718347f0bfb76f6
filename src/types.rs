use std::{
    collections::HashMap,
    sync::{Arc, RwLock, RwLockWriteGuard},
};

use crate::utils::HandyRwLock;

// Type alias, not a new type, so the underlying Arc/RwLock api stays
// available to callers.
pub type Pod<T> = Arc<RwLock<T>>;

/// A hash map behind a read-write lock. Single-key operations take the lock
/// internally; multi-step sections (capacity checks, eviction) go through
/// `get_inner_wl` so they see one consistent view.
pub struct ConcurrentHashMap<K, V> {
    map: Arc<RwLock<HashMap<K, V>>>,
}

impl<K, V> ConcurrentHashMap<K, V>
where
    K: std::cmp::Eq + std::hash::Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            map: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn get_inner_wl(&self) -> RwLockWriteGuard<HashMap<K, V>> {
        self.map.wl()
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.map.rl().get(key).cloned()
    }

    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.map.wl().insert(key, value)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.map.wl().remove(key)
    }

    pub fn keys(&self) -> Vec<K> {
        self.map.rl().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.map.rl().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.map.wl().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        let map: ConcurrentHashMap<u32, u32> = ConcurrentHashMap::new();
        assert!(map.is_empty());

        map.insert(1, 10);
        map.insert(2, 20);
        assert_eq!(map.get(&1), Some(10));
        assert_eq!(map.len(), 2);

        map.remove(&1);
        assert_eq!(map.get(&1), None);

        map.clear();
        assert!(map.is_empty());
    }
}
