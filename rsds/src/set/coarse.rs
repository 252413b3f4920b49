use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash};
use std::sync::Mutex;

use super::table::{hash_key, should_resize, Table};
use super::ConcurrentSet;

struct Inner<K> {
    table: Table<K>,
    elem_count: usize,
}

/// A concurrent set guarded by a single mutex.
///
/// Every operation acquires the mutex on entry and holds it for the whole
/// critical section, including any resize triggered by [`add`](Self::add).
/// Exclusive ownership of all mutable state by one lock trivially linearizes
/// every operation against every other.
pub struct CoarseSet<K, S = RandomState> {
    inner: Mutex<Inner<K>>,
    hasher: S,
}

impl<K> CoarseSet<K, RandomState>
where
    K: Hash + Eq,
{
    /// Creates a set with `initial_capacity` buckets.
    ///
    /// # Panics
    /// Panics if `initial_capacity` is zero.
    pub fn new(initial_capacity: usize) -> Self {
        Self::with_hasher(initial_capacity, RandomState::default())
    }
}

impl<K, S> CoarseSet<K, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Creates a set with `initial_capacity` buckets and a given hasher.
    ///
    /// # Panics
    /// Panics if `initial_capacity` is zero.
    pub fn with_hasher(initial_capacity: usize, hasher: S) -> Self {
        assert!(initial_capacity > 0, "initial_capacity must be positive");
        CoarseSet {
            inner: Mutex::new(Inner {
                table: Table::new(initial_capacity),
                elem_count: 0,
            }),
            hasher,
        }
    }

    fn hash(&self, key: &K) -> u64 {
        hash_key(&self.hasher, key)
    }
}

impl<K, S> ConcurrentSet<K> for CoarseSet<K, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn add(&self, key: K) -> bool {
        let hash = self.hash(&key);
        let mut guard = self.inner.lock().unwrap();

        let idx = guard.table.locate(hash);
        if guard.table.bucket_contains(idx, &key) {
            return false;
        }
        guard.table.bucket_insert(idx, key);
        guard.elem_count += 1;

        if should_resize(guard.elem_count, guard.table.bucket_count()) {
            let new_count = guard.table.bucket_count() * 2;
            let old_table = std::mem::replace(&mut guard.table, Table::new(1));
            guard.table = old_table.rehash_to(new_count, &self.hasher);
        }
        true
    }

    fn remove(&self, key: K) -> bool {
        let hash = self.hash(&key);
        let mut guard = self.inner.lock().unwrap();

        let idx = guard.table.locate(hash);
        if guard.table.bucket_remove(idx, &key) {
            debug_assert!(guard.elem_count > 0);
            guard.elem_count -= 1;
            true
        } else {
            false
        }
    }

    fn contains(&self, key: K) -> bool {
        let hash = self.hash(&key);
        let guard = self.inner.lock().unwrap();
        let idx = guard.table.locate(hash);
        guard.table.bucket_contains(idx, &key)
    }

    fn size(&self) -> usize {
        self.inner.lock().unwrap().elem_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::set::test_support::{concurrent_round_trip, insert_contains_remove};
    use std::sync::Arc;

    #[test]
    fn add_remove_contains_round_trip() {
        let set = CoarseSet::new(4);
        assert!(set.add(1));
        assert!(!set.add(1));
        assert!(set.remove(1));
        assert!(!set.contains(1));
        assert!(!set.remove(1));
    }

    #[test]
    fn add_add_remove_contains_returns_true_false_true_false() {
        let set = CoarseSet::new(4);
        assert!(set.add(1));
        assert!(!set.add(1));
        assert!(set.remove(1));
        assert!(!set.contains(1));
        assert_eq!(set.size(), 0);
    }

    #[test]
    fn resize_is_transparent() {
        let set = CoarseSet::new(2);
        for i in 0..1000 {
            assert!(set.add(i));
        }
        assert_eq!(set.size(), 1000);
        for i in 0..1000 {
            assert!(set.contains(i));
        }
    }

    #[test]
    fn single_threaded_round_trip() {
        let set = CoarseSet::new(4);
        let elems: Vec<usize> = (0..10_000).collect();
        insert_contains_remove(&set, &elems);
    }

    #[test]
    fn no_loss_concurrency() {
        let set = Arc::new(CoarseSet::new(4));
        concurrent_round_trip(set, (0..10_000).collect(), 8);
    }
}
