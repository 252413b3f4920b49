use std::cell::{Cell, RefCell};
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash};

use super::table::{hash_key, should_resize, Table};
use super::ConcurrentSet;

/// An unsynchronized set: no locking, not `Sync` (by way of `RefCell`).
///
/// Used as the single-threaded baseline and as a reference oracle that the
/// concurrent variants' tests compare against. `remove` mutates the stored
/// bucket directly rather than a local copy of it.
pub struct SequentialSet<K, S = RandomState> {
    table: RefCell<Table<K>>,
    elem_count: Cell<usize>,
    hasher: S,
}

impl<K> SequentialSet<K, RandomState>
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

impl<K, S> SequentialSet<K, S>
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
        SequentialSet {
            table: RefCell::new(Table::new(initial_capacity)),
            elem_count: Cell::new(0),
            hasher,
        }
    }

    fn hash(&self, key: &K) -> u64 {
        hash_key(&self.hasher, key)
    }
}

impl<K, S> ConcurrentSet<K> for SequentialSet<K, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn add(&self, key: K) -> bool {
        let hash = self.hash(&key);
        let mut table = self.table.borrow_mut();

        let idx = table.locate(hash);
        if table.bucket_contains(idx, &key) {
            return false;
        }
        table.bucket_insert(idx, key);
        self.elem_count.set(self.elem_count.get() + 1);

        if should_resize(self.elem_count.get(), table.bucket_count()) {
            let new_count = table.bucket_count() * 2;
            let old_table = std::mem::replace(&mut *table, Table::new(1));
            *table = old_table.rehash_to(new_count, &self.hasher);
        }
        true
    }

    fn remove(&self, key: K) -> bool {
        let hash = self.hash(&key);
        let mut table = self.table.borrow_mut();
        let idx = table.locate(hash);
        // Mutates the bucket stored in `self.table` directly, not a copy of
        // it — removing from a local copy and discarding the result would
        // silently leave the key in place.
        if table.bucket_remove(idx, &key) {
            let count = self.elem_count.get();
            debug_assert!(count > 0);
            self.elem_count.set(count - 1);
            true
        } else {
            false
        }
    }

    fn contains(&self, key: K) -> bool {
        let hash = self.hash(&key);
        let table = self.table.borrow();
        let idx = table.locate(hash);
        table.bucket_contains(idx, &key)
    }

    fn size(&self) -> usize {
        self.elem_count.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::set::test_support::insert_contains_remove;

    #[test]
    fn add_remove_contains_round_trip() {
        let set = SequentialSet::new(4);
        assert!(set.add(1));
        assert!(!set.add(1));
        assert!(set.remove(1));
        assert!(!set.contains(1));
        assert!(!set.remove(1));
    }

    #[test]
    fn remove_mutates_stored_bucket() {
        let set = SequentialSet::new(1);
        assert!(set.add(1));
        assert!(set.add(2));
        assert!(set.remove(1));
        // If `remove` had operated on a copy of the bucket rather than the
        // stored one, `1` would still be observable here.
        assert!(!set.contains(1));
        assert!(set.contains(2));
        assert_eq!(set.size(), 1);
    }

    #[test]
    fn resize_doubles_and_preserves_contents() {
        let set = SequentialSet::new(2);
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
        let set = SequentialSet::new(4);
        let elems: Vec<usize> = (0..10_000).collect();
        insert_contains_remove(&set, &elems);
    }
}
