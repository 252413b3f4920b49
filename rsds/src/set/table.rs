//! Pure, unsynchronized bucket table shared by the concurrent set variants.
//!
//! `Table` knows nothing about locking; every caller in this crate is
//! responsible for holding whatever locks its variant prescribes before
//! touching a bucket.

use std::hash::{BuildHasher, Hash, Hasher};

/// An indexed sequence of buckets. Key `k` lives in bucket `hash(k) mod
/// bucket_count`.
pub(crate) struct Table<K> {
    buckets: Vec<Vec<K>>,
}

impl<K> Table<K> {
    /// Builds a table of `bucket_count` empty buckets.
    ///
    /// # Panics
    /// Panics if `bucket_count` is zero — a set must always have at least
    /// one bucket.
    pub(crate) fn new(bucket_count: usize) -> Self {
        assert!(bucket_count > 0, "bucket_count must be positive");
        Table {
            buckets: (0..bucket_count).map(|_| Vec::new()).collect(),
        }
    }

    pub(crate) fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// `hash mod bucket_count`.
    pub(crate) fn locate(&self, hash: u64) -> usize {
        (hash as usize) % self.buckets.len()
    }

}

impl<K: Eq> Table<K> {
    pub(crate) fn bucket_contains(&self, index: usize, key: &K) -> bool {
        self.buckets[index].iter().any(|k| k == key)
    }

    /// Appends `key` to bucket `index`. The caller must have already checked
    /// that the key is absent.
    pub(crate) fn bucket_insert(&mut self, index: usize, key: K) {
        self.buckets[index].push(key);
    }

    /// Removes the first occurrence of `key` from bucket `index`, returning
    /// whether it was found.
    pub(crate) fn bucket_remove(&mut self, index: usize, key: &K) -> bool {
        let bucket = &mut self.buckets[index];
        if let Some(pos) = bucket.iter().position(|k| k == key) {
            bucket.remove(pos);
            true
        } else {
            false
        }
    }
}

impl<K: Hash> Table<K> {
    /// Allocates a fresh table of `new_count` buckets and redistributes every
    /// key from `self` by `hash(k) mod new_count`.
    pub(crate) fn rehash_to<S: BuildHasher>(self, new_count: usize, hasher: &S) -> Table<K> {
        let mut new_table = Table::new(new_count);
        for bucket in self.buckets {
            for key in bucket {
                let h = hash_key(hasher, &key);
                let idx = new_table.locate(h);
                new_table.bucket_insert(idx, key);
            }
        }
        new_table
    }
}

/// Hashes `key` with `hasher`'s algorithm, the way every variant in this
/// crate locates a key's bucket and lock.
pub(crate) fn hash_key<K: Hash, S: BuildHasher>(hasher: &S, key: &K) -> u64 {
    let mut state = hasher.build_hasher();
    key.hash(&mut state);
    state.finish()
}

/// Whether a table of `bucket_count` buckets holding `elem_count` keys should
/// double: `elem_count / bucket_count > 4`, using integer division so the
/// resize triggers only once the load factor strictly exceeds 4.
pub(crate) fn should_resize(elem_count: usize, bucket_count: usize) -> bool {
    elem_count / bucket_count > super::RESIZE_LOAD_FACTOR
}
