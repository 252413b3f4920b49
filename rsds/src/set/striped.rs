use std::cell::UnsafeCell;
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};
use std::sync::Mutex;

use crossbeam::utils::CachePadded;

use super::table::{hash_key, should_resize};
use super::ConcurrentSet;

/// A `Table` whose buckets are individually interior-mutable.
///
/// Safety rests on the locking discipline of [`StripedSet`]: a bucket is
/// never touched without first holding the striped lock that covers it
/// (`bucket_index mod lock_count`), and the whole array is never replaced
/// without holding every striped lock. `K: Send` is therefore sufficient for
/// `Sync` — access is always serialized by a `Mutex`, never truly shared.
struct BucketArray<K> {
    buckets: Vec<UnsafeCell<Vec<K>>>,
}

unsafe impl<K: Send> Sync for BucketArray<K> {}

impl<K> BucketArray<K> {
    fn new(bucket_count: usize) -> Self {
        BucketArray {
            buckets: (0..bucket_count).map(|_| UnsafeCell::new(Vec::new())).collect(),
        }
    }

    fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// # Safety
    /// The caller must hold the striped lock covering `index` (or, for a
    /// resize, every striped lock).
    #[allow(clippy::mut_from_ref)]
    unsafe fn bucket_mut(&self, index: usize) -> &mut Vec<K> {
        &mut *self.buckets[index].get()
    }
}

/// A concurrent set guarded by a fixed-size array of mutexes.
///
/// `lock_count` is fixed at construction (`initial_bucket_count`) and never
/// changes; `bucket_count` doubles as the set grows, so each lock comes to
/// cover multiple buckets (`bucket mod lock_count`). Every operation holds
/// the lock for its key's bucket; a resize acquires every lock, in index
/// order, before replacing the bucket array wholesale — an easier problem
/// than the refinable variant's, since the *lock* array here never moves.
pub struct StripedSet<K, S = RandomState> {
    locks: Vec<Mutex<()>>,
    buckets: CachePadded<AtomicPtr<BucketArray<K>>>,
    bucket_count: CachePadded<AtomicUsize>,
    elem_count: CachePadded<AtomicUsize>,
    hasher: S,
    // `AtomicPtr<BucketArray<K>>` is Send/Sync for any K (it never
    // dereferences on its own), so without this marker the compiler would
    // auto-derive Send/Sync for `StripedSet<K, _>` even when K is not Send.
    // This ties those auto traits back to K the way `Mutex<K>` would.
    _marker: PhantomData<K>,
}

impl<K> StripedSet<K, RandomState>
where
    K: Hash + Eq + Send,
{
    /// Creates a set with `initial_capacity` buckets and locks.
    ///
    /// # Panics
    /// Panics if `initial_capacity` is zero.
    pub fn new(initial_capacity: usize) -> Self {
        Self::with_hasher(initial_capacity, RandomState::default())
    }
}

impl<K, S> StripedSet<K, S>
where
    K: Hash + Eq + Send,
    S: BuildHasher,
{
    /// Creates a set with `initial_capacity` buckets and locks, and a given
    /// hasher.
    ///
    /// # Panics
    /// Panics if `initial_capacity` is zero.
    pub fn with_hasher(initial_capacity: usize, hasher: S) -> Self {
        assert!(initial_capacity > 0, "initial_capacity must be positive");
        let locks = (0..initial_capacity).map(|_| Mutex::new(())).collect();
        let buckets = Box::into_raw(Box::new(BucketArray::new(initial_capacity)));
        StripedSet {
            locks,
            buckets: CachePadded::new(AtomicPtr::new(buckets)),
            bucket_count: CachePadded::new(AtomicUsize::new(initial_capacity)),
            elem_count: CachePadded::new(AtomicUsize::new(0)),
            hasher,
            _marker: PhantomData,
        }
    }

    /// Number of locks (fixed for the lifetime of the set).
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    fn hash(&self, key: &K) -> u64 {
        hash_key(&self.hasher, key)
    }

    fn lock_index(&self, hash: u64) -> usize {
        (hash as usize) % self.locks.len()
    }

    fn bucket_array(&self) -> &BucketArray<K> {
        // SAFETY: the pointer always refers to a live, fully-initialized
        // `BucketArray` allocated by `Box::into_raw` in `with_hasher` or
        // `maybe_resize`; it is only ever replaced (never freed) while every
        // lock is held, and every reader here holds at least one lock.
        unsafe { &*self.buckets.load(Ordering::Acquire) }
    }

    /// Re-checks the load factor and, if it is still exceeded, doubles the
    /// bucket array. Acquires every lock in index order (a fixed total order,
    /// so this can never deadlock against a per-key operation holding one
    /// lock) to guarantee no concurrent bucket access during the swap.
    fn maybe_resize(&self) {
        // Reads `bucket_count` lock-free, so it must come from its own
        // atomic rather than from dereferencing `buckets` — the pointed-to
        // `BucketArray` can be freed by a concurrent resize the instant
        // after it is loaded, with no lock held here to prevent that.
        let old_count = self.bucket_count.load(Ordering::Relaxed);
        if !should_resize(self.elem_count.load(Ordering::Relaxed), old_count) {
            return;
        }

        let _guards: Vec<_> = self.locks.iter().map(|l| l.lock().unwrap()).collect();

        if self.bucket_count.load(Ordering::Relaxed) != old_count {
            // Another thread already won this resize.
            return;
        }

        let current = self.bucket_array();
        let new_count = old_count * 2;
        let new_array = BucketArray::new(new_count);
        for bucket_cell in &current.buckets {
            // SAFETY: every lock is held, so no other thread can be touching
            // any bucket.
            let bucket = unsafe { &mut *bucket_cell.get() };
            for key in bucket.drain(..) {
                let hash = self.hash(&key);
                let idx = (hash as usize) % new_count;
                // SAFETY: `new_array` is not yet visible to any other
                // thread.
                unsafe { new_array.bucket_mut(idx) }.push(key);
            }
        }

        let new_ptr = Box::into_raw(Box::new(new_array));
        let old_ptr = self.buckets.swap(new_ptr, Ordering::Release);
        // `bucket_count` is updated while every lock is still held, the same
        // exclusion window that makes the pointer swap itself safe.
        self.bucket_count.store(new_count, Ordering::Relaxed);
        // SAFETY: `old_ptr` was allocated by `Box::into_raw` and is no longer
        // reachable from `self.buckets`; every lock (hence every potential
        // reader) is held by this thread right now.
        drop(unsafe { Box::from_raw(old_ptr) });
    }
}

impl<K, S> ConcurrentSet<K> for StripedSet<K, S>
where
    K: Hash + Eq + Send,
    S: BuildHasher,
{
    fn add(&self, key: K) -> bool {
        let hash = self.hash(&key);
        let lock_idx = self.lock_index(hash);

        let inserted = {
            let _guard = self.locks[lock_idx].lock().unwrap();
            let array = self.bucket_array();
            let bucket_idx = (hash as usize) % array.bucket_count();
            // SAFETY: `_guard` covers `bucket_idx` (`bucket_idx mod
            // lock_count == lock_idx`).
            let bucket = unsafe { array.bucket_mut(bucket_idx) };
            if bucket.iter().any(|k| k == &key) {
                false
            } else {
                bucket.push(key);
                true
            }
        };

        if inserted {
            self.elem_count.fetch_add(1, Ordering::Relaxed);
            self.maybe_resize();
        }
        inserted
    }

    fn remove(&self, key: K) -> bool {
        let hash = self.hash(&key);
        let lock_idx = self.lock_index(hash);

        let removed = {
            let _guard = self.locks[lock_idx].lock().unwrap();
            let array = self.bucket_array();
            let bucket_idx = (hash as usize) % array.bucket_count();
            // SAFETY: see `add`.
            let bucket = unsafe { array.bucket_mut(bucket_idx) };
            if let Some(pos) = bucket.iter().position(|k| k == &key) {
                bucket.remove(pos);
                true
            } else {
                false
            }
        };
        if removed {
            self.elem_count.fetch_sub(1, Ordering::Relaxed);
        }
        removed
    }

    fn contains(&self, key: K) -> bool {
        let hash = self.hash(&key);
        let lock_idx = self.lock_index(hash);

        let _guard = self.locks[lock_idx].lock().unwrap();
        let array = self.bucket_array();
        let bucket_idx = (hash as usize) % array.bucket_count();
        // SAFETY: see `add`. Only shared access is taken here even though
        // `bucket_mut` is `&mut` — the striped lock makes this the sole
        // accessor regardless.
        let bucket = unsafe { array.bucket_mut(bucket_idx) };
        bucket.iter().any(|k| k == &key)
    }

    fn size(&self) -> usize {
        self.elem_count.load(Ordering::Relaxed)
    }
}

impl<K, S> Drop for StripedSet<K, S> {
    fn drop(&mut self) {
        let ptr = self.buckets.load(Ordering::Acquire);
        // SAFETY: `self` is being dropped, so no other thread can hold a
        // reference into `ptr` any more.
        drop(unsafe { Box::from_raw(ptr) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::set::test_support::{concurrent_round_trip, insert_contains_remove};
    use std::sync::Arc;

    #[test]
    fn add_remove_contains_round_trip() {
        let set = StripedSet::new(4);
        assert!(set.add(1));
        assert!(!set.add(1));
        assert!(set.remove(1));
        assert!(!set.contains(1));
        assert!(!set.remove(1));
    }

    #[test]
    fn lock_count_is_stable_across_resizes() {
        let set = StripedSet::new(4);
        for i in 0..1000 {
            set.add(i);
        }
        assert_eq!(set.lock_count(), 4);
        assert_eq!(set.size(), 1000);
        for i in 0..1000 {
            assert!(set.contains(i));
        }
    }

    #[test]
    fn single_threaded_round_trip() {
        let set = StripedSet::new(4);
        let elems: Vec<usize> = (0..10_000).collect();
        insert_contains_remove(&set, &elems);
    }

    #[test]
    fn no_loss_concurrency() {
        let set = Arc::new(StripedSet::new(4));
        concurrent_round_trip(set, (0..10_000).collect(), 8);
    }

    #[test]
    fn two_threads_disjoint_ranges_preserve_lock_count() {
        let set = Arc::new(StripedSet::new(4));
        let a = {
            let set = set.clone();
            std::thread::spawn(move || {
                for i in 0..500usize {
                    set.add(i);
                }
            })
        };
        let b = {
            let set = set.clone();
            std::thread::spawn(move || {
                for i in 500..1000usize {
                    set.add(i);
                }
            })
        };
        a.join().unwrap();
        b.join().unwrap();

        assert_eq!(set.lock_count(), 4);
        for i in 0..1000 {
            assert!(set.contains(i));
        }
    }
}
