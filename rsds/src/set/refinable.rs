use std::cell::UnsafeCell;
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crossbeam::utils::CachePadded;

use super::table::{hash_key, should_resize};
use super::ConcurrentSet;

/// The table and its per-bucket locks, replaced as one unit on every resize.
///
/// `locks.len() == buckets.len()` always: the lock array is rebuilt in
/// lockstep with the table on every resize, unlike
/// [`StripedSet`](super::StripedSet)'s fixed-width array.
struct Inner<K> {
    buckets: Vec<UnsafeCell<Vec<K>>>,
    locks: Vec<Mutex<()>>,
}

/// # Safety
/// A bucket is never touched without first holding its own `locks[i]`
/// (enforced by every method below), so sharing `&Inner` across threads is
/// sound whenever `K: Send` — the same reasoning as `Mutex<K>: Sync`.
unsafe impl<K: Send> Sync for Inner<K> {}

impl<K> Inner<K> {
    fn new(bucket_count: usize) -> Self {
        Inner {
            buckets: (0..bucket_count).map(|_| UnsafeCell::new(Vec::new())).collect(),
            locks: (0..bucket_count).map(|_| Mutex::new(())).collect(),
        }
    }

    fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// # Safety
    /// The caller must hold `self.locks[index]`.
    #[allow(clippy::mut_from_ref)]
    unsafe fn bucket_mut(&self, index: usize) -> &mut Vec<K> {
        &mut *self.buckets[index].get()
    }
}

/// A concurrent set whose per-bucket lock array grows in step with the
/// table.
///
/// Because the lock array itself is the thing a resize must replace, an
/// operation cannot simply "acquire a lock, then use the bucket" — the lock
/// it picked might belong to an array that a resize is about to discard. The
/// fix is two-level synchronization:
///
/// 1. a reader/writer **resize gate** (here, `gate: RwLock<Arc<Inner<K>>>`):
///    every per-key operation holds the *read* side for its whole critical
///    section, which is also how it obtains a stable reference to the
///    current `Inner` (table + locks); a resize takes the *write* side,
///    which by `RwLock`'s own contract cannot succeed while any read guard is
///    outstanding;
/// 2. the per-bucket `Mutex` within that `Inner`, locked only after the gate
///    is held, so that concurrent operations on different buckets don't
///    serialize against each other.
///
/// Because the gate's read guard is held for a per-key operation's entire
/// critical section, and `Inner` is reached only by `Arc::clone`-free deref
/// through that guard, `bucket_count` and the lock array identity are
/// provably immutable for as long as any read guard is alive — that
/// immutability falls out of `RwLock`'s own semantics rather than needing a
/// hand-rolled refcount.
pub struct RefinableSet<K, S = RandomState> {
    gate: RwLock<Arc<Inner<K>>>,
    elem_count: CachePadded<AtomicUsize>,
    hasher: S,
    _marker: PhantomData<K>,
}

impl<K> RefinableSet<K, RandomState>
where
    K: Hash + Eq + Send + Sync,
{
    /// Creates a set with `initial_capacity` buckets and locks.
    ///
    /// # Panics
    /// Panics if `initial_capacity` is zero.
    pub fn new(initial_capacity: usize) -> Self {
        Self::with_hasher(initial_capacity, RandomState::default())
    }
}

impl<K, S> RefinableSet<K, S>
where
    K: Hash + Eq + Send + Sync,
    S: BuildHasher,
{
    /// Creates a set with `initial_capacity` buckets and locks, and a given
    /// hasher.
    ///
    /// # Panics
    /// Panics if `initial_capacity` is zero.
    pub fn with_hasher(initial_capacity: usize, hasher: S) -> Self {
        assert!(initial_capacity > 0, "initial_capacity must be positive");
        RefinableSet {
            gate: RwLock::new(Arc::new(Inner::new(initial_capacity))),
            elem_count: CachePadded::new(AtomicUsize::new(0)),
            hasher,
            _marker: PhantomData,
        }
    }

    /// Current number of buckets (and locks — they are always equal).
    pub fn bucket_count(&self) -> usize {
        self.gate.read().unwrap().bucket_count()
    }

    fn hash(&self, key: &K) -> u64 {
        hash_key(&self.hasher, key)
    }

    /// Re-evaluates the load factor and, if still exceeded, doubles the
    /// table and rebuilds the lock array to match.
    fn maybe_resize(&self) {
        let old_count = {
            // Step 1: snapshot `old_count` under a shared lease.
            let lease = self.gate.read().unwrap();
            lease.bucket_count()
        };
        if !should_resize(self.elem_count.load(Ordering::Relaxed), old_count) {
            return;
        }

        // Step 2: take the exclusive lease. Blocks until every shared lease
        // (every in-flight per-key operation) has dropped its read guard.
        let mut writer = self.gate.write().unwrap();

        // Step 3: another resize may have already won this race.
        if writer.bucket_count() != old_count {
            return;
        }

        // Step 4: quiesce. The exclusive lease alone already guarantees no
        // per-key operation is in flight; this additional lock/unlock pass
        // is a defensive barrier documenting that invariant rather than a
        // load-bearing one.
        for lock in writer.locks.iter() {
            drop(lock.lock().unwrap());
        }

        // Step 5: build the doubled table and lock array, rehash every key,
        // then install the new `Inner` as a single atomic swap of the `Arc`.
        let new_count = old_count * 2;
        let new_inner = Inner::new(new_count);
        for bucket_cell in &writer.buckets {
            // SAFETY: every lock was just quiesced and the exclusive lease is
            // still held, so no other thread can be touching any bucket.
            let bucket = unsafe { &mut *bucket_cell.get() };
            for key in bucket.drain(..) {
                let hash = self.hash(&key);
                let idx = (hash as usize) % new_count;
                // SAFETY: `new_inner` is not yet reachable from any other
                // thread.
                unsafe { new_inner.bucket_mut(idx) }.push(key);
            }
        }
        *writer = Arc::new(new_inner);
        // Step 6: the exclusive lease is released when `writer` drops here.
    }
}

impl<K, S> ConcurrentSet<K> for RefinableSet<K, S>
where
    K: Hash + Eq + Send + Sync,
    S: BuildHasher,
{
    fn add(&self, key: K) -> bool {
        let hash = self.hash(&key);

        let inserted = {
            // Acquire step 1-3: shared lease, then the bucket's own lock.
            let lease = self.gate.read().unwrap();
            let bucket_count = lease.bucket_count();
            let idx = (hash as usize) % bucket_count;
            let _bucket_guard = lease.locks[idx].lock().unwrap();
            // SAFETY: `_bucket_guard` covers exactly bucket `idx`.
            let bucket = unsafe { lease.bucket_mut(idx) };
            if bucket.iter().any(|k| k == &key) {
                false
            } else {
                bucket.push(key);
                true
            }
            // Release: the bucket guard, then the shared lease, drop here.
        };

        if inserted {
            self.elem_count.fetch_add(1, Ordering::Relaxed);
            self.maybe_resize();
        }
        inserted
    }

    fn remove(&self, key: K) -> bool {
        let hash = self.hash(&key);

        let removed = {
            let lease = self.gate.read().unwrap();
            let bucket_count = lease.bucket_count();
            let idx = (hash as usize) % bucket_count;
            let _bucket_guard = lease.locks[idx].lock().unwrap();
            // SAFETY: see `add`.
            let bucket = unsafe { lease.bucket_mut(idx) };
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

        let lease = self.gate.read().unwrap();
        let bucket_count = lease.bucket_count();
        let idx = (hash as usize) % bucket_count;
        let _bucket_guard = lease.locks[idx].lock().unwrap();
        // SAFETY: see `add`.
        let bucket = unsafe { lease.bucket_mut(idx) };
        bucket.iter().any(|k| k == &key)
    }

    fn size(&self) -> usize {
        self.elem_count.load(Ordering::Relaxed)
    }
}
