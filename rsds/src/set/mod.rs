//! Concurrent set data structures over hashable keys.
//!
//! Four variants share one [`ConcurrentSet`] contract and differ only in how
//! they synchronize access to the underlying [`table`]: [`CoarseSet`] behind
//! one mutex, [`StripedSet`] behind a fixed-width lock array, [`RefinableSet`]
//! behind a lock array that grows with the table, and [`SequentialSet`] with
//! no synchronization at all (a single-threaded reference oracle).

mod coarse;
mod refinable;
mod sequential;
mod striped;
pub(crate) mod table;

pub use coarse::CoarseSet;
pub use refinable::RefinableSet;
pub use sequential::SequentialSet;
pub use striped::StripedSet;

/// Common behavior shared by every set variant in this crate.
///
/// Keys are taken and returned by value rather than by reference: the set is
/// meant for small, cheaply-copyable keys (integers, short strings), not
/// large owned types, so callers are expected to `clone()` a key before an
/// operation if they still need it afterwards.
pub trait ConcurrentSet<K> {
    /// Inserts `key` if it is absent.
    ///
    /// Returns `true` if `key` was absent (and is now present), `false` if it
    /// was already present (in which case the set is unchanged).
    fn add(&self, key: K) -> bool;

    /// Removes `key` if it is present.
    ///
    /// Returns `true` if `key` was present (and is now absent), `false` if it
    /// was already absent.
    fn remove(&self, key: K) -> bool;

    /// Returns whether `key` is currently present.
    fn contains(&self, key: K) -> bool;

    /// Returns the number of keys currently in the set.
    ///
    /// For the concurrent variants this is a best-effort snapshot: it is
    /// correct at some instant during the call but is not linearizable with
    /// concurrent `add`/`remove` calls (see the crate-level concurrency
    /// notes on each variant).
    fn size(&self) -> usize;
}

/// A resize doubles `bucket_count` once the load factor strictly exceeds this
/// threshold: `elem_count / bucket_count > RESIZE_LOAD_FACTOR`, using integer
/// division so the trigger fires only once the ratio passes 4, not at 4
/// itself.
pub(crate) const RESIZE_LOAD_FACTOR: usize = 4;
