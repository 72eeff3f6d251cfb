//! Sharded concurrent key index.
//!
//! ## Architecture
//! - Keys map to an [`IndexSlot`] holding the value (`Arc<V>`) and the
//!   [`SlotId`] of the entry's node in the eviction deque.
//! - Keys are partitioned across `RwLock`-guarded shards; lookups take a
//!   shared lock on one shard, writes take the exclusive lock on one shard.
//! - Entry count is tracked with an atomic so `len` never locks.
//!
//! ## Core Operations
//! - `lookup`: value + deque handle for a key.
//! - `insert_with` / `insert_if_absent_with`: insert or update; the `link`
//!   callback runs only when a new key is admitted, while the shard lock is
//!   still held, and returns the deque handle to store.
//! - `remove` / `remove_if`: unconditional or predicate-guarded removal.
//! - `replace` / `replace_if`: in-place value swap for present keys.
//!
//! ## Thread Safety
//! Every mutation of one key happens under that key's shard write lock, so
//! per-key operations are linearizable. A lookup never waits on writers of
//! other shards. It can wait briefly on a writer of a different key in the
//! same shard: the write lock covers the map update and the `link` callback,
//! which must stay O(1) (the cache only appends a node there and runs its
//! eviction scan after the lock is released). More shards shrink that window.

use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{RwLock, RwLockReadGuard};
use rustc_hash::FxHashMap;

use crate::ds::shard::ShardSelector;
use crate::ds::slot_arena::SlotId;

/// Index-side half of a cache entry.
#[derive(Debug)]
pub struct IndexSlot<V> {
    pub value: Arc<V>,
    pub node: SlotId,
}

impl<V> Clone for IndexSlot<V> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            node: self.node,
        }
    }
}

type Shard<K, V> = RwLock<FxHashMap<K, IndexSlot<V>>>;

#[derive(Debug)]
pub struct ShardedIndex<K, V> {
    shards: Vec<Shard<K, V>>,
    selector: ShardSelector,
    len: AtomicUsize,
}

impl<K, V> ShardedIndex<K, V>
where
    K: Eq + Hash,
{
    /// Creates an index with `shards` partitions (clamped to at least one).
    pub fn new(shards: usize) -> Self {
        let selector = ShardSelector::new(shards, 0);
        let shards = (0..selector.shard_count())
            .map(|_| RwLock::new(FxHashMap::default()))
            .collect();
        Self {
            shards,
            selector,
            len: AtomicUsize::new(0),
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    #[inline]
    fn shard(&self, key: &K) -> &Shard<K, V> {
        &self.shards[self.selector.shard_for_key(key)]
    }

    /// Returns the value and deque handle for `key`.
    #[inline]
    pub fn lookup(&self, key: &K) -> Option<(Arc<V>, SlotId)> {
        self.shard(key)
            .read()
            .get(key)
            .map(|slot| (Arc::clone(&slot.value), slot.node))
    }

    pub fn contains(&self, key: &K) -> bool {
        self.shard(key).read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts or updates `key`. For a new key, `link` is called with the
    /// shard lock held and must return the entry's deque handle; keep it
    /// O(1), since readers of the shard wait for it.
    pub fn insert_with(
        &self,
        key: K,
        value: Arc<V>,
        link: impl FnOnce(&K) -> SlotId,
    ) -> Option<Arc<V>> {
        let mut shard = self.shard(&key).write();
        if let Some(slot) = shard.get_mut(&key) {
            return Some(std::mem::replace(&mut slot.value, value));
        }
        let node = link(&key);
        shard.insert(key, IndexSlot { value, node });
        self.len.fetch_add(1, Ordering::AcqRel);
        None
    }

    /// Inserts `key` only if absent; returns the existing value otherwise.
    pub fn insert_if_absent_with(
        &self,
        key: K,
        value: Arc<V>,
        link: impl FnOnce(&K) -> SlotId,
    ) -> Option<Arc<V>> {
        let mut shard = self.shard(&key).write();
        if let Some(slot) = shard.get(&key) {
            return Some(Arc::clone(&slot.value));
        }
        let node = link(&key);
        shard.insert(key, IndexSlot { value, node });
        self.len.fetch_add(1, Ordering::AcqRel);
        None
    }

    pub fn remove(&self, key: &K) -> Option<(K, IndexSlot<V>)> {
        self.remove_if(key, |_| true)
    }

    /// Removes `key` only if `predicate` accepts its current slot.
    pub fn remove_if(
        &self,
        key: &K,
        predicate: impl FnOnce(&IndexSlot<V>) -> bool,
    ) -> Option<(K, IndexSlot<V>)> {
        let mut shard = self.shard(key).write();
        if !predicate(shard.get(key)?) {
            return None;
        }
        let removed = shard.remove_entry(key);
        if removed.is_some() {
            self.len.fetch_sub(1, Ordering::AcqRel);
        }
        removed
    }

    /// Swaps the value of a present key; never admits a new key.
    pub fn replace(&self, key: &K, value: Arc<V>) -> Option<Arc<V>> {
        let mut shard = self.shard(key).write();
        let slot = shard.get_mut(key)?;
        Some(std::mem::replace(&mut slot.value, value))
    }

    /// Swaps the value only if `predicate` accepts the current one.
    pub fn replace_if(
        &self,
        key: &K,
        predicate: impl FnOnce(&V) -> bool,
        value: Arc<V>,
    ) -> bool {
        let mut shard = self.shard(key).write();
        match shard.get_mut(key) {
            Some(slot) if predicate(&slot.value) => {
                slot.value = value;
                true
            },
            _ => false,
        }
    }

    /// Empties each shard in turn and returns everything removed.
    ///
    /// Shards are cleared one at a time, so writers to other shards are not
    /// blocked for the whole operation.
    pub fn take_all(&self) -> Vec<(K, IndexSlot<V>)> {
        let mut taken = Vec::with_capacity(self.len());
        for shard in &self.shards {
            let mut shard = shard.write();
            let before = taken.len();
            taken.extend(shard.drain());
            self.len.fetch_sub(taken.len() - before, Ordering::AcqRel);
        }
        taken
    }

    /// Visits every entry, one shard read lock at a time.
    pub fn for_each(&self, mut f: impl FnMut(&K, &IndexSlot<V>)) {
        for shard in &self.shards {
            for (key, slot) in shard.read().iter() {
                f(key, slot);
            }
        }
    }

    /// Returns `true` if any entry's value satisfies `predicate`.
    pub fn any_value(&self, mut predicate: impl FnMut(&V) -> bool) -> bool {
        self.shards
            .iter()
            .any(|shard| shard.read().values().any(|slot| predicate(&slot.value)))
    }

    /// Read-locks every shard in order, for consistency checks and copies.
    pub fn read_all(&self) -> Vec<RwLockReadGuard<'_, FxHashMap<K, IndexSlot<V>>>> {
        self.shards.iter().map(|shard| shard.read()).collect()
    }
}
