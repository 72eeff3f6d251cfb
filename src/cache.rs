//! Concurrent bounded cache with pluggable eviction.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                    ConcurrentLinkedCache<K, V>                       │
//!   │                                                                      │
//!   │   ShardedIndex<K, V>            K -> { Arc<V>, SlotId }              │
//!   │   ┌────────┬────────┬────────┐  one RwLock per shard                 │
//!   │   │shard 0 │shard 1 │shard 2 │                                       │
//!   │   └───┬────┴───┬────┴───┬────┘                                       │
//!   │       │ SlotId │        │                                            │
//!   │       ▼        ▼        ▼                                            │
//!   │   Mutex<EvictionDeque<K>>       the ordering lock                    │
//!   │   head ─► [k3] ◄─► [k7] ◄─► [k1] ◄─ tail                             │
//!   │  (victim)                   (favored)                                │
//!   │       ▲                                                              │
//!   │       │ drained by whoever holds the ordering lock                   │
//!   │   AccessBuffer (lock-free ArrayQueue<SlotId>) ◄── read hits          │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Operation flow
//!
//! ```text
//!   get(k)      shard.read() -> clone value + handle -> push handle to buffer
//!   insert(k)   shard.write() ─┬─ present: swap value in place (no reorder)
//!                              └─ absent:  ordering.lock()
//!                                            drain buffer
//!                                            append k at tail
//!               release locks
//!               ordering.lock() -> pick victims while over capacity
//!               release lock -> drop victims from index -> notify listener
//!   remove(k)   shard.write() remove -> ordering.lock() unlink -> notify
//! ```
//!
//! ## Locking
//!
//! | Lock            | Scope                      | Held by                           |
//! |-----------------|----------------------------|-----------------------------------|
//! | shard `RwLock`  | one partition of the index | lookups (read), key writes        |
//! | ordering `Mutex`| the eviction deque         | inserts, removals, drains, resize |
//!
//! Locks are always taken shard first, ordering second. The victim scan runs
//! with no shard lock held, so a second-chance scan over a large deque never
//! stalls readers of the shard being written. Victims are unlinked
//! under the ordering lock but dropped from the index only after it is
//! released; the drop is conditional on the victim's generation-tagged handle
//! still being the one stored for its key, so a racing explicit removal and
//! an eviction never both report the same entry.
//!
//! ## Example Usage
//!
//! ```
//! use linkmap::cache::ConcurrentLinkedCache;
//! use linkmap::policy::EvictionPolicy;
//!
//! let cache = ConcurrentLinkedCache::new(2, EvictionPolicy::Lru);
//! cache.insert("a", 1);
//! cache.insert("b", 2);
//! assert_eq!(cache.get(&"a").as_deref(), Some(&1));
//!
//! // "b" is now least recently read
//! cache.insert("c", 3);
//! assert!(!cache.contains_key(&"b"));
//! assert_eq!(cache.len(), 2);
//! ```

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, trace};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::builder::CacheBuilder;
use crate::ds::access_buffer::AccessBuffer;
use crate::ds::eviction_deque::EvictionDeque;
use crate::ds::index::{IndexSlot, ShardedIndex};
use crate::ds::slot_arena::SlotId;
use crate::error::{ConfigError, InvariantError};
use crate::listener::EvictionListener;
#[cfg(feature = "metrics")]
use crate::metrics::{CacheCounters, CacheMetricsSnapshot, MetricsReset, MetricsSnapshotProvider};
use crate::policy::{EvictionPolicy, Victim};

/// Thread-safe bounded map that evicts by FIFO, LRU or second-chance order.
///
/// Values are stored as `Arc<V>`; reads hand out clones of the `Arc`, so a
/// value stays usable after its entry is evicted.
pub struct ConcurrentLinkedCache<K, V> {
    index: ShardedIndex<K, V>,
    ordering: Mutex<EvictionDeque<K>>,
    buffer: AccessBuffer,
    capacity: AtomicUsize,
    policy: EvictionPolicy,
    listener: Option<Arc<dyn EvictionListener<K, V>>>,
    #[cfg(feature = "metrics")]
    counters: CacheCounters,
}

impl<K, V> ConcurrentLinkedCache<K, V> {
    /// Starts a [`CacheBuilder`] for a cache bounded to `capacity` entries.
    pub fn builder(capacity: usize) -> CacheBuilder<K, V> {
        CacheBuilder::new(capacity)
    }
}

impl<K, V> ConcurrentLinkedCache<K, V>
where
    K: Clone + Eq + Hash,
{
    /// Creates a cache with default sharding and no listener.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; use [`try_new`](Self::try_new) to
    /// handle that case.
    pub fn new(capacity: usize, policy: EvictionPolicy) -> Self {
        Self::builder(capacity).policy(policy).build()
    }

    /// Creates a cache, rejecting a zero capacity.
    pub fn try_new(capacity: usize, policy: EvictionPolicy) -> Result<Self, ConfigError> {
        Self::builder(capacity).policy(policy).try_build()
    }

    pub(crate) fn from_builder(builder: CacheBuilder<K, V>) -> Self {
        Self {
            index: ShardedIndex::new(builder.shards),
            ordering: Mutex::new(EvictionDeque::with_capacity(builder.capacity)),
            buffer: AccessBuffer::new(builder.access_buffer_capacity),
            capacity: AtomicUsize::new(builder.capacity),
            policy: builder.policy,
            listener: builder.listener,
            #[cfg(feature = "metrics")]
            counters: CacheCounters::default(),
        }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Returns the value for `key` and records the hit for the policy.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        match self.index.lookup(key) {
            Some((value, node)) => {
                #[cfg(feature = "metrics")]
                self.counters.inc_hit();
                self.record_access(node);
                Some(value)
            },
            None => {
                #[cfg(feature = "metrics")]
                self.counters.inc_miss();
                None
            },
        }
    }

    /// Returns the value for `key` without affecting eviction order.
    pub fn peek(&self, key: &K) -> Option<Arc<V>> {
        self.index.lookup(key).map(|(value, _)| value)
    }

    /// Returns `true` if `key` is present. Does not count as an access.
    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains(key)
    }

    /// Returns `true` if any entry holds a value equal to `value`. O(n).
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.index.any_value(|candidate| candidate == value)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Acquire)
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    pub fn shard_count(&self) -> usize {
        self.index.shard_count()
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Inserts or updates `key`, returning the previous value.
    ///
    /// Updating an existing key swaps its value in place; it is not treated
    /// as an access and does not change the entry's eviction position.
    pub fn insert(&self, key: K, value: V) -> Option<Arc<V>> {
        self.insert_arc(key, Arc::new(value))
    }

    /// Like [`insert`](Self::insert) for a value that is already shared.
    pub fn insert_arc(&self, key: K, value: Arc<V>) -> Option<Arc<V>> {
        let previous = self.index.insert_with(key, value, |key| self.link_new(key));
        match previous {
            Some(_) => {
                #[cfg(feature = "metrics")]
                self.counters.inc_update();
            },
            None => {
                #[cfg(feature = "metrics")]
                self.counters.inc_insert();
                self.evict_overflow();
            },
        }
        previous
    }

    /// Inserts `key` only if it is absent.
    ///
    /// Returns the value already present, in which case nothing changes, or
    /// `None` if `value` was stored.
    pub fn insert_if_absent(&self, key: K, value: V) -> Option<Arc<V>> {
        let existing = self
            .index
            .insert_if_absent_with(key, Arc::new(value), |key| self.link_new(key));
        if existing.is_none() {
            #[cfg(feature = "metrics")]
            self.counters.inc_insert();
            self.evict_overflow();
        }
        existing
    }

    /// Inserts every pair in order.
    pub fn insert_all(&self, entries: impl IntoIterator<Item = (K, V)>) {
        for (key, value) in entries {
            self.insert(key, value);
        }
    }

    /// Replaces the value of a present key; absent keys stay absent.
    pub fn replace(&self, key: &K, value: V) -> Option<Arc<V>> {
        let previous = self.index.replace(key, Arc::new(value));
        if previous.is_some() {
            #[cfg(feature = "metrics")]
            self.counters.inc_update();
        }
        previous
    }

    /// Replaces the value only if it currently equals `expected`.
    pub fn replace_if_eq(&self, key: &K, expected: &V, value: V) -> bool
    where
        V: PartialEq,
    {
        let replaced = self
            .index
            .replace_if(key, |current| current == expected, Arc::new(value));
        if replaced {
            #[cfg(feature = "metrics")]
            self.counters.inc_update();
        }
        replaced
    }

    /// Removes `key`, notifying the listener, and returns its value.
    pub fn remove(&self, key: &K) -> Option<Arc<V>> {
        let (key, slot) = self.index.remove(key)?;
        Some(self.finish_removal(key, slot))
    }

    /// Removes `key` only if its value equals `expected`.
    pub fn remove_if_eq(&self, key: &K, expected: &V) -> bool
    where
        V: PartialEq,
    {
        match self.index.remove_if(key, |slot| *slot.value == *expected) {
            Some((key, slot)) => {
                self.finish_removal(key, slot);
                true
            },
            None => false,
        }
    }

    /// Removes every entry, notifying the listener once per entry in
    /// eviction order. The capacity bound is unchanged.
    pub fn clear(&self) {
        let taken = self.index.take_all();
        if taken.is_empty() {
            self.buffer.discard();
            return;
        }

        let mut by_node: FxHashMap<SlotId, (K, Arc<V>)> = taken
            .into_iter()
            .map(|(key, slot)| (slot.node, (key, slot.value)))
            .collect();
        let mut ordered = Vec::with_capacity(by_node.len());
        {
            let mut deque = self.ordering.lock();
            self.drain_locked(&mut deque);
            let nodes: Vec<SlotId> = deque
                .iter_entries()
                .map(|(node, _, _)| node)
                .filter(|node| by_node.contains_key(node))
                .collect();
            for node in nodes {
                deque.unlink(node);
                if let Some(entry) = by_node.remove(&node) {
                    ordered.push(entry);
                }
            }
        }
        // Entries whose node a concurrent eviction had already unlinked.
        ordered.extend(by_node.into_values());

        debug!("cleared {} entries", ordered.len());
        #[cfg(feature = "metrics")]
        self.counters.add_evictions(ordered.len() as u64);
        for (key, value) in ordered {
            self.notify(key, value);
        }
    }

    // ------------------------------------------------------------------
    // Capacity
    // ------------------------------------------------------------------

    /// Changes the capacity bound.
    ///
    /// Shrinking below the current size evicts victims in policy order,
    /// notifying the listener, before returning. Growing only stores the new
    /// bound. A zero bound is rejected and nothing changes.
    pub fn set_capacity(&self, capacity: usize) -> Result<(), ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::non_positive_capacity(capacity));
        }
        let mut victims = Vec::new();
        {
            let mut deque = self.ordering.lock();
            self.drain_locked(&mut deque);
            let previous = self.capacity.swap(capacity, Ordering::AcqRel);
            self.collect_victims_locked(&mut deque, &mut victims);
            debug!(
                "capacity {} -> {}, evicting {} entries",
                previous,
                capacity,
                victims.len()
            );
        }
        self.finish_evictions(victims);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Ordering observers
    // ------------------------------------------------------------------

    /// Number of buffered read hits not yet applied to the eviction order.
    pub fn pending_access_events(&self) -> usize {
        self.buffer.len()
    }

    /// Applies all buffered read hits to the eviction order now.
    pub fn drain_access_buffer(&self) {
        let mut deque = self.ordering.lock();
        self.drain_locked(&mut deque);
    }

    /// Returns the second-chance mark of `key`'s entry after applying
    /// buffered reads, or `None` if the key is absent.
    pub fn is_marked(&self, key: &K) -> Option<bool> {
        let (_, node) = self.index.lookup(key)?;
        let mut deque = self.ordering.lock();
        self.drain_locked(&mut deque);
        deque.is_marked(node)
    }

    /// Keys from next victim to most favored, after applying buffered reads.
    pub fn keys_in_eviction_order(&self) -> Vec<K> {
        let mut deque = self.ordering.lock();
        self.drain_locked(&mut deque);
        deque.iter().cloned().collect()
    }

    /// Copies every entry into a map, e.g. to compare two caches.
    pub fn to_hash_map(&self) -> FxHashMap<K, Arc<V>> {
        let mut map = FxHashMap::default();
        self.index.for_each(|key, slot| {
            map.insert(key.clone(), Arc::clone(&slot.value));
        });
        map
    }

    /// Verifies that the index and the eviction deque describe the same set
    /// of entries and that the deque is well formed.
    ///
    /// Only meaningful when no other thread is mutating the cache.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let shards = self.index.read_all();
        let mut deque = self.ordering.lock();
        self.drain_locked(&mut deque);
        deque.check_invariants()?;

        let indexed: usize = shards.iter().map(|shard| shard.len()).sum();
        if indexed != self.index.len() {
            return Err(InvariantError::new(format!(
                "index counter {} != indexed entries {}",
                self.index.len(),
                indexed
            )));
        }
        if indexed != deque.len() {
            return Err(InvariantError::new(format!(
                "index holds {} entries, deque links {}",
                indexed,
                deque.len()
            )));
        }
        for shard in &shards {
            for (key, slot) in shard.iter() {
                if deque.key(slot.node) != Some(key) {
                    return Err(InvariantError::new(format!(
                        "index entry points at {:?}, which is not its deque node",
                        slot.node
                    )));
                }
            }
        }
        if deque.len() > self.capacity() {
            return Err(InvariantError::new(format!(
                "{} entries exceed capacity {}",
                deque.len(),
                self.capacity()
            )));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Links a newly admitted key at the tail. Runs with the key's shard
    /// write lock held, so it only appends; eviction happens afterwards in
    /// [`evict_overflow`](Self::evict_overflow).
    fn link_new(&self, key: &K) -> SlotId {
        let mut deque = self.ordering.lock();
        self.drain_locked(&mut deque);
        deque.append_tail(key.clone())
    }

    /// Evicts while the deque holds more entries than the bound. Called
    /// with no shard lock held; the just-linked key is a candidate like any
    /// other.
    fn evict_overflow(&self) {
        let mut victims = Vec::new();
        {
            let mut deque = self.ordering.lock();
            self.drain_locked(&mut deque);
            self.collect_victims_locked(&mut deque, &mut victims);
        }
        self.finish_evictions(victims);
    }

    /// Unlinks victims until the deque fits the bound.
    fn collect_victims_locked(&self, deque: &mut EvictionDeque<K>, victims: &mut Vec<Victim<K>>) {
        let capacity = self.capacity();
        while deque.len() > capacity {
            match self.policy.select_victim(deque) {
                Some(victim) => {
                    #[cfg(feature = "metrics")]
                    self.counters.add_scan_steps(victim.reprieved as u64);
                    victims.push(victim);
                },
                None => break,
            }
        }
    }

    /// Drops unlinked victims from the index, then notifies the listener.
    ///
    /// A victim whose key was removed or re-inserted in the meantime no
    /// longer carries the stored handle and is skipped; whoever removed it
    /// reports it instead.
    fn finish_evictions(&self, victims: Vec<Victim<K>>) {
        if victims.is_empty() {
            return;
        }
        let evicted: Vec<(K, IndexSlot<V>)> = victims
            .into_iter()
            .filter_map(|victim| {
                self.index
                    .remove_if(&victim.key, |slot| slot.node == victim.node)
            })
            .collect();
        trace!("evicted {} entries ({})", evicted.len(), self.policy);
        #[cfg(feature = "metrics")]
        self.counters.add_evictions(evicted.len() as u64);
        for (key, slot) in evicted {
            self.notify(key, slot.value);
        }
    }

    /// Unlinks an entry already taken out of the index and reports it.
    fn finish_removal(&self, key: K, slot: IndexSlot<V>) -> Arc<V> {
        // Buffered events for this node go stale; the next drain skips them.
        self.ordering.lock().unlink(slot.node);
        #[cfg(feature = "metrics")]
        self.counters.inc_removal();
        self.notify(key, Arc::clone(&slot.value));
        slot.value
    }

    /// Records a read hit, draining first if the buffer is full.
    #[inline]
    fn record_access(&self, node: SlotId) {
        if !self.policy.records_access() {
            return;
        }
        while self.buffer.record(node).is_err() {
            let mut deque = self.ordering.lock();
            self.drain_locked(&mut deque);
        }
    }

    /// Replays buffered read hits. Caller holds the ordering lock.
    fn drain_locked(&self, deque: &mut EvictionDeque<K>) {
        if self.buffer.is_empty() {
            return;
        }
        let mut stale = 0u64;
        let drained = self.buffer.drain(|node| {
            if !self.policy.on_access(deque, node) {
                stale += 1;
            }
        });
        trace!("drained {} access events ({} stale)", drained, stale);
        #[cfg(feature = "metrics")]
        self.counters.record_drain(drained as u64, stale);
    }

    fn notify(&self, key: K, value: Arc<V>) {
        if let Some(listener) = &self.listener {
            listener.on_evict(key, value);
        }
    }
}

impl<K, V> Clone for ConcurrentLinkedCache<K, V>
where
    K: Clone + Eq + Hash,
{
    /// Copies entries, eviction order, marks, capacity, policy and listener.
    /// Buffered read hits are applied to the source first, not carried over.
    /// Counters start from zero.
    fn clone(&self) -> Self {
        let shards = self.index.read_all();
        let mut deque = self.ordering.lock();
        self.drain_locked(&mut deque);

        let copy = Self {
            index: ShardedIndex::new(self.index.shard_count()),
            ordering: Mutex::new(deque.clone()),
            buffer: AccessBuffer::new(self.buffer.capacity()),
            capacity: AtomicUsize::new(self.capacity()),
            policy: self.policy,
            listener: self.listener.clone(),
            #[cfg(feature = "metrics")]
            counters: CacheCounters::default(),
        };
        for shard in &shards {
            for (key, slot) in shard.iter() {
                copy.index
                    .insert_with(key.clone(), Arc::clone(&slot.value), |_| slot.node);
            }
        }
        copy
    }
}

impl<K, V> Extend<(K, V)> for ConcurrentLinkedCache<K, V>
where
    K: Clone + Eq + Hash,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.insert_all(iter);
    }
}

#[cfg(feature = "metrics")]
impl<K, V> MetricsSnapshotProvider<CacheMetricsSnapshot> for ConcurrentLinkedCache<K, V>
where
    K: Clone + Eq + Hash,
{
    fn snapshot(&self) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            len: self.len(),
            capacity: self.capacity(),
            pending_events: self.buffer.len(),
            ..self.counters.snapshot()
        }
    }
}

#[cfg(feature = "metrics")]
impl<K, V> MetricsReset for ConcurrentLinkedCache<K, V> {
    fn reset_metrics(&self) {
        self.counters.reset();
    }
}

impl<K, V> fmt::Debug for ConcurrentLinkedCache<K, V>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentLinkedCache")
            .field("capacity", &self.capacity.load(Ordering::Relaxed))
            .field("len", &self.index.len())
            .field("policy", &self.policy)
            .field("pending_events", &self.buffer.len())
            .finish_non_exhaustive()
    }
}
