//! Intrusive eviction deque backed by [`SlotArena`].
//!
//! Every live cache entry owns exactly one node here. Nodes are linked by
//! [`SlotId`] rather than pointers, so the index can hold a plain handle to
//! its entry's node without shared ownership of the links.
//!
//! ## Architecture
//!
//! ```text
//!   arena (SlotArena<Node<K>>)
//!   ┌────────┬──────────────────────────────────────────────────────┐
//!   │ SlotId │ Node { key, prev, next, marked }                     │
//!   ├────────┼──────────────────────────────────────────────────────┤
//!   │ id_1   │ { key: A, prev: None,       next: Some(id_2), no  }  │
//!   │ id_2   │ { key: B, prev: Some(id_1), next: Some(id_3), yes }  │
//!   │ id_3   │ { key: C, prev: Some(id_2), next: None,       no  }  │
//!   └────────┴──────────────────────────────────────────────────────┘
//!
//!   head ─► [id_1] ◄──► [id_2] ◄──► [id_3] ◄── tail
//!   (next victim)                      (most favored)
//! ```
//!
//! ## Operations
//! - `append_tail(key)`: new node, unmarked, at the favored end
//! - `move_to_tail(id)`: detach + attach at tail
//! - `unlink(id)`: detach + free slot, returns the key
//! - `peek_head()` / `pop_head()`: victim end
//!
//! All operations are O(1) except iteration and invariant checking.
//! The deque is not synchronized; callers hold the ordering lock.

use crate::ds::slot_arena::{SlotArena, SlotId};
use crate::error::InvariantError;

#[derive(Debug, Clone)]
struct Node<K> {
    key: K,
    prev: Option<SlotId>,
    next: Option<SlotId>,
    marked: bool,
}

/// Ordered sequence of live keys from next victim (head) to most favored (tail).
#[derive(Debug, Clone)]
pub struct EvictionDeque<K> {
    arena: SlotArena<Node<K>>,
    head: Option<SlotId>,
    tail: Option<SlotId>,
}

impl<K> EvictionDeque<K> {
    pub fn new() -> Self {
        Self {
            arena: SlotArena::new(),
            head: None,
            tail: None,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            arena: SlotArena::with_capacity(capacity),
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Returns `true` if `id` still names a linked node.
    pub fn contains(&self, id: SlotId) -> bool {
        self.arena.contains(id)
    }

    /// Returns the handle of the next eviction candidate.
    pub fn peek_head(&self) -> Option<SlotId> {
        self.head
    }

    /// Returns the handle of the most favored node.
    pub fn peek_tail(&self) -> Option<SlotId> {
        self.tail
    }

    pub fn key(&self, id: SlotId) -> Option<&K> {
        self.arena.get(id).map(|node| &node.key)
    }

    pub fn is_marked(&self, id: SlotId) -> Option<bool> {
        self.arena.get(id).map(|node| node.marked)
    }

    /// Sets the mark bit; returns `false` if `id` is stale.
    pub fn set_marked(&mut self, id: SlotId, marked: bool) -> bool {
        match self.arena.get_mut(id) {
            Some(node) => {
                node.marked = marked;
                true
            },
            None => false,
        }
    }

    /// Links a new unmarked node at the tail and returns its handle.
    pub fn append_tail(&mut self, key: K) -> SlotId {
        let id = self.arena.insert(Node {
            key,
            prev: self.tail,
            next: None,
            marked: false,
        });
        if let Some(tail) = self.tail {
            if let Some(node) = self.arena.get_mut(tail) {
                node.next = Some(id);
            }
        } else {
            self.head = Some(id);
        }
        self.tail = Some(id);
        id
    }

    /// Unlinks `id` and frees its node, returning the key.
    pub fn unlink(&mut self, id: SlotId) -> Option<K> {
        self.detach(id)?;
        self.arena.remove(id).map(|node| node.key)
    }

    /// Unlinks the head node, returning its handle and key.
    pub fn pop_head(&mut self) -> Option<(SlotId, K)> {
        let id = self.head?;
        self.unlink(id).map(|key| (id, key))
    }

    /// Moves an existing node to the tail; returns `false` if `id` is stale.
    pub fn move_to_tail(&mut self, id: SlotId) -> bool {
        if !self.arena.contains(id) {
            return false;
        }
        if Some(id) == self.tail {
            return true;
        }
        self.detach(id);
        self.attach_tail(id);
        true
    }

    /// Unlinks every node, returning `(handle, key)` pairs from head to tail.
    pub fn drain(&mut self) -> Vec<(SlotId, K)> {
        let mut drained = Vec::with_capacity(self.len());
        while let Some(entry) = self.pop_head() {
            drained.push(entry);
        }
        drained
    }

    pub fn clear(&mut self) {
        self.arena.clear();
        self.head = None;
        self.tail = None;
    }

    /// Iterates keys from head (next victim) to tail.
    pub fn iter(&self) -> EvictionDequeIter<'_, K> {
        EvictionDequeIter {
            deque: self,
            current: self.head,
        }
    }

    /// Iterates `(handle, key, marked)` from head to tail.
    pub fn iter_entries(&self) -> impl Iterator<Item = (SlotId, &K, bool)> + '_ {
        let mut current = self.head;
        std::iter::from_fn(move || {
            let id = current?;
            let node = self.arena.get(id)?;
            current = node.next;
            Some((id, &node.key, node.marked))
        })
    }

    fn detach(&mut self, id: SlotId) -> Option<()> {
        let (prev, next) = {
            let node = self.arena.get(id)?;
            (node.prev, node.next)
        };

        if let Some(prev_id) = prev {
            if let Some(prev_node) = self.arena.get_mut(prev_id) {
                prev_node.next = next;
            }
        } else {
            self.head = next;
        }

        if let Some(next_id) = next {
            if let Some(next_node) = self.arena.get_mut(next_id) {
                next_node.prev = prev;
            }
        } else {
            self.tail = prev;
        }

        if let Some(node) = self.arena.get_mut(id) {
            node.prev = None;
            node.next = None;
        }

        Some(())
    }

    fn attach_tail(&mut self, id: SlotId) -> Option<()> {
        let old_tail = self.tail;
        let node = self.arena.get_mut(id)?;
        node.next = None;
        node.prev = old_tail;
        if let Some(old_tail) = old_tail {
            if let Some(tail_node) = self.arena.get_mut(old_tail) {
                tail_node.next = Some(id);
            }
        } else {
            self.head = Some(id);
        }
        self.tail = Some(id);
        Some(())
    }

    /// Walks the links and verifies head/tail, back-pointers, acyclicity and
    /// that every arena slot is reachable.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.head.is_none() || self.tail.is_none() {
            if self.head.is_some() || self.tail.is_some() || !self.is_empty() {
                return Err(InvariantError::new(
                    "empty deque must have neither head nor tail",
                ));
            }
            return Ok(());
        }

        let mut count = 0usize;
        let mut current = self.head;
        let mut prev = None;

        while let Some(id) = current {
            let node = self
                .arena
                .get(id)
                .ok_or_else(|| InvariantError::new(format!("dangling link to {id:?}")))?;
            if node.prev != prev {
                return Err(InvariantError::new(format!(
                    "node {id:?} has prev {:?}, expected {prev:?}",
                    node.prev
                )));
            }
            if node.next.is_none() && self.tail != Some(id) {
                return Err(InvariantError::new("last reachable node is not the tail"));
            }

            prev = Some(id);
            current = node.next;
            count += 1;
            if count > self.len() {
                return Err(InvariantError::new("cycle detected in eviction deque"));
            }
        }

        if count != self.len() {
            return Err(InvariantError::new(format!(
                "reachable nodes {count} != arena len {}",
                self.len()
            )));
        }
        Ok(())
    }
}

pub struct EvictionDequeIter<'a, K> {
    deque: &'a EvictionDeque<K>,
    current: Option<SlotId>,
}

impl<'a, K> Iterator for EvictionDequeIter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        let node = self.deque.arena.get(id)?;
        self.current = node.next;
        Some(&node.key)
    }
}

impl<K> Default for EvictionDeque<K> {
    fn default() -> Self {
        Self::new()
    }
}
