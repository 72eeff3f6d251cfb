//! Eviction disciplines.
//!
//! A policy makes exactly two decisions over the [`EvictionDeque`]:
//!
//! | Policy          | On read hit                 | Victim selection                          |
//! |-----------------|-----------------------------|-------------------------------------------|
//! | `Fifo`          | nothing                     | head                                      |
//! | `Lru`           | move entry to tail          | head                                      |
//! | `SecondChance`  | mark entry (no move)        | marked head: unmark + move to tail, retry |
//! |                 |                             | unmarked head: evict                      |
//!
//! ## Second chance (CLOCK)
//!
//! ```text
//!   head                                   tail
//!    [a*] [b*] [c ] [d*]        * = marked
//!
//!   select_victim:
//!    a* -> unmark, move:  [b*] [c ] [d*] [a ]
//!    b* -> unmark, move:  [c ] [d*] [a ] [b ]
//!    c  -> evict
//! ```
//!
//! The scan gives each entry at most one reprieve per call, so it finishes
//! within `len` moves even when every entry is marked.
//!
//! The policy is chosen once at construction and never changes; both
//! decisions run with the ordering lock held.

use std::fmt;

use crate::ds::eviction_deque::EvictionDeque;
use crate::ds::slot_arena::SlotId;

/// Eviction discipline of a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EvictionPolicy {
    /// Evict in insertion order; reads never affect order.
    Fifo,
    /// Evict the least recently read entry.
    #[default]
    Lru,
    /// CLOCK: reads set a mark that buys one reprieve from eviction.
    SecondChance,
}

/// Entry chosen by [`EvictionPolicy::select_victim`], already unlinked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Victim<K> {
    pub node: SlotId,
    pub key: K,
    /// Marked entries moved to the tail before this one was chosen.
    pub reprieved: usize,
}

impl EvictionPolicy {
    /// Returns `false` when read hits have no effect, letting readers skip
    /// recording access events altogether.
    #[inline]
    pub fn records_access(self) -> bool {
        !matches!(self, EvictionPolicy::Fifo)
    }

    /// Applies the read-hit decision to `node`. Stale handles are ignored.
    ///
    /// Idempotent per policy, so replaying duplicate events is harmless.
    /// Returns `true` if `node` was live.
    pub fn on_access<K>(self, deque: &mut EvictionDeque<K>, node: SlotId) -> bool {
        match self {
            EvictionPolicy::Fifo => deque.contains(node),
            EvictionPolicy::Lru => deque.move_to_tail(node),
            EvictionPolicy::SecondChance => deque.set_marked(node, true),
        }
    }

    /// Chooses a victim, unlinks it from `deque` and returns it.
    pub fn select_victim<K>(self, deque: &mut EvictionDeque<K>) -> Option<Victim<K>> {
        match self {
            EvictionPolicy::Fifo | EvictionPolicy::Lru => {
                deque.pop_head().map(|(node, key)| Victim {
                    node,
                    key,
                    reprieved: 0,
                })
            },
            EvictionPolicy::SecondChance => {
                let mut reprieved = 0;
                while reprieved < deque.len() {
                    let head = deque.peek_head()?;
                    if deque.is_marked(head) != Some(true) {
                        break;
                    }
                    deque.set_marked(head, false);
                    deque.move_to_tail(head);
                    reprieved += 1;
                }
                deque.pop_head().map(|(node, key)| Victim {
                    node,
                    key,
                    reprieved,
                })
            },
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EvictionPolicy::Fifo => "fifo",
            EvictionPolicy::Lru => "lru",
            EvictionPolicy::SecondChance => "second_chance",
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
