//! Bounded lock-free log of read hits.
//!
//! Readers push the [`SlotId`] of the entry they hit without touching the
//! ordering lock. Whoever holds the ordering lock next replays the buffered
//! events in push order through the policy's read-hit decision.
//!
//! ```text
//!   reader ─┐
//!   reader ─┼─► ArrayQueue<SlotId> ──drain──► policy.on_access(deque, id)
//!   reader ─┘      (bounded)                 (under the ordering lock)
//! ```
//!
//! The buffer is advisory: events may refer to entries that have since been
//! removed, and replay skips them. A full buffer never drops an event; the
//! caller that failed to push is expected to drain and retry.

use crossbeam_queue::ArrayQueue;

use crate::ds::slot_arena::SlotId;

/// Default number of buffered access events before a forced drain.
pub const DEFAULT_ACCESS_BUFFER_CAPACITY: usize = 128;

#[derive(Debug)]
pub struct AccessBuffer {
    queue: ArrayQueue<SlotId>,
}

impl AccessBuffer {
    /// Creates a buffer holding at most `capacity` events.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity),
        }
    }

    /// Records an access; hands the event back if the buffer is full.
    #[inline]
    pub fn record(&self, id: SlotId) -> Result<(), SlotId> {
        self.queue.push(id)
    }

    /// Pops every event buffered at call time, oldest first, into `apply`.
    ///
    /// Bounded by the buffer capacity so concurrent producers cannot keep a
    /// drain running forever. Returns the number of events consumed.
    pub fn drain(&self, mut apply: impl FnMut(SlotId)) -> usize {
        let mut drained = 0;
        while drained < self.queue.capacity() {
            match self.queue.pop() {
                Some(id) => {
                    apply(id);
                    drained += 1;
                },
                None => break,
            }
        }
        drained
    }

    /// Discards all pending events.
    pub fn discard(&self) -> usize {
        self.drain(|_| {})
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.queue.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }
}

impl Default for AccessBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_ACCESS_BUFFER_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::ds::slot_arena::SlotArena;

    fn ids(n: usize) -> Vec<SlotId> {
        let mut arena = SlotArena::new();
        (0..n).map(|i| arena.insert(i)).collect()
    }

    #[test]
    fn drain_replays_in_push_order() {
        let buffer = AccessBuffer::new(8);
        let ids = ids(4);
        for &id in &ids {
            buffer.record(id).unwrap();
        }

        let mut seen = Vec::new();
        assert_eq!(buffer.drain(|id| seen.push(id)), 4);
        assert_eq!(seen, ids);
        assert!(buffer.is_empty());
    }

    #[test]
    fn full_buffer_hands_event_back() {
        let buffer = AccessBuffer::new(2);
        let ids = ids(3);
        assert!(buffer.record(ids[0]).is_ok());
        assert!(buffer.record(ids[1]).is_ok());
        assert!(buffer.is_full());
        assert_eq!(buffer.record(ids[2]), Err(ids[2]));

        assert_eq!(buffer.discard(), 2);
        assert!(buffer.record(ids[2]).is_ok());
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn drain_is_bounded_by_capacity() {
        let buffer = AccessBuffer::new(4);
        let ids = ids(1);
        for _ in 0..4 {
            buffer.record(ids[0]).unwrap();
        }
        let mut count = 0;
        buffer.drain(|id| {
            count += 1;
            let _ = buffer.record(id);
        });
        assert_eq!(count, 4);
    }

    #[test]
    fn concurrent_producers_lose_nothing() {
        let buffer = Arc::new(AccessBuffer::new(1024));
        let id = ids(1)[0];
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let buffer = buffer.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        buffer.record(id).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(buffer.len(), 400);
        assert_eq!(buffer.discard(), 400);
    }
}
