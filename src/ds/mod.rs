pub mod access_buffer;
pub mod eviction_deque;
pub mod index;
pub mod shard;
pub mod slot_arena;

pub use access_buffer::{AccessBuffer, DEFAULT_ACCESS_BUFFER_CAPACITY};
pub use eviction_deque::EvictionDeque;
pub use index::{IndexSlot, ShardedIndex};
pub use shard::ShardSelector;
pub use slot_arena::{SlotArena, SlotId};
