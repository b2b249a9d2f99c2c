//! Output queues for fetched items.
//!
//! A queue is a named FIFO of serialized items. Jobs only ever append to the
//! tail; consumers pop from the head and decode with [`harvest_core::Item::from_bytes`].

pub mod in_memory;
#[cfg(feature = "redis")]
pub mod redis_list;

pub use in_memory::InMemoryItemQueue;
#[cfg(feature = "redis")]
pub use redis_list::RedisItemQueue;

use std::sync::Arc;

use harvest_core::QueueError;

/// Append-only access to named item queues.
pub trait ItemQueue: Send + Sync {
    /// Append a serialized item to the tail of `queue`.
    fn push(&self, queue: &str, payload: Vec<u8>) -> Result<(), QueueError>;
}

impl<Q: ItemQueue + ?Sized> ItemQueue for Arc<Q> {
    fn push(&self, queue: &str, payload: Vec<u8>) -> Result<(), QueueError> {
        (**self).push(queue, payload)
    }
}
