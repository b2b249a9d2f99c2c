use std::collections::HashMap;
use std::sync::RwLock;

use harvest_core::{Item, QueueError};

use super::ItemQueue;

/// In-memory item queues for tests/dev.
///
/// Optionally bounded: once a queue holds `capacity` entries further pushes
/// fail, which is how tests simulate a broken queue mid-run.
#[derive(Debug, Default)]
pub struct InMemoryItemQueue {
    queues: RwLock<HashMap<String, Vec<Vec<u8>>>>,
    capacity: Option<usize>,
}

impl InMemoryItemQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bounded(capacity: usize) -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
            capacity: Some(capacity),
        }
    }

    /// Raw entries of `queue`, head first.
    pub fn entries(&self, queue: &str) -> Vec<Vec<u8>> {
        self.queues
            .read()
            .ok()
            .and_then(|queues| queues.get(queue).cloned())
            .unwrap_or_default()
    }

    pub fn len(&self, queue: &str) -> usize {
        self.queues
            .read()
            .ok()
            .and_then(|queues| queues.get(queue).map(Vec::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, queue: &str) -> bool {
        self.len(queue) == 0
    }

    /// Decoded items of `queue`, head first.
    pub fn items(&self, queue: &str) -> Result<Vec<Item>, QueueError> {
        self.entries(queue)
            .iter()
            .map(|bytes| Item::from_bytes(bytes))
            .collect()
    }

    /// Remove and return the head of `queue`.
    pub fn pop(&self, queue: &str) -> Option<Vec<u8>> {
        let mut queues = self.queues.write().ok()?;
        let entries = queues.get_mut(queue)?;
        if entries.is_empty() {
            None
        } else {
            Some(entries.remove(0))
        }
    }
}

impl ItemQueue for InMemoryItemQueue {
    fn push(&self, queue: &str, payload: Vec<u8>) -> Result<(), QueueError> {
        let mut queues = self
            .queues
            .write()
            .map_err(|_| QueueError::Connection("lock poisoned".to_string()))?;
        let entries = queues.entry(queue.to_string()).or_default();

        if let Some(capacity) = self.capacity {
            if entries.len() >= capacity {
                return Err(QueueError::Command(format!(
                    "queue '{queue}' is full ({capacity} entries)"
                )));
            }
        }

        entries.push(payload);
        Ok(())
    }
}
