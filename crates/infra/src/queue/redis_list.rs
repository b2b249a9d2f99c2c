//! Redis list-backed item queue.
//!
//! Each named queue is a Redis list; items are appended with `RPUSH`, so a
//! consumer using `LPOP`/`BLPOP` sees them in production order.

use std::sync::{Arc, Mutex};

use tracing::{instrument, warn};

use harvest_core::QueueError;

use super::ItemQueue;

/// Item queue writing to Redis lists.
///
/// Holds one connection, re-established on the next push after a failure.
pub struct RedisItemQueue {
    client: Arc<redis::Client>,
    conn: Mutex<Option<redis::Connection>>,
}

impl RedisItemQueue {
    /// Create a queue client for `redis_url` (e.g. "redis://localhost:6379").
    pub fn new(redis_url: impl AsRef<str>) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| QueueError::Connection(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            conn: Mutex::new(None),
        })
    }

    fn connect(&self) -> Result<redis::Connection, QueueError> {
        self.client
            .get_connection()
            .map_err(|e| QueueError::Connection(e.to_string()))
    }
}

impl ItemQueue for RedisItemQueue {
    #[instrument(skip(self, payload), fields(bytes = payload.len()), err)]
    fn push(&self, queue: &str, payload: Vec<u8>) -> Result<(), QueueError> {
        let mut slot = self
            .conn
            .lock()
            .map_err(|_| QueueError::Connection("lock poisoned".to_string()))?;

        let mut conn = match slot.take() {
            Some(conn) => conn,
            None => self.connect()?,
        };

        let pushed: redis::RedisResult<u64> = redis::cmd("RPUSH")
            .arg(queue)
            .arg(payload)
            .query(&mut conn);

        match pushed {
            Ok(_) => {
                *slot = Some(conn);
                Ok(())
            }
            Err(e) => {
                warn!(queue, error = %e, "RPUSH failed; dropping connection");
                Err(QueueError::Command(format!("RPUSH failed: {e}")))
            }
        }
    }
}

impl core::fmt::Debug for RedisItemQueue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RedisItemQueue").finish_non_exhaustive()
    }
}
