//! Runtime configuration.
//!
//! Read from the environment with development defaults:
//!
//! | variable | default |
//! |---|---|
//! | `HARVEST_REDIS_URL` | `redis://127.0.0.1:6379` |
//! | `HARVEST_ITEMS_QUEUE` | `items` |
//! | `HARVEST_META_PREFIX` | `harvest:job:` |

use tracing::warn;

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_ITEMS_QUEUE: &str = "items";
pub const DEFAULT_META_PREFIX: &str = "harvest:job:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Redis instance holding the output queues and job metadata.
    pub redis_url: String,
    /// Queue items are pushed to when a request does not name one.
    pub items_queue: String,
    /// Key prefix of per-job metadata hashes.
    pub meta_prefix: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            items_queue: DEFAULT_ITEMS_QUEUE.to_string(),
            meta_prefix: DEFAULT_META_PREFIX.to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup (used by tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let redis_url = lookup("HARVEST_REDIS_URL").unwrap_or_else(|| {
            warn!("HARVEST_REDIS_URL not set; using {}", DEFAULT_REDIS_URL);
            defaults.redis_url
        });

        Self {
            redis_url,
            items_queue: non_empty(lookup("HARVEST_ITEMS_QUEUE")).unwrap_or(defaults.items_queue),
            meta_prefix: non_empty(lookup("HARVEST_META_PREFIX")).unwrap_or(defaults.meta_prefix),
        }
    }

    pub fn with_redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = url.into();
        self
    }

    pub fn with_items_queue(mut self, queue: impl Into<String>) -> Self {
        self.items_queue = queue.into();
        self
    }

    pub fn with_meta_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.meta_prefix = prefix.into();
        self
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
