use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

/// Best-effort key/value cache. Callers must not depend on a write succeeding.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process TTL cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, Entry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let hit = self
            .entries
            .get(key)
            .and_then(|e| (e.expires_at > now).then(|| e.value.clone()));
        if hit.is_none() {
            self.entries.remove_if(key, |_, e| e.expires_at <= now);
        }
        hit
    }

    /// Drops expired entries.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, e| e.expires_at > now);
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> anyhow::Result<()> {
        if self.entries.len() > 10_000 {
            self.purge_expired();
        }
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + Duration::from_secs(ttl_seconds),
            },
        );
        Ok(())
    }
}
