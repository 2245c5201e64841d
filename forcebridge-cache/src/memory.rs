//! In-memory reference backend.
//!
//! Suitable for tests and single-process deployments. Expiry is lazy: an
//! entry past its deadline is treated as absent at read time and dropped on
//! the next write that touches the map.

use async_trait::async_trait;
use forcebridge_core::CacheError;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::traits::CacheBackend;

#[derive(Debug, Clone)]
struct StoredEntry {
    value: serde_json::Value,
    expires_at: Option<Instant>,
}

impl StoredEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Thread-safe in-memory cache backend.
#[derive(Debug, Default)]
pub struct InMemoryCacheBackend {
    entries: RwLock<HashMap<String, StoredEntry>>,
}

impl InMemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of physically stored entries, expired ones included.
    pub fn entry_count(&self) -> usize {
        self.entries.read().map(|map| map.len()).unwrap_or(0)
    }
}

fn poisoned(_: impl std::fmt::Debug) -> CacheError {
    CacheError::Backend {
        reason: "cache lock poisoned".to_string(),
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    async fn has(&self, key: &str) -> Result<bool, CacheError> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.get(key).is_some_and(|entry| !entry.is_expired()))
    }

    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone()))
    }

    async fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.retain(|_, entry| !entry.is_expired());
        entries.insert(
            key.to_string(),
            StoredEntry {
                value,
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.remove(key);
        Ok(())
    }
}
