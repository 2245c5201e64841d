//! Cache backend contract.
//!
//! The backend is an external synchronous key/value service with
//! at-least-once, eventually-consistent semantics. No transactions and no
//! compare-and-swap are assumed; both cache tiers are written against exactly
//! this surface.

use async_trait::async_trait;
use forcebridge_core::CacheError;
use std::time::Duration;

/// Pluggable key/value cache backend.
///
/// Values are JSON documents; implementations own their own serialization of
/// that JSON. A `ttl` of `None` means no expiry beyond the backend's own
/// eviction policy.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn has(&self, key: &str) -> Result<bool, CacheError>;

    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError>;

    async fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}
