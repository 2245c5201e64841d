//! Versioned-namespace query cache.
//!
//! Memoizes "run this exact compiled query" behind a namespace token
//! embedded in every key. Flushing rotates the token, orphaning every
//! existing query entry in O(1); orphans expire or get evicted by the
//! backend's own policy.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use forcebridge_core::{CacheError, CacheOptions, ForceBridgeResult};

use crate::keys;
use crate::traits::CacheBackend;

/// Query-result cache over a pluggable backend.
pub struct QueryCache<B: CacheBackend> {
    backend: Arc<B>,
    query_ttl: Option<Duration>,
    skip_retrieval_by_default: bool,
}

impl<B: CacheBackend> QueryCache<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            query_ttl: None,
            skip_retrieval_by_default: false,
        }
    }

    /// Set the TTL applied to stored query results.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.query_ttl = Some(ttl);
        self
    }

    /// Skip cache retrieval unless a call opts back in.
    pub fn skip_retrieval_by_default(mut self, skip: bool) -> Self {
        self.skip_retrieval_by_default = skip;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Current namespace token, self-healing.
    ///
    /// A backend read failure or a malformed pointer value is never fatal: a
    /// fresh token is generated and persisted, which simply orphans whatever
    /// was cached under the previous token.
    pub async fn namespace(&self) -> String {
        match self.backend.get(keys::QUERY_NAMESPACE_KEY).await {
            Ok(Some(serde_json::Value::String(token))) if !token.is_empty() => return token,
            Ok(_) => {}
            Err(error) => {
                tracing::warn!(error = %error, "query namespace pointer unreadable, regenerating");
            }
        }
        let token = generate_namespace();
        if let Err(error) = self
            .backend
            .set(keys::QUERY_NAMESPACE_KEY, json!(token), None)
            .await
        {
            tracing::warn!(error = %error, "failed to persist fresh query namespace");
        }
        token
    }

    /// Flush all cached query results by rotating the namespace token.
    ///
    /// O(1) regardless of how many results are cached; old entries become
    /// unreachable rather than being enumerated and deleted.
    pub async fn flush(&self) -> Result<(), CacheError> {
        let token = generate_namespace();
        self.backend
            .set(keys::QUERY_NAMESPACE_KEY, json!(token), None)
            .await
    }

    /// Memoize the result of running the given compiled query.
    ///
    /// On hit (unless `skip_cache`), the stored value is decoded and
    /// returned; on miss the producer runs and its result is stored under the
    /// configured TTL. Backend read/write failures degrade to a miss or an
    /// unstored result; producer errors propagate unchanged.
    pub async fn remember<T, F, Fut>(
        &self,
        soql: &str,
        options: CacheOptions,
        producer: F,
    ) -> ForceBridgeResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ForceBridgeResult<T>>,
    {
        let namespace = self.namespace().await;
        let key = keys::query_key(&namespace, soql);
        let skip = options.skip_cache || self.skip_retrieval_by_default;

        if !skip {
            match self.backend.get(&key).await {
                Ok(Some(value)) => match serde_json::from_value::<T>(value) {
                    Ok(decoded) => {
                        if options.log_request {
                            tracing::debug!(soql, key = %key, cache = true, "query served from cache");
                        }
                        return Ok(decoded);
                    }
                    Err(error) => {
                        tracing::warn!(key = %key, error = %error, "cached query result undecodable, refetching");
                    }
                },
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(key = %key, error = %error, "query cache read failed, treating as miss");
                }
            }
        }

        let produced = producer().await?;

        match serde_json::to_value(&produced) {
            Ok(encoded) => {
                if let Err(error) = self.backend.set(&key, encoded, self.query_ttl).await {
                    tracing::warn!(key = %key, error = %error, "failed to store query result");
                }
            }
            Err(error) => {
                tracing::warn!(key = %key, error = %error, "query result not serializable, skipping store");
            }
        }

        if options.log_request {
            tracing::debug!(soql, key = %key, cache = false, "query executed");
        }

        Ok(produced)
    }
}

impl<B: CacheBackend> Clone for QueryCache<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            query_ttl: self.query_ttl,
            skip_retrieval_by_default: self.skip_retrieval_by_default,
        }
    }
}

fn generate_namespace() -> String {
    Uuid::now_v7().simple().to_string()
}
