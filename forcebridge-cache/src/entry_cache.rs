//! Entry cache with secondary invalidation index.
//!
//! Memoizes the records matching a specific equality/IN condition signature
//! and maintains a reverse index from `(object, field, value)` to the set of
//! entry keys that depended on it. A write path that only knows
//! "object X, field F, value V changed" can then invalidate exactly the
//! affected entries without scanning the cache.
//!
//! Signatures with no indexable pair are never cached: they could not be
//! invalidated precisely, and serving stale single-record data indefinitely
//! is worse than refetching.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use forcebridge_core::{
    indexable_pairs, BooleanOp, CacheError, CacheOptions, CompareOp, Condition,
    ForceBridgeResult, Value,
};

use crate::keys;
use crate::traits::CacheBackend;

/// Input accepted by [`EntryCache::forget_by_conditions`]: either a raw
/// field→value map or an already-built condition list.
#[derive(Debug, Clone)]
pub enum InvalidationConditions {
    Fields(BTreeMap<String, Value>),
    Conditions(Vec<Condition>),
}

impl InvalidationConditions {
    fn into_conditions(self) -> Vec<Condition> {
        match self {
            InvalidationConditions::Conditions(conditions) => conditions,
            InvalidationConditions::Fields(fields) => fields
                .into_iter()
                .map(|(field, value)| {
                    Condition::basic(BooleanOp::And, field, CompareOp::Eq, value)
                })
                .collect(),
        }
    }
}

impl From<BTreeMap<String, Value>> for InvalidationConditions {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        InvalidationConditions::Fields(fields)
    }
}

impl From<Vec<Condition>> for InvalidationConditions {
    fn from(conditions: Vec<Condition>) -> Self {
        InvalidationConditions::Conditions(conditions)
    }
}

/// Point-lookup cache over a pluggable backend.
pub struct EntryCache<B: CacheBackend> {
    backend: Arc<B>,
    entry_ttl: Option<Duration>,
    skip_retrieval_by_default: bool,
}

impl<B: CacheBackend> EntryCache<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            entry_ttl: None,
            skip_retrieval_by_default: false,
        }
    }

    /// Set the TTL applied to entries and their index sets.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.entry_ttl = Some(ttl);
        self
    }

    pub fn skip_retrieval_by_default(mut self, skip: bool) -> Self {
        self.skip_retrieval_by_default = skip;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Memoize the record(s) matching this condition signature.
    ///
    /// Registration happens on miss and again on every hit: the index set
    /// carries the same TTL as the entry but can expire independently, and an
    /// unindexed entry would be invisible to invalidation.
    pub async fn remember<T, F, Fut>(
        &self,
        object: &str,
        conditions: &[Condition],
        options: CacheOptions,
        producer: F,
    ) -> ForceBridgeResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ForceBridgeResult<T>>,
    {
        let pairs = indexable_pairs(conditions);
        if pairs.is_empty() {
            return producer().await;
        }

        let key = keys::entry_key(object, conditions);
        let skip = options.skip_cache || self.skip_retrieval_by_default;

        if !skip {
            match self.backend.get(&key).await {
                Ok(Some(value)) => match serde_json::from_value::<T>(value) {
                    Ok(decoded) => {
                        self.register(&key, object, &pairs).await;
                        if options.log_request {
                            tracing::debug!(object, key = %key, cache = true, "entry served from cache");
                        }
                        return Ok(decoded);
                    }
                    Err(error) => {
                        tracing::warn!(key = %key, error = %error, "cached entry undecodable, refetching");
                    }
                },
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(key = %key, error = %error, "entry cache read failed, treating as miss");
                }
            }
        }

        let produced = producer().await?;

        match serde_json::to_value(&produced) {
            Ok(encoded) => {
                if let Err(error) = self.backend.set(&key, encoded, self.entry_ttl).await {
                    tracing::warn!(key = %key, error = %error, "failed to store entry");
                } else {
                    self.register(&key, object, &pairs).await;
                }
            }
            Err(error) => {
                tracing::warn!(key = %key, error = %error, "entry not serializable, skipping store");
            }
        }

        if options.log_request {
            tracing::debug!(object, key = %key, cache = false, "entry fetched");
        }

        Ok(produced)
    }

    /// Invalidate every entry that could be stale after a change to the given
    /// field/value pairs.
    ///
    /// For each indexable pair: fetch the index set, delete every dependent
    /// entry key, then delete the index key itself. Interruption at any point
    /// self-heals: a dangling index only ever produces a cache miss. Inputs
    /// with no indexable pair are a no-op.
    pub async fn forget_by_conditions(
        &self,
        object: &str,
        input: impl Into<InvalidationConditions>,
    ) -> Result<(), CacheError> {
        let conditions = input.into().into_conditions();
        let pairs = indexable_pairs(&conditions);
        if pairs.is_empty() {
            return Ok(());
        }

        // Direct key for this exact signature: covers an entry whose index
        // set expired before the entry itself did.
        self.backend
            .delete(&keys::entry_key(object, &conditions))
            .await?;

        for (field, value) in pairs {
            let index_key = keys::entry_index_key(object, field, value);
            let dependents: Vec<String> = match self.backend.get(&index_key).await? {
                Some(value) => serde_json::from_value(value).unwrap_or_default(),
                None => Vec::new(),
            };
            for entry_key in &dependents {
                self.backend.delete(entry_key).await?;
            }
            self.backend.delete(&index_key).await?;
            tracing::debug!(
                object,
                field,
                invalidated = dependents.len(),
                "entry cache invalidated by condition"
            );
        }

        Ok(())
    }

    /// Register an entry key under every one of its indexable pairs.
    ///
    /// The read-modify-write on the index set is not atomic; a concurrent
    /// registration can lose one append. That under-indexes an entry until
    /// the next hit re-registers it, but never serves wrong data as fresh.
    async fn register(&self, entry_key: &str, object: &str, pairs: &[(&str, &Value)]) {
        for (field, value) in pairs {
            let index_key = keys::entry_index_key(object, field, value);
            let mut set: Vec<String> = match self.backend.get(&index_key).await {
                Ok(Some(value)) => serde_json::from_value(value).unwrap_or_default(),
                Ok(None) => Vec::new(),
                Err(error) => {
                    tracing::warn!(index_key = %index_key, error = %error, "index read failed, rebuilding set");
                    Vec::new()
                }
            };
            if set.iter().any(|key| key == entry_key) {
                continue;
            }
            set.push(entry_key.to_string());
            if let Err(error) = self.backend.set(&index_key, json!(set), self.entry_ttl).await {
                tracing::warn!(index_key = %index_key, error = %error, "failed to register entry in index");
            }
        }
    }
}

impl<B: CacheBackend> Clone for EntryCache<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            entry_ttl: self.entry_ttl,
            skip_retrieval_by_default: self.skip_retrieval_by_default,
        }
    }
}
