//! Picklist lookups.
//!
//! A lookup names one picklist field of one remote object; its admissible
//! values come from describe metadata. The cached variant memoizes the value
//! list through the cache backend so repeated lookups skip the describe call.

use std::sync::Arc;
use std::time::Duration;

use forcebridge_cache::{keys, CacheBackend};
use forcebridge_client::RemoteApi;
use forcebridge_core::ForceBridgeResult;

/// Descriptor for one picklist field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    object: String,
    field: String,
}

impl Lookup {
    pub fn new(object: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            field: field.into(),
        }
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Fetch the admissible values straight from the remote API.
    pub async fn fetch<A: RemoteApi>(&self, api: &A) -> ForceBridgeResult<Vec<String>> {
        Ok(api.picklist_values(&self.object, &self.field).await?)
    }
}

/// Lookup memoized through the cache backend.
pub struct CachedLookup<A: RemoteApi, B: CacheBackend> {
    lookup: Lookup,
    api: Arc<A>,
    backend: Arc<B>,
    ttl: Option<Duration>,
}

impl<A: RemoteApi, B: CacheBackend> CachedLookup<A, B> {
    pub fn new(lookup: Lookup, api: Arc<A>, backend: Arc<B>) -> Self {
        Self {
            lookup,
            api,
            backend,
            ttl: Some(Duration::from_secs(3600)),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// All admissible values, served from cache when possible.
    pub async fn all(&self) -> ForceBridgeResult<Vec<String>> {
        let key = keys::lookup_key(self.lookup.object(), self.lookup.field());

        match self.backend.get(&key).await {
            Ok(Some(value)) => match serde_json::from_value::<Vec<String>>(value) {
                Ok(values) => return Ok(values),
                Err(error) => {
                    tracing::warn!(key = %key, error = %error, "cached lookup undecodable, refetching");
                }
            },
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(key = %key, error = %error, "lookup cache read failed, treating as miss");
            }
        }

        let values = self.lookup.fetch(self.api.as_ref()).await?;
        if let Err(error) = self
            .backend
            .set(&key, serde_json::json!(values), self.ttl)
            .await
        {
            tracing::warn!(key = %key, error = %error, "failed to store lookup values");
        }
        Ok(values)
    }
}
