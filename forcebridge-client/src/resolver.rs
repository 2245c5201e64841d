//! Memoizing schema resolver.
//!
//! Describe metadata changes rarely but is fetched on every relationship
//! resolution, so the resolver memoizes unconditionally per instance. The
//! caller owns the resolver's lifetime (request- or process-scoped) and with
//! it the memoization window; there is deliberately no global state.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use forcebridge_core::{ObjectDescribe, RemoteError, SchemaResolver};

use crate::RemoteApi;

/// Schema resolver backed by a remote API with per-instance memoization.
pub struct MemoizedSchemaResolver<A: RemoteApi> {
    api: Arc<A>,
    describes: RwLock<HashMap<String, ObjectDescribe>>,
}

impl<A: RemoteApi> MemoizedSchemaResolver<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            describes: RwLock::new(HashMap::new()),
        }
    }

    /// Drop the memoized describe for one object.
    pub async fn invalidate(&self, object: &str) {
        self.describes.write().await.remove(object);
    }

    /// Drop every memoized describe.
    pub async fn clear(&self) {
        self.describes.write().await.clear();
    }
}

#[async_trait]
impl<A: RemoteApi> SchemaResolver for MemoizedSchemaResolver<A> {
    async fn describe(&self, object: &str) -> Result<ObjectDescribe, RemoteError> {
        if let Some(found) = self.describes.read().await.get(object) {
            return Ok(found.clone());
        }
        let describe = self.api.describe(object).await?;
        self.describes
            .write()
            .await
            .insert(object.to_string(), describe.clone());
        Ok(describe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QueryResponse;
    use forcebridge_core::{AttributeMap, Record};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingApi {
        describe_calls: AtomicU32,
    }

    impl CountingApi {
        fn new() -> Self {
            Self {
                describe_calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl RemoteApi for CountingApi {
        async fn query(&self, _soql: &str) -> Result<Vec<Record>, RemoteError> {
            Ok(Vec::new())
        }

        async fn raw_query(&self, _soql: &str) -> Result<QueryResponse, RemoteError> {
            Ok(QueryResponse::default())
        }

        async fn describe(&self, object: &str) -> Result<ObjectDescribe, RemoteError> {
            self.describe_calls.fetch_add(1, Ordering::SeqCst);
            Ok(ObjectDescribe {
                name: object.to_string(),
                ..Default::default()
            })
        }

        async fn create(
            &self,
            _object: &str,
            _attributes: &AttributeMap,
        ) -> Result<String, RemoteError> {
            Ok("001".to_string())
        }

        async fn update(
            &self,
            _object: &str,
            _id: &str,
            _attributes: &AttributeMap,
            _identifier_field: &str,
        ) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn delete(
            &self,
            _object: &str,
            _id: &str,
            _identifier_field: &str,
        ) -> Result<(), RemoteError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_describe_is_memoized() {
        let api = Arc::new(CountingApi::new());
        let resolver = MemoizedSchemaResolver::new(Arc::clone(&api));

        for _ in 0..3 {
            let describe = resolver.describe("Account").await.unwrap();
            assert_eq!(describe.name, "Account");
        }
        assert_eq!(api.describe_calls.load(Ordering::SeqCst), 1);

        // A different object is its own cache slot.
        resolver.describe("Contact").await.unwrap();
        assert_eq!(api.describe_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_refetches() {
        let api = Arc::new(CountingApi::new());
        let resolver = MemoizedSchemaResolver::new(Arc::clone(&api));

        resolver.describe("Account").await.unwrap();
        resolver.invalidate("Account").await;
        resolver.describe("Account").await.unwrap();
        assert_eq!(api.describe_calls.load(Ordering::SeqCst), 2);
    }
}
