//! FORCEBRIDGE Client - Remote Record API
//!
//! The [`RemoteApi`] trait is the transport seam for the whole integration:
//! query, raw query (with total size), describe metadata and CRUD. The
//! [`RestClient`] implements it over the remote store's REST surface with
//! bearer auth. Token acquisition/refresh and transport-level retries belong
//! to the caller.

pub mod resolver;
pub mod rest;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use forcebridge_core::{AttributeMap, ObjectDescribe, Record, RemoteError};

pub use resolver::MemoizedSchemaResolver;
pub use rest::RestClient;

/// One page of raw query results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryResponse {
    pub total_size: u64,
    pub done: bool,
    pub records: Vec<serde_json::Value>,
    pub next_records_url: Option<String>,
}

/// Remote record store API.
///
/// Calls either complete or propagate a [`RemoteError`]; no retry policy is
/// owned at this layer.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Run a query and return every matching record, following pagination.
    async fn query(&self, soql: &str) -> Result<Vec<Record>, RemoteError>;

    /// Run a query and return the first result page verbatim, including the
    /// remote's total size (used for counts).
    async fn raw_query(&self, soql: &str) -> Result<QueryResponse, RemoteError>;

    /// Fetch describe metadata for an object.
    async fn describe(&self, object: &str) -> Result<ObjectDescribe, RemoteError>;

    /// Create a record, returning the new identifier.
    async fn create(&self, object: &str, attributes: &AttributeMap) -> Result<String, RemoteError>;

    /// Update the record addressed by `identifier_field = id`.
    async fn update(
        &self,
        object: &str,
        id: &str,
        attributes: &AttributeMap,
        identifier_field: &str,
    ) -> Result<(), RemoteError>;

    /// Delete the record addressed by `identifier_field = id`.
    async fn delete(&self, object: &str, id: &str, identifier_field: &str)
        -> Result<(), RemoteError>;

    /// Admissible picklist values for a field, from describe metadata.
    async fn picklist_values(&self, object: &str, field: &str) -> Result<Vec<String>, RemoteError> {
        Ok(self.describe(object).await?.picklist_values(field))
    }
}
