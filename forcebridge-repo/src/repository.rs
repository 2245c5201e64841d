//! Repository façade.
//!
//! Composes the query builder/compiler, both cache tiers and the remote CRUD
//! calls behind an explicit operation set: find, first, get, count, pluck,
//! create, update, delete, upsert. The façade owns the read-path routing
//! (entry cache for point lookups, query cache otherwise) and triggers
//! invalidation after every write.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use forcebridge_cache::{CacheBackend, EntryCache, QueryCache};
use forcebridge_client::{MemoizedSchemaResolver, RemoteApi};
use forcebridge_core::{
    is_point_lookup, normalize_value, AttributeMap, CacheOptions, ForceBridgeResult, Record,
    RepositoryError, Value,
};
use forcebridge_soql::{Constraint, QueryBuilder};

use crate::transformer::{IdentityTransformer, Transformer};

/// Declarative repository configuration.
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// Target remote object. Operations fail with
    /// [`RepositoryError::ObjectNotSpecified`] while unset.
    pub object: Option<String>,
    /// Identifier field, used for point lookups and write invalidation.
    pub identifier_field: String,
    /// Select list applied to every new query; empty means identifier only.
    pub select_fields: Vec<String>,
    /// Declared default attribute values, filled into creates and updates
    /// when the caller does not provide the field. Null or empty defaults
    /// are dropped, never sent.
    pub default_attributes: AttributeMap,
    /// Fixed attribute values filled into every write the caller does not
    /// override.
    pub fixed_attributes: AttributeMap,
    pub query_ttl: Option<Duration>,
    pub entry_ttl: Option<Duration>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            object: None,
            identifier_field: "Id".to_string(),
            select_fields: Vec::new(),
            default_attributes: AttributeMap::new(),
            fixed_attributes: AttributeMap::new(),
            query_ttl: None,
            entry_ttl: None,
        }
    }
}

impl RepositoryConfig {
    pub fn new(object: impl Into<String>) -> Self {
        Self {
            object: Some(object.into()),
            ..Self::default()
        }
    }

    pub fn with_identifier_field(mut self, field: impl Into<String>) -> Self {
        self.identifier_field = field.into();
        self
    }

    pub fn with_select_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default_attribute(
        mut self,
        field: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        self.default_attributes.insert(field.into(), value);
        self
    }

    pub fn with_fixed_attribute(
        mut self,
        field: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        self.fixed_attributes.insert(field.into(), value);
        self
    }

    pub fn with_query_ttl(mut self, ttl: Duration) -> Self {
        self.query_ttl = Some(ttl);
        self
    }

    pub fn with_entry_ttl(mut self, ttl: Duration) -> Self {
        self.entry_ttl = Some(ttl);
        self
    }
}

/// Repository-style access to one remote object.
pub struct Repository<A: RemoteApi, B: CacheBackend> {
    api: Arc<A>,
    resolver: MemoizedSchemaResolver<A>,
    query_cache: QueryCache<B>,
    entry_cache: EntryCache<B>,
    config: RepositoryConfig,
    default_constraints: Vec<Constraint>,
    transformer: Arc<dyn Transformer>,
}

impl<A: RemoteApi, B: CacheBackend> Repository<A, B> {
    pub fn new(api: Arc<A>, backend: Arc<B>, config: RepositoryConfig) -> Self {
        let mut query_cache = QueryCache::new(Arc::clone(&backend));
        if let Some(ttl) = config.query_ttl {
            query_cache = query_cache.with_ttl(ttl);
        }
        let mut entry_cache = EntryCache::new(backend);
        if let Some(ttl) = config.entry_ttl {
            entry_cache = entry_cache.with_ttl(ttl);
        }
        Self {
            resolver: MemoizedSchemaResolver::new(Arc::clone(&api)),
            api,
            query_cache,
            entry_cache,
            config,
            default_constraints: Vec::new(),
            transformer: Arc::new(IdentityTransformer),
        }
    }

    /// Add a constraint applied to every new query.
    pub fn with_default_constraint(mut self, constraint: Constraint) -> Self {
        self.default_constraints.push(constraint);
        self
    }

    pub fn with_transformer(mut self, transformer: Arc<dyn Transformer>) -> Self {
        self.transformer = transformer;
        self
    }

    pub fn resolver(&self) -> &MemoizedSchemaResolver<A> {
        &self.resolver
    }

    fn object(&self) -> Result<&str, RepositoryError> {
        self.config
            .object
            .as_deref()
            .ok_or(RepositoryError::ObjectNotSpecified)
    }

    /// A new query over the target object, with configured select fields and
    /// default constraints applied.
    pub fn query(&self) -> ForceBridgeResult<QueryBuilder> {
        let object = self.object()?;
        let mut builder = QueryBuilder::new(object)
            .with_identifier(self.config.identifier_field.clone());
        if !self.config.select_fields.is_empty() {
            builder = builder.select(self.config.select_fields.clone());
        }
        for constraint in &self.default_constraints {
            builder = builder.apply(constraint)?;
        }
        Ok(builder)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub async fn get(&self, builder: QueryBuilder) -> ForceBridgeResult<Vec<Record>> {
        self.get_with_options(builder, CacheOptions::new()).await
    }

    /// Run a collection query through the query cache.
    pub async fn get_with_options(
        &self,
        builder: QueryBuilder,
        options: CacheOptions,
    ) -> ForceBridgeResult<Vec<Record>> {
        let soql = builder.to_soql(&self.resolver).await?;
        let api = Arc::clone(&self.api);
        let fetch_soql = soql.clone();
        let records: Vec<Record> = self
            .query_cache
            .remember(&soql, options, move || async move {
                api.query(&fetch_soql).await.map_err(Into::into)
            })
            .await?;
        Ok(records
            .into_iter()
            .map(|record| self.transformer.from_remote(record))
            .collect())
    }

    pub async fn first(&self, builder: QueryBuilder) -> ForceBridgeResult<Option<Record>> {
        self.first_with_options(builder, CacheOptions::new()).await
    }

    /// Fetch the first matching record.
    ///
    /// A point lookup (every condition an equality/IN) goes through the
    /// entry cache so later writes can invalidate it precisely; anything
    /// else goes through the query cache only.
    pub async fn first_with_options(
        &self,
        builder: QueryBuilder,
        options: CacheOptions,
    ) -> ForceBridgeResult<Option<Record>> {
        let builder = builder.limit(1);
        if !is_point_lookup(builder.conditions()) {
            let records = self.get_with_options(builder, options).await?;
            return Ok(records.into_iter().next());
        }

        let object = self.object()?.to_string();
        let soql = builder.to_soql(&self.resolver).await?;
        let api = Arc::clone(&self.api);
        let records: Vec<Record> = self
            .entry_cache
            .remember(&object, builder.conditions(), options, move || async move {
                api.query(&soql).await.map_err(Into::into)
            })
            .await?;
        Ok(records
            .into_iter()
            .next()
            .map(|record| self.transformer.from_remote(record)))
    }

    pub async fn first_or_fail(&self, builder: QueryBuilder) -> ForceBridgeResult<Record> {
        let object = self.object()?.to_string();
        self.first(builder)
            .await?
            .ok_or_else(|| RepositoryError::RecordNotFound { object }.into())
    }

    /// Fetch one record by identifier.
    pub async fn find(&self, id: &str) -> ForceBridgeResult<Option<Record>> {
        let builder = self
            .query()?
            .filter(self.config.identifier_field.clone(), id);
        self.first(builder).await
    }

    pub async fn find_or_fail(&self, id: &str) -> ForceBridgeResult<Record> {
        let object = self.object()?.to_string();
        self.find(id)
            .await?
            .ok_or_else(|| RepositoryError::RecordNotFound { object }.into())
    }

    /// Count matching records without fetching them.
    pub async fn count(&self, builder: QueryBuilder) -> ForceBridgeResult<u64> {
        let soql = builder.count().to_soql(&self.resolver).await?;
        let api = Arc::clone(&self.api);
        let fetch_soql = soql.clone();
        self.query_cache
            .remember(&soql, CacheOptions::new(), move || async move {
                Ok(api.raw_query(&fetch_soql).await?.total_size)
            })
            .await
    }

    /// Project a single field out of every matching record.
    pub async fn pluck(
        &self,
        builder: QueryBuilder,
        field: &str,
    ) -> ForceBridgeResult<Vec<serde_json::Value>> {
        let records = self.get(builder.select([field])).await?;
        Ok(records
            .into_iter()
            .filter_map(|record| record.get(field).cloned())
            .collect())
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Create a record and return the new identifier.
    ///
    /// A brand-new record cannot collide with any cached point lookup, so
    /// only the query-cache namespace is rotated; the entry cache is left
    /// untouched.
    pub async fn create(&self, attributes: AttributeMap) -> ForceBridgeResult<String> {
        let object = self.object()?.to_string();
        let merged = self.merge_attributes(attributes);
        let remote_attributes = self.transformer.to_remote(&merged);
        let id = self.api.create(&object, &remote_attributes).await?;
        tracing::debug!(object = %object, id = %id, "record created, flushing query cache");
        self.query_cache.flush().await?;
        Ok(id)
    }

    /// Update a record, then invalidate both cache tiers for it.
    pub async fn update(&self, id: &str, attributes: AttributeMap) -> ForceBridgeResult<()> {
        let object = self.object()?.to_string();
        let merged = self.merge_attributes(attributes);
        let remote_attributes = self.transformer.to_remote(&merged);
        self.api
            .update(&object, id, &remote_attributes, &self.config.identifier_field)
            .await?;
        tracing::debug!(object = %object, id = %id, "record updated, invalidating caches");
        self.invalidate_after_write(&object, id).await
    }

    /// Delete a record, then invalidate both cache tiers for it.
    pub async fn delete(&self, id: &str) -> ForceBridgeResult<()> {
        let object = self.object()?.to_string();
        self.api
            .delete(&object, id, &self.config.identifier_field)
            .await?;
        tracing::debug!(object = %object, id = %id, "record deleted, invalidating caches");
        self.invalidate_after_write(&object, id).await
    }

    /// Update the record matching `match_fields`, or create it with the
    /// match fields merged into the attributes. Returns the identifier.
    pub async fn upsert(
        &self,
        match_fields: BTreeMap<String, Value>,
        attributes: AttributeMap,
    ) -> ForceBridgeResult<String> {
        let object = self.object()?.to_string();
        let mut builder = self.query()?;
        for (field, value) in &match_fields {
            builder = builder.filter(field.clone(), value.clone());
        }

        match self.first(builder).await? {
            Some(record) => {
                let id = record
                    .id(&self.config.identifier_field)
                    .ok_or(RepositoryError::RecordNotFound { object })?
                    .to_string();
                self.update(&id, attributes).await?;
                Ok(id)
            }
            None => {
                let mut combined = attributes;
                for (field, value) in match_fields {
                    combined
                        .entry(field)
                        .or_insert_with(|| normalize_value(&value));
                }
                self.create(combined).await
            }
        }
    }

    async fn invalidate_after_write(&self, object: &str, id: &str) -> ForceBridgeResult<()> {
        self.query_cache.flush().await?;
        let mut fields = BTreeMap::new();
        fields.insert(
            self.config.identifier_field.clone(),
            Value::from(id.to_string()),
        );
        self.entry_cache.forget_by_conditions(object, fields).await?;
        Ok(())
    }

    /// Merge caller attributes over declared default and fixed values.
    ///
    /// Caller-provided values win; defaults and fixed fields fill gaps;
    /// null or empty defaults not explicitly provided are dropped.
    fn merge_attributes(&self, attributes: AttributeMap) -> AttributeMap {
        let mut merged = AttributeMap::new();
        for (field, value) in &self.config.default_attributes {
            if value.is_null() || value.as_str().is_some_and(str::is_empty) {
                continue;
            }
            merged.insert(field.clone(), value.clone());
        }
        for (field, value) in &self.config.fixed_attributes {
            merged.insert(field.clone(), value.clone());
        }
        for (field, value) in attributes {
            merged.insert(field, value);
        }
        merged
    }
}
