//! FORCEBRIDGE Cache - Two-Tier Result Cache
//!
//! Query tier: memoizes compiled-query results behind a rotating namespace
//! token, so "flush everything" is a single pointer write. Entry tier:
//! memoizes point lookups and keeps a reverse index from
//! `(object, field, value)` to dependent entry keys, so a write can
//! invalidate exactly what it made stale.
//!
//! Both tiers sit on the [`CacheBackend`] contract and treat backend
//! failures as cache misses; caching is best-effort, the remote store stays
//! the source of truth.

pub mod entry_cache;
pub mod keys;
pub mod memory;
pub mod query_cache;
pub mod traits;

pub use entry_cache::{EntryCache, InvalidationConditions};
pub use memory::InMemoryCacheBackend;
pub use query_cache::QueryCache;
pub use traits::CacheBackend;
