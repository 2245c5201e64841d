//! FORCEBRIDGE Repo - Repository Façade
//!
//! Ordinary repository-style access (find, filter, sort, paginate, create,
//! update, delete) over the remote record store, composed from the query
//! compiler, the two cache tiers and the remote client. Write operations
//! trigger the invalidation that keeps the read path honest.

pub mod lookup;
pub mod repository;
pub mod transformer;

pub use lookup::{CachedLookup, Lookup};
pub use repository::{Repository, RepositoryConfig};
pub use transformer::{IdentityTransformer, Transformer};
