//! FORCEBRIDGE Core - Data Types
//!
//! Pure data structures and errors for the remote record store integration.
//! All other crates depend on this. This crate contains no I/O - the schema
//! resolver trait is the single async seam, implemented elsewhere.

pub mod condition;
pub mod error;
pub mod options;
pub mod record;
pub mod schema;
pub mod signature;

pub use condition::{
    indexable_pairs, is_point_lookup, BooleanOp, CompareOp, Condition, Scalar, SetOp, Value,
};
pub use error::{
    CacheError, ForceBridgeError, ForceBridgeResult, QueryError, RemoteError, RepositoryError,
};
pub use options::CacheOptions;
pub use record::{AttributeMap, Record};
pub use schema::{
    ChildRelationship, FieldDescribe, ObjectDescribe, PicklistValue, SchemaResolver,
    StaticSchemaResolver,
};
pub use signature::{canonical_conditions, normalize_value, sha256_hex, signature_hash};
