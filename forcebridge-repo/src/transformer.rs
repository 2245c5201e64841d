//! Attribute transformer seam.
//!
//! Mapping between the remote store's field names/types and an application's
//! attribute names/types (dates, booleans, delimited lists, computed fields)
//! is an external collaborator. The repository only needs a black box that
//! maps attributes in both directions.

use forcebridge_core::{AttributeMap, Record};

/// Black-box attribute mapper applied around every read and write.
pub trait Transformer: Send + Sync {
    /// Map application attributes to remote field names/values for writes.
    fn to_remote(&self, attributes: &AttributeMap) -> AttributeMap;

    /// Map a raw remote record to application attributes for reads.
    fn from_remote(&self, record: Record) -> Record;
}

/// Pass-through transformer used when the application speaks wire field
/// names directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransformer;

impl Transformer for IdentityTransformer {
    fn to_remote(&self, attributes: &AttributeMap) -> AttributeMap {
        attributes.clone()
    }

    fn from_remote(&self, record: Record) -> Record {
        record
    }
}
