//! FORCEBRIDGE SOQL - Query Builder and Compiler
//!
//! Fluent condition building plus deterministic lowering to SOQL text.
//! The compiler resolves relationship includes against describe metadata
//! through the `SchemaResolver` seam defined in `forcebridge-core`.

pub mod builder;
pub mod compiler;

pub use builder::{Constraint, QueryBuilder, SortDirection};
pub use compiler::compile;
