//! Database schema model
//!
//! An immutable snapshot of the node labels and directed relationship
//! triples known to the database, built from `CALL apoc.meta.schema()`.
//! The Cypher validator checks generated statements against this snapshot.

pub mod model;

use crate::graph::GraphError;
use thiserror::Error;

pub use model::{PropertySpec, SchemaNode, SchemaRelationship, SchemaSnapshot};

#[derive(Error, Debug)]
pub enum SchemaError {
    /// Introspection returned nothing; there is no schema to validate
    /// against, so this is fatal rather than a degraded mode.
    #[error("Could not load schema: introspection returned no data")]
    Load,
    #[error("Malformed schema description: {0}")]
    Parse(String),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

pub type SchemaResult<T> = Result<T, SchemaError>;
