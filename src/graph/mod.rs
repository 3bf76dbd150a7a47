//! Graph database access
//!
//! The rest of the crate talks to Neo4j through the [`GraphService`] trait:
//! run a statement and get rows back, or introspect the schema. Keeping the
//! seam here means the repair loops can be exercised against mocks.

pub mod client;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use client::Neo4jHttpClient;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    /// The database accepted the connection but rejected the statement.
    /// The message is fed back to the LLM by the execution repair loop.
    #[error("Execution error: {0}")]
    ExecutionError(String),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// A graph database that can execute Cypher and describe its own schema
#[async_trait]
pub trait GraphService: Send + Sync {
    /// Execute a statement and return one JSON object per row
    async fn query(&self, statement: &str, params: Value) -> GraphResult<Vec<Value>>;

    /// Return the raw schema description rows used to build a
    /// [`crate::schema::SchemaSnapshot`]
    async fn introspect_schema(&self) -> GraphResult<Vec<Value>> {
        self.query("CALL apoc.meta.schema()", Value::Null).await
    }
}
