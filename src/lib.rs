//! Ebert — a movie recommendation chatbot backed by a graph database.
//!
//! The chatbot answers natural-language questions about movies by translating
//! them into Cypher, running the query against Neo4j, and turning the rows
//! into a grounded answer. The interesting machinery lives in [`cypher`]:
//! generated statements are checked against a snapshot of the live database
//! schema, relationships written in the wrong direction are flipped in place,
//! and remaining errors are fed back to the LLM for a bounded number of
//! repair rounds before the query is executed.
//!
//! Service boundaries ([`llm::CompletionService`], [`graph::GraphService`])
//! are traits so the loops can be driven by mocks in tests.

#![warn(clippy::all)]

pub mod agent;
pub mod config;
pub mod cypher;
pub mod graph;
pub mod llm;
pub mod schema;

// Re-export main types for convenience
pub use agent::{Agent, AgentError, AgentResult, AgentTool, ToolOutput};
pub use config::{AgentSettings, AppConfig, GraphConfig, LlmConfig, LlmProvider};
pub use cypher::{CypherError, CypherResult, CypherRetriever, CypherValidator, Validation};
pub use graph::{GraphError, GraphResult, GraphService, Neo4jHttpClient};
pub use llm::{CompletionService, EmbeddingService, LlmClient, LlmError, LlmResult};
pub use schema::{
    PropertySpec, SchemaError, SchemaNode, SchemaRelationship, SchemaResult, SchemaSnapshot,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
