//! Plot similarity retrieval
//!
//! Thin glue over the database's vector index: embed the question, query
//! the `moviePlots` index, and package the hits as context. The index
//! itself is maintained outside this application.

use crate::agent::{AgentResult, ToolOutput};
use crate::cypher::retrieval::extract_ids;
use crate::graph::GraphService;
use crate::llm::EmbeddingService;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

const RETRIEVAL_QUERY: &str = "CALL db.index.vector.queryNodes($index, $k, $embedding) \
     YIELD node, score \
     RETURN node.plot AS text, score, { \
       _id: elementId(node), \
       title: node.title, \
       directors: [ (person)-[:DIRECTED]->(node) | person.name ], \
       actors: [ (person)-[r:ACTED_IN]->(node) | [person.name, r.role] ], \
       tmdbId: node.tmdbId, \
       source: 'https://www.themoviedb.org/movie/'+ node.tmdbId \
     } AS metadata";

pub struct VectorRetriever {
    graph: Arc<dyn GraphService>,
    embeddings: Arc<dyn EmbeddingService>,
    index: String,
    top_k: u32,
}

impl VectorRetriever {
    pub fn new(
        graph: Arc<dyn GraphService>,
        embeddings: Arc<dyn EmbeddingService>,
        index: String,
        top_k: u32,
    ) -> Self {
        Self {
            graph,
            embeddings,
            index,
            top_k,
        }
    }

    pub async fn retrieve(&self, question: &str) -> AgentResult<ToolOutput> {
        let embedding = self.embeddings.embed(question).await?;
        let rows = self
            .graph
            .query(
                RETRIEVAL_QUERY,
                json!({
                    "index": self.index,
                    "k": self.top_k,
                    "embedding": embedding,
                }),
            )
            .await?;

        debug!("Vector search returned {} documents", rows.len());

        let ids = extract_ids(&rows);
        let context = serde_json::Value::Array(rows).to_string();

        Ok(ToolOutput {
            context,
            ids,
            cypher: None,
        })
    }
}
