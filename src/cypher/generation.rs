//! Cypher generation chain
//!
//! One completion call from question + schema to a candidate statement. No
//! validation or retrying happens here; service errors propagate to the
//! retrieval loop.

use crate::llm::{CompletionService, LlmResult};
use std::sync::Arc;
use tracing::debug;

const SYSTEM_PROMPT: &str = "You are a Neo4j Developer translating user questions into Cypher \
to answer questions about movies and provide recommendations.";

const GENERATION_PROMPT: &str = r#"Convert the user's question into a Cypher statement based on the schema.

You must:
* Only use the nodes, relationships and properties mentioned in the schema.
* Use `IS NOT NULL` to check for property existence, and not the exists() function.
* Use the `elementId()` function to return the unique identifier for a node or relationship as `_id`.
  For example:
  ```
  MATCH (a:Person)-[:ACTED_IN]->(m:Movie)
  WHERE a.name = 'Emil Eifrem'
  RETURN m.title AS title, elementId(m) AS _id, a.role AS role
  ```
* Include extra information about the nodes that may help an LLM provide a more informative answer,
  for example the release date or rating.
* For movies, use the tmdbId property to return a source URL.
  For example: `'https://www.themoviedb.org/movie/'+ m.tmdbId AS source`.
* For movie titles that begin with "The", move "the" to the end.
  For example "The 39 Steps" becomes "39 Steps, The" or "the matrix" becomes "Matrix, The".
* Limit the maximum number of results to 10.

Important:
* The "role" property exists on the ACTED_IN relationship.
* The "rating" property exists on the RATED relationship.

Schema:
{schema}

Question:
{question}

Respond with only the Cypher statement."#;

/// Turns a natural-language question plus schema description into one
/// candidate Cypher statement
pub struct CypherGenerationChain {
    llm: Arc<dyn CompletionService>,
}

impl CypherGenerationChain {
    pub fn new(llm: Arc<dyn CompletionService>) -> Self {
        Self { llm }
    }

    pub async fn generate(&self, question: &str, schema: &str) -> LlmResult<String> {
        let prompt = GENERATION_PROMPT
            .replace("{schema}", schema)
            .replace("{question}", question);

        let raw = self.llm.complete(SYSTEM_PROMPT, &prompt).await?;
        let cypher = extract_cypher(&raw);
        debug!("Generated Cypher: {}", cypher);
        Ok(cypher)
    }
}

/// Extract a Cypher statement from an LLM reply that may contain markdown
/// fences or surrounding prose.
pub fn extract_cypher(response: &str) -> String {
    let trimmed = response.trim();

    // If the reply contains a fenced code block, extract the first one
    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        // Skip the language tag (e.g. "cypher\n")
        let code_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        if let Some(end) = after_fence[code_start..].find("```") {
            return after_fence[code_start..code_start + end].trim().to_string();
        }
    }

    trimmed
        .trim_start_matches("```cypher")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
        .to_string()
}
