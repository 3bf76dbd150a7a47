//! Cypher retrieval: the bounded self-correction loops
//!
//! Two independent loops, both capped by the same configurable try limit:
//!
//! * static repair — validate the candidate against the schema snapshot and
//!   feed any findings back to the evaluation chain until the statement is
//!   clean or the budget is spent. Exhaustion returns the last candidate:
//!   a close-but-imperfect statement may still execute and return useful
//!   rows, so this is best-effort rather than a hard failure.
//! * execution repair — run the statement; when the database rejects it at
//!   runtime, feed the engine's message into the same chain (static
//!   validation is not repeated) and re-execute. Exhaustion yields no rows,
//!   which callers must treat as "no answer", not an error.

use crate::cypher::evaluation::CypherEvaluationChain;
use crate::cypher::generation::CypherGenerationChain;
use crate::cypher::validator::CypherValidator;
use crate::cypher::CypherResult;
use crate::graph::{GraphError, GraphService};
use crate::llm::{CompletionService, LlmResult};
use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

/// GPT models are adamant about using the deprecated `id()` function
/// regardless of prompt instructions, so it is rewritten deterministically
/// after the repair loop converges.
static DEPRECATED_ID_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\sid\(([^)]+)\)").expect("id() pattern is valid"));

/// Everything one retrieval produced, for answer generation and history
#[derive(Debug, Clone)]
pub struct CypherRetrieval {
    /// The statement that was finally executed
    pub cypher: String,
    /// Result rows; empty when every execution attempt failed
    pub rows: Vec<Value>,
    /// Rows serialized for interpolation into the answer prompt
    pub context: String,
    /// Element ids of the nodes that grounded the answer
    pub ids: Vec<String>,
}

/// Generates, validates, repairs and executes Cypher for one question
pub struct CypherRetriever {
    graph: Arc<dyn GraphService>,
    validator: Arc<CypherValidator>,
    generation: CypherGenerationChain,
    evaluation: CypherEvaluationChain,
    max_tries: u32,
}

impl CypherRetriever {
    pub fn new(
        graph: Arc<dyn GraphService>,
        llm: Arc<dyn CompletionService>,
        validator: Arc<CypherValidator>,
        max_tries: u32,
    ) -> Self {
        Self {
            graph,
            validator,
            generation: CypherGenerationChain::new(llm.clone()),
            evaluation: CypherEvaluationChain::new(llm),
            max_tries,
        }
    }

    /// Generate a statement for the question and repair it against the
    /// schema until it validates cleanly or the try budget is spent.
    pub async fn generate_validated(&self, question: &str) -> LlmResult<String> {
        let schema = self.validator.schema_string();

        let mut cypher = self.generation.generate(question, &schema).await?;
        let mut checked = self.validator.validate(&cypher);
        cypher = checked.query;

        let mut tries = 0;
        while !checked.errors.is_empty() && tries < self.max_tries {
            tries += 1;
            debug!(
                "Repair round {}/{}: {} errors",
                tries,
                self.max_tries,
                checked.errors.len()
            );

            match self
                .evaluation
                .evaluate(question, &schema, &cypher, &checked.errors)
                .await
            {
                Ok(evaluation) => cypher = evaluation.cypher,
                // No improvement this round; the attempt still counts
                // against the budget
                Err(e) => warn!("Repair attempt {} abandoned: {}", tries, e),
            }

            checked = self.validator.validate(&cypher);
            cypher = checked.query;
        }

        if !checked.errors.is_empty() {
            warn!(
                "Returning best-effort statement with {} unresolved errors",
                checked.errors.len()
            );
        }

        Ok(rewrite_deprecated_id(&cypher))
    }

    /// Execute the statement, correcting runtime errors reported by the
    /// database. Returns `None` when every attempt failed.
    pub async fn fetch_results(
        &self,
        question: &str,
        cypher: &str,
    ) -> CypherResult<Option<Vec<Value>>> {
        let schema = self.validator.schema_string();
        let mut cypher = cypher.to_string();
        let mut retries = 0;

        loop {
            match self.graph.query(&cypher, Value::Null).await {
                Ok(rows) => return Ok(Some(rows)),
                Err(GraphError::ExecutionError(message)) => {
                    if retries >= self.max_tries {
                        warn!("Execution retries exhausted, returning no results");
                        return Ok(None);
                    }
                    retries += 1;
                    debug!(
                        "Execution attempt {}/{} rejected: {}",
                        retries, self.max_tries, message
                    );

                    match self
                        .evaluation
                        .evaluate(question, &schema, &cypher, &[message])
                        .await
                    {
                        Ok(evaluation) => cypher = evaluation.cypher,
                        Err(e) => warn!("Correction attempt {} abandoned: {}", retries, e),
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// The full pipeline: generate, repair, execute, and package the rows
    /// for answer generation.
    pub async fn retrieve(&self, question: &str) -> CypherResult<CypherRetrieval> {
        let cypher = self.generate_validated(question).await?;
        let rows = self
            .fetch_results(question, &cypher)
            .await?
            .unwrap_or_default();

        let ids = extract_ids(&rows);
        let context = if rows.len() == 1 {
            rows[0].to_string()
        } else {
            Value::Array(rows.clone()).to_string()
        };

        Ok(CypherRetrieval {
            cypher,
            rows,
            context,
            ids,
        })
    }
}

/// Rewrite deprecated ` id(x)` calls to ` elementId(x)`
pub fn rewrite_deprecated_id(cypher: &str) -> String {
    DEPRECATED_ID_CALL
        .replace_all(cypher, " elementId($1)")
        .into_owned()
}

/// Collect every `_id` value from the result rows, including nested
/// objects and arrays, preserving first-seen order.
pub fn extract_ids(rows: &[Value]) -> Vec<String> {
    let mut ids = Vec::new();
    for row in rows {
        collect_ids(row, &mut ids);
    }
    ids
}

fn collect_ids(value: &Value, ids: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map {
                if key == "_id" {
                    if let Some(id) = inner.as_str() {
                        if !ids.iter().any(|existing| existing == id) {
                            ids.push(id.to_string());
                        }
                    }
                } else {
                    collect_ids(inner, ids);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_ids(item, ids);
            }
        }
        _ => {}
    }
}
