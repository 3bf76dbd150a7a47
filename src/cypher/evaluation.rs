//! Cypher evaluation chain
//!
//! Given a statement and the errors found in it, ask the LLM to rewrite the
//! statement. Used both for static validation findings and for runtime
//! error messages reported by the database.

use crate::llm::{CompletionService, LlmError, LlmResult};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

const SYSTEM_PROMPT: &str =
    "You are a Neo4j Developer correcting Cypher statements. You always respond with JSON.";

const EVALUATION_PROMPT: &str = r#"Given the following schema, will the Cypher statement provided
return the correct information to answer the question.

If the statement is correct, return the statement.
If the statement is incorrect, rewrite the statement.

Respond with a JSON object with "cypher" and "errors" keys.
* "cypher" - the corrected Cypher statement
* "errors" - a list of uncorrected errors. For example: ["Label (:Foo) does not exist, did you mean (:Film)?"]

Do not provide any preamble or markdown.

Schema:
{schema}

Question:
{question}

Cypher Statement:
{cypher}

Errors:
{errors}"#;

/// The repair chain's reply: a rewritten statement plus any errors the
/// model could not resolve
#[derive(Debug, Clone, Deserialize)]
pub struct Evaluation {
    pub cypher: String,
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Asks the LLM to repair a Cypher statement given a list of findings
pub struct CypherEvaluationChain {
    llm: Arc<dyn CompletionService>,
}

impl CypherEvaluationChain {
    pub fn new(llm: Arc<dyn CompletionService>) -> Self {
        Self { llm }
    }

    pub async fn evaluate(
        &self,
        question: &str,
        schema: &str,
        cypher: &str,
        errors: &[String],
    ) -> LlmResult<Evaluation> {
        let prompt = EVALUATION_PROMPT
            .replace("{schema}", schema)
            .replace("{question}", question)
            .replace("{cypher}", cypher)
            .replace("{errors}", &errors.join("\n"));

        let raw = self.llm.complete(SYSTEM_PROMPT, &prompt).await?;
        let evaluation = parse_evaluation(&raw)?;
        debug!(
            "Evaluated Cypher: {} ({} outstanding errors)",
            evaluation.cypher,
            evaluation.errors.len()
        );
        Ok(evaluation)
    }
}

/// Parse the model's JSON reply, tolerating markdown fences and prose
/// around the object.
fn parse_evaluation(response: &str) -> LlmResult<Evaluation> {
    let trimmed = response.trim();

    if let Ok(evaluation) = serde_json::from_str(trimmed) {
        return Ok(evaluation);
    }

    // Fall back to the outermost brace pair
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            return serde_json::from_str(&trimmed[start..=end])
                .map_err(|e| LlmError::SerializationError(e.to_string()));
        }
    }

    Err(LlmError::SerializationError(format!(
        "Reply contained no JSON object: {}",
        trimmed
    )))
}
