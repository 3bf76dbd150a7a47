//! Conversation history persistence
//!
//! Each session is a `(:Session)` node with a linked list of `(:Response)`
//! nodes chained by `:NEXT`, the most recent marked by `:LAST_RESPONSE`.
//! Responses link to the graph entities that grounded them via `:CONTEXT`.

use crate::graph::{GraphResult, GraphService};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// One persisted conversational turn
#[derive(Debug, Clone, Deserialize)]
pub struct ChatbotResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub input: String,
    #[serde(default, rename = "rephrasedQuestion")]
    pub rephrased_question: String,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub cypher: Option<String>,
}

/// Fetch the most recent turns for a session, oldest first
pub async fn get_history(
    graph: &dyn GraphService,
    session_id: &str,
    limit: u32,
) -> GraphResult<Vec<ChatbotResponse>> {
    // The path length bound cannot be a parameter, so the window is
    // interpolated into the statement
    let statement = format!(
        "MATCH (:Session {{id: $sessionId}})-[:LAST_RESPONSE]->(last) \
         MATCH path = (start)-[:NEXT*0..{limit}]->(last) \
         WHERE length(path) = {limit} OR NOT EXISTS {{ ()-[:NEXT]->(start) }} \
         UNWIND nodes(path) AS response \
         RETURN response.id AS id, \
           response.input AS input, \
           response.rephrasedQuestion AS rephrasedQuestion, \
           response.output AS output, \
           response.cypher AS cypher, \
           [ (response)-[:CONTEXT]->(n) | elementId(n) ] AS context"
    );

    let rows = graph.query(&statement, json!({ "sessionId": session_id })).await?;
    let history = rows
        .into_iter()
        .filter_map(|row| serde_json::from_value(row).ok())
        .collect::<Vec<ChatbotResponse>>();

    debug!("Loaded {} history turns for session {}", history.len(), session_id);
    Ok(history)
}

/// Save one turn and return the new response's id
#[allow(clippy::too_many_arguments)]
pub async fn save_history(
    graph: &dyn GraphService,
    session_id: &str,
    source: &str,
    input: &str,
    rephrased_question: &str,
    output: &str,
    ids: &[String],
    cypher: Option<&str>,
) -> GraphResult<String> {
    let statement = "MERGE (session:Session { id: $sessionId }) \
         CREATE (response:Response { \
           id: randomUuid(), \
           createdAt: datetime(), \
           source: $source, \
           input: $input, \
           output: $output, \
           rephrasedQuestion: $rephrasedQuestion, \
           cypher: $cypher, \
           ids: $ids \
         }) \
         CREATE (session)-[:HAS_RESPONSE]->(response) \
         WITH session, response \
         CALL { \
           WITH session, response \
           MATCH (session)-[lrel:LAST_RESPONSE]->(last) \
           DELETE lrel \
           CREATE (last)-[:NEXT]->(response) \
         } \
         CREATE (session)-[:LAST_RESPONSE]->(response) \
         WITH response \
         CALL { \
           WITH response \
           UNWIND $ids AS id \
           MATCH (context) \
           WHERE elementId(context) = id \
           CREATE (response)-[:CONTEXT]->(context) \
           RETURN count(*) AS count \
         } \
         RETURN DISTINCT response.id AS id";

    let rows = graph
        .query(
            statement,
            json!({
                "sessionId": session_id,
                "source": source,
                "input": input,
                "output": output,
                "rephrasedQuestion": rephrased_question,
                "cypher": cypher,
                "ids": ids,
            }),
        )
        .await?;

    let id = rows
        .first()
        .and_then(|row| row.get("id"))
        .and_then(|id| id.as_str())
        .unwrap_or_default()
        .to_string();

    debug!("Saved response {} for session {}", id, session_id);
    Ok(id)
}

/// Delete every response recorded for a session
pub async fn clear_history(graph: &dyn GraphService, session_id: &str) -> GraphResult<()> {
    graph
        .query(
            "MATCH (s:Session {id: $sessionId})-[:HAS_RESPONSE]->(r) DETACH DELETE r",
            json!({ "sessionId": session_id }),
        )
        .await?;
    Ok(())
}
