//! Rephrase and answer generation chains

use crate::agent::history::ChatbotResponse;
use crate::llm::{CompletionService, LlmResult};

/// The chatbot's persona, shared by the routing and answer calls
pub const AGENT_SYSTEM_PROMPT: &str = "You are Ebert, a movie recommendation chatbot. \
Your goal is to provide movie lovers with excellent recommendations backed by data from \
Neo4j, the world's leading graph database. Respond to any questions that don't relate to \
movies, actors or directors with a joke about parrots, before asking them to ask another \
question related to the movie industry.";

const REPHRASE_PROMPT: &str = r#"Given the following conversation and a question,
rephrase the follow-up question to be a standalone question about the
subject of the conversation history.

If you do not have the required information required to construct
a standalone question, ask for clarification.

Always include the subject of the history in the question.

History:
{history}

Question:
{input}"#;

const ANSWER_PROMPT: &str = r#"Use the following context to answer the following question.
The context is provided by an authoritative source, you must never doubt
it or attempt to use your pre-trained knowledge to correct the answer.

Make the answer sound like it is a response to the question.
Do not mention that you have based your response on the context.

Here is an example:

Question: Who played Woody in Toy Story?
Context: ['role': 'Woody', 'actor': 'Tom Hanks']
Response: Tom Hanks played Woody in Toy Story.

If no context is provided, say that you don't know,
don't try to make up an answer, do not fall back to your internal knowledge.
If no context is provided you may also ask for clarification.

Include links and sources where possible.

Question:
{question}

Context:
{context}"#;

/// Rephrase a follow-up question into a standalone one using the
/// conversation history
pub async fn rephrase_question(
    llm: &dyn CompletionService,
    input: &str,
    history: &[ChatbotResponse],
) -> LlmResult<String> {
    let rendered = if history.is_empty() {
        "No history".to_string()
    } else {
        history
            .iter()
            .map(|turn| format!("Human: {}\nAI: {}", turn.input, turn.output))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let prompt = REPHRASE_PROMPT
        .replace("{history}", &rendered)
        .replace("{input}", input);

    let reply = llm.complete(AGENT_SYSTEM_PROMPT, &prompt).await?;
    Ok(reply.trim().to_string())
}

/// Generate an answer grounded in the retrieved context
pub async fn generate_answer(
    llm: &dyn CompletionService,
    question: &str,
    context: &str,
) -> LlmResult<String> {
    // Empty retrievals serialize as "[]"; the prompt expects an explicit
    // "I don't know" marker instead
    let context = match context.trim() {
        "" | "[]" | "{}" => "I don't know",
        other => other,
    };

    let prompt = ANSWER_PROMPT
        .replace("{question}", question)
        .replace("{context}", context);

    let reply = llm.complete(AGENT_SYSTEM_PROMPT, &prompt).await?;
    Ok(reply.trim().to_string())
}
