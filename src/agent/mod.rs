//! The chatbot agent
//!
//! One `handle` call per chat message: load conversation history, rephrase
//! the question into a standalone one, pick a retrieval tool, generate an
//! answer grounded in the retrieved context, and persist the turn.
//!
//! Tools are a tagged enum rather than trait objects; there are exactly two
//! and the dispatch is explicit.

pub mod chains;
pub mod history;
pub mod vector;

use crate::config::AgentSettings;
use crate::cypher::{CypherError, CypherRetriever, CypherValidator};
use crate::graph::{GraphError, GraphService};
use crate::llm::{CompletionService, EmbeddingService, LlmError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

pub use vector::VectorRetriever;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Cypher(#[from] CypherError),
}

pub type AgentResult<T> = Result<T, AgentError>;

/// What a tool hands back to the agent for answer generation and history
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Retrieved facts, serialized for the answer prompt
    pub context: String,
    /// Element ids of the nodes that grounded the context
    pub ids: Vec<String>,
    /// The executed Cypher statement, when the tool ran one directly
    pub cypher: Option<String>,
}

/// The retrieval tools the agent can dispatch to
pub enum AgentTool {
    /// Database retrieval through generated-and-validated Cypher
    CypherRetrieval(CypherRetriever),
    /// Plot similarity search over the movie embedding index
    VectorRetrieval(VectorRetriever),
}

impl AgentTool {
    pub fn name(&self) -> &'static str {
        match self {
            AgentTool::CypherRetrieval(_) => "graph-cypher-retrieval-chain",
            AgentTool::VectorRetrieval(_) => "graph-vector-retrieval-chain",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AgentTool::CypherRetrieval(_) => {
                "For retrieving movie information from the database including movie \
                 recommendations, actors and user ratings"
            }
            AgentTool::VectorRetrieval(_) => {
                "For finding movies, comparing movies by their plot or recommending \
                 a movie based on a theme"
            }
        }
    }

    /// The `source` tag recorded against the response in history
    pub fn source(&self) -> &'static str {
        match self {
            AgentTool::CypherRetrieval(_) => "cypher",
            AgentTool::VectorRetrieval(_) => "vector",
        }
    }

    pub async fn invoke(&self, question: &str) -> AgentResult<ToolOutput> {
        match self {
            AgentTool::CypherRetrieval(retriever) => {
                let retrieval = retriever.retrieve(question).await?;
                Ok(ToolOutput {
                    context: retrieval.context,
                    ids: retrieval.ids,
                    cypher: Some(retrieval.cypher),
                })
            }
            AgentTool::VectorRetrieval(retriever) => retriever.retrieve(question).await,
        }
    }
}

/// The conversational agent
pub struct Agent {
    llm: Arc<dyn CompletionService>,
    graph: Arc<dyn GraphService>,
    tools: Vec<AgentTool>,
    history_window: u32,
}

impl Agent {
    pub fn new(
        llm: Arc<dyn CompletionService>,
        embeddings: Arc<dyn EmbeddingService>,
        graph: Arc<dyn GraphService>,
        validator: Arc<CypherValidator>,
        settings: &AgentSettings,
    ) -> Self {
        let tools = vec![
            AgentTool::CypherRetrieval(CypherRetriever::new(
                graph.clone(),
                llm.clone(),
                validator,
                settings.max_tries,
            )),
            AgentTool::VectorRetrieval(VectorRetriever::new(
                graph.clone(),
                embeddings,
                settings.vector_index.clone(),
                settings.vector_top_k,
            )),
        ];

        Self {
            llm,
            graph,
            tools,
            history_window: settings.history_window,
        }
    }

    /// Handle one chat message for a session and return the answer
    pub async fn handle(&self, session_id: &str, input: &str) -> AgentResult<String> {
        info!("Handling message for session {}", session_id);

        let history =
            history::get_history(self.graph.as_ref(), session_id, self.history_window).await?;
        let question = chains::rephrase_question(self.llm.as_ref(), input, &history).await?;
        debug!("Rephrased question: {}", question);

        let tool = self.route(&question).await;
        debug!("Dispatching to {}", tool.name());
        let output = tool.invoke(&question).await?;

        let answer =
            chains::generate_answer(self.llm.as_ref(), &question, &output.context).await?;

        history::save_history(
            self.graph.as_ref(),
            session_id,
            tool.source(),
            input,
            &question,
            &answer,
            &output.ids,
            output.cypher.as_deref(),
        )
        .await?;

        Ok(answer)
    }

    /// Ask the LLM which tool fits the question; fall back to Cypher
    /// retrieval when the reply names no known tool.
    async fn route(&self, question: &str) -> &AgentTool {
        let listing = self
            .tools
            .iter()
            .map(|tool| format!("{}: {}", tool.name(), tool.description()))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "Select the tool best suited to answer the question.\n\n\
             Tools:\n{}\n\nQuestion:\n{}\n\nRespond with only the tool name.",
            listing, question
        );

        match self.llm.complete(chains::AGENT_SYSTEM_PROMPT, &prompt).await {
            Ok(reply) => self
                .tools
                .iter()
                .find(|tool| reply.contains(tool.name()))
                .unwrap_or(&self.tools[0]),
            Err(e) => {
                debug!("Tool routing failed ({}), defaulting to Cypher retrieval", e);
                &self.tools[0]
            }
        }
    }
}
