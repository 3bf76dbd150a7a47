//! Runtime configuration
//!
//! All knobs are plain serde structs so they can be loaded from a file or
//! assembled from the environment by the binary.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Supported LLM providers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LlmProvider {
    OpenAI,
    Ollama,
}

/// Configuration for the LLM backing the chatbot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// The LLM provider to use
    pub provider: LlmProvider,
    /// Chat model name (e.g. "gpt-4o", "llama3")
    pub model: String,
    /// Embedding model name (e.g. "text-embedding-3-small")
    pub embedding_model: String,
    /// API Key (optional, required for OpenAI)
    pub api_key: Option<String>,
    /// API Base URL (required for Ollama, optional for others)
    pub api_base_url: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

/// Connection details for the Neo4j Query API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Base URL, e.g. "http://localhost:7474"
    pub url: String,
    pub database: String,
    pub username: String,
    pub password: String,
    /// Per-query timeout in seconds
    pub timeout_secs: u64,
}

/// Tunables for the agent and the Cypher repair loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Retry ceiling for both the static-validation repair loop and the
    /// execution-error repair loop
    pub max_tries: u32,
    /// Number of previous turns included when rephrasing a question
    pub history_window: u32,
    /// Name of the vector index used by the plot-similarity tool
    pub vector_index: String,
    /// Results returned per vector search
    pub vector_top_k: u32,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_tries: 5,
            history_window: 5,
            vector_index: "moviePlots".to_string(),
            vector_top_k: 5,
        }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub graph: GraphConfig,
    #[serde(default)]
    pub agent: AgentSettings,
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl GraphConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    /// Assemble a configuration from environment variables.
    ///
    /// `OPENAI_API_KEY` selects the OpenAI provider; otherwise a local
    /// Ollama instance is assumed.
    pub fn from_env() -> Self {
        let api_key = std::env::var("OPENAI_API_KEY").ok();
        let provider = if api_key.is_some() {
            LlmProvider::OpenAI
        } else {
            LlmProvider::Ollama
        };
        let (model, embedding_model) = match provider {
            LlmProvider::OpenAI => ("gpt-4o".to_string(), "text-embedding-3-small".to_string()),
            LlmProvider::Ollama => ("llama3".to_string(), "nomic-embed-text".to_string()),
        };

        Self {
            llm: LlmConfig {
                provider,
                model: std::env::var("LLM_MODEL").unwrap_or(model),
                embedding_model: std::env::var("EMBEDDING_MODEL").unwrap_or(embedding_model),
                api_key,
                api_base_url: std::env::var("LLM_API_BASE").ok(),
                timeout_secs: 60,
            },
            graph: GraphConfig {
                url: std::env::var("NEO4J_URI")
                    .unwrap_or_else(|_| "http://localhost:7474".to_string()),
                database: std::env::var("NEO4J_DATABASE").unwrap_or_else(|_| "neo4j".to_string()),
                username: std::env::var("NEO4J_USERNAME").unwrap_or_else(|_| "neo4j".to_string()),
                password: std::env::var("NEO4J_PASSWORD").unwrap_or_default(),
                timeout_secs: 30,
            },
            agent: AgentSettings::default(),
        }
    }
}
