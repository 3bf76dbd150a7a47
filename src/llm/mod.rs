//! LLM access
//!
//! Text completion and embeddings behind traits; [`client::LlmClient`] is the
//! HTTP implementation for OpenAI-compatible and Ollama endpoints.

pub mod client;

use async_trait::async_trait;
use thiserror::Error;

pub use client::LlmClient;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM API error: {0}")]
    ApiError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type LlmResult<T> = Result<T, LlmError>;

/// A text completion service
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Complete a prompt under the given system instruction and return the
    /// raw model reply
    async fn complete(&self, system: &str, prompt: &str) -> LlmResult<String>;
}

/// An embedding service for vector similarity search
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> LlmResult<Vec<f32>>;
}
