//! Cypher generation, validation and self-correction
//!
//! The pipeline for one question:
//!
//! 1. [`generation`] turns the question plus a schema description into a
//!    candidate statement.
//! 2. [`validator`] checks every node label and relationship triple in the
//!    statement against the schema snapshot, flipping relationships that are
//!    written against the schema direction.
//! 3. [`retrieval`] drives the repair loop: remaining validation errors are
//!    handed back to the LLM via [`evaluation`] for a bounded number of
//!    rounds, then the statement is executed, with a second bounded loop
//!    correcting runtime errors reported by the database.

pub mod evaluation;
pub mod extract;
pub mod generation;
pub mod retrieval;
pub mod validator;

use crate::graph::GraphError;
use crate::llm::LlmError;
use crate::schema::SchemaError;
use thiserror::Error;

pub use evaluation::{CypherEvaluationChain, Evaluation};
pub use generation::CypherGenerationChain;
pub use retrieval::{CypherRetrieval, CypherRetriever};
pub use validator::{CypherValidator, Validation};

#[derive(Error, Debug)]
pub enum CypherError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

pub type CypherResult<T> = Result<T, CypherError>;
