//! Type definitions for the RAG layer

use chrono::{DateTime, Utc};
use deepsift_core::{DeepsiftError, ErrorContext};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored memory entry with its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: Uuid,
    pub text: String,
    pub embedding: Vec<f32>,
    pub namespace: String,
    pub created_at: DateTime<Utc>,
}

/// Error types for the RAG layer
#[derive(Debug, thiserror::Error)]
pub enum RagError {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Core error: {0}")]
    Core(Box<DeepsiftError>),
}

impl From<DeepsiftError> for RagError {
    fn from(err: DeepsiftError) -> Self {
        RagError::Core(Box::new(err))
    }
}

impl From<RagError> for DeepsiftError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::Core(inner) => *inner,
            RagError::Io(e) => DeepsiftError::Io(e),
            RagError::Serialization(e) => DeepsiftError::Serialization(e),
            RagError::Llm(message) => DeepsiftError::Generation {
                message,
                source: None,
                context: ErrorContext::new("llm"),
            },
            RagError::Config(message) => DeepsiftError::Config {
                message,
                source: None,
                context: ErrorContext::new("rag"),
            },
            RagError::Embedding(message) => DeepsiftError::Storage {
                message: format!("Embedding failed: {}", message),
                source: None,
                context: ErrorContext::new("embeddings"),
            },
            RagError::Storage(message) => DeepsiftError::Storage {
                message,
                source: None,
                context: ErrorContext::new("memory"),
            },
        }
    }
}

pub type RagResult<T> = Result<T, RagError>;
