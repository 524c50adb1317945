//! Shared data types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::async_utils::RetryConfig;
use crate::logging::LoggingConfig;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeepsiftConfig {
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub research: ResearchSettings,
    pub retrieval: RetrievalSettings,
    pub memory: MemoryConfig,
    pub retry: RetryConfig,
    pub logging: LoggingConfig,
}

/// Language model provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider type (openai, anthropic, ollama, groq)
    pub provider: String,
    pub model: String,
    /// API key (falls back to the provider's environment variable)
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Per-call timeout for generation requests
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding provider (openai, hashing)
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub dimension: usize,
}

/// Settings for the deep-search loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchSettings {
    /// Exclusive upper bound on research rounds
    pub max_depth: usize,
    /// Token ceiling for accumulated evidence
    pub max_tokens: usize,
    /// Long-term memory partition used by default
    pub namespace: String,
    pub max_sub_queries_per_round: usize,
    /// Concurrent sub-queries processed within one round
    pub max_concurrency: usize,
    /// Result limit passed to each retrieval source
    pub per_source_limit: usize,
    pub adapter_timeout_secs: u64,
    /// Use the original query as the only sub-query when decomposition fails
    pub fallback_to_query_on_decompose_error: bool,
    /// tiktoken encoding or model name used for budgeting
    pub tokenizer_encoding: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Web search provider (tavily, brave, serpapi)
    pub web_provider: String,
    pub web_api_key: Option<String>,
    pub web_search_enabled: bool,
    pub arxiv_enabled: bool,
    pub arxiv_base_url: String,
    pub semantic_enabled: bool,
    pub enable_reranking: bool,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub enable_persistence: bool,
    pub persist_dir: PathBuf,
}

/// Kind of retrieval source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Semantic,
    WebSearch,
    PaperSearch,
    Transcript,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Semantic => write!(f, "semantic"),
            SourceKind::WebSearch => write!(f, "web_search"),
            SourceKind::PaperSearch => write!(f, "paper_search"),
            SourceKind::Transcript => write!(f, "transcript"),
        }
    }
}

/// Outcome of one reflection step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reflection {
    #[serde(default)]
    pub sub_queries: Vec<String>,
    #[serde(default)]
    pub complete: bool,
}

impl Reflection {
    pub fn complete() -> Self {
        Self {
            sub_queries: Vec::new(),
            complete: true,
        }
    }

    pub fn continue_with(sub_queries: Vec<String>) -> Self {
        Self {
            sub_queries,
            complete: false,
        }
    }

    /// Whether the research loop should stop after this reflection
    pub fn should_terminate(&self) -> bool {
        self.complete || self.sub_queries.is_empty()
    }
}

/// Question/answer study card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashCard {
    pub question: String,
    pub answer: String,
}

/// A single semantic memory match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryHit {
    pub score: f32,
    pub text: String,
}

/// A reranked candidate, pointing back into the candidate list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedText {
    pub index: usize,
    pub score: f32,
    pub text: String,
}
