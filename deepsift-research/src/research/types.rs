//! Research run state and report types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why the round loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Decomposition or deduplicated reflection produced nothing to research
    NoSubQueries,
    DepthExhausted,
    TokenBudgetExhausted,
    /// Reflection declared the search complete or proposed no follow-ups
    ReflectionComplete,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationReason::NoSubQueries => write!(f, "no sub-queries"),
            TerminationReason::DepthExhausted => write!(f, "depth exhausted"),
            TerminationReason::TokenBudgetExhausted => write!(f, "token budget exhausted"),
            TerminationReason::ReflectionComplete => write!(f, "reflection complete"),
        }
    }
}

/// What happened in one research round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Zero-based round index
    pub depth: usize,
    pub sub_queries: Vec<String>,
    pub evidence_chunks_added: usize,
    /// Running synthesis over all evidence gathered so far
    pub synthesis: String,
    /// Token count of the evidence accumulator after this round
    pub tokens_after: usize,
}

/// Outcome of a complete research run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchReport {
    pub query: String,
    pub answer: String,
    pub namespace: String,
    pub rounds: Vec<RoundRecord>,
    pub termination: TerminationReason,
    pub total_tokens: usize,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Mutable state owned by a single run
#[derive(Debug)]
pub(crate) struct RunState {
    pub depth: usize,
    pub chunks: Vec<String>,
    pub namespace: String,
    /// Every sub-query already researched in this run
    pub asked: Vec<String>,
}

impl RunState {
    pub fn new(namespace: &str) -> Self {
        Self {
            depth: 0,
            chunks: Vec::new(),
            namespace: namespace.to_string(),
            asked: Vec::new(),
        }
    }
}
