//! Capability traits consumed by the research orchestrator
//!
//! Every external collaborator (language model, search backends, vector store,
//! reranker, content extraction) is reached through one of these narrow
//! contracts, so implementations can be swapped or mocked freely.

use crate::error::DeepsiftResult;
use crate::types::*;
use async_trait::async_trait;

/// A retrieval source: turns a query into flattened, human-readable evidence text
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Stable source name used in logs and error messages
    fn name(&self) -> &str;

    fn kind(&self) -> SourceKind;

    /// Search the source and return pre-merged evidence text
    async fn search(&self, query: &str, limit: usize) -> DeepsiftResult<String>;

    /// Search on behalf of a research run writing to `namespace`
    ///
    /// Sources without per-namespace state ignore it.
    async fn search_in(
        &self,
        query: &str,
        _namespace: &str,
        limit: usize,
    ) -> DeepsiftResult<String> {
        self.search(query, limit).await
    }
}

/// Structured language-model operations used by the research loop
#[async_trait]
pub trait Generator: Send + Sync {
    /// Decompose a query into narrower sub-queries
    async fn generate_sub_queries(&self, query: &str) -> DeepsiftResult<Vec<String>>;

    /// Critique evidence and either propose new sub-queries or declare completion
    async fn reflection(
        &self,
        query: &str,
        prior_sub_queries: &[String],
        evidence_chunks: &[String],
    ) -> DeepsiftResult<Reflection>;

    /// Summarize chunks with respect to a query
    ///
    /// Must return an empty string, not an error, when `chunks` is empty.
    async fn summarize(&self, query: &str, chunks: &[String]) -> DeepsiftResult<String>;

    /// Produce `quantity` question/answer cards about the prompt
    async fn flashcards(&self, prompt: &str, quantity: usize) -> DeepsiftResult<Vec<FlashCard>>;
}

/// Namespace-partitioned long-term semantic memory
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn upsert(&self, text: &str, namespace: &str) -> DeepsiftResult<()>;

    /// Ordered best-first
    async fn search(
        &self,
        query: &str,
        namespace: &str,
        limit: usize,
    ) -> DeepsiftResult<Vec<MemoryHit>>;
}

/// Text embedding capability
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: Vec<String>) -> DeepsiftResult<Vec<Vec<f32>>>;

    fn dimension(&self) -> usize;
}

/// Scores and orders candidate chunks by relevance to a query
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn rerank(
        &self,
        query: &str,
        candidates: &[String],
        top_n: usize,
    ) -> DeepsiftResult<Vec<RankedText>>;
}

/// Turns a document reference (URL, video link, PDF location) into plain text
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    fn name(&self) -> &str;

    async fn extract(&self, target: &str) -> DeepsiftResult<String>;
}
