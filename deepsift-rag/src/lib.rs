//! Deepsift RAG - token budgeting, semantic memory and LLM generation
//!
//! This crate integrates with siumai to provide the generation, embedding
//! and memory capabilities the research loop consumes through the traits
//! defined in `deepsift-core`.

pub mod embeddings;
pub mod generator;
pub mod llm_client;
pub mod memory;
pub mod prompts;
pub mod reranker;
pub mod token_counter;
pub mod types;

pub use embeddings::{cosine_similarity, HashingEmbedder, LlmEmbedder};
pub use generator::{extract_json_object, LlmGenerator, RetryingGenerator};
pub use llm_client::{CompletionBackend, DeepsiftLlmClient};
pub use memory::VectorMemoryStore;
pub use reranker::LexicalReranker;
pub use token_counter::{get_context_limit, TokenCounter};
pub use types::{MemoryRecord, RagError, RagResult};

use deepsift_core::{DeepsiftConfig, DeepsiftResult, Embedder};
use std::sync::Arc;

/// Build the embedder selected by configuration
pub async fn create_embedder(config: &DeepsiftConfig) -> DeepsiftResult<Arc<dyn Embedder>> {
    match config.embedding.provider.as_str() {
        "hashing" => Ok(Arc::new(HashingEmbedder::new(config.embedding.dimension))),
        _ => Ok(Arc::new(LlmEmbedder::new(&config.embedding).await?)),
    }
}

/// Build the memory store selected by configuration
pub async fn create_memory_store(config: &DeepsiftConfig) -> DeepsiftResult<VectorMemoryStore> {
    let embedder = create_embedder(config).await?;
    let store = VectorMemoryStore::new(embedder);

    if config.memory.enable_persistence {
        Ok(store.with_persistence(&config.memory.persist_dir)?)
    } else {
        Ok(store)
    }
}

/// Build the retrying LLM generator selected by configuration
pub async fn create_generator(
    config: &DeepsiftConfig,
    token_counter: Arc<TokenCounter>,
) -> DeepsiftResult<RetryingGenerator<LlmGenerator>> {
    let client = DeepsiftLlmClient::new(&config.llm).await?;
    let max_input_tokens = get_context_limit(&config.llm.model) / 2;

    let generator = LlmGenerator::new(Arc::new(client))
        .with_token_budget(token_counter, max_input_tokens);

    Ok(RetryingGenerator::new(
        generator,
        config.retry.clone(),
        config.llm.timeout_secs.saturating_mul(1000),
    ))
}
