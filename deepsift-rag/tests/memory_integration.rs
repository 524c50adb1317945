//! Integration tests for memory, reranking and token budgeting

use deepsift_core::{DeepsiftConfig, MemoryStore, Reranker};
use deepsift_rag::{
    create_memory_store, HashingEmbedder, LexicalReranker, TokenCounter, VectorMemoryStore,
};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_memory_store_from_config_with_persistence() {
    let temp_dir = TempDir::new().unwrap();

    let mut config = DeepsiftConfig::default();
    config.embedding.provider = "hashing".to_string();
    config.embedding.dimension = 256;
    config.memory.enable_persistence = true;
    config.memory.persist_dir = temp_dir.path().to_path_buf();

    let store = create_memory_store(&config).await.unwrap();
    store
        .upsert("Q-learning is an off-policy algorithm", "deep-searcher")
        .await
        .unwrap();

    let files: Vec<_> = std::fs::read_dir(temp_dir.path()).unwrap().collect();
    assert_eq!(files.len(), 1);

    let reopened = create_memory_store(&config).await.unwrap();
    let hits = reopened
        .search("off-policy algorithm", "deep-searcher", 5)
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
}

#[tokio::test]
async fn test_namespace_isolation_across_runs() {
    let store = VectorMemoryStore::new(Arc::new(HashingEmbedder::new(128)));

    store
        .upsert("Synthesis for the first research run", "run-a")
        .await
        .unwrap();
    store
        .upsert("Synthesis for the second research run", "run-b")
        .await
        .unwrap();

    let hits_a = store.search("research run", "run-a", 10).await.unwrap();
    let hits_b = store.search("research run", "run-b", 10).await.unwrap();

    assert_eq!(hits_a.len(), 1);
    assert_eq!(hits_b.len(), 1);
    assert!(hits_a[0].text.contains("first"));
    assert!(hits_b[0].text.contains("second"));
}

#[tokio::test]
async fn test_rerank_memory_hits() {
    let store = VectorMemoryStore::new(Arc::new(HashingEmbedder::new(128)));
    for text in [
        "Policy gradient methods optimize the policy directly",
        "Value iteration computes optimal value functions",
        "Sourdough needs a starter culture",
    ] {
        store.upsert(text, "ns").await.unwrap();
    }

    let hits = store.search("policy gradient", "ns", 3).await.unwrap();
    let texts: Vec<String> = hits.into_iter().map(|hit| hit.text).collect();

    let ranked = LexicalReranker::new()
        .rerank("policy gradient", &texts, 1)
        .await
        .unwrap();
    assert_eq!(ranked.len(), 1);
    assert!(ranked[0].text.starts_with("Policy gradient"));
}

#[test]
fn test_token_budget_truncation_of_evidence() {
    let counter = TokenCounter::cl100k().unwrap();
    let chunks: Vec<String> = (0..50)
        .map(|i| format!("Evidence chunk number {} about reinforcement learning.", i))
        .collect();

    let total = counter.count_joined(&chunks);
    assert!(total > 100);

    let truncated = counter.truncate_to_tokens(&chunks.join("\n"), 100).unwrap();
    assert!(counter.count_tokens(&truncated) <= 100);
}
