//! Semantic search over the long-term memory store

use async_trait::async_trait;
use deepsift_core::{DeepsiftResult, MemoryStore, Reranker, Retriever, SourceKind};
use std::sync::Arc;
use tracing::debug;

/// Retriever backed by a namespaced [`MemoryStore`]
pub struct SemanticRetriever {
    memory: Arc<dyn MemoryStore>,
    namespace: String,
    reranker: Option<Arc<dyn Reranker>>,
}

impl SemanticRetriever {
    pub fn new(memory: Arc<dyn MemoryStore>, namespace: impl Into<String>) -> Self {
        Self {
            memory,
            namespace: namespace.into(),
            reranker: None,
        }
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn search_namespace(
        &self,
        query: &str,
        namespace: &str,
        limit: usize,
    ) -> DeepsiftResult<String> {
        let hits = self
            .memory
            .search(query, namespace, limit)
            .await
            .map_err(|e| e.into_retrieval(self.name()))?;

        // An empty store is not a failure for this source
        if hits.is_empty() {
            debug!("No semantic hits in namespace '{}'", namespace);
            return Ok(String::new());
        }

        let texts: Vec<String> = hits.into_iter().map(|hit| hit.text).collect();
        let texts = match &self.reranker {
            Some(reranker) => reranker
                .rerank(query, &texts, limit)
                .await
                .map_err(|e| e.into_retrieval(self.name()))?
                .into_iter()
                .map(|ranked| ranked.text)
                .collect(),
            None => texts,
        };

        Ok(texts.join("\n"))
    }
}

#[async_trait]
impl Retriever for SemanticRetriever {
    fn name(&self) -> &str {
        "semantic"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Semantic
    }

    /// Search the namespace this retriever was built for
    async fn search(&self, query: &str, limit: usize) -> DeepsiftResult<String> {
        self.search_namespace(query, &self.namespace, limit).await
    }

    async fn search_in(
        &self,
        query: &str,
        namespace: &str,
        limit: usize,
    ) -> DeepsiftResult<String> {
        self.search_namespace(query, namespace, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepsift_rag::{HashingEmbedder, LexicalReranker, VectorMemoryStore};

    fn memory() -> Arc<VectorMemoryStore> {
        Arc::new(VectorMemoryStore::new(Arc::new(HashingEmbedder::new(128))))
    }

    #[tokio::test]
    async fn test_empty_memory_returns_empty_text() {
        let retriever = SemanticRetriever::new(memory(), "deep-searcher");
        assert_eq!(retriever.search("anything", 5).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_search_scoped_to_namespace() {
        let memory = memory();
        memory
            .upsert("Temporal difference learning bootstraps", "ns-a")
            .await
            .unwrap();
        memory
            .upsert("Monte Carlo methods wait for episode end", "ns-b")
            .await
            .unwrap();

        let retriever = SemanticRetriever::new(memory.clone(), "ns-a")
            .with_reranker(Arc::new(LexicalReranker::new()));
        let text = retriever.search("learning methods", 5).await.unwrap();

        assert!(text.contains("Temporal difference"));
        assert!(!text.contains("Monte Carlo"));
    }

    #[tokio::test]
    async fn test_search_in_overrides_default_namespace() {
        let memory = memory();
        memory
            .upsert("Policy gradients follow the return", "deep-searcher")
            .await
            .unwrap();

        let retriever = SemanticRetriever::new(memory.clone(), "deep-searcher");
        assert_eq!(retriever.search_in("policy gradients", "fresh-run", 5).await.unwrap(), "");

        let text = retriever
            .search_in("policy gradients", "deep-searcher", 5)
            .await
            .unwrap();
        assert!(text.contains("Policy gradients"));
    }
}
