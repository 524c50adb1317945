//! Namespaced vector memory
//!
//! Each namespace is an isolated partition of embedded texts searched by
//! cosine similarity. With persistence enabled a namespace is stored as one
//! JSON file and loaded lazily on first access.

use crate::embeddings::cosine_similarity;
use crate::types::{MemoryRecord, RagError, RagResult};
use async_trait::async_trait;
use chrono::Utc;
use deepsift_core::{DeepsiftResult, Embedder, MemoryHit, MemoryStore};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// In-memory vector store with optional JSON persistence
pub struct VectorMemoryStore {
    embedder: Arc<dyn Embedder>,
    partitions: RwLock<HashMap<String, Vec<MemoryRecord>>>,
    persist_dir: Option<PathBuf>,
    similarity_threshold: f32,
}

impl VectorMemoryStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            partitions: RwLock::new(HashMap::new()),
            persist_dir: None,
            similarity_threshold: 0.0,
        }
    }

    /// Persist namespaces as JSON files under `dir`
    pub fn with_persistence(mut self, dir: impl Into<PathBuf>) -> RagResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        info!("Memory persistence enabled at {}", dir.display());
        self.persist_dir = Some(dir);
        Ok(self)
    }

    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Number of stored texts in a namespace
    pub async fn len(&self, namespace: &str) -> RagResult<usize> {
        self.ensure_loaded(namespace).await?;
        let partitions = self.partitions.read().await;
        Ok(partitions.get(namespace).map_or(0, Vec::len))
    }

    pub async fn is_empty(&self, namespace: &str) -> RagResult<bool> {
        Ok(self.len(namespace).await? == 0)
    }

    fn namespace_file(dir: &Path, namespace: &str) -> PathBuf {
        let digest = format!("{:x}", Sha256::digest(namespace.as_bytes()));
        let readable: String = namespace
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .take(48)
            .collect();
        dir.join(format!("{}_{}.json", readable, &digest[..16]))
    }

    async fn ensure_loaded(&self, namespace: &str) -> RagResult<()> {
        if self.partitions.read().await.contains_key(namespace) {
            return Ok(());
        }

        let records = match &self.persist_dir {
            Some(dir) => {
                let path = Self::namespace_file(dir, namespace);
                if path.exists() {
                    let data = tokio::fs::read_to_string(&path).await?;
                    let records: Vec<MemoryRecord> = serde_json::from_str(&data)?;
                    debug!(
                        "Loaded {} records for namespace '{}' from {}",
                        records.len(),
                        namespace,
                        path.display()
                    );
                    records
                } else {
                    Vec::new()
                }
            }
            None => Vec::new(),
        };

        self.partitions
            .write()
            .await
            .entry(namespace.to_string())
            .or_insert(records);
        Ok(())
    }

    async fn save(&self, namespace: &str, records: &[MemoryRecord]) -> RagResult<()> {
        let Some(dir) = &self.persist_dir else {
            return Ok(());
        };

        let path = Self::namespace_file(dir, namespace);
        let data = serde_json::to_string_pretty(records)?;
        tokio::fs::write(&path, data).await?;
        debug!("Saved namespace '{}' to {}", namespace, path.display());
        Ok(())
    }

    async fn embed_one(&self, text: &str) -> RagResult<Vec<f32>> {
        let mut embeddings = self.embedder.embed(vec![text.to_string()]).await?;
        let embedding = embeddings
            .pop()
            .ok_or_else(|| RagError::Embedding("No embedding data returned".to_string()))?;

        if embedding.len() != self.embedder.dimension() {
            return Err(RagError::Embedding(format!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.embedder.dimension(),
                embedding.len()
            )));
        }
        Ok(embedding)
    }
}

#[async_trait]
impl MemoryStore for VectorMemoryStore {
    async fn upsert(&self, text: &str, namespace: &str) -> DeepsiftResult<()> {
        if text.trim().is_empty() {
            return Ok(());
        }

        self.ensure_loaded(namespace).await?;
        let embedding = self.embed_one(text).await?;

        // The write guard is held through the save so files are written in
        // the same order as the in-memory updates
        let mut partitions = self.partitions.write().await;
        let records = partitions.entry(namespace.to_string()).or_default();

        match records.iter_mut().find(|record| record.text == text) {
            Some(existing) => {
                existing.embedding = embedding;
                existing.created_at = Utc::now();
            }
            None => records.push(MemoryRecord {
                id: Uuid::new_v4(),
                text: text.to_string(),
                embedding,
                namespace: namespace.to_string(),
                created_at: Utc::now(),
            }),
        }

        if let Err(e) = self.save(namespace, records).await {
            warn!("Failed to persist namespace '{}': {}", namespace, e);
            return Err(e.into());
        }

        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        namespace: &str,
        limit: usize,
    ) -> DeepsiftResult<Vec<MemoryHit>> {
        self.ensure_loaded(namespace).await?;

        if self.is_empty(namespace).await? || limit == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embed_one(query).await?;
        let partitions = self.partitions.read().await;
        let records = partitions.get(namespace).map(Vec::as_slice).unwrap_or(&[]);

        let mut hits: Vec<MemoryHit> = records
            .iter()
            .map(|record| MemoryHit {
                score: cosine_similarity(&query_embedding, &record.embedding),
                text: record.text.clone(),
            })
            .filter(|hit| hit.score >= self.similarity_threshold)
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);

        debug!(
            "Memory search in '{}' returned {} hits",
            namespace,
            hits.len()
        );
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashingEmbedder;
    use tempfile::TempDir;

    fn store() -> VectorMemoryStore {
        VectorMemoryStore::new(Arc::new(HashingEmbedder::new(128)))
    }

    #[tokio::test]
    async fn test_upsert_and_search() {
        let store = store();
        store
            .upsert("Reinforcement learning maximizes reward", "rl")
            .await
            .unwrap();
        store
            .upsert("Bread is baked from flour and water", "rl")
            .await
            .unwrap();

        let hits = store
            .search("what does reinforcement learning maximize", "rl", 2)
            .await
            .unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].text, "Reinforcement learning maximizes reward");
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let store = store();
        store.upsert("alpha beta gamma", "first").await.unwrap();

        let hits = store.search("alpha beta gamma", "second", 5).await.unwrap();
        assert!(hits.is_empty());
        assert_eq!(store.len("first").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_same_text_replaces() {
        let store = store();
        store.upsert("same text", "ns").await.unwrap();
        store.upsert("same text", "ns").await.unwrap();
        store.upsert("   ", "ns").await.unwrap();
        assert_eq!(store.len("ns").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_persistence_round_trip() {
        let temp_dir = TempDir::new().unwrap();

        {
            let store = store().with_persistence(temp_dir.path()).unwrap();
            store
                .upsert("Persisted synthesis about policies", "deep-searcher")
                .await
                .unwrap();
        }

        let reopened = store().with_persistence(temp_dir.path()).unwrap();
        let hits = reopened
            .search("policies", "deep-searcher", 3)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "Persisted synthesis about policies");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upserts_are_all_persisted() {
        let temp_dir = TempDir::new().unwrap();
        let shared = Arc::new(store().with_persistence(temp_dir.path()).unwrap());

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..16 {
            let shared = shared.clone();
            tasks.spawn(async move {
                shared
                    .upsert(&format!("finding number {} about policies", i), "shared")
                    .await
            });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }
        drop(shared);

        let reopened = store().with_persistence(temp_dir.path()).unwrap();
        assert_eq!(reopened.len("shared").await.unwrap(), 16);
    }

    #[test]
    fn test_namespace_file_name_is_stable() {
        let path = VectorMemoryStore::namespace_file(Path::new("/data"), "deep-searcher");
        assert_eq!(path, Path::new("/data/deep_searcher_0af2b38f42cfe447.json"));
    }
}
