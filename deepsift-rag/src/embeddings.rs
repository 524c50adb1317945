//! Embedding providers
//!
//! [`LlmEmbedder`] calls the configured provider through siumai.
//! [`HashingEmbedder`] is a deterministic, offline feature-hashing embedder
//! used when no embedding provider is available.

use crate::llm_client::DeepsiftLlmClient;
use async_trait::async_trait;
use deepsift_core::{DeepsiftResult, Embedder, EmbeddingConfig};
use sha2::{Digest, Sha256};
use std::time::Instant;
use tracing::{debug, warn};

/// Embedder backed by an LLM provider's embedding endpoint
pub struct LlmEmbedder {
    client: DeepsiftLlmClient,
    dimension: usize,
}

impl LlmEmbedder {
    pub async fn new(config: &EmbeddingConfig) -> DeepsiftResult<Self> {
        let client = DeepsiftLlmClient::for_embeddings(config).await?;
        Ok(Self {
            client,
            dimension: config.dimension,
        })
    }
}

#[async_trait]
impl Embedder for LlmEmbedder {
    async fn embed(&self, texts: Vec<String>) -> DeepsiftResult<Vec<Vec<f32>>> {
        let start = Instant::now();
        let count = texts.len();
        let embeddings = self.client.embed(texts).await?;

        for embedding in &embeddings {
            if embedding.len() != self.dimension {
                warn!(
                    "Embedding dimension mismatch: expected {}, got {}",
                    self.dimension,
                    embedding.len()
                );
            }
        }

        debug!("Embedded {} texts in {:?}", count, start.elapsed());
        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Bag-of-words feature hashing into a fixed number of buckets
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// Bucket of a lowercased term, stable across builds and platforms
    fn bucket(&self, term: &str) -> usize {
        let digest = Sha256::digest(term.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        (u64::from_be_bytes(prefix) % self.dimension as u64) as usize
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for term in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|term| !term.is_empty())
        {
            vector[self.bucket(&term.to_lowercase())] += 1.0;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, texts: Vec<String>) -> DeepsiftResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Calculate cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        let c = vec![0.0, 1.0, 0.0];

        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&a, &c).abs() < 1e-6);
        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_hashing_embedder_is_deterministic() {
        let embedder = HashingEmbedder::new(64);
        let texts = vec![
            "Reinforcement learning basics".to_string(),
            "reinforcement LEARNING basics".to_string(),
        ];

        let embeddings = embedder.embed(texts).await.unwrap();
        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0].len(), 64);
        assert!((cosine_similarity(&embeddings[0], &embeddings[1]) - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_hashing_embedder_empty_text() {
        let embedder = HashingEmbedder::new(8);
        let embeddings = embedder.embed(vec![String::new()]).await.unwrap();
        assert!(embeddings[0].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_hashing_buckets_are_pinned() {
        let embedder = HashingEmbedder::new(64);
        assert_eq!(embedder.bucket("reinforcement"), 62);
        assert_eq!(embedder.bucket("learning"), 42);
        assert_eq!(embedder.bucket("policy"), 21);

        let vector = embedder.embed_one("Reinforcement, learning!");
        let expected = 1.0 / 2f32.sqrt();
        assert!((vector[62] - expected).abs() < 1e-6);
        assert!((vector[42] - expected).abs() < 1e-6);
    }
}
