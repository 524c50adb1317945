//! Lexical reranking of candidate chunks

use async_trait::async_trait;
use deepsift_core::{DeepsiftResult, RankedText, Reranker};
use std::collections::HashSet;
use tracing::debug;

/// Scores candidates by query-term overlap with a small bonus for substance
#[derive(Debug, Clone, Default)]
pub struct LexicalReranker;

impl LexicalReranker {
    pub fn new() -> Self {
        Self
    }

    fn terms(text: &str) -> HashSet<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|term| term.len() > 2)
            .map(str::to_lowercase)
            .collect()
    }

    fn score(query_terms: &HashSet<String>, candidate: &str) -> f32 {
        let length_bonus = (candidate.len() as f32 / 10000.0).min(0.1);
        if query_terms.is_empty() {
            return length_bonus;
        }

        let candidate_terms = Self::terms(candidate);
        let overlap = query_terms
            .iter()
            .filter(|term| candidate_terms.contains(*term))
            .count();

        overlap as f32 / query_terms.len() as f32 + length_bonus
    }
}

#[async_trait]
impl Reranker for LexicalReranker {
    async fn rerank(
        &self,
        query: &str,
        candidates: &[String],
        top_n: usize,
    ) -> DeepsiftResult<Vec<RankedText>> {
        let query_terms = Self::terms(query);

        let mut ranked: Vec<RankedText> = candidates
            .iter()
            .enumerate()
            .map(|(index, text)| RankedText {
                index,
                score: Self::score(&query_terms, text),
                text: text.clone(),
            })
            .collect();

        // Stable sort keeps input order among equal scores
        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(top_n);

        debug!("Reranked {} candidates, kept {}", candidates.len(), ranked.len());
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rerank_prefers_overlap() {
        let reranker = LexicalReranker::new();
        let candidates = vec![
            "Cooking pasta requires boiling water".to_string(),
            "Reinforcement learning agents maximize cumulative reward".to_string(),
        ];

        let ranked = reranker
            .rerank("reinforcement learning reward", &candidates, 2)
            .await
            .unwrap();

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].index, 1);
        assert!(ranked[0].score > ranked[1].score);
    }

    #[tokio::test]
    async fn test_rerank_truncates_to_top_n() {
        let reranker = LexicalReranker::new();
        let candidates: Vec<String> = (0..5).map(|i| format!("chunk {}", i)).collect();

        let ranked = reranker.rerank("chunk", &candidates, 3).await.unwrap();
        assert_eq!(ranked.len(), 3);
        assert!(reranker.rerank("chunk", &[], 3).await.unwrap().is_empty());
    }
}
