//! Structured generation on top of a completion backend
//!
//! [`LlmGenerator`] turns prompts into typed payloads. [`RetryingGenerator`]
//! adds per-call timeouts and retries around any [`Generator`].

use crate::llm_client::CompletionBackend;
use crate::prompts::{self, render};
use crate::token_counter::TokenCounter;
use async_trait::async_trait;
use chrono::{Datelike, Utc};
use deepsift_core::{
    generation_error, retry_async_if, with_timeout, DeepsiftError, DeepsiftResult, FlashCard,
    Generator, Reflection, RetryConfig,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

const COMPONENT: &str = "llm_generator";

#[derive(Debug, Deserialize)]
struct SubQueriesPayload {
    #[serde(default)]
    queries: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SummaryPayload {
    summary: String,
}

#[derive(Debug, Deserialize)]
struct FlashcardsPayload {
    #[serde(default)]
    flashcards: Vec<FlashCard>,
}

/// Generator that prompts an LLM for JSON payloads
pub struct LlmGenerator {
    backend: Arc<dyn CompletionBackend>,
    token_counter: Option<Arc<TokenCounter>>,
    max_input_tokens: usize,
    language: String,
}

impl LlmGenerator {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            backend,
            token_counter: None,
            max_input_tokens: 8192,
            language: "English".to_string(),
        }
    }

    /// Truncate evidence passed to the model to `max_input_tokens`
    pub fn with_token_budget(mut self, counter: Arc<TokenCounter>, max_input_tokens: usize) -> Self {
        self.token_counter = Some(counter);
        self.max_input_tokens = max_input_tokens;
        self
    }

    /// Language used for flashcard text
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    fn bounded(&self, text: String) -> DeepsiftResult<String> {
        match &self.token_counter {
            Some(counter) if counter.count_tokens(&text) > self.max_input_tokens => {
                debug!(
                    "Truncating model input to {} tokens",
                    self.max_input_tokens
                );
                Ok(counter.truncate_to_tokens(&text, self.max_input_tokens)?)
            }
            _ => Ok(text),
        }
    }

    async fn complete_json<T: DeserializeOwned>(&self, prompt: &str, task: &str) -> DeepsiftResult<T> {
        let response = self
            .backend
            .complete("You respond only with valid JSON.", prompt)
            .await
            .map_err(|e| generation_error!(format!("{} request failed: {}", task, e), COMPONENT))?;

        parse_payload(&response).map_err(|e| {
            warn!("Malformed {} payload from {}", task, self.backend.model_name());
            generation_error!(format!("Malformed {} payload: {}", task, e), COMPONENT)
        })
    }
}

/// Extract the outermost JSON object from a model response, tolerating code fences and prose
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn parse_payload<T: DeserializeOwned>(response: &str) -> Result<T, String> {
    let json = extract_json_object(response).ok_or_else(|| "no JSON object found".to_string())?;
    serde_json::from_str(json).map_err(|e| e.to_string())
}

fn clean_queries(queries: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(queries.len());
    for query in queries {
        let query = query.trim();
        if !query.is_empty() && !cleaned.iter().any(|q| q == query) {
            cleaned.push(query.to_string());
        }
    }
    cleaned
}

#[async_trait]
impl Generator for LlmGenerator {
    async fn generate_sub_queries(&self, query: &str) -> DeepsiftResult<Vec<String>> {
        info!("Generating sub-queries for: {}", query);

        let year = Utc::now().year().to_string();
        let prompt = render(
            prompts::SUB_QUERY_PROMPT,
            &[("current_year", year.as_str()), ("original_query", query)],
        );

        let payload: SubQueriesPayload = self.complete_json(&prompt, "sub-query").await?;
        let queries = clean_queries(payload.queries);
        if queries.is_empty() {
            info!("Model returned no sub-queries for: {}", query);
        }

        debug!("Generated {} sub-queries", queries.len());
        Ok(queries)
    }

    async fn reflection(
        &self,
        query: &str,
        prior_sub_queries: &[String],
        evidence_chunks: &[String],
    ) -> DeepsiftResult<Reflection> {
        let previous_queries = prior_sub_queries
            .iter()
            .map(|q| format!("- {}", q))
            .collect::<Vec<_>>()
            .join("\n");
        let documents = self.bounded(evidence_chunks.join("\n"))?;

        let prompt = render(
            prompts::REFLECT_PROMPT,
            &[
                ("original_query", query),
                ("previous_queries", previous_queries.as_str()),
                ("previous_documents", documents.as_str()),
            ],
        );

        let mut reflection: Reflection = self.complete_json(&prompt, "reflection").await?;
        reflection.sub_queries = clean_queries(reflection.sub_queries);

        debug!(
            "Reflection returned {} sub-queries (complete: {})",
            reflection.sub_queries.len(),
            reflection.complete
        );
        Ok(reflection)
    }

    async fn summarize(&self, query: &str, chunks: &[String]) -> DeepsiftResult<String> {
        if chunks.is_empty() {
            return Ok(String::new());
        }

        let material = self.bounded(chunks.join("\n\n"))?;
        let prompt = render(
            prompts::SUMMARIZER_PROMPT,
            &[("original_query", query), ("chunks", material.as_str())],
        );

        let response = self
            .backend
            .complete("You write grounded research summaries.", &prompt)
            .await
            .map_err(|e| generation_error!(format!("summary request failed: {}", e), COMPONENT))?;

        // Plain-text answers are accepted when the model ignores the JSON format
        let summary = match parse_payload::<SummaryPayload>(&response) {
            Ok(payload) => payload.summary,
            Err(_) => response,
        };

        let summary = summary.trim().to_string();
        if summary.is_empty() {
            return Err(generation_error!("Empty summary generated", COMPONENT));
        }
        Ok(summary)
    }

    async fn flashcards(&self, prompt: &str, quantity: usize) -> DeepsiftResult<Vec<FlashCard>> {
        info!("Generating {} flashcards", quantity);

        let quantity_text = quantity.to_string();
        let text = self.bounded(prompt.to_string())?;
        let request = render(
            prompts::FLASHCARD_PROMPT,
            &[
                ("quantity", quantity_text.as_str()),
                ("language", self.language.as_str()),
                ("text", text.as_str()),
            ],
        );

        let payload: FlashcardsPayload = self.complete_json(&request, "flashcard").await?;
        let cards: Vec<FlashCard> = payload
            .flashcards
            .into_iter()
            .filter(|card| !card.question.trim().is_empty() && !card.answer.trim().is_empty())
            .collect();

        if cards.len() != quantity {
            return Err(generation_error!(
                format!("Expected {} flashcards, got {}", quantity, cards.len()),
                COMPONENT
            ));
        }
        Ok(cards)
    }
}

/// Decorator adding timeout and retry to every generator call
pub struct RetryingGenerator<G> {
    inner: G,
    retry: RetryConfig,
    timeout_ms: u64,
}

impl<G: Generator> RetryingGenerator<G> {
    pub fn new(inner: G, retry: RetryConfig, timeout_ms: u64) -> Self {
        Self {
            inner,
            retry,
            timeout_ms,
        }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    async fn call<'a, T, F, Fut>(&'a self, operation_name: &str, mut operation: F) -> DeepsiftResult<T>
    where
        F: FnMut(&'a G) -> Fut,
        Fut: std::future::Future<Output = DeepsiftResult<T>>,
    {
        let timeout_ms = self.timeout_ms;
        retry_async_if(
            || {
                let future = operation(&self.inner);
                async move { with_timeout(future, timeout_ms, operation_name).await? }
            },
            &self.retry,
            operation_name,
            DeepsiftError::is_recoverable,
        )
        .await
    }
}

#[async_trait]
impl<G: Generator> Generator for RetryingGenerator<G> {
    async fn generate_sub_queries(&self, query: &str) -> DeepsiftResult<Vec<String>> {
        self.call("generate_sub_queries", |g| g.generate_sub_queries(query))
            .await
    }

    async fn reflection(
        &self,
        query: &str,
        prior_sub_queries: &[String],
        evidence_chunks: &[String],
    ) -> DeepsiftResult<Reflection> {
        self.call("reflection", |g| {
            g.reflection(query, prior_sub_queries, evidence_chunks)
        })
        .await
    }

    async fn summarize(&self, query: &str, chunks: &[String]) -> DeepsiftResult<String> {
        self.call("summarize", |g| g.summarize(query, chunks)).await
    }

    async fn flashcards(&self, prompt: &str, quantity: usize) -> DeepsiftResult<Vec<FlashCard>> {
        self.call("flashcards", |g| g.flashcards(prompt, quantity))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RagError, RagResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct CannedBackend {
        responses: Mutex<Vec<String>>,
        calls: AtomicUsize,
    }

    impl CannedBackend {
        fn new(responses: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.iter().rev().map(|s| s.to_string()).collect()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CompletionBackend for CannedBackend {
        async fn complete(&self, _system: &str, _user: &str) -> RagResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| RagError::Llm("no canned response left".to_string()))
        }

        fn model_name(&self) -> &str {
            "canned"
        }
    }

    fn fast_retry(max_attempts: usize) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    #[test]
    fn test_extract_json_object() {
        let text = "Sure!\n```json\n{\"queries\": [\"a\"]}\n```";
        assert_eq!(extract_json_object(text), Some("{\"queries\": [\"a\"]}"));
        assert_eq!(extract_json_object("no json here"), None);
    }

    #[tokio::test]
    async fn test_sub_queries_are_cleaned() {
        let backend = CannedBackend::new(&[r#"{"queries": [" What is RL? ", "", "What is RL?"]}"#]);
        let generator = LlmGenerator::new(backend);

        let queries = generator.generate_sub_queries("Explain RL").await.unwrap();
        assert_eq!(queries, vec!["What is RL?".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_sub_queries_are_not_retried() {
        let backend = CannedBackend::new(&[r#"{"queries": ["  ", ""]}"#, r#"{"queries": []}"#]);
        let generator = RetryingGenerator::new(LlmGenerator::new(backend.clone()), fast_retry(6), 1000);

        let queries = generator.generate_sub_queries("Explain RL").await.unwrap();
        assert!(queries.is_empty());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_generation_error() {
        let generator = LlmGenerator::new(CannedBackend::new(&["I cannot answer that"]));
        let err = generator.reflection("q", &[], &[]).await.unwrap_err();
        assert!(err.is_generation());
    }

    #[tokio::test]
    async fn test_summarize_empty_chunks_skips_backend() {
        let backend = CannedBackend::new(&[]);
        let generator = LlmGenerator::new(backend.clone());

        assert_eq!(generator.summarize("q", &[]).await.unwrap(), "");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_summarize_accepts_plain_text() {
        let generator = LlmGenerator::new(CannedBackend::new(&["RL learns from reward."]));
        let summary = generator
            .summarize("What is RL?", &["chunk".to_string()])
            .await
            .unwrap();
        assert_eq!(summary, "RL learns from reward.");
    }

    #[tokio::test]
    async fn test_flashcard_count_mismatch() {
        let generator = LlmGenerator::new(CannedBackend::new(&[
            r#"{"flashcards": [{"question": "Q1", "answer": "A1"}]}"#,
        ]));
        let err = generator.flashcards("text", 2).await.unwrap_err();
        assert!(err.to_string().contains("Expected 2 flashcards"));
    }

    #[tokio::test]
    async fn test_retrying_generator_recovers() {
        let backend = CannedBackend::new(&["garbage", r#"{"queries": ["What is RL?"]}"#]);
        let generator = RetryingGenerator::new(LlmGenerator::new(backend.clone()), fast_retry(3), 1000);

        let queries = generator.generate_sub_queries("Explain RL").await.unwrap();
        assert_eq!(queries, vec!["What is RL?".to_string()]);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retrying_generator_gives_up() {
        let backend = CannedBackend::new(&["garbage", "garbage"]);
        let generator = RetryingGenerator::new(LlmGenerator::new(backend.clone()), fast_retry(2), 1000);

        assert!(generator.generate_sub_queries("Explain RL").await.is_err());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }
}
