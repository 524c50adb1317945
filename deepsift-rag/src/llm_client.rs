//! LLM client integration using siumai
//!
//! Wraps a siumai client behind [`CompletionBackend`] so the structured
//! generator can be driven by a real provider or by a canned backend in tests.

use crate::types::{RagError, RagResult};
use async_trait::async_trait;
use deepsift_core::{resolve_api_key, EmbeddingConfig, LlmConfig};
use siumai::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

/// Single-turn text completion
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_message: &str) -> RagResult<String>;

    /// Identifier used in logs
    fn model_name(&self) -> &str;
}

/// Provider-agnostic LLM client
pub struct DeepsiftLlmClient {
    client: Box<dyn LlmClient>,
    provider: String,
    model: String,
}

impl DeepsiftLlmClient {
    /// Create a chat client for the configured provider
    pub async fn new(config: &LlmConfig) -> RagResult<Self> {
        let client = Self::build_client(config).await?;

        info!(
            "Created LLM client for provider: {} with model: {}",
            config.provider, config.model
        );

        Ok(Self {
            client,
            provider: config.provider.clone(),
            model: config.model.clone(),
        })
    }

    /// Create a client used only for embeddings
    pub async fn for_embeddings(config: &EmbeddingConfig) -> RagResult<Self> {
        match config.provider.as_str() {
            "openai" => {
                let api_key = resolve_api_key(config.api_key.as_deref(), "OPENAI_API_KEY")
                    .ok_or_else(|| RagError::Config("OpenAI API key not found".to_string()))?;

                let client = LlmBuilder::new()
                    .openai()
                    .api_key(&api_key)
                    .model(&config.model)
                    .build()
                    .await
                    .map_err(|e| {
                        RagError::Embedding(format!("Failed to create OpenAI client: {}", e))
                    })?;

                info!(
                    "Initialized embedding client - model: {}, dimension: {}",
                    config.model, config.dimension
                );

                Ok(Self {
                    client: Box::new(client),
                    provider: config.provider.clone(),
                    model: config.model.clone(),
                })
            }
            provider => Err(RagError::Config(format!(
                "Unsupported embedding provider: {}",
                provider
            ))),
        }
    }

    async fn build_client(config: &LlmConfig) -> RagResult<Box<dyn LlmClient>> {
        match config.provider.as_str() {
            "openai" => {
                let api_key = resolve_api_key(config.api_key.as_deref(), "OPENAI_API_KEY")
                    .ok_or_else(|| RagError::Config("OpenAI API key not found".to_string()))?;

                let mut builder = LlmBuilder::new()
                    .openai()
                    .api_key(&api_key)
                    .model(&config.model)
                    .temperature(config.temperature);

                if let Some(max_tokens) = config.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }
                if let Some(base_url) = &config.base_url {
                    builder = builder.base_url(base_url);
                }

                let client = builder
                    .build()
                    .await
                    .map_err(|e| RagError::Llm(format!("Failed to build OpenAI client: {}", e)))?;
                Ok(Box::new(client))
            }
            "anthropic" => {
                let api_key = resolve_api_key(config.api_key.as_deref(), "ANTHROPIC_API_KEY")
                    .ok_or_else(|| RagError::Config("Anthropic API key not found".to_string()))?;

                let mut builder = LlmBuilder::new()
                    .anthropic()
                    .api_key(&api_key)
                    .model(&config.model)
                    .temperature(config.temperature);

                if let Some(max_tokens) = config.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }

                let client = builder.build().await.map_err(|e| {
                    RagError::Llm(format!("Failed to build Anthropic client: {}", e))
                })?;
                Ok(Box::new(client))
            }
            "ollama" => {
                let base_url = config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| "http://localhost:11434".to_string());

                let mut builder = LlmBuilder::new()
                    .ollama()
                    .model(&config.model)
                    .base_url(&base_url)
                    .temperature(config.temperature);

                if let Some(max_tokens) = config.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }

                let client = builder
                    .build()
                    .await
                    .map_err(|e| RagError::Llm(format!("Failed to build Ollama client: {}", e)))?;
                Ok(Box::new(client))
            }
            "groq" => {
                let api_key = resolve_api_key(config.api_key.as_deref(), "GROQ_API_KEY")
                    .ok_or_else(|| RagError::Config("Groq API key not found".to_string()))?;

                let mut builder = LlmBuilder::new()
                    .groq()
                    .api_key(&api_key)
                    .model(&config.model)
                    .temperature(config.temperature);

                if let Some(max_tokens) = config.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }

                let client = builder
                    .build()
                    .await
                    .map_err(|e| RagError::Llm(format!("Failed to build Groq client: {}", e)))?;
                Ok(Box::new(client))
            }
            provider => Err(RagError::Config(format!(
                "Unsupported LLM provider: {}",
                provider
            ))),
        }
    }

    /// Generate embeddings, if the provider supports it
    pub async fn embed(&self, texts: Vec<String>) -> RagResult<Vec<Vec<f32>>> {
        let embedding_client = self.client.as_embedding_capability().ok_or_else(|| {
            RagError::Config(format!(
                "Provider {} does not support embeddings",
                self.provider
            ))
        })?;

        let response = embedding_client
            .embed(texts)
            .await
            .map_err(|e| RagError::Embedding(format!("Embedding generation failed: {}", e)))?;

        Ok(response.embeddings)
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }
}

#[async_trait]
impl CompletionBackend for DeepsiftLlmClient {
    async fn complete(&self, system_prompt: &str, user_message: &str) -> RagResult<String> {
        let start_time = Instant::now();
        let messages = vec![system!(system_prompt), user!(user_message)];

        debug!("Sending {} messages to {}", messages.len(), self.model);

        let response = self
            .client
            .chat(messages)
            .await
            .map_err(|e| RagError::Llm(format!("LLM generation failed: {}", e)))?;

        let content = response
            .content_text()
            .ok_or_else(|| RagError::Llm("No text content in LLM response".to_string()))?;

        debug!(
            "Generated response in {:?} ({} chars)",
            start_time.elapsed(),
            content.len()
        );
        Ok(content.to_string())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
