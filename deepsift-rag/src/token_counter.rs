//! Token counting for evidence budgeting
//!
//! Uses tiktoken-rs so budget comparisons line up with the context window of
//! the model that consumes the evidence.

use crate::types::{RagError, RagResult};
use tiktoken_rs::{get_bpe_from_model, CoreBPE};
use tracing::{debug, warn};

/// BPE token counter
pub struct TokenCounter {
    encoder: CoreBPE,
    encoding: String,
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCounter")
            .field("encoding", &self.encoding)
            .finish()
    }
}

impl TokenCounter {
    /// Create a counter from an encoding name (`cl100k_base`, `o200k_base`, ...)
    /// or a model name (`gpt-4o`, `gpt-4`, ...)
    pub fn new(encoding_or_model: &str) -> RagResult<Self> {
        let encoder = match encoding_or_model {
            "cl100k_base" => tiktoken_rs::cl100k_base(),
            "o200k_base" => tiktoken_rs::o200k_base(),
            "p50k_base" => tiktoken_rs::p50k_base(),
            "r50k_base" => tiktoken_rs::r50k_base(),
            model => get_bpe_from_model(model),
        }
        .map_err(|e| {
            RagError::Config(format!(
                "Failed to get encoder for {}: {}",
                encoding_or_model, e
            ))
        })?;

        Ok(Self {
            encoder,
            encoding: encoding_or_model.to_string(),
        })
    }

    /// Counter for the default `cl100k_base` encoding
    pub fn cl100k() -> RagResult<Self> {
        Self::new("cl100k_base")
    }

    /// Count tokens in a text string
    pub fn count_tokens(&self, text: &str) -> usize {
        self.encoder.encode_with_special_tokens(text).len()
    }

    /// Encoded length of the chunks joined by newlines
    pub fn count_joined(&self, chunks: &[String]) -> usize {
        if chunks.is_empty() {
            return 0;
        }
        self.count_tokens(&chunks.join("\n"))
    }

    /// Truncate text to at most `max_tokens` tokens
    pub fn truncate_to_tokens(&self, text: &str, max_tokens: usize) -> RagResult<String> {
        let tokens = self.encoder.encode_with_special_tokens(text);

        if tokens.len() <= max_tokens {
            return Ok(text.to_string());
        }

        // A multi-byte character can span several tokens; back off until the
        // prefix ends on a character boundary
        let mut end = max_tokens;
        let truncated_text = loop {
            match self.encoder.decode(tokens[..end].to_vec()) {
                Ok(text) => break text,
                Err(_) if end > 0 => end -= 1,
                Err(e) => {
                    return Err(RagError::Config(format!(
                        "Failed to decode truncated tokens: {}",
                        e
                    )))
                }
            }
        };

        debug!(
            "Truncated text from {} to {} tokens",
            tokens.len(),
            end
        );
        Ok(truncated_text)
    }

    pub fn encoding(&self) -> &str {
        &self.encoding
    }
}

/// Context window limits for different models
pub fn get_context_limit(model_name: &str) -> usize {
    match model_name {
        "gpt-4" => 8192,
        "gpt-4-turbo" | "gpt-4o" | "gpt-4o-mini" => 128000,
        "gpt-3.5-turbo" => 16385,
        name if name.starts_with("claude-") => 200000,
        _ => {
            warn!(
                "Unknown context limit for model: {}, using default 8192",
                model_name
            );
            8192
        }
    }
}
