//! Configuration management

use crate::async_utils::RetryConfig;
use crate::error::{DeepsiftError, DeepsiftResult};
use crate::logging::LoggingConfig;
use crate::types::{
    DeepsiftConfig, EmbeddingConfig, LlmConfig, MemoryConfig, ResearchSettings, RetrievalSettings,
};

use std::path::{Path, PathBuf};

impl Default for DeepsiftConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            research: ResearchSettings::default(),
            retrieval: RetrievalSettings::default(),
            memory: MemoryConfig::default(),
            retry: RetryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.2,
            max_tokens: Some(1000),
            timeout_secs: 60,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            api_key: None,
            dimension: 1536,
        }
    }
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self {
            max_depth: 10,
            max_tokens: 4096,
            namespace: "deep-searcher".to_string(),
            max_sub_queries_per_round: 5,
            max_concurrency: 4,
            per_source_limit: 5,
            adapter_timeout_secs: 30,
            fallback_to_query_on_decompose_error: false,
            tokenizer_encoding: "cl100k_base".to_string(),
        }
    }
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            web_provider: "tavily".to_string(),
            web_api_key: None,
            web_search_enabled: true,
            arxiv_enabled: true,
            arxiv_base_url: "https://export.arxiv.org/api/query".to_string(),
            semantic_enabled: true,
            enable_reranking: true,
            user_agent: concat!("deepsift/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        let persist_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("deepsift")
            .join("memory");

        Self {
            enable_persistence: false,
            persist_dir,
        }
    }
}

impl DeepsiftConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> DeepsiftResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DeepsiftError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: DeepsiftConfig =
            toml::from_str(&content).map_err(|e| DeepsiftError::Config {
                message: format!("Failed to parse config: {}", e),
                source: Some(Box::new(e)),
                context: crate::ErrorContext::new("config")
                    .with_operation("parse_toml")
                    .with_suggestion("Check TOML syntax in config file"),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> DeepsiftResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| DeepsiftError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(path, content).map_err(|e| DeepsiftError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Default location of the user configuration file
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("deepsift")
            .join("config.toml")
    }

    /// Validate configuration
    pub fn validate(&self) -> DeepsiftResult<()> {
        self.research.validate()?;

        if self.embedding.dimension == 0 {
            return Err(invalid(
                "Embedding dimension must be greater than 0",
                "Set embedding.dimension to a positive value",
            ));
        }

        if self.llm.timeout_secs == 0 {
            return Err(invalid(
                "LLM timeout_secs must be greater than 0",
                "Set llm.timeout_secs to a positive value",
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(invalid(
                "Retry max_attempts must be at least 1",
                "Set retry.max_attempts to a positive value",
            ));
        }

        if self.retry.backoff_multiplier < 1.0 {
            return Err(invalid(
                "Retry backoff_multiplier must be at least 1.0",
                "Set retry.backoff_multiplier to 1.0 or more",
            ));
        }

        match self.retrieval.web_provider.as_str() {
            "tavily" | "brave" | "serpapi" => {}
            other => {
                return Err(invalid(
                    &format!("Unsupported web search provider: {}", other),
                    "Use one of: tavily, brave, serpapi",
                ))
            }
        }

        Ok(())
    }
}

impl ResearchSettings {
    /// Validate the numeric budgets of the research loop
    pub fn validate(&self) -> DeepsiftResult<()> {
        if self.max_depth == 0 {
            return Err(invalid(
                "Research max_depth must be greater than 0",
                "Set research.max_depth to a positive value",
            ));
        }

        if self.max_tokens == 0 {
            return Err(invalid(
                "Research max_tokens must be greater than 0",
                "Set research.max_tokens to a positive value",
            ));
        }

        if self.max_concurrency == 0 {
            return Err(invalid(
                "Research max_concurrency must be greater than 0",
                "Set research.max_concurrency to a positive value",
            ));
        }

        if self.max_sub_queries_per_round == 0 {
            return Err(invalid(
                "Research max_sub_queries_per_round must be greater than 0",
                "Set research.max_sub_queries_per_round to a positive value",
            ));
        }

        if self.per_source_limit == 0 || self.adapter_timeout_secs == 0 {
            return Err(invalid(
                "Research per_source_limit and adapter_timeout_secs must be greater than 0",
                "Set both values to positive numbers",
            ));
        }

        Ok(())
    }
}

/// Resolve an API key from configuration, falling back to an environment variable
pub fn resolve_api_key(configured: Option<&str>, env_var: &str) -> Option<String> {
    configured
        .filter(|key| !key.trim().is_empty())
        .map(str::to_string)
        .or_else(|| std::env::var(env_var).ok().filter(|key| !key.is_empty()))
}

fn invalid(message: &str, suggestion: &str) -> DeepsiftError {
    DeepsiftError::Config {
        message: message.to_string(),
        source: None,
        context: crate::ErrorContext::new("config")
            .with_operation("validate")
            .with_suggestion(suggestion),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DeepsiftConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.research.max_depth, 10);
        assert_eq!(config.research.max_tokens, 4096);
        assert_eq!(config.retry.max_attempts, 6);
    }

    #[test]
    fn test_zero_budgets_are_rejected() {
        let mut config = DeepsiftConfig::default();
        config.research.max_depth = 0;
        assert!(matches!(
            config.validate(),
            Err(DeepsiftError::Config { .. })
        ));

        let mut config = DeepsiftConfig::default();
        config.research.max_tokens = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_web_provider_is_rejected() {
        let mut config = DeepsiftConfig::default();
        config.retrieval.web_provider = "altavista".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = DeepsiftConfig::default();
        config.research.namespace = "unit-test".to_string();
        config.save_to_file(&path).unwrap();

        let loaded = DeepsiftConfig::from_file(&path).unwrap();
        assert_eq!(loaded.research.namespace, "unit-test");
        assert_eq!(loaded.llm.model, config.llm.model);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[research]\nmax_depth = 3\n").unwrap();

        let loaded = DeepsiftConfig::from_file(&path).unwrap();
        assert_eq!(loaded.research.max_depth, 3);
        assert_eq!(loaded.research.max_tokens, 4096);
        assert_eq!(loaded.retrieval.web_provider, "tavily");
    }

    #[test]
    fn test_resolve_api_key_prefers_configured_value() {
        assert_eq!(
            resolve_api_key(Some("sk-test"), "DEEPSIFT_TEST_UNSET_KEY"),
            Some("sk-test".to_string())
        );
        assert_eq!(resolve_api_key(Some("  "), "DEEPSIFT_TEST_UNSET_KEY"), None);
    }
}
