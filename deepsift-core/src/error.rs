//! Unified error handling system
//!
//! Provides structured error types with context, recovery suggestions, and proper error chaining

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

pub type DeepsiftResult<T> = Result<T, DeepsiftError>;

/// Error context providing additional information for debugging and recovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Timestamp when error occurred
    pub timestamp: DateTime<Utc>,
    /// Component where error originated
    pub component: String,
    /// Operation being performed when error occurred
    pub operation: Option<String>,
    /// Additional metadata
    pub metadata: std::collections::HashMap<String, String>,
    /// Recovery suggestions
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            metadata: std::collections::HashMap::new(),
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Main error type for the deepsift system
#[derive(Error, Debug)]
pub enum DeepsiftError {
    /// A retrieval source failed. Isolated per source by the orchestrator.
    #[error("Retrieval error ({source_name}): {message}")]
    Retrieval {
        source_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    /// A generation capability call failed. Fatal to a research run.
    #[error("Generation error: {message}")]
    Generation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Operation timeout: {operation}")]
    Timeout {
        operation: String,
        duration_ms: u64,
        context: ErrorContext,
    },

    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        retry_after_ms: Option<u64>,
        context: ErrorContext,
    },

    #[error("Operation cancelled: {operation}")]
    Cancelled {
        operation: String,
        context: ErrorContext,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },
}

impl DeepsiftError {
    /// Get the error context
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            DeepsiftError::Retrieval { context, .. } => Some(context),
            DeepsiftError::Generation { context, .. } => Some(context),
            DeepsiftError::Validation { context, .. } => Some(context),
            DeepsiftError::Config { context, .. } => Some(context),
            DeepsiftError::Storage { context, .. } => Some(context),
            DeepsiftError::Network { context, .. } => Some(context),
            DeepsiftError::Timeout { context, .. } => Some(context),
            DeepsiftError::RateLimit { context, .. } => Some(context),
            DeepsiftError::Cancelled { context, .. } => Some(context),
            DeepsiftError::Internal { context, .. } => Some(context),
            DeepsiftError::Io(_) | DeepsiftError::Serialization(_) => None,
        }
    }

    /// Check if error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            DeepsiftError::Network { .. } => true,
            DeepsiftError::Timeout { .. } => true,
            DeepsiftError::RateLimit { .. } => true,
            DeepsiftError::Generation { .. } => true,
            DeepsiftError::Config { .. } => false,
            DeepsiftError::Validation { .. } => false,
            DeepsiftError::Cancelled { .. } => false,
            _ => false,
        }
    }

    /// Get retry delay in milliseconds for recoverable errors
    pub fn retry_delay_ms(&self) -> Option<u64> {
        match self {
            DeepsiftError::Network { .. } => Some(1000),
            DeepsiftError::Timeout { .. } => Some(2000),
            DeepsiftError::RateLimit { retry_after_ms, .. } => *retry_after_ms,
            _ => None,
        }
    }

    pub fn is_retrieval(&self) -> bool {
        matches!(self, DeepsiftError::Retrieval { .. })
    }

    pub fn is_generation(&self) -> bool {
        matches!(self, DeepsiftError::Generation { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, DeepsiftError::Cancelled { .. })
    }

    /// Wrap any error raised while talking to a retrieval source.
    ///
    /// Errors that already are retrieval errors keep their original source name.
    pub fn into_retrieval(self, source_name: &str) -> Self {
        match self {
            err @ DeepsiftError::Retrieval { .. } => err,
            DeepsiftError::Cancelled { operation, context } => {
                DeepsiftError::Cancelled { operation, context }
            }
            other => DeepsiftError::Retrieval {
                source_name: source_name.to_string(),
                message: other.to_string(),
                source: Some(Box::new(other)),
                context: ErrorContext::new("retrieval").with_operation("search"),
            },
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        match self {
            DeepsiftError::Internal { .. } => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Internal error occurred"
                );
            }
            DeepsiftError::Config { .. } | DeepsiftError::Validation { .. } => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Configuration or validation error"
                );
            }
            DeepsiftError::Retrieval { .. }
            | DeepsiftError::Network { .. }
            | DeepsiftError::Timeout { .. }
            | DeepsiftError::RateLimit { .. } => {
                warn!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Source or network error (may be recoverable)"
                );
            }
            _ => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Error occurred"
                );
            }
        }
    }
}

/// Convenience macros for creating errors with context
#[macro_export]
macro_rules! retrieval_error {
    ($msg:expr, $source_name:expr) => {
        $crate::DeepsiftError::Retrieval {
            source_name: $source_name.to_string(),
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new("retrieval"),
        }
    };
    ($msg:expr, $source_name:expr, $source:expr) => {
        $crate::DeepsiftError::Retrieval {
            source_name: $source_name.to_string(),
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: $crate::ErrorContext::new("retrieval"),
        }
    };
}

#[macro_export]
macro_rules! generation_error {
    ($msg:expr, $component:expr) => {
        $crate::DeepsiftError::Generation {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component),
        }
    };
    ($msg:expr, $component:expr, $source:expr) => {
        $crate::DeepsiftError::Generation {
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: $crate::ErrorContext::new($component),
        }
    };
}

#[macro_export]
macro_rules! config_error {
    ($msg:expr, $component:expr) => {
        $crate::DeepsiftError::Config {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check your configuration file")
                .with_suggestion("Run 'deepsift config --init' to create default config"),
        }
    };
}

#[macro_export]
macro_rules! validation_error {
    ($msg:expr, $field:expr, $component:expr) => {
        $crate::DeepsiftError::Validation {
            message: $msg.to_string(),
            field: Some($field.to_string()),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check the field value and format"),
        }
    };
}
