//! Tool invocation layer
//!
//! Wraps research, retrieval, extraction and generation capabilities behind a
//! uniform callable contract so an outer conversational agent can pick among
//! them by name. Arguments are validated before any capability is touched and
//! every failure surfaces as a [`ToolError`].
//!
//! ```no_run
//! use deepsift_research::tools::{Tool, ToolRegistry};
//! use serde_json::json;
//!
//! # async fn example(registry: ToolRegistry) -> Result<(), deepsift_research::tools::ToolError> {
//! let answer = registry
//!     .invoke("search_web", json!({"query": "reinforcement learning", "max_results": 3}))
//!     .await?;
//! println!("{}", answer);
//! # Ok(())
//! # }
//! ```

mod builtin;
mod registry;
pub mod validation;

pub use builtin::{DeepResearchTool, ExtractorTool, FlashcardTool, RetrieverTool};
pub use registry::ToolRegistry;

use async_trait::async_trait;
use deepsift_core::DeepsiftError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Failure category of a tool invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    /// Arguments rejected before the capability was invoked
    Validation,
    NotFound,
    Execution,
    Timeout,
}

impl fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolErrorKind::Validation => write!(f, "invalid input"),
            ToolErrorKind::NotFound => write!(f, "not found"),
            ToolErrorKind::Execution => write!(f, "execution failed"),
            ToolErrorKind::Timeout => write!(f, "timed out"),
        }
    }
}

/// The single error type visible above the tool boundary
#[derive(Debug, Clone, thiserror::Error)]
#[error("Tool '{tool}' {kind}: {message}")]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub tool: String,
    pub message: String,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn validation(tool: &str, message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Validation, tool, message)
    }

    pub fn not_found(tool: &str) -> Self {
        Self::new(ToolErrorKind::NotFound, tool, "no tool registered with this name")
    }

    pub fn execution(tool: &str, message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Execution, tool, message)
    }

    pub fn timeout(tool: &str, timeout_ms: u64) -> Self {
        Self::new(
            ToolErrorKind::Timeout,
            tool,
            format!("no result after {}ms", timeout_ms),
        )
    }

    /// Normalise a capability error at the tool boundary
    pub fn from_core(tool: &str, error: DeepsiftError) -> Self {
        let kind = match &error {
            DeepsiftError::Validation { .. } => ToolErrorKind::Validation,
            DeepsiftError::Timeout { .. } => ToolErrorKind::Timeout,
            _ => ToolErrorKind::Execution,
        };
        Self::new(kind, tool, error.to_string())
    }

    pub fn is_validation(&self) -> bool {
        self.kind == ToolErrorKind::Validation
    }
}

/// Function-calling declaration exposed to an outer agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// A named, schema-validated callable
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name used for lookup and function calling
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the arguments object
    fn parameters_schema(&self) -> Value;

    /// Validate `args` and run the underlying capability
    async fn invoke(&self, args: Value) -> Result<String, ToolError>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.parameters_schema(),
        }
    }
}
