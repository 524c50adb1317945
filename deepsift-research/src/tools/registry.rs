//! Name-indexed tool registry

use super::{Tool, ToolDefinition, ToolError};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Default per-invocation ceiling; deep research runs are the long pole
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(600);

/// Holds tools by name and invokes them under a timeout
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    /// Registration order, for stable definition listings
    order: Vec<String>,
    timeout: Duration,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Register a tool, replacing any previous tool with the same name
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_arc(Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            warn!("Replacing previously registered tool '{}'", name);
        } else {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn list(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.definition())
            .collect()
    }

    /// Invoke a tool by name
    pub async fn invoke(&self, name: &str, args: Value) -> Result<String, ToolError> {
        let tool = self.get(name).ok_or_else(|| ToolError::not_found(name))?;

        let start = Instant::now();
        let result = match tokio::time::timeout(self.timeout, tool.invoke(args)).await {
            Ok(result) => result,
            Err(_) => Err(ToolError::timeout(name, self.timeout.as_millis() as u64)),
        };

        match &result {
            Ok(output) => info!(
                tool = name,
                duration_ms = start.elapsed().as_millis() as u64,
                output_len = output.len(),
                "Tool invocation succeeded"
            ),
            Err(e) => warn!(
                tool = name,
                kind = %e.kind,
                duration_ms = start.elapsed().as_millis() as u64,
                "Tool invocation failed: {}",
                e.message
            ),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolErrorKind;
    use async_trait::async_trait;
    use serde_json::json;

    struct SleepyTool {
        delay: Duration,
    }

    #[async_trait]
    impl Tool for SleepyTool {
        fn name(&self) -> &str {
            "sleepy"
        }

        fn description(&self) -> &str {
            "Sleeps before answering"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }

        async fn invoke(&self, _args: Value) -> Result<String, ToolError> {
            tokio::time::sleep(self.delay).await;
            Ok("awake".to_string())
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_is_not_found() {
        let registry = ToolRegistry::new();
        let err = registry.invoke("missing", json!({})).await.unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::NotFound);
        assert_eq!(err.tool, "missing");
    }

    #[tokio::test]
    async fn test_invocation_timeout() {
        let mut registry = ToolRegistry::new().with_timeout(Duration::from_millis(20));
        registry.register(SleepyTool {
            delay: Duration::from_secs(5),
        });

        let err = registry.invoke("sleepy", json!({})).await.unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_register_and_invoke() {
        let mut registry = ToolRegistry::new();
        registry.register(SleepyTool {
            delay: Duration::from_millis(1),
        });
        registry.register(SleepyTool {
            delay: Duration::from_millis(1),
        });

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.list(), vec!["sleepy"]);
        assert_eq!(registry.definitions()[0].description, "Sleeps before answering");
        assert_eq!(registry.invoke("sleepy", json!({})).await.unwrap(), "awake");
    }
}
