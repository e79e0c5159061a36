//! Tool registry and the per-conversation tool sets carved out of it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;

use crate::context::RunContext;
use crate::error::ToolError;
use crate::llm::ToolDefinition;
use crate::tools::tool::Tool;

/// Names of built-in tools that cannot be shadowed by later registrations.
const PROTECTED_TOOL_NAMES: &[&str] = &[
    "verify_user_trust",
    "find_potential_mentors",
    "save_session_summary",
];

/// Registry of available tools.
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
    /// Names registered as built-in (protected from shadowing).
    builtin_names: RwLock<HashSet<String>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
            builtin_names: RwLock::new(HashSet::new()),
        }
    }

    /// Register a tool. Rejects tools that try to shadow a built-in name.
    pub async fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.builtin_names.read().await.contains(&name) {
            tracing::warn!(
                tool = %name,
                "Rejected tool registration: would shadow a built-in tool"
            );
            return;
        }
        if PROTECTED_TOOL_NAMES.contains(&name.as_str()) {
            self.builtin_names.write().await.insert(name.clone());
        }
        self.tools.write().await.insert(name.clone(), tool);
        tracing::debug!("Registered tool: {}", name);
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().await.get(name).cloned()
    }

    /// Carve out the tools one conversation may use.
    ///
    /// Unknown names are skipped with a warning; the resulting set keeps the
    /// requested order.
    pub async fn scoped(&self, names: &[&str]) -> ToolSet {
        let mut selected = Vec::with_capacity(names.len());
        for name in names {
            match self.get(name).await {
                Some(tool) => selected.push(tool),
                None => tracing::warn!(tool = %name, "Requested tool is not registered"),
            }
        }
        ToolSet { tools: selected }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The capability set granted to a single agent conversation.
///
/// Calls to tools outside the set are refused.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Tool definitions for LLM function calling.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect()
    }

    /// Execute a tool from this set and serialize its result for the model.
    pub async fn execute(
        &self,
        name: &str,
        params: &serde_json::Value,
        ctx: &RunContext,
    ) -> Result<String, ToolError> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| ToolError::OutOfScope {
                name: name.to_string(),
            })?;

        tracing::debug!(
            tool = %name,
            params = %params,
            run = %ctx.run_id,
            agent = %ctx.agent,
            "Tool call started"
        );

        let timeout = tool.execution_timeout();
        let start = Instant::now();
        let result = tokio::time::timeout(timeout, tool.execute(params.clone(), ctx)).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let output = match result {
            Ok(Ok(output)) => {
                tracing::debug!(tool = %name, elapsed_ms, "Tool call succeeded");
                output
            }
            Ok(Err(e)) => {
                tracing::debug!(tool = %name, elapsed_ms, error = %e, "Tool call failed");
                return Err(ToolError::ExecutionFailed {
                    name: name.to_string(),
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                tracing::debug!(tool = %name, elapsed_ms, "Tool call timed out");
                return Err(ToolError::Timeout {
                    name: name.to_string(),
                    timeout,
                });
            }
        };

        serde_json::to_string(&output.result).map_err(|e| ToolError::ExecutionFailed {
            name: name.to_string(),
            reason: format!("Failed to serialize result: {e}"),
        })
    }
}
