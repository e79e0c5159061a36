//! The `Tool` trait and its input/output types.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::context::RunContext;

/// Errors a tool returns from [`Tool::execute`].
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

/// Output of a successful tool call.
#[derive(Debug, Clone, Serialize)]
pub struct ToolOutput {
    /// JSON payload handed back to the model.
    pub result: serde_json::Value,
    #[serde(skip)]
    pub duration: Duration,
}

impl ToolOutput {
    pub fn success(result: serde_json::Value, duration: Duration) -> Self {
        Self { result, duration }
    }
}

/// A capability an agent can invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    /// Description shown to the model.
    fn description(&self) -> &str;

    /// JSON schema of the parameters object.
    fn parameters_schema(&self) -> serde_json::Value;

    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: &RunContext,
    ) -> Result<ToolOutput, ToolError>;

    fn execution_timeout(&self) -> Duration {
        Duration::from_secs(30)
    }
}

/// Extract a required string parameter.
pub fn require_str<'a>(params: &'a serde_json::Value, key: &str) -> Result<&'a str, ToolError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::InvalidParameters(format!("missing '{key}' parameter")))
}

/// Extract a required integer parameter.
///
/// Models frequently quote numbers, so numeric strings are accepted too.
pub fn require_i64(params: &serde_json::Value, key: &str) -> Result<i64, ToolError> {
    match params.get(key) {
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| ToolError::InvalidParameters(format!("'{key}' must be an integer"))),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| ToolError::InvalidParameters(format!("'{key}' must be an integer"))),
        _ => Err(ToolError::InvalidParameters(format!(
            "missing '{key}' parameter"
        ))),
    }
}
