//! `verify_user_trust`: exposes the trust oracle to the verification agent.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::context::RunContext;
use crate::matchmaking::trust::verify_user;
use crate::store::Database;
use crate::tools::tool::{Tool, ToolError, ToolOutput, require_i64};

pub struct VerifyUserTrustTool {
    store: Arc<dyn Database>,
    threshold: f64,
}

impl VerifyUserTrustTool {
    pub fn new(store: Arc<dyn Database>, threshold: f64) -> Self {
        Self { store, threshold }
    }
}

#[async_trait]
impl Tool for VerifyUserTrustTool {
    fn name(&self) -> &str {
        "verify_user_trust"
    }

    fn description(&self) -> &str {
        "Check whether a user's trust score meets the required threshold. \
         Returns a JSON object whose status is VERIFIED, UNTRUSTWORTHY or NOT_FOUND."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "user_id": {
                    "type": "integer",
                    "description": "Id of the user to verify"
                }
            },
            "required": ["user_id"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: &RunContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let user_id = require_i64(&params, "user_id")?;

        let report = verify_user(self.store.as_ref(), user_id, self.threshold)
            .await
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;

        let result = serde_json::to_value(&report)
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;
        Ok(ToolOutput::success(result, start.elapsed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LibSqlBackend;

    #[tokio::test]
    async fn reports_missing_user_as_json() {
        let store: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let tool = VerifyUserTrustTool::new(store, 30.0);

        let out = tool
            .execute(serde_json::json!({"user_id": 41}), &RunContext::new("test"))
            .await
            .unwrap();
        assert_eq!(
            out.result,
            serde_json::json!({
                "user_id": 41,
                "status": "NOT_FOUND",
                "details": "User does not exist."
            })
        );
    }

    #[tokio::test]
    async fn requires_user_id() {
        let store: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let tool = VerifyUserTrustTool::new(store, 30.0);
        let result = tool
            .execute(serde_json::json!({}), &RunContext::new("test"))
            .await;
        assert!(matches!(result, Err(ToolError::InvalidParameters(_))));
    }
}
