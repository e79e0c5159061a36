//! `save_session_summary`: lets the summary agent persist its write-up.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::context::RunContext;
use crate::store::Database;
use crate::tools::tool::{Tool, ToolError, ToolOutput, require_i64, require_str};

pub struct SaveSessionSummaryTool {
    store: Arc<dyn Database>,
}

impl SaveSessionSummaryTool {
    pub fn new(store: Arc<dyn Database>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for SaveSessionSummaryTool {
    fn name(&self) -> &str {
        "save_session_summary"
    }

    fn description(&self) -> &str {
        "Save the summary of a mentorship session and mark the session as completed."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "session_id": {
                    "type": "integer",
                    "description": "Id of the mentorship session"
                },
                "summary_text": {
                    "type": "string",
                    "description": "Concise bullet-point summary of the session"
                }
            },
            "required": ["session_id", "summary_text"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: &RunContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let session_id = require_i64(&params, "session_id")?;
        let summary_text = require_str(&params, "summary_text")?;

        match ctx.session_id {
            Some(bound) if bound == session_id => {}
            Some(bound) => {
                return Err(ToolError::InvalidParameters(format!(
                    "this conversation may only summarize session {bound}, not {session_id}"
                )));
            }
            None => {
                return Err(ToolError::ExecutionFailed(
                    "conversation is not bound to a mentorship session".to_string(),
                ));
            }
        }

        let saved = self
            .store
            .save_session_summary(session_id, summary_text)
            .await
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;

        let result = match saved {
            Some(_) => serde_json::json!({
                "session_id": session_id,
                "status": "SUCCESS",
                "details": "Summary saved and session marked as COMPLETED.",
            }),
            None => serde_json::json!({
                "session_id": session_id,
                "status": "ERROR",
                "details": "Session not found or not awaiting a summary.",
            }),
        };
        Ok(ToolOutput::success(result, start.elapsed()))
    }
}
